use std::borrow::Cow;

use tbl_frame::{DataFrame, DataType, Field, FrameError, Scalar, Series};

use crate::ReshapeError;

fn list_len(value: &Scalar) -> usize {
    match value {
        Scalar::List(items) => items.len(),
        _ => 0,
    }
}

/// One row per list element. Other columns repeat; an empty or null list
/// yields a single null row.
pub fn explode(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, ReshapeError> {
    if columns.is_empty() {
        return Err(ReshapeError::InvalidArgument(
            "explode needs at least one column".to_owned(),
        ));
    }
    let mut targets: Vec<(&str, DataType, Cow<'_, [Scalar]>)> = Vec::with_capacity(columns.len());
    for name in columns {
        let series = df.column(name)?;
        let DataType::List(inner) = series.dtype() else {
            return Err(ReshapeError::InvalidArgument(format!(
                "cannot explode {name:?} of type {}",
                series.dtype()
            )));
        };
        targets.push((series.name(), (**inner).clone(), series.values()));
    }

    let mut repeat = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let len = list_len(&targets[0].2[row]);
        if targets[1..]
            .iter()
            .any(|(_, _, values)| list_len(&values[row]) != len)
        {
            return Err(FrameError::ExplodeLengthMismatch { row }.into());
        }
        repeat.extend(std::iter::repeat_n(row, len.max(1)));
    }

    let mut exploded = Vec::with_capacity(targets.len());
    for (name, inner, values) in &targets {
        let mut flat = Vec::with_capacity(repeat.len());
        for value in values.iter() {
            match value {
                Scalar::List(items) if !items.is_empty() => flat.extend(items.iter().cloned()),
                _ => flat.push(Scalar::Null),
            }
        }
        exploded.push(Series::with_dtype(*name, inner.clone(), flat)?);
    }

    let mut out = Vec::with_capacity(df.width());
    for series in df.iter() {
        match targets.iter().position(|(name, _, _)| *name == series.name()) {
            Some(idx) => out.push(exploded[idx].clone()),
            None => out.push(series.take(&repeat)?),
        }
    }
    Ok(DataFrame::new(out)?)
}

fn field_series(field: &Field, idx: usize, values: &[Scalar]) -> Result<Series, ReshapeError> {
    let column = values
        .iter()
        .map(|value| match value {
            Scalar::Struct(items) => items.get(idx).cloned().unwrap_or(Scalar::Null),
            _ => Scalar::Null,
        })
        .collect();
    Ok(Series::with_dtype(
        field.name.as_str(),
        field.dtype.clone(),
        column,
    )?)
}

/// Replace each struct column, in place, by one column per field.
pub fn unnest(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, ReshapeError> {
    if columns.is_empty() {
        return Err(ReshapeError::InvalidArgument(
            "unnest needs at least one column".to_owned(),
        ));
    }
    for name in columns {
        let series = df.column(name)?;
        if !matches!(series.dtype(), DataType::Struct(_)) {
            return Err(ReshapeError::InvalidArgument(format!(
                "cannot unnest {name:?} of type {}",
                series.dtype()
            )));
        }
    }

    let mut out = Vec::with_capacity(df.width());
    for series in df.iter() {
        match series.dtype() {
            DataType::Struct(fields) if columns.contains(&series.name()) => {
                let values = series.values();
                for (idx, field) in fields.iter().enumerate() {
                    out.push(field_series(field, idx, &values)?);
                }
            }
            _ => out.push(series.clone()),
        }
    }
    Ok(DataFrame::new(out)?)
}
