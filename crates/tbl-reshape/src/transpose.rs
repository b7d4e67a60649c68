use serde::{Deserialize, Serialize};
use tbl_frame::{DataFrame, DataType, Scalar, Series};
use tbl_types::supertype;

use crate::ReshapeError;

/// Where the transposed frame's column names come from. Without one, the
/// columns are called `column_0`, `column_1`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnNames {
    /// Truncated to the row count, or padded with generated names.
    Given(Vec<String>),
    Prefix(String),
    /// String forms of this column's values; the column itself is not
    /// transposed.
    FromColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransposeArgs {
    pub include_header: bool,
    pub header_name: String,
    pub column_names: Option<ColumnNames>,
}

impl Default for TransposeArgs {
    fn default() -> Self {
        Self {
            include_header: false,
            header_name: "column".to_owned(),
            column_names: None,
        }
    }
}

impl TransposeArgs {
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.include_header = true;
        self.header_name = name.into();
        self
    }

    #[must_use]
    pub fn with_column_names(mut self, names: ColumnNames) -> Self {
        self.column_names = Some(names);
        self
    }
}

fn output_names(df: &DataFrame, names: Option<&ColumnNames>) -> Result<Vec<String>, ReshapeError> {
    let height = df.height();
    Ok(match names {
        None => (0..height).map(|i| format!("column_{i}")).collect(),
        Some(ColumnNames::Given(given)) => (0..height)
            .map(|i| given.get(i).cloned().unwrap_or_else(|| format!("column_{i}")))
            .collect(),
        Some(ColumnNames::Prefix(prefix)) => (0..height).map(|i| format!("{prefix}{i}")).collect(),
        Some(ColumnNames::FromColumn(name)) => {
            df.column(name)?.iter().map(ToString::to_string).collect()
        }
    })
}

/// Rows become columns. Every value is cast to the supertype of the
/// transposed columns.
pub fn transpose(df: &DataFrame, args: &TransposeArgs) -> Result<DataFrame, ReshapeError> {
    let names = output_names(df, args.column_names.as_ref())?;
    let skip = match &args.column_names {
        Some(ColumnNames::FromColumn(name)) => Some(name.as_str()),
        _ => None,
    };
    let sources = df
        .iter()
        .filter(|series| Some(series.name()) != skip)
        .collect::<Vec<_>>();

    let mut common = DataType::Null;
    for series in &sources {
        common = supertype(&common, series.dtype())?;
    }
    let cast = sources
        .iter()
        .map(|series| Ok(series.cast(&common)?.to_vec()))
        .collect::<Result<Vec<_>, ReshapeError>>()?;

    let mut columns = Vec::with_capacity(names.len() + 1);
    if args.include_header {
        let header = sources
            .iter()
            .map(|series| Scalar::Utf8(series.name().to_owned()))
            .collect();
        columns.push(Series::with_dtype(
            args.header_name.as_str(),
            DataType::Utf8,
            header,
        )?);
    }
    for (row, name) in names.into_iter().enumerate() {
        let values = cast.iter().map(|column| column[row].clone()).collect();
        columns.push(Series::with_dtype(name, common.clone(), values)?);
    }
    Ok(DataFrame::new(columns)?)
}
