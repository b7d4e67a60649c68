use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use tbl_types::{DataType, Scalar};

use crate::{Evaluator, FrameError, Row, Rows, Schema, Series};

/// An ordered collection of equally long, uniquely named series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataFrame {
    columns: Vec<Series>,
}

fn check_columns(columns: &[Series]) -> Result<(), FrameError> {
    let height = columns.first().map_or(0, Series::len);
    let mut seen = HashSet::with_capacity(columns.len());
    for series in columns {
        if series.len() != height {
            return Err(FrameError::LengthMismatch {
                expected: height,
                actual: series.len(),
            });
        }
        if !seen.insert(series.name()) {
            return Err(FrameError::DuplicateColumn(series.name().to_owned()));
        }
    }
    Ok(())
}

impl DataFrame {
    pub fn new(columns: Vec<Series>) -> Result<Self, FrameError> {
        check_columns(&columns)?;
        Ok(Self { columns })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from literal `(name, values)` pairs, inferring each dtype.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (S, Vec<Scalar>)>,
        S: Into<String>,
    {
        let series = columns
            .into_iter()
            .map(|(name, values)| Series::from_values(name, values))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(series)
    }

    /// Build from row-major values coerced to `schema`.
    pub fn from_rows(schema: &Schema, rows: Vec<Vec<Scalar>>) -> Result<Self, FrameError> {
        let mut buffers = vec![Vec::with_capacity(rows.len()); schema.len()];
        for row in rows {
            if row.len() != schema.len() {
                return Err(FrameError::LengthMismatch {
                    expected: schema.len(),
                    actual: row.len(),
                });
            }
            for (buffer, value) in buffers.iter_mut().zip(row) {
                buffer.push(value);
            }
        }
        let series = schema
            .iter()
            .zip(buffers)
            .map(|(field, values)| Series::with_dtype(field.name.clone(), field.dtype.clone(), values))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(series)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Series::len)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Series::name).collect()
    }

    /// Recomputed from the columns on every call.
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema::from_fields(
            self.columns
                .iter()
                .map(|s| tbl_types::Field::new(s.name(), s.dtype().clone()))
                .collect(),
        )
        .unwrap_or_default()
    }

    #[must_use]
    pub fn dtypes(&self) -> Vec<DataType> {
        self.columns.iter().map(|s| s.dtype().clone()).collect()
    }

    #[must_use]
    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    #[must_use]
    pub fn into_columns(self) -> Vec<Series> {
        self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Series> {
        self.columns.iter()
    }

    #[must_use]
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|s| s.name() == name)
    }

    pub fn column(&self, name: &str) -> Result<&Series, FrameError> {
        self.columns
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))
    }

    #[must_use]
    pub fn column_at(&self, idx: usize) -> Option<&Series> {
        self.columns.get(idx)
    }

    pub(crate) fn resolve(&self, names: &[&str]) -> Result<Vec<&Series>, FrameError> {
        names.iter().map(|name| self.column(name)).collect()
    }

    fn check_height(&self, series: &Series) -> Result<(), FrameError> {
        if self.width() > 0 && series.len() != self.height() {
            return Err(FrameError::LengthMismatch {
                expected: self.height(),
                actual: series.len(),
            });
        }
        Ok(())
    }

    /// Replace the same-named column or append a new one.
    pub fn with_column(&mut self, series: Series) -> Result<&mut Self, FrameError> {
        match self.get_column_index(series.name()) {
            Some(idx) => {
                if self.width() > 1 {
                    self.check_height(&series)?;
                }
                self.columns[idx] = series;
            }
            None => {
                self.check_height(&series)?;
                self.columns.push(series);
            }
        }
        Ok(self)
    }

    pub fn insert_column(&mut self, idx: usize, series: Series) -> Result<&mut Self, FrameError> {
        if idx > self.width() {
            return Err(FrameError::InvalidArgument(format!(
                "insert position {idx} exceeds width {}",
                self.width()
            )));
        }
        if self.get_column_index(series.name()).is_some() {
            return Err(FrameError::DuplicateColumn(series.name().to_owned()));
        }
        self.check_height(&series)?;
        self.columns.insert(idx, series);
        Ok(self)
    }

    /// Swap the column at `idx` for `series`, returning the old column.
    pub fn replace_column(&mut self, idx: usize, series: Series) -> Result<Series, FrameError> {
        if idx >= self.width() {
            return Err(FrameError::InvalidArgument(format!(
                "column position {idx} out of bounds for width {}",
                self.width()
            )));
        }
        if let Some(existing) = self.get_column_index(series.name())
            && existing != idx
        {
            return Err(FrameError::DuplicateColumn(series.name().to_owned()));
        }
        if self.width() > 1 {
            self.check_height(&series)?;
        }
        Ok(std::mem::replace(&mut self.columns[idx], series))
    }

    pub fn drop_in_place(&mut self, name: &str) -> Result<Series, FrameError> {
        let idx = self
            .get_column_index(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))?;
        Ok(self.columns.remove(idx))
    }

    /// Project onto `names`. A repeated name is kept once, at its first
    /// position.
    pub fn select(&self, names: &[&str]) -> Result<Self, FrameError> {
        let mut seen = HashSet::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            if seen.insert(*name) {
                columns.push(self.column(name)?.clone());
            }
        }
        Ok(Self { columns })
    }

    pub fn drop(&self, name: &str) -> Result<Self, FrameError> {
        let mut out = self.clone();
        out.drop_in_place(name)?;
        Ok(out)
    }

    /// Drop every listed column; unknown names are ignored.
    #[must_use]
    pub fn drop_many(&self, names: &[&str]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|s| !names.contains(&s.name()))
                .cloned()
                .collect(),
        }
    }

    /// Rename columns in place. Sources are resolved against the names
    /// before any renaming happens.
    pub fn rename(&mut self, mapping: &[(&str, &str)]) -> Result<&mut Self, FrameError> {
        let mut names = self
            .columns
            .iter()
            .map(|s| s.name().to_owned())
            .collect::<Vec<_>>();
        for (from, to) in mapping {
            let idx = self
                .get_column_index(from)
                .ok_or_else(|| FrameError::ColumnNotFound((*from).to_owned()))?;
            names[idx] = (*to).to_owned();
        }
        let mut seen = HashSet::with_capacity(names.len());
        if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(FrameError::DuplicateColumn(dup.clone()));
        }
        for (series, name) in self.columns.iter_mut().zip(names) {
            series.rename(name);
        }
        Ok(self)
    }

    /// Append columns side by side.
    pub fn hstack(&self, columns: &[Series]) -> Result<Self, FrameError> {
        let mut all = self.columns.clone();
        all.extend(columns.iter().cloned());
        Self::new(all)
    }

    fn check_same_schema(&self, other: &Self) -> Result<(), FrameError> {
        let (left, right) = (self.schema(), other.schema());
        if left != right {
            let describe = |schema: &Schema| {
                schema
                    .iter()
                    .map(|f| format!("{}: {}", f.name, f.dtype))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(FrameError::SchemaMismatch(format!(
                "[{}] vs [{}]",
                describe(&left),
                describe(&right)
            )));
        }
        Ok(())
    }

    /// Append `other`'s rows, sharing its chunks.
    pub fn extend(&mut self, other: &Self) -> Result<&mut Self, FrameError> {
        if self.width() == 0 {
            self.columns.clone_from(&other.columns);
            return Ok(self);
        }
        self.check_same_schema(other)?;
        for (series, extra) in self.columns.iter_mut().zip(&other.columns) {
            series.append(extra)?;
        }
        Ok(self)
    }

    pub fn vstack(&self, other: &Self) -> Result<Self, FrameError> {
        let mut out = self.clone();
        out.extend(other)?;
        Ok(out)
    }

    pub fn filter(&self, mask: &Series) -> Result<Self, FrameError> {
        if mask.len() != self.height() {
            return Err(FrameError::LengthMismatch {
                expected: self.height(),
                actual: mask.len(),
            });
        }
        let keep = mask
            .column()
            .as_bools()?
            .into_iter()
            .map(|v| v.unwrap_or(false))
            .collect::<Vec<_>>();
        Ok(self.map_columns(|s| Series::new(s.name(), s.column().filter_bools(&keep))))
    }

    pub fn filter_with(&self, evaluator: &dyn Evaluator) -> Result<Self, FrameError> {
        let mask = evaluator.evaluate(self)?;
        self.filter(&mask)
    }

    fn map_columns(&self, f: impl Fn(&Series) -> Series) -> Self {
        Self {
            columns: self.columns.iter().map(f).collect(),
        }
    }

    fn try_map_columns(
        &self,
        f: impl Fn(&Series) -> Result<Series, FrameError>,
    ) -> Result<Self, FrameError> {
        Ok(Self {
            columns: self.columns.iter().map(f).collect::<Result<_, _>>()?,
        })
    }

    pub fn take(&self, indices: &[usize]) -> Result<Self, FrameError> {
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= self.height()) {
            return Err(FrameError::InvalidArgument(format!(
                "row index {bad} out of bounds for height {}",
                self.height()
            )));
        }
        self.try_map_columns(|s| s.take(indices))
    }

    /// Gather rows by position; `None` slots become null rows.
    #[must_use]
    pub fn take_optional(&self, positions: &[Option<usize>]) -> Self {
        self.map_columns(|s| Series::new(s.name(), s.column().reindex_by_positions(positions)))
    }

    /// Rows from `offset` (negative counts from the end), at most `len` of them.
    #[must_use]
    pub fn slice(&self, offset: i64, len: usize) -> Self {
        let height = self.height();
        let start = if offset < 0 {
            height.saturating_sub(usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX))
        } else {
            usize::try_from(offset).unwrap_or(usize::MAX).min(height)
        };
        self.map_columns(|s| s.slice(start, len))
    }

    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        self.map_columns(|s| s.head(n))
    }

    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        self.map_columns(|s| s.tail(n))
    }

    /// Randomly sample rows. Exactly one of `n` and `frac` must be given.
    pub fn sample(
        &self,
        n: Option<usize>,
        frac: Option<f64>,
        with_replacement: bool,
        seed: Option<u64>,
    ) -> Result<Self, FrameError> {
        let total = self.height();
        let sample_n = match (n, frac) {
            (Some(count), None) => count,
            (None, Some(f)) if f.is_finite() && f >= 0.0 => (total as f64 * f).round() as usize,
            (None, Some(f)) => {
                return Err(FrameError::InvalidArgument(format!(
                    "sample fraction must be a non-negative number, got {f}"
                )));
            }
            (None, None) => {
                return Err(FrameError::InvalidArgument(
                    "sample needs either n or frac".to_owned(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(FrameError::InvalidArgument(
                    "cannot specify both n and frac".to_owned(),
                ));
            }
        };

        if sample_n > 0 && total == 0 {
            return Err(FrameError::InvalidArgument(
                "cannot sample from an empty frame".to_owned(),
            ));
        }
        if !with_replacement && sample_n > total {
            return Err(FrameError::InvalidArgument(format!(
                "cannot sample {sample_n} rows from {total} without replacement"
            )));
        }

        let mut rng_state = seed.unwrap_or(42);
        let mut next_rand = || -> usize {
            rng_state = rng_state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1);
            (rng_state >> 33) as usize
        };

        let indices: Vec<usize> = if with_replacement {
            (0..sample_n).map(|_| next_rand() % total).collect()
        } else {
            let mut pool: Vec<usize> = (0..total).collect();
            for i in 0..sample_n {
                let j = i + (next_rand() % (total - i));
                pool.swap(i, j);
            }
            pool.truncate(sample_n);
            pool
        };
        self.take(&indices)
    }

    /// Replace nulls in every column that has any. The fill value is cast to
    /// each such column's dtype.
    pub fn fill_null(&self, value: &Scalar) -> Result<Self, FrameError> {
        self.try_map_columns(|s| {
            if s.null_count() == 0 {
                Ok(s.clone())
            } else {
                s.fill_null(value)
            }
        })
    }

    /// Drop rows holding a null in any of `subset` (default: every column).
    pub fn drop_nulls(&self, subset: Option<&[&str]>) -> Result<Self, FrameError> {
        let keys = match subset {
            Some(names) => self.resolve(names)?,
            None => self.columns.iter().collect(),
        };
        let mut keep = vec![true; self.height()];
        for series in keys {
            for (flag, value) in keep.iter_mut().zip(series.iter()) {
                *flag &= !value.is_null();
            }
        }
        Ok(self.map_columns(|s| Series::new(s.name(), s.column().filter_bools(&keep))))
    }

    /// One-row frame with each column's null count.
    pub fn null_count(&self) -> Result<Self, FrameError> {
        let columns = self
            .columns
            .iter()
            .map(|s| {
                let count = i64::try_from(s.null_count()).unwrap_or(i64::MAX);
                Series::with_dtype(s.name(), DataType::Int64, vec![Scalar::Int(count)])
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    #[must_use]
    pub fn rechunk(&self) -> Self {
        self.map_columns(Series::rechunk)
    }

    /// Largest chunk count of any column.
    #[must_use]
    pub fn n_chunks(&self) -> usize {
        self.columns.iter().map(Series::n_chunks).max().unwrap_or(0)
    }

    pub fn cast(&self, name: &str, dtype: &DataType) -> Result<Self, FrameError> {
        let idx = self
            .get_column_index(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))?;
        let mut out = self.clone();
        out.columns[idx] = self.columns[idx].cast(dtype)?;
        debug!("cast column {name:?} to {dtype}");
        Ok(out)
    }

    pub fn row(&self, idx: usize) -> Result<Row, FrameError> {
        if idx >= self.height() {
            return Err(FrameError::InvalidArgument(format!(
                "row {idx} out of bounds for height {}",
                self.height()
            )));
        }
        let values = self
            .columns
            .iter()
            .map(|s| s.get(idx).cloned().unwrap_or(Scalar::Null))
            .collect();
        Ok(Row::new(Arc::new(self.schema()), values))
    }

    #[must_use]
    pub fn rows(&self) -> Rows<'_> {
        Rows::new(self)
    }
}

impl<'a> IntoIterator for &'a DataFrame {
    type Item = &'a Series;
    type IntoIter = std::slice::Iter<'a, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl<'de> Deserialize<'de> for DataFrame {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            columns: Vec<Series>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.columns).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use tbl_types::{DataType, Scalar};

    use super::DataFrame;
    use crate::{Evaluator, FrameError, Schema, Series};

    fn sample_frame() -> DataFrame {
        DataFrame::from_columns([
            ("a", vec![Scalar::Int(1), Scalar::Int(2), Scalar::Null]),
            (
                "b",
                vec![Scalar::from("x"), Scalar::Null, Scalar::from("z")],
            ),
        ])
        .expect("frame")
    }

    #[test]
    fn constructor_rejects_ragged_and_duplicate_columns() {
        let ragged = DataFrame::from_columns([
            ("a", vec![Scalar::Int(1)]),
            ("b", vec![Scalar::Int(1), Scalar::Int(2)]),
        ]);
        assert!(matches!(ragged, Err(FrameError::LengthMismatch { .. })));

        let dup = DataFrame::from_columns([
            ("a", vec![Scalar::Int(1)]),
            ("a", vec![Scalar::Int(2)]),
        ]);
        assert!(matches!(dup, Err(FrameError::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn from_rows_coerces_to_schema() {
        let schema = Schema::from_pairs([("id", DataType::Int32), ("flag", DataType::Boolean)])
            .expect("schema");
        let df = DataFrame::from_rows(
            &schema,
            vec![
                vec![Scalar::Int(1), Scalar::Boolean(true)],
                vec![Scalar::Int(2), Scalar::Null],
            ],
        )
        .expect("frame");
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.schema(), schema);

        let short = DataFrame::from_rows(&schema, vec![vec![Scalar::Int(1)]]);
        assert!(matches!(short, Err(FrameError::LengthMismatch { .. })));
    }

    #[test]
    fn with_column_replaces_or_appends() {
        let mut df = sample_frame();
        df.with_column(
            Series::from_values("c", vec![Scalar::Int(7); 3]).expect("series"),
        )
        .expect("append");
        assert_eq!(df.column_names(), vec!["a", "b", "c"]);

        df.with_column(Series::from_values("a", vec![Scalar::Int(0); 3]).expect("series"))
            .expect("replace");
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("a").expect("a").get(2), Some(&Scalar::Int(0)));

        let err = df
            .with_column(Series::from_values("d", vec![Scalar::Int(0)]).expect("series"))
            .expect_err("short");
        assert!(matches!(err, FrameError::LengthMismatch { expected: 3, actual: 1 }));
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn empty_frame_adopts_first_height() {
        let mut df = DataFrame::empty();
        df.with_column(Series::from_values("a", vec![Scalar::Int(1); 4]).expect("series"))
            .expect("adopt");
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn insert_replace_and_drop_in_place() {
        let mut df = sample_frame();
        df.insert_column(0, Series::from_values("z", vec![Scalar::Int(9); 3]).expect("z"))
            .expect("insert");
        assert_eq!(df.column_names(), vec!["z", "a", "b"]);
        assert!(matches!(
            df.insert_column(0, Series::from_values("a", vec![Scalar::Int(9); 3]).expect("a")),
            Err(FrameError::DuplicateColumn(_))
        ));

        let old = df
            .replace_column(0, Series::from_values("y", vec![Scalar::Int(1); 3]).expect("y"))
            .expect("replace");
        assert_eq!(old.name(), "z");
        assert!(matches!(
            df.replace_column(0, Series::from_values("a", vec![Scalar::Int(1); 3]).expect("a")),
            Err(FrameError::DuplicateColumn(_))
        ));

        let dropped = df.drop_in_place("y").expect("drop");
        assert_eq!(dropped.len(), 3);
        assert!(matches!(
            df.drop_in_place("y"),
            Err(FrameError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn select_collapses_repeats_and_reports_unknown() {
        let df = sample_frame();
        let out = df.select(&["b", "a", "b"]).expect("select");
        assert_eq!(out.column_names(), vec!["b", "a"]);
        assert!(matches!(
            df.select(&["nope"]),
            Err(FrameError::ColumnNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn drop_is_strict_and_drop_many_is_lenient() {
        let df = sample_frame();
        assert!(matches!(df.drop("c"), Err(FrameError::ColumnNotFound(_))));
        let out = df.drop_many(&["a", "c"]);
        assert_eq!(out.column_names(), vec!["b"]);
    }

    #[test]
    fn rename_checks_sources_and_collisions() {
        let mut df = sample_frame();
        df.rename(&[("a", "b"), ("b", "a")]).expect("swap names");
        assert_eq!(df.column_names(), vec!["b", "a"]);

        let err = df.rename(&[("a", "b")]).expect_err("collision");
        assert!(matches!(err, FrameError::DuplicateColumn(_)));
        assert_eq!(df.column_names(), vec!["b", "a"]);

        assert!(matches!(
            df.rename(&[("missing", "x")]),
            Err(FrameError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn hstack_and_vstack_validate() {
        let df = sample_frame();
        assert!(matches!(
            df.hstack(&[Series::from_values("a", vec![Scalar::Int(1); 3]).expect("a")]),
            Err(FrameError::DuplicateColumn(_))
        ));
        assert!(matches!(
            df.hstack(&[Series::from_values("c", vec![Scalar::Int(1)]).expect("c")]),
            Err(FrameError::LengthMismatch { .. })
        ));

        let stacked = df.vstack(&df).expect("vstack");
        assert_eq!(stacked.height(), 6);
        assert_eq!(stacked.n_chunks(), 2);
        assert_eq!(stacked.rechunk().n_chunks(), 1);

        let other = df.select(&["b", "a"]).expect("reordered");
        assert!(matches!(df.vstack(&other), Err(FrameError::SchemaMismatch(_))));
    }

    #[test]
    fn extend_is_atomic_on_mismatch() {
        let mut df = sample_frame();
        let casted = df.cast("a", &DataType::Float64).expect("cast");
        assert!(df.extend(&casted).is_err());
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn filter_take_slice() {
        let df = sample_frame();
        let mask = Series::from_values(
            "m",
            vec![Scalar::Boolean(true), Scalar::Null, Scalar::Boolean(true)],
        )
        .expect("mask");
        assert_eq!(df.filter(&mask).expect("filter").height(), 2);

        let taken = df.take(&[2, 0]).expect("take");
        assert_eq!(taken.column("a").expect("a").to_vec(), vec![Scalar::Null, Scalar::Int(1)]);
        assert!(df.take(&[3]).is_err());

        assert_eq!(df.slice(-2, 5).height(), 2);
        assert_eq!(df.slice(1, 1).column("a").expect("a").to_vec(), vec![Scalar::Int(2)]);
        assert_eq!(df.head(10).height(), 3);
        assert_eq!(df.tail(1).column("b").expect("b").to_vec(), vec![Scalar::from("z")]);
    }

    #[derive(Debug)]
    struct NotNull(&'static str);

    impl Evaluator for NotNull {
        fn evaluate(&self, df: &DataFrame) -> Result<Series, FrameError> {
            Ok(df.column(self.0)?.is_not_null())
        }
    }

    #[test]
    fn filter_with_uses_evaluator_mask() {
        let df = sample_frame();
        let out = df.filter_with(&NotNull("b")).expect("filter");
        assert_eq!(out.column("a").expect("a").to_vec(), vec![Scalar::Int(1), Scalar::Null]);
    }

    #[test]
    fn sample_is_deterministic_and_validates_arguments() {
        let df = DataFrame::from_columns([("a", (0..20).map(Scalar::from).collect::<Vec<_>>())])
            .expect("frame");
        let first = df.sample(Some(5), None, false, Some(7)).expect("sample");
        let second = df.sample(Some(5), None, false, Some(7)).expect("sample");
        assert_eq!(first, second);
        assert_eq!(first.column("a").expect("a").n_unique(), 5);

        assert_eq!(df.sample(None, Some(0.5), true, None).expect("frac").height(), 10);
        assert!(matches!(
            df.sample(None, None, false, None),
            Err(FrameError::InvalidArgument(_))
        ));
        assert!(matches!(
            df.sample(Some(1), Some(0.1), false, None),
            Err(FrameError::InvalidArgument(_))
        ));
        assert!(df.sample(Some(21), None, false, None).is_err());
    }

    #[test]
    fn null_handling_helpers() {
        let df = sample_frame();
        let counts = df.null_count().expect("counts");
        assert_eq!(counts.column("a").expect("a").to_vec(), vec![Scalar::Int(1)]);

        assert_eq!(df.drop_nulls(None).expect("drop").height(), 1);
        assert_eq!(df.drop_nulls(Some(&["a"][..])).expect("drop").height(), 2);
        assert!(df.drop_nulls(Some(&["q"][..])).is_err());

        let filled = df.fill_null(&Scalar::Int(0)).expect("fill");
        assert_eq!(filled.column("a").expect("a").get(2), Some(&Scalar::Int(0)));
        assert_eq!(filled.column("b").expect("b").get(1), Some(&Scalar::from("0")));
    }

    #[test]
    fn rows_are_restartable_views() {
        let df = sample_frame();
        let first_pass = df.rows().collect::<Vec<_>>();
        let second_pass = df.rows().collect::<Vec<_>>();
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 3);
        assert_eq!(first_pass[1].get("a"), Some(&Scalar::Int(2)));
        assert_eq!(first_pass[1].get("b"), Some(&Scalar::Null));
        assert_eq!(df.row(0).expect("row").values(), &[Scalar::Int(1), Scalar::from("x")]);
        assert!(df.row(3).is_err());
    }

    #[test]
    fn serde_round_trip_revalidates() {
        let df = sample_frame();
        let json = serde_json::to_string(&df).expect("serialize");
        let back: DataFrame = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, df);
    }
}
