use tbl_types::{DataType, Scalar, cast_scalar, folds, supertype};

use crate::{DataFrame, FrameError, NullStrategy, Series};

fn is_summable(dtype: &DataType) -> bool {
    dtype.is_numeric() || matches!(dtype, DataType::Boolean)
}

impl DataFrame {
    fn reduce(
        &self,
        output_dtype: impl Fn(&DataType) -> DataType,
        fold: impl Fn(&Series) -> Scalar,
    ) -> Result<Self, FrameError> {
        let columns = self
            .iter()
            .map(|s| Series::with_dtype(s.name(), output_dtype(s.dtype()), vec![fold(s)]))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns)
    }

    fn float_or_null(dtype: &DataType) -> DataType {
        if is_summable(dtype) {
            DataType::Float64
        } else {
            DataType::Null
        }
    }

    fn orderable_or_null(dtype: &DataType) -> DataType {
        if dtype.is_nested() {
            DataType::Null
        } else {
            dtype.clone()
        }
    }

    /// One-row frame of per-column sums; non-numeric columns become null.
    pub fn sum(&self) -> Result<Self, FrameError> {
        self.reduce(
            |dtype| folds::sum_dtype(dtype).unwrap_or(DataType::Null),
            Series::sum,
        )
    }

    pub fn mean(&self) -> Result<Self, FrameError> {
        self.reduce(Self::float_or_null, Series::mean)
    }

    pub fn median(&self) -> Result<Self, FrameError> {
        self.reduce(Self::float_or_null, Series::median)
    }

    pub fn var(&self, ddof: u8) -> Result<Self, FrameError> {
        self.reduce(Self::float_or_null, |s| s.var(ddof))
    }

    pub fn std(&self, ddof: u8) -> Result<Self, FrameError> {
        self.reduce(Self::float_or_null, |s| s.std(ddof))
    }

    pub fn min(&self) -> Result<Self, FrameError> {
        self.reduce(Self::orderable_or_null, Series::min)
    }

    pub fn max(&self) -> Result<Self, FrameError> {
        self.reduce(Self::orderable_or_null, Series::max)
    }

    fn horizontal_inputs(&self, op: &str, numeric: bool) -> Result<DataType, FrameError> {
        if self.width() == 0 {
            return Err(FrameError::InvalidArgument(format!(
                "{op} needs at least one column"
            )));
        }
        let mut common = DataType::Null;
        for series in self.iter() {
            let accepted = if numeric {
                is_summable(series.dtype()) || matches!(series.dtype(), DataType::Null)
            } else {
                !series.dtype().is_nested()
            };
            if !accepted {
                return Err(FrameError::InvalidArgument(format!(
                    "{op} cannot use column {:?} of dtype {}",
                    series.name(),
                    series.dtype()
                )));
            }
            common = supertype(&common, series.dtype())?;
        }
        Ok(common)
    }

    fn fold_rows(
        &self,
        name: &str,
        common: &DataType,
        output: DataType,
        strategy: NullStrategy,
        fold: impl Fn(&[Scalar]) -> Scalar,
    ) -> Result<Series, FrameError> {
        let columns = self.iter().map(Series::values).collect::<Vec<_>>();
        let mut out = Vec::with_capacity(self.height());
        let mut row = Vec::with_capacity(self.width());
        for idx in 0..self.height() {
            row.clear();
            for values in &columns {
                row.push(cast_scalar(&values[idx], common)?);
            }
            let value = if strategy == NullStrategy::Propagate && row.iter().any(Scalar::is_null)
            {
                Scalar::Null
            } else {
                fold(row.as_slice())
            };
            out.push(value);
        }
        Series::with_dtype(name, output, out)
    }

    /// Row-wise sum across every column. Under `Ignore` an all-null row sums
    /// to zero.
    pub fn sum_horizontal(&self, strategy: NullStrategy) -> Result<Series, FrameError> {
        let common = self.horizontal_inputs("sum_horizontal", true)?;
        let output = folds::sum_dtype(&common).unwrap_or(DataType::Int64);
        let sum_input = if matches!(common, DataType::Null) {
            DataType::Int64
        } else {
            common.clone()
        };
        self.fold_rows("sum", &common, output, strategy, |row| {
            folds::sum(row, &sum_input)
        })
    }

    pub fn mean_horizontal(&self, strategy: NullStrategy) -> Result<Series, FrameError> {
        let common = self.horizontal_inputs("mean_horizontal", true)?;
        self.fold_rows("mean", &common, DataType::Float64, strategy, folds::mean)
    }

    pub fn min_horizontal(&self, strategy: NullStrategy) -> Result<Series, FrameError> {
        let common = self.horizontal_inputs("min_horizontal", false)?;
        self.fold_rows("min", &common, common.clone(), strategy, folds::min)
    }

    pub fn max_horizontal(&self, strategy: NullStrategy) -> Result<Series, FrameError> {
        let common = self.horizontal_inputs("max_horizontal", false)?;
        self.fold_rows("max", &common, common.clone(), strategy, folds::max)
    }
}
