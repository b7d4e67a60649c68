#![forbid(unsafe_code)]

//! Grouped aggregation: key partitioning, the closed set of aggregate
//! functions, and time/index windowed variants in [`dynamic`].

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use tbl_columnar::ColumnError;
use tbl_frame::{DataFrame, DataType, Evaluator, FrameError, NullStrategy, Row, Scalar, Series};
use tbl_types::{TypeError, folds, supertype};
use thiserror::Error;

pub mod dynamic;
mod groups;

pub use dynamic::{
    ClosedWindow, DynamicGroupOptions, Label, RollingOptions, StartBy, group_by_dynamic, rolling,
};

#[derive(Debug, Error)]
pub enum GroupByError {
    #[error("unknown aggregate {0:?}")]
    UnknownAggregate(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ColumnError> for GroupByError {
    fn from(err: ColumnError) -> Self {
        Self::Frame(err.into())
    }
}

pub const DEFAULT_ARENA_BUDGET_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByExecutionOptions {
    pub use_arena: bool,
    pub arena_budget_bytes: usize,
}

impl Default for GroupByExecutionOptions {
    fn default() -> Self {
        Self {
            use_arena: true,
            arena_budget_bytes: DEFAULT_ARENA_BUDGET_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByOptions {
    pub maintain_order: bool,
    /// Drop rows with a null in any key instead of grouping them together.
    pub drop_null_keys: bool,
    pub null_strategy: NullStrategy,
    pub execution: GroupByExecutionOptions,
}

impl Default for GroupByOptions {
    fn default() -> Self {
        Self {
            maintain_order: true,
            drop_null_keys: false,
            null_strategy: NullStrategy::Ignore,
            execution: GroupByExecutionOptions::default(),
        }
    }
}

/// Aggregation function selector.
#[derive(Debug, Clone)]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Std { ddof: u8 },
    Var { ddof: u8 },
    /// Non-null values per group.
    Count,
    First,
    Last,
    NUnique,
    /// Evaluated on each group's sub-frame; must yield exactly one value.
    Custom(Arc<dyn Evaluator>),
}

impl AggFunc {
    /// Resolve a name such as `"sum"` or `"n_unique"`. `std` and `var` use
    /// one delta degree of freedom.
    pub fn from_name(name: &str) -> Result<Self, GroupByError> {
        Ok(match name {
            "sum" => Self::Sum,
            "mean" => Self::Mean,
            "min" => Self::Min,
            "max" => Self::Max,
            "median" => Self::Median,
            "std" => Self::Std { ddof: 1 },
            "var" => Self::Var { ddof: 1 },
            "count" => Self::Count,
            "first" => Self::First,
            "last" => Self::Last,
            "n_unique" | "nunique" => Self::NUnique,
            other => return Err(GroupByError::UnknownAggregate(other.to_owned())),
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Std { .. } => "std",
            Self::Var { .. } => "var",
            Self::Count => "count",
            Self::First => "first",
            Self::Last => "last",
            Self::NUnique => "n_unique",
            Self::Custom(_) => "custom",
        }
    }

    /// Output dtype for `input`; `None` means the result is an all-null
    /// column of dtype `Null`.
    fn output_dtype(&self, input: &DataType) -> Option<DataType> {
        let summable = input.is_numeric() || matches!(input, DataType::Boolean);
        match self {
            Self::Sum => folds::sum_dtype(input),
            Self::Mean | Self::Median | Self::Std { .. } | Self::Var { .. } => {
                summable.then_some(DataType::Float64)
            }
            Self::Min | Self::Max => (!input.is_nested()).then(|| input.clone()),
            Self::First | Self::Last => Some(input.clone()),
            Self::Count | Self::NUnique => Some(DataType::Int64),
            Self::Custom(_) => None,
        }
    }

    fn fold(&self, values: &[Scalar], dtype: &DataType, strategy: NullStrategy) -> Scalar {
        if let Self::Count = self {
            return Scalar::Int(as_i64(folds::count(values)));
        }
        if strategy == NullStrategy::Propagate && values.iter().any(Scalar::is_null) {
            return Scalar::Null;
        }
        match self {
            Self::Sum => folds::sum(values, dtype),
            Self::Mean => folds::mean(values),
            Self::Min => folds::min(values),
            Self::Max => folds::max(values),
            Self::Median => folds::median(values),
            Self::Std { ddof } => folds::std(values, *ddof),
            Self::Var { ddof } => folds::var(values, *ddof),
            Self::First => folds::first(values),
            Self::Last => folds::last(values),
            Self::NUnique => Scalar::Int(as_i64(folds::n_unique(values))),
            Self::Count | Self::Custom(_) => Scalar::Null,
        }
    }
}

fn as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// One output column: `func` applied to `column`, named `alias` or the
/// input column's name.
#[derive(Debug, Clone)]
pub struct AggSpec {
    pub column: String,
    pub func: AggFunc,
    pub alias: Option<String>,
}

impl AggSpec {
    #[must_use]
    pub fn new(column: impl Into<String>, func: AggFunc) -> Self {
        Self {
            column: column.into(),
            func,
            alias: None,
        }
    }

    pub fn from_name(column: impl Into<String>, func: &str) -> Result<Self, GroupByError> {
        Ok(Self::new(column, AggFunc::from_name(func)?))
    }

    #[must_use]
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias = Some(name.into());
        self
    }

    #[must_use]
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

fn evaluate_custom(
    source: &DataFrame,
    groups: &[Vec<usize>],
    name: &str,
    evaluator: &dyn Evaluator,
) -> Result<Series, GroupByError> {
    let mut dtype = DataType::Null;
    let mut values = Vec::with_capacity(groups.len());
    for rows in groups {
        let result = evaluator.evaluate(&source.take(rows)?)?;
        if result.len() != 1 {
            return Err(GroupByError::InvalidArgument(format!(
                "custom aggregate {name:?} produced {} values for one group",
                result.len()
            )));
        }
        dtype = supertype(&dtype, result.dtype())?;
        values.push(result.get(0).cloned().unwrap_or(Scalar::Null));
    }
    Ok(Series::with_dtype(name, dtype, values)?)
}

fn evaluate_spec(
    source: &DataFrame,
    groups: &[Vec<usize>],
    spec: &AggSpec,
    strategy: NullStrategy,
) -> Result<Series, GroupByError> {
    let name = spec.output_name();
    if let AggFunc::Custom(evaluator) = &spec.func {
        return evaluate_custom(source, groups, name, evaluator.as_ref());
    }
    let input = source.column(&spec.column)?;
    let Some(dtype) = spec.func.output_dtype(input.dtype()) else {
        return Ok(Series::full_null(name, DataType::Null, groups.len()));
    };
    let values = input.values();
    let mut gathered = Vec::new();
    let out = groups
        .iter()
        .map(|rows| {
            gathered.clear();
            gathered.extend(rows.iter().map(|&row| values[row].clone()));
            spec.func.fold(&gathered, input.dtype(), strategy)
        })
        .collect();
    Ok(Series::with_dtype(name, dtype, out)?)
}

/// One aggregate column per spec, one row per group.
pub(crate) fn evaluate_specs(
    source: &DataFrame,
    groups: &[Vec<usize>],
    specs: &[AggSpec],
    strategy: NullStrategy,
) -> Result<Vec<Series>, GroupByError> {
    specs
        .iter()
        .map(|spec| evaluate_spec(source, groups, spec, strategy))
        .collect()
}

/// Deferred grouping over a borrowed frame. Nothing is partitioned until an
/// aggregation, [`GroupBy::groups`] or [`GroupBy::iter`] asks for it.
#[derive(Debug, Clone)]
pub struct GroupBy<'a> {
    source: &'a DataFrame,
    keys: Vec<String>,
    options: GroupByOptions,
}

impl<'a> GroupBy<'a> {
    pub fn new(
        source: &'a DataFrame,
        keys: &[&str],
        options: GroupByOptions,
    ) -> Result<Self, GroupByError> {
        if keys.is_empty() {
            return Err(GroupByError::InvalidArgument(
                "group_by needs at least one key column".to_owned(),
            ));
        }
        for key in keys {
            source.column(key)?;
        }
        Ok(Self {
            source,
            keys: keys.iter().map(|key| (*key).to_owned()).collect(),
            options,
        })
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[must_use]
    pub fn options(&self) -> GroupByOptions {
        self.options
    }

    fn key_names(&self) -> Vec<&str> {
        self.keys.iter().map(String::as_str).collect()
    }

    /// Row indices of every group, ascending within a group.
    pub fn groups(&self) -> Result<Vec<Vec<usize>>, GroupByError> {
        let (groups, trace) = groups::partition(self.source, &self.key_names(), &self.options)?;
        debug!(
            "group_by {:?}: {} groups from {} rows (dense: {}, arena: {})",
            self.keys,
            groups.len(),
            self.source.height(),
            trace.dense,
            trace.used_arena
        );
        Ok(groups)
    }

    fn key_frame(&self, groups: &[Vec<usize>]) -> Result<DataFrame, GroupByError> {
        let firsts = groups.iter().map(|rows| rows[0]).collect::<Vec<_>>();
        Ok(self.source.select(&self.key_names())?.take(&firsts)?)
    }

    /// Key columns followed by one column per spec.
    pub fn agg(&self, specs: &[AggSpec]) -> Result<DataFrame, GroupByError> {
        let groups = self.groups()?;
        let keys = self.key_frame(&groups)?;
        let aggregates = evaluate_specs(self.source, &groups, specs, self.options.null_strategy)?;
        Ok(keys.hstack(&aggregates)?)
    }

    fn agg_all(&self, func: AggFunc) -> Result<DataFrame, GroupByError> {
        let specs = self
            .source
            .column_names()
            .into_iter()
            .filter(|name| !self.keys.iter().any(|key| key == name))
            .map(|name| AggSpec::new(name, func.clone()))
            .collect::<Vec<_>>();
        self.agg(&specs)
    }

    pub fn sum(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Sum)
    }

    pub fn mean(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Mean)
    }

    pub fn min(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Min)
    }

    pub fn max(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Max)
    }

    pub fn median(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Median)
    }

    pub fn std(&self, ddof: u8) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Std { ddof })
    }

    pub fn var(&self, ddof: u8) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Var { ddof })
    }

    pub fn first(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::First)
    }

    pub fn last(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::Last)
    }

    pub fn n_unique(&self) -> Result<DataFrame, GroupByError> {
        self.agg_all(AggFunc::NUnique)
    }

    /// Key columns plus the row count of each group, named `"count"`.
    pub fn count(&self) -> Result<DataFrame, GroupByError> {
        let groups = self.groups()?;
        let sizes = groups
            .iter()
            .map(|rows| Scalar::Int(as_i64(rows.len())))
            .collect();
        let keys = self.key_frame(&groups)?;
        Ok(keys.hstack(&[Series::with_dtype("count", DataType::Int64, sizes)?])?)
    }

    /// Same as [`GroupBy::count`].
    pub fn len(&self) -> Result<DataFrame, GroupByError> {
        self.count()
    }

    /// `(key row, sub-frame)` per group.
    pub fn iter(&self) -> Result<GroupIter<'a>, GroupByError> {
        let groups = self.groups()?;
        let keys = self.key_frame(&groups)?;
        Ok(GroupIter {
            source: self.source,
            keys,
            groups: groups.into_iter(),
            next: 0,
        })
    }
}

pub struct GroupIter<'a> {
    source: &'a DataFrame,
    keys: DataFrame,
    groups: std::vec::IntoIter<Vec<usize>>,
    next: usize,
}

impl Iterator for GroupIter<'_> {
    type Item = Result<(Row, DataFrame), GroupByError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.groups.next()?;
        let idx = self.next;
        self.next += 1;
        let item = self
            .keys
            .row(idx)
            .and_then(|key| Ok((key, self.source.take(&rows)?)))
            .map_err(GroupByError::from);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

impl ExactSizeIterator for GroupIter<'_> {}

pub fn group_by<'a>(source: &'a DataFrame, keys: &[&str]) -> Result<GroupBy<'a>, GroupByError> {
    GroupBy::new(source, keys, GroupByOptions::default())
}

/// Grouping entry points on [`DataFrame`].
pub trait GroupByExt {
    fn group_by(&self, keys: &[&str]) -> Result<GroupBy<'_>, GroupByError>;

    fn group_by_with_options(
        &self,
        keys: &[&str],
        options: GroupByOptions,
    ) -> Result<GroupBy<'_>, GroupByError>;

    fn group_by_dynamic(
        &self,
        index_column: &str,
        options: &DynamicGroupOptions,
        specs: &[AggSpec],
    ) -> Result<DataFrame, GroupByError>;

    fn rolling(
        &self,
        index_column: &str,
        options: &RollingOptions,
        specs: &[AggSpec],
    ) -> Result<DataFrame, GroupByError>;
}

impl GroupByExt for DataFrame {
    fn group_by(&self, keys: &[&str]) -> Result<GroupBy<'_>, GroupByError> {
        group_by(self, keys)
    }

    fn group_by_with_options(
        &self,
        keys: &[&str],
        options: GroupByOptions,
    ) -> Result<GroupBy<'_>, GroupByError> {
        GroupBy::new(self, keys, options)
    }

    fn group_by_dynamic(
        &self,
        index_column: &str,
        options: &DynamicGroupOptions,
        specs: &[AggSpec],
    ) -> Result<DataFrame, GroupByError> {
        group_by_dynamic(self, index_column, options, specs)
    }

    fn rolling(
        &self,
        index_column: &str,
        options: &RollingOptions,
        specs: &[AggSpec],
    ) -> Result<DataFrame, GroupByError> {
        rolling(self, index_column, options, specs)
    }
}
