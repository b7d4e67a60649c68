//! Window aggregations over an ordered integer, date or datetime index.
//!
//! [`group_by_dynamic`] buckets rows into regular windows stepped by
//! `every`; [`rolling`] gives each row its own window looking back from its
//! index value. Both operate in the physical unit of the index column.

use serde::{Deserialize, Serialize};
use tbl_frame::{DataFrame, DataType, Duration, NullStrategy, Scalar, Series};

use crate::{AggSpec, GroupByError, evaluate_specs};

/// Which window ends include points lying exactly on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedWindow {
    #[default]
    Left,
    Right,
    Both,
    None,
}

impl ClosedWindow {
    fn includes_lower(self) -> bool {
        matches!(self, Self::Left | Self::Both)
    }

    fn includes_upper(self) -> bool {
        matches!(self, Self::Right | Self::Both)
    }

    /// Positions `lo..hi` of `sorted` falling in the window.
    fn bounds(self, sorted: &[i64], lower: i64, upper: i64) -> (usize, usize) {
        let lo = if self.includes_lower() {
            sorted.partition_point(|&v| v < lower)
        } else {
            sorted.partition_point(|&v| v <= lower)
        };
        let hi = if self.includes_upper() {
            sorted.partition_point(|&v| v <= upper)
        } else {
            sorted.partition_point(|&v| v < upper)
        };
        (lo, hi.max(lo))
    }
}

/// Value written to the index column of each dynamic window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    #[default]
    Left,
    Right,
    DataPoint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartBy {
    /// First window starts at the first index value truncated to `every`.
    #[default]
    WindowBound,
    DataPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicGroupOptions {
    pub every: Duration,
    /// Window length; `every` when unset.
    #[serde(default)]
    pub period: Option<Duration>,
    #[serde(default)]
    pub offset: Duration,
    #[serde(default)]
    pub closed: ClosedWindow,
    #[serde(default)]
    pub by: Vec<String>,
    #[serde(default)]
    pub label: Label,
    #[serde(default)]
    pub include_boundaries: bool,
    #[serde(default)]
    pub start_by: StartBy,
}

impl DynamicGroupOptions {
    #[must_use]
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            period: None,
            offset: Duration::default(),
            closed: ClosedWindow::Left,
            by: Vec::new(),
            label: Label::Left,
            include_boundaries: false,
            start_by: StartBy::WindowBound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingOptions {
    pub period: Duration,
    /// Shift of the window's lower end from each row; `-period` when unset.
    #[serde(default)]
    pub offset: Option<Duration>,
    #[serde(default = "default_rolling_closed")]
    pub closed: ClosedWindow,
    #[serde(default)]
    pub by: Vec<String>,
}

fn default_rolling_closed() -> ClosedWindow {
    ClosedWindow::Right
}

impl RollingOptions {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            offset: None,
            closed: default_rolling_closed(),
            by: Vec::new(),
        }
    }
}

fn ensure_positive(what: &str, duration: &Duration) -> Result<(), GroupByError> {
    if duration.is_zero() || duration.is_negative() {
        return Err(GroupByError::InvalidArgument(format!(
            "{what} must be positive, got {duration}"
        )));
    }
    Ok(())
}

/// Physical index values of a window index column, with its dtype.
fn physical_index(df: &DataFrame, name: &str) -> Result<(DataType, Vec<i64>), GroupByError> {
    let series = df.column(name)?;
    let dtype = series.dtype().clone();
    if !(dtype.is_integer() || matches!(dtype, DataType::Date | DataType::Datetime(_))) {
        return Err(GroupByError::InvalidArgument(format!(
            "index column {name:?} must be an integer, date or datetime column, got {dtype}"
        )));
    }
    let values = series
        .iter()
        .map(|value| {
            value
                .as_i128()
                .and_then(|v| i64::try_from(v).ok())
                .ok_or_else(|| {
                    GroupByError::InvalidArgument(format!(
                        "index column {name:?} holds {value}, which is not a usable index value"
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((dtype, values))
}

fn physical_to_scalar(value: i64, dtype: &DataType) -> Scalar {
    match dtype {
        DataType::Date => i32::try_from(value).map_or(Scalar::Null, Scalar::Date),
        DataType::Datetime(unit) => Scalar::Datetime(value, *unit),
        _ => Scalar::Int(value),
    }
}

fn index_series(name: &str, dtype: &DataType, values: &[i64]) -> Result<Series, GroupByError> {
    let scalars = values
        .iter()
        .map(|&v| physical_to_scalar(v, dtype))
        .collect();
    Ok(Series::with_dtype(name, dtype.clone(), scalars)?)
}

/// Rows of each `by` group (every row when `by` is empty), checked to be
/// sorted by the index within the group.
fn sorted_groups(
    df: &DataFrame,
    by: &[String],
    index_name: &str,
    index: &[i64],
) -> Result<Vec<Vec<usize>>, GroupByError> {
    let groups = if by.is_empty() {
        if df.height() == 0 {
            Vec::new()
        } else {
            vec![(0..df.height()).collect()]
        }
    } else {
        let names = by.iter().map(String::as_str).collect::<Vec<_>>();
        df.partition_rows(Some(&names))?
    };
    for rows in &groups {
        if rows.windows(2).any(|pair| index[pair[0]] > index[pair[1]]) {
            return Err(GroupByError::InvalidArgument(format!(
                "index column {index_name:?} must be sorted ascending within each group"
            )));
        }
    }
    Ok(groups)
}

fn by_columns(df: &DataFrame, by: &[String], rows: &[usize]) -> Result<Vec<Series>, GroupByError> {
    if by.is_empty() {
        return Ok(Vec::new());
    }
    let names = by.iter().map(String::as_str).collect::<Vec<_>>();
    Ok(df.select(&names)?.take(rows)?.into_columns())
}

/// Aggregate rows falling in regular windows of `period`, started every
/// `every`. Empty windows produce no row.
///
/// Output columns: the `by` keys, the index column holding each window's
/// label, `_lower_boundary` and `_upper_boundary` when requested, then one
/// column per spec.
pub fn group_by_dynamic(
    df: &DataFrame,
    index_column: &str,
    options: &DynamicGroupOptions,
    specs: &[AggSpec],
) -> Result<DataFrame, GroupByError> {
    let every = options.every;
    let period = options.period.unwrap_or(every);
    ensure_positive("every", &every)?;
    ensure_positive("period", &period)?;
    let back = every.negate();

    let (dtype, index) = physical_index(df, index_column)?;
    let groups = sorted_groups(df, &options.by, index_column, &index)?;

    let mut windows: Vec<Vec<usize>> = Vec::new();
    let mut owners = Vec::new();
    let mut labels = Vec::new();
    let mut lowers = Vec::new();
    let mut uppers = Vec::new();
    for rows in &groups {
        let sorted = rows.iter().map(|&row| index[row]).collect::<Vec<_>>();
        let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
            continue;
        };
        let mut start = match options.start_by {
            StartBy::WindowBound => options
                .offset
                .add_to(every.truncate(first, &dtype)?, &dtype)?,
            StartBy::DataPoint => first,
        };
        while start > first {
            start = back.add_to(start, &dtype)?;
        }
        while start <= last {
            let stop = period.add_to(start, &dtype)?;
            let (lo, hi) = options.closed.bounds(&sorted, start, stop);
            if lo < hi {
                windows.push(rows[lo..hi].to_vec());
                owners.push(rows[0]);
                labels.push(match options.label {
                    Label::Left => start,
                    Label::Right => stop,
                    Label::DataPoint => sorted[lo],
                });
                lowers.push(start);
                uppers.push(stop);
            }
            start = every.add_to(start, &dtype)?;
        }
    }
    log::debug!(
        "group_by_dynamic on {index_column:?}: {} windows over {} groups",
        windows.len(),
        groups.len()
    );

    let mut columns = by_columns(df, &options.by, &owners)?;
    columns.push(index_series(index_column, &dtype, &labels)?);
    if options.include_boundaries {
        columns.push(index_series("_lower_boundary", &dtype, &lowers)?);
        columns.push(index_series("_upper_boundary", &dtype, &uppers)?);
    }
    columns.extend(evaluate_specs(df, &windows, specs, NullStrategy::Ignore)?);
    Ok(DataFrame::new(columns)?)
}

/// Aggregate, for every row, the rows of its group whose index lies in
/// `[t + offset, t + offset + period]` with ends included per `closed`.
/// Output keeps the input row order: the `by` keys, the index column, then
/// one column per spec.
pub fn rolling(
    df: &DataFrame,
    index_column: &str,
    options: &RollingOptions,
    specs: &[AggSpec],
) -> Result<DataFrame, GroupByError> {
    let period = options.period;
    ensure_positive("period", &period)?;
    let offset = options.offset.unwrap_or_else(|| period.negate());

    let (dtype, index) = physical_index(df, index_column)?;
    let groups = sorted_groups(df, &options.by, index_column, &index)?;

    let mut windows = vec![Vec::new(); df.height()];
    for rows in &groups {
        let sorted = rows.iter().map(|&row| index[row]).collect::<Vec<_>>();
        for (&row, &t) in rows.iter().zip(&sorted) {
            let lower = offset.add_to(t, &dtype)?;
            let upper = period.add_to(lower, &dtype)?;
            let (lo, hi) = options.closed.bounds(&sorted, lower, upper);
            windows[row] = rows[lo..hi].to_vec();
        }
    }

    let all_rows = (0..df.height()).collect::<Vec<_>>();
    let mut columns = by_columns(df, &options.by, &all_rows)?;
    columns.push(df.column(index_column)?.clone());
    columns.extend(evaluate_specs(df, &windows, specs, NullStrategy::Ignore)?);
    Ok(DataFrame::new(columns)?)
}
