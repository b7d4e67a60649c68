//! Nearest-key joins on sorted data.
//!
//! Right rows are bucketed by their `by` tuple; within a bucket the `on`
//! values are assumed ascending, so each left row resolves its match with a
//! binary search.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tbl_frame::{DataFrame, DataType, Duration, Scalar, Series};
use tbl_types::{ScalarKey, supertype};

use crate::parallel::{PARALLEL_MIN_ROWS, map_indices};
use crate::{JoinError, KeyRows, cast_key_pairs, combine_sides, key_rows};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsofStrategy {
    /// Last right row whose key is `<=` the left key.
    #[default]
    Backward,
    /// First right row whose key is `>=` the left key.
    Forward,
    /// Smallest distance; ties go to the smaller key.
    Nearest,
}

/// Largest accepted distance between the left and the matched right key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Tolerance {
    Numeric(f64),
    Duration(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsofJoinArgs {
    pub left_on: String,
    pub right_on: String,
    pub left_by: Vec<String>,
    pub right_by: Vec<String>,
    pub strategy: AsofStrategy,
    pub tolerance: Option<Tolerance>,
    pub suffix: String,
    pub allow_parallel: bool,
    pub force_parallel: bool,
}

impl Default for AsofJoinArgs {
    fn default() -> Self {
        Self {
            left_on: String::new(),
            right_on: String::new(),
            left_by: Vec::new(),
            right_by: Vec::new(),
            strategy: AsofStrategy::Backward,
            tolerance: None,
            suffix: "_right".to_owned(),
            allow_parallel: true,
            force_parallel: false,
        }
    }
}

impl AsofJoinArgs {
    #[must_use]
    pub fn on(key: &str) -> Self {
        Self::with_keys(key, key)
    }

    #[must_use]
    pub fn with_keys(left_on: &str, right_on: &str) -> Self {
        Self {
            left_on: left_on.to_owned(),
            right_on: right_on.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by(self, keys: &[&str]) -> Self {
        self.by_left_right(keys, keys)
    }

    #[must_use]
    pub fn by_left_right(mut self, left: &[&str], right: &[&str]) -> Self {
        self.left_by = left.iter().map(|k| (*k).to_owned()).collect();
        self.right_by = right.iter().map(|k| (*k).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: AsofStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, allow: bool, force: bool) -> Self {
        self.allow_parallel = allow;
        self.force_parallel = force;
        self
    }
}

/// Tolerance in the physical unit of the key column.
#[derive(Debug, Clone, Copy)]
enum Limit {
    Int(i128),
    Float(f64),
}

fn resolve_tolerance(
    tolerance: Option<&Tolerance>,
    dtype: &DataType,
) -> Result<Option<Limit>, JoinError> {
    let limit = match tolerance {
        None => return Ok(None),
        Some(Tolerance::Numeric(value)) => {
            if value.is_nan() || *value < 0.0 {
                return Err(JoinError::InvalidArgument(format!(
                    "as-of tolerance must be a non-negative number, got {value}"
                )));
            }
            Limit::Float(*value)
        }
        Some(Tolerance::Duration(duration)) => {
            if duration.is_negative() {
                return Err(JoinError::InvalidArgument(format!(
                    "as-of tolerance {duration} is negative"
                )));
            }
            Limit::Int(i128::from(duration.to_physical(dtype)?))
        }
    };
    Ok(Some(limit))
}

/// Physical key representation the probe compares and measures.
trait AsofKey: Copy + PartialOrd + Send + Sync {
    fn from_scalar(value: &Scalar) -> Option<Self>;

    fn distance(self, other: Self) -> Self;

    fn from_limit(limit: Limit) -> Self;
}

impl AsofKey for i128 {
    fn from_scalar(value: &Scalar) -> Option<Self> {
        value.as_i128()
    }

    fn distance(self, other: Self) -> Self {
        (self - other).abs()
    }

    fn from_limit(limit: Limit) -> Self {
        match limit {
            Limit::Int(v) => v,
            Limit::Float(v) => v.floor() as i128,
        }
    }
}

impl AsofKey for f64 {
    fn from_scalar(value: &Scalar) -> Option<Self> {
        value.to_f64().ok().filter(|v| !v.is_nan())
    }

    fn distance(self, other: Self) -> Self {
        (self - other).abs()
    }

    fn from_limit(limit: Limit) -> Self {
        match limit {
            Limit::Int(v) => v as f64,
            Limit::Float(v) => v,
        }
    }
}

fn pick<T: AsofKey>(
    candidates: &[(T, usize)],
    key: T,
    strategy: AsofStrategy,
    limit: Option<T>,
) -> Option<usize> {
    let backward = || {
        let idx = candidates.partition_point(|(k, _)| *k <= key);
        idx.checked_sub(1).map(|i| candidates[i])
    };
    let forward = || {
        let idx = candidates.partition_point(|(k, _)| *k < key);
        candidates.get(idx).copied()
    };
    let chosen = match strategy {
        AsofStrategy::Backward => backward(),
        AsofStrategy::Forward => forward(),
        AsofStrategy::Nearest => match (backward(), forward()) {
            (Some(before), Some(after)) => {
                if after.0.distance(key) < key.distance(before.0) {
                    Some(after)
                } else {
                    Some(before)
                }
            }
            (before, after) => before.or(after),
        },
    };
    let (matched, row) = chosen?;
    if let Some(limit) = limit
        && key.distance(matched) > limit
    {
        return None;
    }
    Some(row)
}

struct Probe<'p, 'a> {
    left_key: &'p [Scalar],
    right_key: &'p [Scalar],
    left_groups: &'p KeyRows<'a>,
    right_groups: &'p KeyRows<'a>,
    strategy: AsofStrategy,
    parallel: bool,
    on: &'p str,
}

impl Probe<'_, '_> {
    fn run<T: AsofKey>(&self, limit: Option<Limit>) -> Vec<Option<usize>> {
        let limit = limit.map(T::from_limit);
        let mut buckets: HashMap<&[ScalarKey<'_>], Vec<(T, usize)>> = HashMap::new();
        for (row, group) in self.right_groups.iter().enumerate() {
            let Some(group) = group else { continue };
            let Some(key) = T::from_scalar(&self.right_key[row]) else {
                continue;
            };
            buckets.entry(group.as_slice()).or_default().push((key, row));
        }
        if buckets
            .values()
            .any(|rows| rows.windows(2).any(|pair| pair[0].0 > pair[1].0))
        {
            warn!(
                "join_asof: right side is not sorted by {:?} within its groups; matches may be wrong",
                self.on
            );
        }
        debug!(
            "join_asof: {} right groups, probing {} left rows (parallel: {})",
            buckets.len(),
            self.left_key.len(),
            self.parallel
        );

        map_indices(self.left_key.len(), self.parallel, |row| {
            let group = self.left_groups[row].as_ref()?;
            let key = T::from_scalar(&self.left_key[row])?;
            let candidates = buckets.get(group.as_slice())?;
            pick(candidates, key, self.strategy, limit)
        })
    }
}

fn check_by_names(names: &[String], on: &str) -> Result<(), JoinError> {
    if names.iter().any(|name| name == on) {
        return Err(JoinError::InvalidArgument(format!(
            "{on:?} is both the as-of key and a by column"
        )));
    }
    Ok(())
}

/// Left join on the nearest key. Both frames must be sorted ascending by
/// their `on` column within each `by` group; the right side is checked and
/// an unsorted input only logs a warning.
pub fn join_asof(
    left: &DataFrame,
    right: &DataFrame,
    args: &AsofJoinArgs,
) -> Result<DataFrame, JoinError> {
    check_by_names(&args.left_by, &args.left_on)?;
    check_by_names(&args.right_by, &args.right_on)?;
    let (left_by, right_by) = cast_key_pairs(left, right, &args.left_by, &args.right_by)?;

    let left_on = left.column(&args.left_on)?;
    let right_on = right.column(&args.right_on)?;
    let common = supertype(left_on.dtype(), right_on.dtype())?;
    if !(common.is_numeric() || common.is_temporal()) {
        return Err(JoinError::InvalidArgument(format!(
            "as-of key must be numeric or temporal, got {common}"
        )));
    }
    let left_key = left_on.cast(&common)?;
    let right_key = right_on.cast(&common)?;
    let limit = resolve_tolerance(args.tolerance.as_ref(), &common)?;

    let left_by_values = left_by.iter().map(Series::values).collect::<Vec<_>>();
    let right_by_values = right_by.iter().map(Series::values).collect::<Vec<_>>();
    let left_groups = key_rows(&left_by_values, left.height(), false);
    let right_groups = key_rows(&right_by_values, right.height(), false);

    let left_values = left_key.values();
    let right_values = right_key.values();
    let probe = Probe {
        left_key: &left_values,
        right_key: &right_values,
        left_groups: &left_groups,
        right_groups: &right_groups,
        strategy: args.strategy,
        parallel: args.force_parallel
            || (args.allow_parallel && left.height() >= PARALLEL_MIN_ROWS),
        on: &args.right_on,
    };
    let positions = if common.is_float() {
        probe.run::<f64>(limit)
    } else {
        probe.run::<i128>(limit)
    };

    let mut dropped = vec![args.right_on.as_str()];
    dropped.extend(args.right_by.iter().map(String::as_str));
    let right_part = right.drop_many(&dropped).take_optional(&positions);
    combine_sides(left.clone(), right_part, &args.suffix)
}
