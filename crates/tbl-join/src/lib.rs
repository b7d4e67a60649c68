#![forbid(unsafe_code)]

//! Equality and as-of joins between two [`DataFrame`]s.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::mem::size_of;

use bumpalo::{Bump, collections::Vec as BumpVec};
use log::debug;
use serde::{Deserialize, Serialize};
use tbl_columnar::ColumnError;
use tbl_frame::{DataFrame, FrameError, Scalar, Series};
use tbl_types::{ScalarKey, TypeError, supertype};
use thiserror::Error;

mod asof;
mod parallel;

pub use asof::{AsofJoinArgs, AsofStrategy, Tolerance, join_asof};

pub const DEFAULT_ARENA_BUDGET_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join requires at least one key column")]
    MissingJoinKey,
    #[error("got {left} left keys but {right} right keys")]
    KeyCountMismatch { left: usize, right: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ColumnError> for JoinError {
    fn from(err: ColumnError) -> Self {
        Self::Frame(err.into())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Outer,
    Cross,
}

/// Key multiplicity the caller expects; checked before any output is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinValidation {
    #[default]
    ManyToMany,
    OneToMany,
    ManyToOne,
    OneToOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinExecutionOptions {
    pub use_arena: bool,
    pub arena_budget_bytes: usize,
}

impl Default for JoinExecutionOptions {
    fn default() -> Self {
        Self {
            use_arena: true,
            arena_budget_bytes: DEFAULT_ARENA_BUDGET_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinArgs {
    pub how: JoinType,
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
    pub suffix: String,
    pub join_nulls: bool,
    pub validation: JoinValidation,
    pub execution: JoinExecutionOptions,
}

impl Default for JoinArgs {
    fn default() -> Self {
        Self {
            how: JoinType::Inner,
            left_on: Vec::new(),
            right_on: Vec::new(),
            suffix: "_right".to_owned(),
            join_nulls: false,
            validation: JoinValidation::ManyToMany,
            execution: JoinExecutionOptions::default(),
        }
    }
}

fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

impl JoinArgs {
    #[must_use]
    pub fn new(how: JoinType) -> Self {
        Self {
            how,
            ..Self::default()
        }
    }

    /// Same key names on both sides.
    #[must_use]
    pub fn on(mut self, keys: &[&str]) -> Self {
        self.left_on = owned_names(keys);
        self.right_on = owned_names(keys);
        self
    }

    #[must_use]
    pub fn left_on(mut self, keys: &[&str]) -> Self {
        self.left_on = owned_names(keys);
        self
    }

    #[must_use]
    pub fn right_on(mut self, keys: &[&str]) -> Self {
        self.right_on = owned_names(keys);
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_join_nulls(mut self, join_nulls: bool) -> Self {
        self.join_nulls = join_nulls;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: JoinValidation) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn with_execution(mut self, execution: JoinExecutionOptions) -> Self {
        self.execution = execution;
        self
    }
}

/// Join methods on [`DataFrame`].
pub trait JoinExt {
    fn join(&self, other: &DataFrame, args: &JoinArgs) -> Result<DataFrame, JoinError>;

    fn join_asof(&self, other: &DataFrame, args: &AsofJoinArgs) -> Result<DataFrame, JoinError>;
}

impl JoinExt for DataFrame {
    fn join(&self, other: &DataFrame, args: &JoinArgs) -> Result<DataFrame, JoinError> {
        join(self, other, args)
    }

    fn join_asof(&self, other: &DataFrame, args: &AsofJoinArgs) -> Result<DataFrame, JoinError> {
        join_asof(self, other, args)
    }
}

/// Per-row key tuples; `None` marks a row whose key can never match.
pub(crate) type KeyRows<'a> = Vec<Option<Vec<ScalarKey<'a>>>>;

type KeyIndex<'k, 'a> = HashMap<&'k [ScalarKey<'a>], Vec<usize>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JoinExecutionTrace {
    used_arena: bool,
    output_rows: usize,
    estimated_bytes: usize,
    build_side: BuildSide,
}

/// Resolve paired key columns and cast each pair to its common supertype.
pub(crate) fn cast_key_pairs(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &[String],
    right_on: &[String],
) -> Result<(Vec<Series>, Vec<Series>), JoinError> {
    if left_on.len() != right_on.len() {
        return Err(JoinError::KeyCountMismatch {
            left: left_on.len(),
            right: right_on.len(),
        });
    }
    let mut left_keys = Vec::with_capacity(left_on.len());
    let mut right_keys = Vec::with_capacity(right_on.len());
    for (left_name, right_name) in left_on.iter().zip(right_on) {
        let left_series = left.column(left_name)?;
        let right_series = right.column(right_name)?;
        let common = supertype(left_series.dtype(), right_series.dtype())?;
        left_keys.push(left_series.cast(&common)?);
        right_keys.push(right_series.cast(&common)?);
    }
    Ok((left_keys, right_keys))
}

pub(crate) fn key_rows<'a>(
    columns: &'a [Cow<'a, [Scalar]>],
    height: usize,
    join_nulls: bool,
) -> KeyRows<'a> {
    (0..height)
        .map(|row| {
            let key = columns
                .iter()
                .map(|values| values[row].key())
                .collect::<Vec<_>>();
            let matchable = join_nulls || !key.iter().any(|k| matches!(k, ScalarKey::Null));
            matchable.then_some(key)
        })
        .collect()
}

fn build_index<'k, 'a>(rows: &'k KeyRows<'a>) -> KeyIndex<'k, 'a> {
    let mut index: KeyIndex<'k, 'a> = HashMap::with_capacity(rows.len());
    for (row, key) in rows.iter().enumerate() {
        if let Some(key) = key {
            index.entry(key.as_slice()).or_default().push(row);
        }
    }
    index
}

fn ensure_unique(rows: &KeyRows<'_>, side: &str, validation: JoinValidation) -> Result<(), JoinError> {
    let mut seen = HashSet::with_capacity(rows.len());
    for key in rows.iter().flatten() {
        if !seen.insert(key.as_slice()) {
            return Err(JoinError::InvalidArgument(format!(
                "{side} join keys are not unique, as {validation:?} requires"
            )));
        }
    }
    Ok(())
}

fn validate(
    validation: JoinValidation,
    left_rows: &KeyRows<'_>,
    right_rows: &KeyRows<'_>,
) -> Result<(), JoinError> {
    match validation {
        JoinValidation::ManyToMany => Ok(()),
        JoinValidation::OneToMany => ensure_unique(left_rows, "left", validation),
        JoinValidation::ManyToOne => ensure_unique(right_rows, "right", validation),
        JoinValidation::OneToOne => {
            ensure_unique(left_rows, "left", validation)?;
            ensure_unique(right_rows, "right", validation)
        }
    }
}

fn estimate_output_rows(
    how: JoinType,
    side: BuildSide,
    left_rows: &KeyRows<'_>,
    right_rows: &KeyRows<'_>,
    index: &KeyIndex<'_, '_>,
) -> usize {
    if how == JoinType::Cross {
        return left_rows.len().saturating_mul(right_rows.len());
    }
    let probe_rows = match side {
        BuildSide::Left => right_rows,
        BuildSide::Right => left_rows,
    };
    let unmatched = usize::from(how != JoinType::Inner);
    let probed = probe_rows
        .iter()
        .map(|key| {
            key.as_ref()
                .and_then(|key| index.get(key.as_slice()))
                .map_or(unmatched, Vec::len)
        })
        .fold(0usize, usize::saturating_add);
    if how == JoinType::Outer {
        probed.saturating_add(right_rows.len())
    } else {
        probed
    }
}

fn estimate_intermediate_bytes(output_rows: usize) -> usize {
    output_rows.saturating_mul(size_of::<Option<usize>>() * 2)
}

/// Emit `(left, right)` row positions in output order.
fn emit_pairs(
    how: JoinType,
    side: BuildSide,
    left_rows: &KeyRows<'_>,
    right_rows: &KeyRows<'_>,
    index: &KeyIndex<'_, '_>,
    mut emit: impl FnMut(Option<usize>, Option<usize>),
) {
    match (how, side) {
        (JoinType::Cross, _) => {
            for left in 0..left_rows.len() {
                for right in 0..right_rows.len() {
                    emit(Some(left), Some(right));
                }
            }
        }
        (JoinType::Inner, BuildSide::Left) => {
            let mut pairs = Vec::new();
            for (right, key) in right_rows.iter().enumerate() {
                let Some(key) = key else { continue };
                if let Some(matches) = index.get(key.as_slice()) {
                    pairs.extend(matches.iter().map(|&left| (left, right)));
                }
            }
            // stable: right positions stay ascending within each left row
            pairs.sort_by_key(|&(left, _)| left);
            for (left, right) in pairs {
                emit(Some(left), Some(right));
            }
        }
        _ => {
            let outer = how == JoinType::Outer;
            let mut matched = vec![false; if outer { right_rows.len() } else { 0 }];
            for (left, key) in left_rows.iter().enumerate() {
                let hits = key.as_ref().and_then(|key| index.get(key.as_slice()));
                match hits {
                    Some(rights) => {
                        for &right in rights {
                            if outer {
                                matched[right] = true;
                            }
                            emit(Some(left), Some(right));
                        }
                    }
                    None if how != JoinType::Inner => emit(Some(left), None),
                    None => {}
                }
            }
            for (right, hit) in matched.iter().enumerate() {
                if !hit {
                    emit(None, Some(right));
                }
            }
        }
    }
}

/// Attach `right` after `left`, suffixing right names that collide.
pub(crate) fn combine_sides(
    left: DataFrame,
    right: DataFrame,
    suffix: &str,
) -> Result<DataFrame, JoinError> {
    let mut taken = left
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect::<HashSet<_>>();
    let mut columns = left.into_columns();
    for series in right.into_columns() {
        let name = if taken.contains(series.name()) {
            format!("{}{suffix}", series.name())
        } else {
            series.name().to_owned()
        };
        if !taken.insert(name.clone()) {
            return Err(FrameError::DuplicateColumn(name).into());
        }
        columns.push(series.with_name(name));
    }
    Ok(DataFrame::new(columns)?)
}

fn coalesce_keys(
    frame: &mut DataFrame,
    names: &[String],
    left_keys: &[Series],
    right_keys: &[Series],
    left_positions: &[Option<usize>],
    right_positions: &[Option<usize>],
) -> Result<(), JoinError> {
    for ((name, left_key), right_key) in names.iter().zip(left_keys).zip(right_keys) {
        let left_values = left_key.values();
        let right_values = right_key.values();
        let values = left_positions
            .iter()
            .zip(right_positions)
            .map(|(l, r)| {
                l.map(|idx| &left_values[idx])
                    .filter(|value| !value.is_null())
                    .or_else(|| r.map(|idx| &right_values[idx]))
                    .cloned()
                    .unwrap_or(Scalar::Null)
            })
            .collect();
        let coalesced = Series::with_dtype(name.as_str(), left_key.dtype().clone(), values)?;
        let idx = frame
            .get_column_index(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.clone()))?;
        frame.replace_column(idx, coalesced)?;
    }
    Ok(())
}

pub fn join(left: &DataFrame, right: &DataFrame, args: &JoinArgs) -> Result<DataFrame, JoinError> {
    join_with_trace(left, right, args).map(|(out, _)| out)
}

fn join_with_trace(
    left: &DataFrame,
    right: &DataFrame,
    args: &JoinArgs,
) -> Result<(DataFrame, JoinExecutionTrace), JoinError> {
    let cross = args.how == JoinType::Cross;
    if !cross && (args.left_on.is_empty() || args.right_on.is_empty()) {
        return Err(JoinError::MissingJoinKey);
    }
    let (left_keys, right_keys) = if cross {
        (Vec::new(), Vec::new())
    } else {
        cast_key_pairs(left, right, &args.left_on, &args.right_on)?
    };
    let left_values = left_keys.iter().map(Series::values).collect::<Vec<_>>();
    let right_values = right_keys.iter().map(Series::values).collect::<Vec<_>>();
    let left_rows = key_rows(&left_values, left.height(), args.join_nulls);
    let right_rows = key_rows(&right_values, right.height(), args.join_nulls);
    validate(args.validation, &left_rows, &right_rows)?;

    let side = if args.how == JoinType::Inner && left.height() < right.height() {
        BuildSide::Left
    } else {
        BuildSide::Right
    };
    let index = match (cross, side) {
        (true, _) => HashMap::new(),
        (false, BuildSide::Left) => build_index(&left_rows),
        (false, BuildSide::Right) => build_index(&right_rows),
    };
    debug!(
        "{:?} join: hashed {:?} side into {} distinct keys",
        args.how,
        side,
        index.len()
    );

    let output_rows = estimate_output_rows(args.how, side, &left_rows, &right_rows, &index);
    let estimated_bytes = estimate_intermediate_bytes(output_rows);
    let use_arena =
        args.execution.use_arena && estimated_bytes <= args.execution.arena_budget_bytes;
    if args.execution.use_arena && !use_arena {
        debug!(
            "join intermediates need ~{estimated_bytes} bytes, over the arena budget of {}; using the global allocator",
            args.execution.arena_budget_bytes
        );
    }

    let assemble = |left_positions: &[Option<usize>],
                    right_positions: &[Option<usize>]|
     -> Result<DataFrame, JoinError> {
        let mut left_part = left.take_optional(left_positions);
        if args.how == JoinType::Outer {
            coalesce_keys(
                &mut left_part,
                &args.left_on,
                &left_keys,
                &right_keys,
                left_positions,
                right_positions,
            )?;
        }
        let right_on = args.right_on.iter().map(String::as_str).collect::<Vec<_>>();
        let right_part = right.drop_many(&right_on).take_optional(right_positions);
        combine_sides(left_part, right_part, &args.suffix)
    };

    let out = if use_arena {
        let arena = Bump::new();
        let mut left_positions = BumpVec::<Option<usize>>::with_capacity_in(output_rows, &arena);
        let mut right_positions = BumpVec::<Option<usize>>::with_capacity_in(output_rows, &arena);
        emit_pairs(args.how, side, &left_rows, &right_rows, &index, |l, r| {
            left_positions.push(l);
            right_positions.push(r);
        });
        assemble(left_positions.as_slice(), right_positions.as_slice())?
    } else {
        let mut left_positions = Vec::with_capacity(output_rows);
        let mut right_positions = Vec::with_capacity(output_rows);
        emit_pairs(args.how, side, &left_rows, &right_rows, &index, |l, r| {
            left_positions.push(l);
            right_positions.push(r);
        });
        assemble(&left_positions, &right_positions)?
    };

    let trace = JoinExecutionTrace {
        used_arena: use_arena,
        output_rows: out.height(),
        estimated_bytes,
        build_side: side,
    };
    Ok((out, trace))
}

#[cfg(test)]
mod tests {
    use tbl_frame::{DataFrame, FrameError, Scalar};

    use super::{
        BuildSide, JoinArgs, JoinError, JoinExecutionOptions, JoinExt, JoinType, JoinValidation,
        join_with_trace,
    };

    fn ints(values: &[i64]) -> Vec<Scalar> {
        values.iter().copied().map(Scalar::Int).collect()
    }

    fn strs(values: &[&str]) -> Vec<Scalar> {
        values.iter().copied().map(Scalar::from).collect()
    }

    fn left() -> DataFrame {
        DataFrame::from_columns([
            ("id", ints(&[1, 2, 2, 4])),
            ("v", strs(&["a", "b", "c", "d"])),
        ])
        .expect("left")
    }

    fn right() -> DataFrame {
        DataFrame::from_columns([
            ("id", ints(&[2, 1, 2, 3, 9])),
            ("v", strs(&["x", "y", "z", "w", "q"])),
        ])
        .expect("right")
    }

    fn ids(df: &DataFrame) -> Vec<Scalar> {
        df.column("id").expect("id").to_vec()
    }

    #[test]
    fn inner_join_orders_by_left_then_right() {
        let out = left()
            .join(&right(), &JoinArgs::new(JoinType::Inner).on(&["id"]))
            .expect("join");
        assert_eq!(out.column_names(), vec!["id", "v", "v_right"]);
        assert_eq!(ids(&out), ints(&[1, 2, 2, 2, 2]));
        assert_eq!(
            out.column("v_right").expect("v_right").to_vec(),
            strs(&["y", "x", "z", "x", "z"])
        );
    }

    #[test]
    fn one_sided_keys_are_missing_keys() {
        for args in [
            JoinArgs::new(JoinType::Inner).left_on(&["id"]),
            JoinArgs::new(JoinType::Left).right_on(&["id"]),
        ] {
            let err = left().join(&right(), &args).expect_err("one-sided keys");
            assert!(matches!(err, JoinError::MissingJoinKey));
        }
    }

    #[test]
    fn inner_join_hashes_the_smaller_side() {
        let small = left().head(2);
        let (a, trace_a) = join_with_trace(
            &small,
            &right(),
            &JoinArgs::new(JoinType::Inner).on(&["id"]),
        )
        .expect("small left");
        assert_eq!(trace_a.build_side, BuildSide::Left);
        let (b, trace_b) = join_with_trace(
            &right(),
            &small,
            &JoinArgs::new(JoinType::Inner).on(&["id"]),
        )
        .expect("small right");
        assert_eq!(trace_b.build_side, BuildSide::Right);
        assert_eq!(ids(&a), ints(&[1, 2, 2]));
        assert_eq!(ids(&b), ints(&[2, 1, 2]));
    }

    #[test]
    fn left_join_keeps_every_left_row() {
        let out = left()
            .join(&right(), &JoinArgs::new(JoinType::Left).on(&["id"]))
            .expect("join");
        assert_eq!(ids(&out), ints(&[1, 2, 2, 2, 2, 4]));
        assert_eq!(out.column("v_right").expect("v_right").get(5), Some(&Scalar::Null));
    }

    #[test]
    fn outer_join_appends_unmatched_right_rows_and_coalesces_keys() {
        let out = left()
            .join(&right(), &JoinArgs::new(JoinType::Outer).on(&["id"]))
            .expect("join");
        assert_eq!(ids(&out), ints(&[1, 2, 2, 2, 2, 4, 3, 9]));
        let v = out.column("v").expect("v");
        assert_eq!(v.get(6), Some(&Scalar::Null));
        assert_eq!(v.get(7), Some(&Scalar::Null));
    }

    #[test]
    fn cross_join_is_left_major() {
        let a = DataFrame::from_columns([("a", ints(&[1, 2]))]).expect("a");
        let b = DataFrame::from_columns([("b", strs(&["x", "y", "z"]))]).expect("b");
        let out = a.join(&b, &JoinArgs::new(JoinType::Cross)).expect("cross");
        assert_eq!(out.shape(), (6, 2));
        assert_eq!(
            out.column("a").expect("a").to_vec(),
            ints(&[1, 1, 1, 2, 2, 2])
        );
        assert_eq!(
            out.column("b").expect("b").to_vec(),
            strs(&["x", "y", "z", "x", "y", "z"])
        );
    }

    #[test]
    fn null_keys_match_only_when_requested() {
        let a = DataFrame::from_columns([("k", vec![Scalar::Null, Scalar::Int(1)])]).expect("a");
        let b = DataFrame::from_columns([
            ("k", vec![Scalar::Null, Scalar::Int(1)]),
            ("w", ints(&[10, 20])),
        ])
        .expect("b");
        let args = JoinArgs::new(JoinType::Inner).on(&["k"]);
        assert_eq!(a.join(&b, &args).expect("join").height(), 1);
        let with_nulls = a.join(&b, &args.with_join_nulls(true)).expect("join");
        assert_eq!(with_nulls.column("w").expect("w").to_vec(), ints(&[10, 20]));
    }

    #[test]
    fn key_dtypes_are_supercast() {
        let a = DataFrame::from_columns([("k", vec![Scalar::Int(1), Scalar::Int(2)])]).expect("a");
        let b = DataFrame::from_columns([
            ("key", vec![Scalar::Float(2.0), Scalar::Float(3.5)]),
            ("w", strs(&["two", "three and a half"])),
        ])
        .expect("b");
        let out = a
            .join(
                &b,
                &JoinArgs::new(JoinType::Inner).left_on(&["k"]).right_on(&["key"]),
            )
            .expect("join");
        assert_eq!(out.column_names(), vec!["k", "w"]);
        assert_eq!(out.column("w").expect("w").to_vec(), strs(&["two"]));
    }

    #[test]
    fn argument_errors() {
        let err = left()
            .join(&right(), &JoinArgs::new(JoinType::Inner))
            .expect_err("no keys");
        assert!(matches!(err, JoinError::MissingJoinKey));

        let err = left()
            .join(
                &right(),
                &JoinArgs::new(JoinType::Inner).left_on(&["id", "v"]).right_on(&["id"]),
            )
            .expect_err("arity");
        assert!(matches!(err, JoinError::KeyCountMismatch { left: 2, right: 1 }));

        let err = left()
            .join(&right(), &JoinArgs::new(JoinType::Inner).on(&["nope"]))
            .expect_err("missing");
        assert!(matches!(err, JoinError::Frame(FrameError::ColumnNotFound(_))));

        let err = left()
            .join(&right(), &JoinArgs::new(JoinType::Inner).on(&["id"]).with_suffix(""))
            .expect_err("collision");
        assert!(matches!(err, JoinError::Frame(FrameError::DuplicateColumn(_))));
    }

    #[test]
    fn validation_rejects_duplicate_keys() {
        let args = JoinArgs::new(JoinType::Left)
            .on(&["id"])
            .with_validation(JoinValidation::ManyToOne);
        assert!(matches!(
            left().join(&right(), &args),
            Err(JoinError::InvalidArgument(_))
        ));
        let unique_right = right().unique(Some(&["id"][..]), Default::default(), true).expect("unique");
        assert!(left().join(&unique_right, &args).is_ok());
    }

    #[test]
    fn arena_and_global_allocator_agree() {
        let args = JoinArgs::new(JoinType::Outer).on(&["id"]);
        let (arena_out, arena_trace) = join_with_trace(&left(), &right(), &args).expect("arena");
        let global_args = args.clone().with_execution(JoinExecutionOptions {
            use_arena: false,
            ..JoinExecutionOptions::default()
        });
        let (global_out, global_trace) =
            join_with_trace(&left(), &right(), &global_args).expect("global");
        assert!(arena_trace.used_arena);
        assert!(!global_trace.used_arena);
        assert_eq!(arena_out, global_out);
        assert_eq!(arena_trace.output_rows, 8);
    }

    #[test]
    fn arena_budget_overflow_falls_back() {
        let args = JoinArgs::new(JoinType::Inner)
            .on(&["id"])
            .with_execution(JoinExecutionOptions {
                use_arena: true,
                arena_budget_bytes: 1,
            });
        let (out, trace) = join_with_trace(&left(), &right(), &args).expect("join");
        assert!(!trace.used_arena);
        assert!(trace.estimated_bytes > 1);
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn repeated_small_joins_stay_stable() {
        let args = JoinArgs::new(JoinType::Left).on(&["id"]);
        for _ in 0..1000 {
            let out = left().join(&right(), &args).expect("join");
            assert_eq!(out.height(), 6);
        }
    }

    #[test]
    fn args_round_trip_through_serde() {
        let args = JoinArgs::new(JoinType::Outer)
            .on(&["id"])
            .with_validation(JoinValidation::OneToOne);
        let json = serde_json::to_string(&args).expect("serialize");
        let back: JoinArgs = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, args);
        let defaults: JoinArgs = serde_json::from_str("{}").expect("defaults");
        assert_eq!(defaults.suffix, "_right");
    }
}
