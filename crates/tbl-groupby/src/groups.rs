//! Partition rows into key groups.

use std::mem::{size_of, take};

use bumpalo::{Bump, collections::Vec as BumpVec};
use tbl_frame::{DataFrame, Scalar, Series};

use crate::{GroupByError, GroupByOptions};

/// Widest key span the dense path allocates buckets for.
const DENSE_KEY_SPAN_LIMIT: i128 = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PartitionTrace {
    pub(crate) dense: bool,
    pub(crate) used_arena: bool,
    pub(crate) estimated_bytes: usize,
}

/// Row-index lists, one per distinct key tuple. Unless the dense path runs
/// without `maintain_order`, groups come out in first-occurrence order.
pub(crate) fn partition(
    source: &DataFrame,
    keys: &[&str],
    options: &GroupByOptions,
) -> Result<(Vec<Vec<usize>>, PartitionTrace), GroupByError> {
    if let [key] = keys
        && let Some(dense) = partition_dense(source.column(key)?, options)
    {
        return Ok(dense);
    }

    let mut groups = source.partition_rows(Some(keys))?;
    if options.drop_null_keys {
        let columns = keys
            .iter()
            .map(|key| source.column(key).map(Series::values))
            .collect::<Result<Vec<_>, _>>()?;
        groups.retain(|rows| !columns.iter().any(|values| values[rows[0]].is_null()));
    }
    let trace = PartitionTrace {
        dense: false,
        used_arena: false,
        estimated_bytes: 0,
    };
    Ok((groups, trace))
}

/// Lowest key and bucket count, or `None` when the dense path does not apply.
fn dense_span(values: &[Scalar], drop_nulls: bool) -> Option<(i128, usize)> {
    let mut bounds: Option<(i128, i128)> = None;
    for value in values {
        match value {
            Scalar::Null if drop_nulls => continue,
            Scalar::Int(_) | Scalar::UInt(_) => {
                let v = value.as_i128()?;
                bounds = Some(bounds.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))));
            }
            _ => return None,
        }
    }
    let (lo, hi) = bounds?;
    let span = hi - lo + 1;
    if span > DENSE_KEY_SPAN_LIMIT {
        return None;
    }
    Some((lo, usize::try_from(span).ok()?))
}

fn partition_dense(
    series: &Series,
    options: &GroupByOptions,
) -> Option<(Vec<Vec<usize>>, PartitionTrace)> {
    if !series.dtype().is_integer() {
        return None;
    }
    let values = series.values();
    let (min, span) = dense_span(&values, options.drop_null_keys)?;
    let estimated_bytes = span.saturating_mul(size_of::<Option<usize>>());
    let exec = options.execution;
    let use_arena = exec.use_arena && estimated_bytes <= exec.arena_budget_bytes;

    let groups = if use_arena {
        let arena = Bump::new();
        let mut slots = BumpVec::<Option<usize>>::with_capacity_in(span, &arena);
        slots.resize(span, None);
        assign_dense(&values, min, &mut slots, options.maintain_order)
    } else {
        let mut slots = vec![None; span];
        assign_dense(&values, min, &mut slots, options.maintain_order)
    };

    let trace = PartitionTrace {
        dense: true,
        used_arena: use_arena,
        estimated_bytes,
    };
    Some((groups, trace))
}

fn assign_dense(
    values: &[Scalar],
    min: i128,
    slots: &mut [Option<usize>],
    maintain_order: bool,
) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, value) in values.iter().enumerate() {
        let Some(bucket) = value
            .as_i128()
            .and_then(|v| usize::try_from(v - min).ok())
        else {
            continue;
        };
        let id = *slots[bucket].get_or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[id].push(row);
    }
    if maintain_order {
        return groups;
    }
    // ascending key order
    slots
        .iter()
        .flatten()
        .map(|&id| take(&mut groups[id]))
        .collect()
}

#[cfg(test)]
mod tests {
    use tbl_frame::{DataFrame, Scalar};

    use super::partition;
    use crate::{GroupByExecutionOptions, GroupByOptions};

    fn keyed(keys: Vec<Scalar>) -> DataFrame {
        DataFrame::from_columns([("k", keys)]).expect("frame")
    }

    #[test]
    fn dense_and_generic_paths_agree() {
        let df = keyed([10, 5, 10, -2, 5].map(Scalar::Int).to_vec());
        let (dense, trace) = partition(&df, &["k"], &GroupByOptions::default()).expect("dense");
        assert!(trace.dense);
        assert!(trace.used_arena);
        let generic = df.partition_rows(Some(&["k"][..])).expect("generic");
        assert_eq!(dense, generic);
        assert_eq!(dense, vec![vec![0, 2], vec![1, 4], vec![3]]);
    }

    #[test]
    fn dense_path_without_maintain_order_sorts_keys() {
        let df = keyed([10, 5, 10, -2].map(Scalar::Int).to_vec());
        let options = GroupByOptions {
            maintain_order: false,
            ..GroupByOptions::default()
        };
        let (groups, _) = partition(&df, &["k"], &options).expect("partition");
        assert_eq!(groups, vec![vec![3], vec![1], vec![0, 2]]);
    }

    #[test]
    fn wide_spans_and_null_groups_use_the_hash_path() {
        let wide = keyed(vec![Scalar::Int(0), Scalar::Int(1_000_000)]);
        let (_, trace) = partition(&wide, &["k"], &GroupByOptions::default()).expect("wide");
        assert!(!trace.dense);

        let nulls = keyed(vec![Scalar::Int(1), Scalar::Null, Scalar::Int(1)]);
        let (groups, trace) =
            partition(&nulls, &["k"], &GroupByOptions::default()).expect("nulls");
        assert!(!trace.dense);
        assert_eq!(groups, vec![vec![0, 2], vec![1]]);

        let dropping = GroupByOptions {
            drop_null_keys: true,
            ..GroupByOptions::default()
        };
        let (groups, trace) = partition(&nulls, &["k"], &dropping).expect("drop");
        assert!(trace.dense);
        assert_eq!(groups, vec![vec![0, 2]]);
    }

    #[test]
    fn arena_budget_overflow_falls_back() {
        let df = keyed([3, 1, 3].map(Scalar::Int).to_vec());
        let options = GroupByOptions {
            execution: GroupByExecutionOptions {
                use_arena: true,
                arena_budget_bytes: 1,
            },
            ..GroupByOptions::default()
        };
        let (groups, trace) = partition(&df, &["k"], &options).expect("partition");
        assert!(trace.dense);
        assert!(!trace.used_arena);
        assert!(trace.estimated_bytes > 1);
        assert_eq!(groups, vec![vec![0, 2], vec![1]]);
    }
}
