//! Multi-key row sorting.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tbl_types::Scalar;

use crate::{DataFrame, FrameError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOptions {
    /// One flag per key, or a single flag applied to every key.
    pub descending: Vec<bool>,
    pub nulls_last: bool,
    pub stable: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            descending: vec![false],
            nulls_last: true,
            stable: true,
        }
    }
}

impl SortOptions {
    #[must_use]
    pub fn descending(flags: Vec<bool>) -> Self {
        Self {
            descending: flags,
            ..Self::default()
        }
    }
}

/// Null placement is independent of direction.
pub(crate) fn compare_for_sort(
    left: &Scalar,
    right: &Scalar,
    descending: bool,
    nulls_last: bool,
) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if nulls_last {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, true) => {
            if nulls_last {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, false) => {
            let order = left.total_cmp(right);
            if descending { order.reverse() } else { order }
        }
    }
}

impl DataFrame {
    /// Row permutation ordering the frame by `by`.
    pub fn arg_sort(&self, by: &[&str], options: &SortOptions) -> Result<Vec<usize>, FrameError> {
        if by.is_empty() {
            return Err(FrameError::InvalidArgument(
                "sort needs at least one key column".to_owned(),
            ));
        }
        let descending = match options.descending.as_slice() {
            [] => vec![false; by.len()],
            [single] => vec![*single; by.len()],
            flags if flags.len() == by.len() => flags.to_vec(),
            flags => {
                return Err(FrameError::InvalidArgument(format!(
                    "got {} descending flags for {} sort keys",
                    flags.len(),
                    by.len()
                )));
            }
        };

        let keys = self
            .resolve(by)?
            .into_iter()
            .map(|series| series.values())
            .collect::<Vec<_>>();

        let compare = |a: &usize, b: &usize| {
            keys.iter()
                .zip(&descending)
                .map(|(values, desc)| {
                    compare_for_sort(&values[*a], &values[*b], *desc, options.nulls_last)
                })
                .find(|order| order.is_ne())
                .unwrap_or(Ordering::Equal)
        };

        let mut order: Vec<usize> = (0..self.height()).collect();
        if options.stable {
            order.sort_by(compare);
        } else {
            order.sort_unstable_by(compare);
        }
        Ok(order)
    }

    pub fn sort(&self, by: &[&str], options: &SortOptions) -> Result<Self, FrameError> {
        let order = self.arg_sort(by, options)?;
        self.take(&order)
    }
}

#[cfg(test)]
mod tests {
    use tbl_types::Scalar;

    use super::SortOptions;
    use crate::{DataFrame, FrameError};

    fn frame() -> DataFrame {
        DataFrame::from_columns([
            (
                "k",
                vec![
                    Scalar::Int(2),
                    Scalar::Null,
                    Scalar::Int(1),
                    Scalar::Int(2),
                    Scalar::Int(1),
                ],
            ),
            (
                "v",
                vec![
                    Scalar::from("a"),
                    Scalar::from("b"),
                    Scalar::from("c"),
                    Scalar::from("d"),
                    Scalar::from("e"),
                ],
            ),
        ])
        .expect("frame")
    }

    #[test]
    fn stable_sort_keeps_tie_order_and_puts_nulls_last() {
        let order = frame()
            .arg_sort(&["k"], &SortOptions::default())
            .expect("sort");
        assert_eq!(order, vec![2, 4, 0, 3, 1]);
    }

    #[test]
    fn descending_keeps_nulls_last() {
        let order = frame()
            .arg_sort(&["k"], &SortOptions::descending(vec![true]))
            .expect("sort");
        assert_eq!(order, vec![0, 3, 2, 4, 1]);
    }

    #[test]
    fn nulls_first_when_requested() {
        let options = SortOptions {
            nulls_last: false,
            ..SortOptions::default()
        };
        let order = frame().arg_sort(&["k"], &options).expect("sort");
        assert_eq!(order[0], 1);
    }

    #[test]
    fn multi_key_mixed_directions() {
        let sorted = frame()
            .sort(&["k", "v"], &SortOptions::descending(vec![false, true]))
            .expect("sort");
        assert_eq!(
            sorted.column("v").expect("v").to_vec(),
            vec![
                Scalar::from("e"),
                Scalar::from("c"),
                Scalar::from("d"),
                Scalar::from("a"),
                Scalar::from("b"),
            ]
        );
    }

    #[test]
    fn descending_arity_must_match() {
        let err = frame()
            .arg_sort(&["k", "v"], &SortOptions::descending(vec![true, false, true]))
            .expect_err("arity");
        assert!(matches!(err, FrameError::InvalidArgument(_)));
        assert!(frame().arg_sort(&[], &SortOptions::default()).is_err());
        assert!(matches!(
            frame().arg_sort(&["zzz"], &SortOptions::default()),
            Err(FrameError::ColumnNotFound(_))
        ));
    }
}
