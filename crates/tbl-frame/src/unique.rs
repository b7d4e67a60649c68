//! Row deduplication.
//!
//! Rows are equal when every selected value is equal, with nulls equal to
//! nulls and all NaNs equal to each other.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};
use tbl_types::{DataType, Scalar, ScalarKey};

use crate::{DataFrame, FrameError, Series};

/// Which representative of a duplicate class survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueKeep {
    #[default]
    First,
    Last,
    Any,
    /// Drop every row of a duplicated class.
    None,
}

impl DataFrame {
    /// Partition row indices into equality classes over `subset` (default:
    /// every column), in order of first occurrence.
    pub fn partition_rows(&self, subset: Option<&[&str]>) -> Result<Vec<Vec<usize>>, FrameError> {
        let keys = match subset {
            Some(names) => self.resolve(names)?,
            None => self.columns().iter().collect(),
        };
        let values = keys.iter().map(|s| s.values()).collect::<Vec<_>>();

        let mut slots: HashMap<Vec<ScalarKey<'_>>, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for row in 0..self.height() {
            let key = values.iter().map(|col| col[row].key()).collect::<Vec<_>>();
            match slots.entry(key) {
                Entry::Occupied(slot) => groups[*slot.get()].push(row),
                Entry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        Ok(groups)
    }

    /// Deduplicate rows. Survivors come out in first-occurrence order of their
    /// class; with `maintain_order` they are ordered by their own row index.
    pub fn unique(
        &self,
        subset: Option<&[&str]>,
        keep: UniqueKeep,
        maintain_order: bool,
    ) -> Result<Self, FrameError> {
        let groups = self.partition_rows(subset)?;
        let mut survivors = groups
            .iter()
            .filter_map(|rows| match keep {
                UniqueKeep::First | UniqueKeep::Any => rows.first().copied(),
                UniqueKeep::Last => rows.last().copied(),
                UniqueKeep::None => (rows.len() == 1).then(|| rows[0]),
            })
            .collect::<Vec<_>>();
        if maintain_order {
            survivors.sort_unstable();
        }
        self.take(&survivors)
    }

    fn class_size_mask(
        &self,
        subset: Option<&[&str]>,
        name: &str,
        predicate: impl Fn(usize) -> bool,
    ) -> Result<Series, FrameError> {
        let mut flags = vec![Scalar::Boolean(false); self.height()];
        for rows in self.partition_rows(subset)? {
            let flag = predicate(rows.len());
            for row in rows {
                flags[row] = Scalar::Boolean(flag);
            }
        }
        Series::with_dtype(name, DataType::Boolean, flags)
    }

    /// True for every row whose class has more than one member.
    pub fn is_duplicated(&self, subset: Option<&[&str]>) -> Result<Series, FrameError> {
        self.class_size_mask(subset, "is_duplicated", |size| size > 1)
    }

    /// True for every row whose class has exactly one member.
    pub fn is_unique(&self, subset: Option<&[&str]>) -> Result<Series, FrameError> {
        self.class_size_mask(subset, "is_unique", |size| size == 1)
    }

    pub fn n_unique(&self, subset: Option<&[&str]>) -> Result<usize, FrameError> {
        Ok(self.partition_rows(subset)?.len())
    }
}

#[cfg(test)]
mod tests {
    use tbl_types::Scalar;

    use super::UniqueKeep;
    use crate::DataFrame;

    fn frame() -> DataFrame {
        DataFrame::from_columns([
            (
                "a",
                vec![
                    Scalar::Int(1),
                    Scalar::Int(2),
                    Scalar::Int(1),
                    Scalar::Null,
                    Scalar::Null,
                ],
            ),
            (
                "b",
                vec![
                    Scalar::Float(f64::NAN),
                    Scalar::Float(0.0),
                    Scalar::Float(f64::NAN),
                    Scalar::Float(1.0),
                    Scalar::Float(1.0),
                ],
            ),
            (
                "c",
                vec![
                    Scalar::Int(10),
                    Scalar::Int(20),
                    Scalar::Int(30),
                    Scalar::Int(40),
                    Scalar::Int(50),
                ],
            ),
        ])
        .expect("frame")
    }

    fn c_values(df: &DataFrame) -> Vec<Scalar> {
        df.column("c").expect("c").to_vec()
    }

    #[test]
    fn nulls_and_nans_form_classes() {
        let df = frame();
        let subset = ["a", "b"];
        assert_eq!(df.n_unique(Some(&subset[..])).expect("n_unique"), 3);

        let first = df
            .unique(Some(&subset[..]), UniqueKeep::First, true)
            .expect("unique");
        assert_eq!(
            c_values(&first),
            vec![Scalar::Int(10), Scalar::Int(20), Scalar::Int(40)]
        );
    }

    #[test]
    fn keep_last_with_and_without_maintain_order() {
        let df = frame();
        let subset = ["a", "b"];
        let ordered = df
            .unique(Some(&subset[..]), UniqueKeep::Last, true)
            .expect("unique");
        assert_eq!(
            c_values(&ordered),
            vec![Scalar::Int(20), Scalar::Int(30), Scalar::Int(50)]
        );
        let by_class = df
            .unique(Some(&subset[..]), UniqueKeep::Last, false)
            .expect("unique");
        assert_eq!(
            c_values(&by_class),
            vec![Scalar::Int(30), Scalar::Int(20), Scalar::Int(50)]
        );
    }

    #[test]
    fn keep_none_drops_whole_classes() {
        let df = frame();
        let out = df
            .unique(Some(&["a", "b"][..]), UniqueKeep::None, true)
            .expect("unique");
        assert_eq!(c_values(&out), vec![Scalar::Int(20)]);
    }

    #[test]
    fn unique_is_idempotent() {
        let df = frame();
        let once = df.unique(Some(&["a"][..]), UniqueKeep::First, true).expect("once");
        let twice = once.unique(Some(&["a"][..]), UniqueKeep::First, true).expect("twice");
        assert_eq!(c_values(&once), c_values(&twice));
    }

    #[test]
    fn duplicate_masks_follow_row_order() {
        let df = frame();
        let dup = df.is_duplicated(Some(&["a"][..])).expect("mask");
        assert_eq!(
            dup.to_vec(),
            [true, false, true, true, true].map(Scalar::Boolean).to_vec()
        );
        let uniq = df.is_unique(Some(&["a"][..])).expect("mask");
        assert_eq!(
            uniq.to_vec(),
            [false, true, false, false, false].map(Scalar::Boolean).to_vec()
        );
        assert_eq!(df.n_unique(None).expect("all columns"), 5);
    }
}
