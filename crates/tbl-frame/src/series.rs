use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tbl_columnar::{ArithmeticOp, Column, ComparisonOp};
use tbl_types::{DataType, Scalar, folds};

use crate::FrameError;
use crate::sort::compare_for_sort;

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    column: Column,
}

impl Series {
    pub fn new(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }

    /// Build from values, inferring the dtype.
    pub fn from_values(name: impl Into<String>, values: Vec<Scalar>) -> Result<Self, FrameError> {
        Ok(Self::new(name, Column::from_values(values)?))
    }

    /// Build from values coerced to `dtype`.
    pub fn with_dtype(
        name: impl Into<String>,
        dtype: DataType,
        values: Vec<Scalar>,
    ) -> Result<Self, FrameError> {
        Ok(Self::new(name, Column::new(dtype, values)?))
    }

    pub fn full_null(name: impl Into<String>, dtype: DataType, len: usize) -> Self {
        Self::new(name, Column::full_null(dtype, len))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn dtype(&self) -> &DataType {
        self.column.dtype()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.column.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }

    #[must_use]
    pub fn column(&self) -> &Column {
        &self.column
    }

    #[must_use]
    pub fn into_column(self) -> Column {
        self.column
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Scalar> {
        self.column.value(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scalar> + '_ {
        self.column.iter()
    }

    #[must_use]
    pub fn values(&self) -> Cow<'_, [Scalar]> {
        self.column.values()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Scalar> {
        self.column.iter().cloned().collect()
    }

    #[must_use]
    pub fn null_count(&self) -> usize {
        self.column.null_count()
    }

    #[must_use]
    pub fn n_chunks(&self) -> usize {
        self.column.n_chunks()
    }

    #[must_use]
    pub fn rechunk(&self) -> Self {
        self.map_column(self.column.rechunk())
    }

    fn map_column(&self, column: Column) -> Self {
        Self {
            name: self.name.clone(),
            column,
        }
    }

    /// Append `other`'s chunks; dtypes must match.
    pub fn append(&mut self, other: &Self) -> Result<&mut Self, FrameError> {
        self.column.append(&other.column)?;
        Ok(self)
    }

    /// Overwrite one value in place. Clones sharing storage are unaffected.
    pub fn set(&mut self, idx: usize, value: Scalar) -> Result<(), FrameError> {
        self.column.set(idx, value)?;
        Ok(())
    }

    pub fn cast(&self, dtype: &DataType) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.cast(dtype)?))
    }

    pub fn filter(&self, mask: &Self) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.filter(&mask.column)?))
    }

    pub fn take(&self, indices: &[usize]) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.take(indices)?))
    }

    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        self.map_column(self.column.slice(offset, len))
    }

    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        self.slice(0, n)
    }

    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        self.slice(self.len().saturating_sub(n), n)
    }

    pub fn fill_null(&self, value: &Scalar) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.fill_null(value)?))
    }

    #[must_use]
    pub fn drop_nulls(&self) -> Self {
        self.map_column(self.column.drop_nulls())
    }

    #[must_use]
    pub fn is_null(&self) -> Self {
        self.map_column(self.column.is_null())
    }

    #[must_use]
    pub fn is_not_null(&self) -> Self {
        self.map_column(self.column.is_not_null())
    }

    fn arithmetic(&self, other: &Self, op: ArithmeticOp) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.binary_numeric(&other.column, op)?))
    }

    pub fn add(&self, other: &Self) -> Result<Self, FrameError> {
        self.arithmetic(other, ArithmeticOp::Add)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, FrameError> {
        self.arithmetic(other, ArithmeticOp::Sub)
    }

    pub fn mul(&self, other: &Self) -> Result<Self, FrameError> {
        self.arithmetic(other, ArithmeticOp::Mul)
    }

    pub fn div(&self, other: &Self) -> Result<Self, FrameError> {
        self.arithmetic(other, ArithmeticOp::Div)
    }

    pub fn rem(&self, other: &Self) -> Result<Self, FrameError> {
        self.arithmetic(other, ArithmeticOp::Rem)
    }

    pub fn apply_scalar(&self, scalar: &Scalar, op: ArithmeticOp) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.scalar_numeric(scalar, op)?))
    }

    pub fn compare(&self, other: &Self, op: ComparisonOp) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.binary_comparison(&other.column, op)?))
    }

    pub fn compare_scalar(&self, scalar: &Scalar, op: ComparisonOp) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.compare_scalar(scalar, op)?))
    }

    pub fn gt(&self, other: &Self) -> Result<Self, FrameError> {
        self.compare(other, ComparisonOp::Gt)
    }

    pub fn lt(&self, other: &Self) -> Result<Self, FrameError> {
        self.compare(other, ComparisonOp::Lt)
    }

    pub fn equal(&self, other: &Self) -> Result<Self, FrameError> {
        self.compare(other, ComparisonOp::Eq)
    }

    pub fn not_equal(&self, other: &Self) -> Result<Self, FrameError> {
        self.compare(other, ComparisonOp::Ne)
    }

    pub fn gt_eq(&self, other: &Self) -> Result<Self, FrameError> {
        self.compare(other, ComparisonOp::Ge)
    }

    pub fn lt_eq(&self, other: &Self) -> Result<Self, FrameError> {
        self.compare(other, ComparisonOp::Le)
    }

    pub fn and(&self, other: &Self) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.and(&other.column)?))
    }

    pub fn or(&self, other: &Self) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.or(&other.column)?))
    }

    pub fn not(&self) -> Result<Self, FrameError> {
        Ok(self.map_column(self.column.not()?))
    }

    fn is_summable(&self) -> bool {
        self.dtype().is_numeric() || matches!(self.dtype(), DataType::Boolean)
    }

    /// Null-skipping sum. Non-numeric series sum to null.
    #[must_use]
    pub fn sum(&self) -> Scalar {
        folds::sum(&self.values(), self.dtype())
    }

    #[must_use]
    pub fn mean(&self) -> Scalar {
        if !self.is_summable() {
            return Scalar::Null;
        }
        folds::mean(&self.values())
    }

    #[must_use]
    pub fn median(&self) -> Scalar {
        if !self.is_summable() {
            return Scalar::Null;
        }
        folds::median(&self.values())
    }

    #[must_use]
    pub fn var(&self, ddof: u8) -> Scalar {
        if !self.is_summable() {
            return Scalar::Null;
        }
        folds::var(&self.values(), ddof)
    }

    #[must_use]
    pub fn std(&self, ddof: u8) -> Scalar {
        if !self.is_summable() {
            return Scalar::Null;
        }
        folds::std(&self.values(), ddof)
    }

    #[must_use]
    pub fn min(&self) -> Scalar {
        if self.dtype().is_nested() {
            return Scalar::Null;
        }
        folds::min(&self.values())
    }

    #[must_use]
    pub fn max(&self) -> Scalar {
        if self.dtype().is_nested() {
            return Scalar::Null;
        }
        folds::max(&self.values())
    }

    /// Permutation that sorts this series. Ties keep their original order.
    #[must_use]
    pub fn arg_sort(&self, descending: bool, nulls_last: bool) -> Vec<usize> {
        let values = self.values();
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| compare_for_sort(&values[a], &values[b], descending, nulls_last));
        order
    }

    pub fn sort(&self, descending: bool, nulls_last: bool) -> Result<Self, FrameError> {
        self.take(&self.arg_sort(descending, nulls_last))
    }

    /// Distinct values counting null once.
    #[must_use]
    pub fn n_unique(&self) -> usize {
        folds::n_unique(&self.values())
    }

    /// Distinct values in first-occurrence order.
    pub fn unique(&self) -> Result<Self, FrameError> {
        let values = self.values();
        let mut seen = HashSet::with_capacity(values.len());
        let positions = values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| seen.insert(value.key()).then_some(idx))
            .collect::<Vec<_>>();
        self.take(&positions)
    }

    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.column.categories()
    }

    #[must_use]
    pub fn category_codes(&self) -> Self {
        self.map_column(self.column.category_codes())
    }
}

#[cfg(test)]
mod tests {
    use tbl_types::{DataType, Scalar};

    use super::Series;
    use crate::FrameError;

    fn ints(name: &str, values: &[Option<i64>]) -> Series {
        Series::with_dtype(
            name,
            DataType::Int64,
            values.iter().map(|v| Scalar::from(*v)).collect(),
        )
        .expect("series")
    }

    #[test]
    fn arithmetic_keeps_left_name() {
        let a = ints("a", &[Some(1), Some(2)]);
        let b = ints("b", &[Some(10), None]);
        let out = a.add(&b).expect("add");
        assert_eq!(out.name(), "a");
        assert_eq!(out.to_vec(), vec![Scalar::Int(11), Scalar::Null]);
    }

    #[test]
    fn length_mismatch_surfaces_as_frame_error() {
        let a = ints("a", &[Some(1)]);
        let b = ints("b", &[Some(1), Some(2)]);
        assert!(matches!(
            a.add(&b),
            Err(FrameError::LengthMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn clone_then_set_is_copy_on_write() {
        let original = ints("a", &[Some(1), Some(2), Some(3)]);
        let mut copy = original.clone();
        copy.set(1, Scalar::Int(20)).expect("set");
        assert_eq!(original.get(1), Some(&Scalar::Int(2)));
        assert_eq!(copy.get(1), Some(&Scalar::Int(20)));
    }

    #[test]
    fn reductions_skip_nulls_and_null_out_non_numeric() {
        let a = ints("a", &[Some(4), None, Some(2)]);
        assert_eq!(a.sum(), Scalar::Int(6));
        assert_eq!(a.mean(), Scalar::Float(3.0));
        assert_eq!(a.min(), Scalar::Int(2));

        let s = Series::from_values("s", vec![Scalar::from("x"), Scalar::from("y")])
            .expect("strings");
        assert_eq!(s.sum(), Scalar::Null);
        assert_eq!(s.mean(), Scalar::Null);
        assert_eq!(s.max(), Scalar::from("y"));
    }

    #[test]
    fn arg_sort_places_nulls_last_in_both_directions() {
        let a = ints("a", &[Some(2), None, Some(1), Some(3)]);
        assert_eq!(a.arg_sort(false, true), vec![2, 0, 3, 1]);
        assert_eq!(a.arg_sort(true, true), vec![3, 0, 2, 1]);
        assert_eq!(a.arg_sort(false, false), vec![1, 2, 0, 3]);
    }

    #[test]
    fn unique_keeps_first_occurrence_order() {
        let a = ints("a", &[Some(3), None, Some(3), Some(1), None]);
        assert_eq!(
            a.unique().expect("unique").to_vec(),
            vec![Scalar::Int(3), Scalar::Null, Scalar::Int(1)]
        );
        assert_eq!(a.n_unique(), 3);
    }

    #[test]
    fn append_grows_chunks() {
        let mut a = ints("a", &[Some(1)]);
        let b = ints("b", &[Some(2)]);
        a.append(&b).expect("append");
        assert_eq!(a.n_chunks(), 2);
        assert_eq!(a.rechunk().n_chunks(), 1);
        assert_eq!(a.len(), 2);
    }
}
