//! Null-skipping reductions over scalar slices.
//!
//! Every fold ignores `Scalar::Null`. Callers that need null propagation
//! check for nulls before folding.

use std::collections::HashSet;

use crate::{DataType, Scalar};

fn collect_numeric(values: &[Scalar]) -> Vec<f64> {
    values.iter().filter_map(|v| v.to_f64().ok()).collect()
}

/// Output dtype of `sum` for an input dtype, `None` when not summable.
#[must_use]
pub fn sum_dtype(dtype: &DataType) -> Option<DataType> {
    match dtype {
        DataType::Boolean => Some(DataType::Int64),
        d if d.is_signed_integer() => Some(DataType::Int64),
        d if d.is_unsigned_integer() => Some(DataType::UInt64),
        DataType::Float32 => Some(DataType::Float32),
        DataType::Float64 => Some(DataType::Float64),
        _ => None,
    }
}

/// Sum of non-null values. An empty or all-null input sums to zero.
#[must_use]
pub fn sum(values: &[Scalar], dtype: &DataType) -> Scalar {
    match sum_dtype(dtype) {
        Some(DataType::Int64) => Scalar::Int(
            values
                .iter()
                .filter_map(|v| match v {
                    Scalar::Int(x) => Some(*x),
                    Scalar::Boolean(b) => Some(i64::from(*b)),
                    _ => None,
                })
                .fold(0_i64, i64::wrapping_add),
        ),
        Some(DataType::UInt64) => Scalar::UInt(
            values
                .iter()
                .filter_map(|v| match v {
                    Scalar::UInt(x) => Some(*x),
                    _ => None,
                })
                .fold(0_u64, u64::wrapping_add),
        ),
        Some(DataType::Float32) => {
            let total: f64 = collect_numeric(values).iter().sum();
            Scalar::Float(f64::from(total as f32))
        }
        Some(_) => Scalar::Float(collect_numeric(values).iter().sum()),
        None => Scalar::Null,
    }
}

#[must_use]
pub fn mean(values: &[Scalar]) -> Scalar {
    let nums = collect_numeric(values);
    if nums.is_empty() {
        return Scalar::Null;
    }
    let total: f64 = nums.iter().sum();
    Scalar::Float(total / nums.len() as f64)
}

#[must_use]
pub fn min(values: &[Scalar]) -> Scalar {
    values
        .iter()
        .filter(|v| !v.is_null())
        .min_by(|a, b| a.total_cmp(b))
        .cloned()
        .unwrap_or(Scalar::Null)
}

#[must_use]
pub fn max(values: &[Scalar]) -> Scalar {
    values
        .iter()
        .filter(|v| !v.is_null())
        .max_by(|a, b| a.total_cmp(b))
        .cloned()
        .unwrap_or(Scalar::Null)
}

#[must_use]
pub fn median(values: &[Scalar]) -> Scalar {
    let mut nums = collect_numeric(values);
    if nums.is_empty() {
        return Scalar::Null;
    }
    nums.sort_by(f64::total_cmp);
    let mid = nums.len() / 2;
    if nums.len().is_multiple_of(2) {
        Scalar::Float((nums[mid - 1] + nums[mid]) / 2.0)
    } else {
        Scalar::Float(nums[mid])
    }
}

/// Variance with `ddof` delta degrees of freedom; null when fewer than
/// `ddof + 1` values are present.
#[must_use]
pub fn var(values: &[Scalar], ddof: u8) -> Scalar {
    let nums = collect_numeric(values);
    let ddof = usize::from(ddof);
    if nums.len() <= ddof {
        return Scalar::Null;
    }
    let mean: f64 = nums.iter().sum::<f64>() / nums.len() as f64;
    let sum_sq: f64 = nums.iter().map(|x| (x - mean).powi(2)).sum();
    Scalar::Float(sum_sq / (nums.len() - ddof) as f64)
}

#[must_use]
pub fn std(values: &[Scalar], ddof: u8) -> Scalar {
    match var(values, ddof) {
        Scalar::Float(v) => Scalar::Float(v.sqrt()),
        other => other,
    }
}

#[must_use]
pub fn count(values: &[Scalar]) -> usize {
    values.iter().filter(|v| !v.is_null()).count()
}

#[must_use]
pub fn first(values: &[Scalar]) -> Scalar {
    values
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Scalar::Null)
}

#[must_use]
pub fn last(values: &[Scalar]) -> Scalar {
    values
        .iter()
        .rev()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Scalar::Null)
}

/// Distinct values, counting null as one value when present.
#[must_use]
pub fn n_unique(values: &[Scalar]) -> usize {
    values.iter().map(Scalar::key).collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::{count, first, last, max, mean, median, min, n_unique, std, sum, var};
    use crate::{DataType, Scalar};

    #[test]
    fn sum_keeps_integer_family() {
        let values = [Scalar::Int(2), Scalar::Null, Scalar::Int(5)];
        assert_eq!(sum(&values, &DataType::Int32), Scalar::Int(7));

        let unsigned = [Scalar::UInt(2), Scalar::UInt(3)];
        assert_eq!(sum(&unsigned, &DataType::UInt8), Scalar::UInt(5));

        let flags = [Scalar::Boolean(true), Scalar::Boolean(true), Scalar::Boolean(false)];
        assert_eq!(sum(&flags, &DataType::Boolean), Scalar::Int(2));
    }

    #[test]
    fn sum_of_all_null_is_zero_and_non_numeric_is_null() {
        assert_eq!(sum(&[Scalar::Null], &DataType::Float64), Scalar::Float(0.0));
        assert_eq!(sum(&[Scalar::from("a")], &DataType::Utf8), Scalar::Null);
    }

    #[test]
    fn mean_and_median_skip_nulls() {
        let values = [Scalar::Int(1), Scalar::Null, Scalar::Int(4), Scalar::Int(10)];
        assert_eq!(mean(&values), Scalar::Float(5.0));
        assert_eq!(median(&values), Scalar::Float(4.0));
        assert_eq!(mean(&[Scalar::Null]), Scalar::Null);
    }

    #[test]
    fn var_respects_ddof() {
        let values = [Scalar::Float(1.0), Scalar::Float(2.0), Scalar::Float(3.0)];
        assert_eq!(var(&values, 1), Scalar::Float(1.0));
        assert_eq!(var(&values, 0), Scalar::Float(2.0 / 3.0));
        assert_eq!(std(&values, 1), Scalar::Float(1.0));
        assert_eq!(var(&values[..1], 1), Scalar::Null);
    }

    #[test]
    fn min_max_work_on_strings() {
        let values = [Scalar::from("pear"), Scalar::Null, Scalar::from("apple")];
        assert_eq!(min(&values), Scalar::from("apple"));
        assert_eq!(max(&values), Scalar::from("pear"));
    }

    #[test]
    fn positional_and_counting_folds() {
        let values = [Scalar::Null, Scalar::Int(3), Scalar::Int(3), Scalar::Null];
        assert_eq!(first(&values), Scalar::Int(3));
        assert_eq!(last(&values), Scalar::Int(3));
        assert_eq!(count(&values), 2);
        assert_eq!(n_unique(&values), 2);
    }
}
