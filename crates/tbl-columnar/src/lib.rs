#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tbl_types::{DataType, Scalar, ScalarKey, TypeError, cast_scalar, cast_scalar_owned, infer_dtype, supertype};
use thiserror::Error;

#[derive(Debug, Clone, Eq)]
pub struct ValidityMask {
    words: Vec<u64>,
    len: usize,
}

impl ValidityMask {
    #[must_use]
    pub fn from_values(values: &[Scalar]) -> Self {
        let len = values.len();
        let mut words = vec![0_u64; len.div_ceil(64)];
        for (idx, value) in values.iter().enumerate() {
            if !value.is_null() {
                words[idx / 64] |= 1_u64 << (idx % 64);
            }
        }
        Self { words, len }
    }

    #[must_use]
    pub fn all_valid(len: usize) -> Self {
        let mut words = vec![u64::MAX; len.div_ceil(64)];
        let remainder = len % 64;
        if remainder > 0
            && let Some(last) = words.last_mut()
        {
            *last = (1_u64 << remainder) - 1;
        }
        Self { words, len }
    }

    #[must_use]
    pub fn all_invalid(len: usize) -> Self {
        Self {
            words: vec![0_u64; len.div_ceil(64)],
            len,
        }
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.words[idx / 64] >> (idx % 64)) & 1 == 1
    }

    pub fn set(&mut self, idx: usize, value: bool) {
        if idx >= self.len {
            return;
        }
        if value {
            self.words[idx / 64] |= 1_u64 << (idx % 64);
        } else {
            self.words[idx / 64] &= !(1_u64 << (idx % 64));
        }
    }

    pub fn push(&mut self, value: bool) {
        if self.len.is_multiple_of(64) {
            self.words.push(0);
        }
        self.len += 1;
        self.set(self.len - 1, value);
    }

    #[must_use]
    pub fn count_valid(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|idx| self.get(idx))
    }
}

impl PartialEq for ValidityMask {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bits().eq(other.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithmeticOp {
    /// Wrapping integer kernel; `None` for division, which always yields floats.
    fn integer_kernel(self) -> Option<fn(i128, i128) -> Option<i128>> {
        match self {
            Self::Add => Some(|a: i128, b: i128| Some(a.wrapping_add(b))),
            Self::Sub => Some(|a: i128, b: i128| Some(a.wrapping_sub(b))),
            Self::Mul => Some(|a: i128, b: i128| Some(a.wrapping_mul(b))),
            Self::Rem => Some(i128::checked_rem),
            Self::Div => None,
        }
    }
}

/// Element-wise comparison operations that produce `Boolean` columns.
///
/// A null on either side yields a null result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

impl ComparisonOp {
    #[must_use]
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering.is_gt(),
            Self::Lt => ordering.is_lt(),
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Ge => ordering.is_ge(),
            Self::Le => ordering.is_le(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("column dtype mismatch: left={left}, right={right}")]
    DtypeMismatch { left: DataType, right: DataType },
    #[error("index {index} out of bounds for column of length {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("cannot apply {op:?} to dtype {dtype}")]
    UnsupportedOperation { op: ArithmeticOp, dtype: DataType },
    #[error("expected a boolean column, got {0}")]
    NotBoolean(DataType),
    #[error(transparent)]
    Type(#[from] TypeError),
}

#[derive(Debug, Clone)]
struct Chunk {
    values: Vec<Scalar>,
    validity: ValidityMask,
}

impl Chunk {
    fn new(values: Vec<Scalar>) -> Self {
        let validity = ValidityMask::from_values(&values);
        Self { values, validity }
    }
}

/// A typed column stored as a list of shared chunks.
///
/// Cloning clones chunk handles only. Mutation through [`Column::set`]
/// copies the touched chunk when it is shared.
#[derive(Debug, Clone)]
pub struct Column {
    dtype: DataType,
    chunks: Vec<Arc<Chunk>>,
    len: usize,
}

fn physical_matches(value: &Scalar, dtype: &DataType) -> bool {
    match (value, dtype) {
        (Scalar::Null, _)
        | (Scalar::Boolean(_), DataType::Boolean)
        | (Scalar::Int(_), DataType::Int64)
        | (Scalar::UInt(_), DataType::UInt64)
        | (Scalar::Float(_), DataType::Float64)
        | (Scalar::Utf8(_), DataType::Utf8 | DataType::Categorical)
        | (Scalar::Date(_), DataType::Date) => true,
        (Scalar::Datetime(_, unit), DataType::Datetime(target)) => unit == target,
        _ => false,
    }
}

fn wrap_integer(value: i128, dtype: &DataType) -> Scalar {
    match dtype {
        DataType::Int8 => Scalar::Int(i64::from(value as i8)),
        DataType::Int16 => Scalar::Int(i64::from(value as i16)),
        DataType::Int32 => Scalar::Int(i64::from(value as i32)),
        DataType::UInt8 => Scalar::UInt(u64::from(value as u8)),
        DataType::UInt16 => Scalar::UInt(u64::from(value as u16)),
        DataType::UInt32 => Scalar::UInt(u64::from(value as u32)),
        DataType::UInt64 => Scalar::UInt(value as u64),
        _ => Scalar::Int(value as i64),
    }
}

fn apply_arithmetic(left: &Scalar, right: &Scalar, op: ArithmeticOp, out: &DataType) -> Scalar {
    if left.is_null() || right.is_null() {
        return Scalar::Null;
    }
    if matches!(out, DataType::Utf8) {
        return Scalar::Utf8(format!("{left}{right}"));
    }
    if let Some(kernel) = op.integer_kernel().filter(|_| out.is_integer()) {
        let (Some(a), Some(b)) = (left.as_i128(), right.as_i128()) else {
            return Scalar::Null;
        };
        return kernel(a, b).map_or(Scalar::Null, |value| wrap_integer(value, out));
    }
    let (Ok(a), Ok(b)) = (left.to_f64(), right.to_f64()) else {
        return Scalar::Null;
    };
    Scalar::Float(match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Rem => a % b,
    })
}

fn compare_values(
    left: &Scalar,
    right: &Scalar,
    common: &DataType,
    op: ComparisonOp,
) -> Result<Scalar, ColumnError> {
    if left.is_null() || right.is_null() {
        return Ok(Scalar::Null);
    }
    let left = comparable(left, common)?;
    let right = comparable(right, common)?;
    Ok(Scalar::Boolean(op.holds(left.total_cmp(&right))))
}

/// Numeric kinds already order by value; booleans, strings and mixed
/// temporal units need the common dtype first.
fn comparable<'a>(value: &'a Scalar, common: &DataType) -> Result<Cow<'a, Scalar>, ColumnError> {
    let cast = match common {
        DataType::Utf8 | DataType::Categorical | DataType::Datetime(_) => true,
        DataType::Boolean => false,
        _ => matches!(value, Scalar::Boolean(_)),
    };
    if cast {
        Ok(Cow::Owned(cast_scalar(value, common)?))
    } else {
        Ok(Cow::Borrowed(value))
    }
}

impl Column {
    /// Construct a column, coercing values to the target dtype.
    pub fn new(dtype: DataType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let needs_coercion = values.iter().any(|v| !physical_matches(v, &dtype));
        let coerced = if needs_coercion {
            values
                .into_iter()
                .map(|value| cast_scalar_owned(value, &dtype))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            values
        };
        Ok(Self::from_coerced(dtype, coerced))
    }

    fn from_coerced(dtype: DataType, values: Vec<Scalar>) -> Self {
        let len = values.len();
        Self {
            dtype,
            chunks: vec![Arc::new(Chunk::new(values))],
            len,
        }
    }

    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    #[must_use]
    pub fn full_null(dtype: DataType, len: usize) -> Self {
        Self::from_coerced(dtype, vec![Scalar::Null; len])
    }

    #[must_use]
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn n_chunks(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn null_count(&self) -> usize {
        self.len
            - self
                .chunks
                .iter()
                .map(|chunk| chunk.validity.count_valid())
                .sum::<usize>()
    }

    fn locate(&self, idx: usize) -> Option<(usize, usize)> {
        let mut offset = idx;
        for (chunk_idx, chunk) in self.chunks.iter().enumerate() {
            if offset < chunk.values.len() {
                return Some((chunk_idx, offset));
            }
            offset -= chunk.values.len();
        }
        None
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Scalar> {
        let (chunk, offset) = self.locate(idx)?;
        self.chunks[chunk].values.get(offset)
    }

    #[must_use]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.locate(idx)
            .is_some_and(|(chunk, offset)| self.chunks[chunk].validity.get(offset))
    }

    /// Combined validity across all chunks.
    #[must_use]
    pub fn validity(&self) -> ValidityMask {
        let mut mask = ValidityMask::all_invalid(0);
        for chunk in &self.chunks {
            for bit in chunk.validity.bits() {
                mask.push(bit);
            }
        }
        mask
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scalar> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.values.iter())
    }

    /// Values as one contiguous slice, borrowed when the column has a single chunk.
    #[must_use]
    pub fn values(&self) -> Cow<'_, [Scalar]> {
        match self.chunks.as_slice() {
            [single] => Cow::Borrowed(single.values.as_slice()),
            _ => Cow::Owned(self.iter().cloned().collect()),
        }
    }

    #[must_use]
    pub fn into_values(mut self) -> Vec<Scalar> {
        if self.chunks.len() == 1
            && let Some(chunk) = self.chunks.pop()
        {
            return Arc::try_unwrap(chunk)
                .map_or_else(|shared| shared.values.clone(), |chunk| chunk.values);
        }
        self.iter().cloned().collect()
    }

    /// Append the chunks of `other` without copying them.
    pub fn append(&mut self, other: &Self) -> Result<(), ColumnError> {
        if self.dtype != other.dtype {
            return Err(ColumnError::DtypeMismatch {
                left: self.dtype.clone(),
                right: other.dtype.clone(),
            });
        }
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            self.chunks.clone_from(&other.chunks);
        } else {
            self.chunks.extend(other.chunks.iter().cloned());
        }
        self.len += other.len;
        Ok(())
    }

    /// Coalesce all chunks into a single chunk.
    #[must_use]
    pub fn rechunk(&self) -> Self {
        if self.chunks.len() <= 1 {
            return self.clone();
        }
        Self::from_coerced(self.dtype.clone(), self.iter().cloned().collect())
    }

    /// Overwrite one value. A chunk shared with another handle is copied first.
    pub fn set(&mut self, idx: usize, value: Scalar) -> Result<(), ColumnError> {
        let value = cast_scalar_owned(value, &self.dtype)?;
        let (chunk_idx, offset) = self.locate(idx).ok_or(ColumnError::OutOfBounds {
            index: idx,
            len: self.len,
        })?;
        let chunk = Arc::make_mut(&mut self.chunks[chunk_idx]);
        chunk.validity.set(offset, !value.is_null());
        chunk.values[offset] = value;
        Ok(())
    }

    pub fn cast(&self, dtype: &DataType) -> Result<Self, ColumnError> {
        if &self.dtype == dtype {
            return Ok(self.clone());
        }
        Self::new(dtype.clone(), self.iter().cloned().collect())
    }

    pub fn take(&self, indices: &[usize]) -> Result<Self, ColumnError> {
        let values = self.values();
        let picked = indices
            .iter()
            .map(|&idx| {
                values.get(idx).cloned().ok_or(ColumnError::OutOfBounds {
                    index: idx,
                    len: self.len,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_coerced(self.dtype.clone(), picked))
    }

    /// Gather by position, producing nulls for `None` or out-of-range slots.
    #[must_use]
    pub fn reindex_by_positions(&self, positions: &[Option<usize>]) -> Self {
        let values = self.values();
        let picked = positions
            .iter()
            .map(|slot| {
                slot.and_then(|idx| values.get(idx).cloned())
                    .unwrap_or(Scalar::Null)
            })
            .collect();
        Self::from_coerced(self.dtype.clone(), picked)
    }

    /// Rows `offset..offset + len`, clamped to the column bounds.
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        let start = offset.min(self.len);
        let end = start.saturating_add(len).min(self.len);
        let picked = self.iter().skip(start).take(end - start).cloned().collect();
        Self::from_coerced(self.dtype.clone(), picked)
    }

    /// Boolean view of the column; nulls map to `None`.
    pub fn as_bools(&self) -> Result<Vec<Option<bool>>, ColumnError> {
        if !matches!(self.dtype, DataType::Boolean | DataType::Null) {
            return Err(ColumnError::NotBoolean(self.dtype.clone()));
        }
        Ok(self
            .iter()
            .map(|value| match value {
                Scalar::Boolean(v) => Some(*v),
                _ => None,
            })
            .collect())
    }

    /// Keep rows where `mask` is true. Null mask entries drop the row.
    pub fn filter(&self, mask: &Self) -> Result<Self, ColumnError> {
        self.check_len(mask)?;
        let keep = mask
            .as_bools()?
            .into_iter()
            .map(|v| v.unwrap_or(false))
            .collect::<Vec<_>>();
        Ok(self.filter_bools(&keep))
    }

    #[must_use]
    pub fn filter_bools(&self, keep: &[bool]) -> Self {
        let picked = self
            .iter()
            .zip(keep)
            .filter_map(|(value, keep)| keep.then(|| value.clone()))
            .collect();
        Self::from_coerced(self.dtype.clone(), picked)
    }

    pub fn fill_null(&self, fill_value: &Scalar) -> Result<Self, ColumnError> {
        let fill = cast_scalar(fill_value, &self.dtype)?;
        let values = self
            .iter()
            .map(|v| if v.is_null() { fill.clone() } else { v.clone() })
            .collect();
        Ok(Self::from_coerced(self.dtype.clone(), values))
    }

    #[must_use]
    pub fn drop_nulls(&self) -> Self {
        let values = self.iter().filter(|v| !v.is_null()).cloned().collect();
        Self::from_coerced(self.dtype.clone(), values)
    }

    #[must_use]
    pub fn is_null(&self) -> Self {
        let values = self.iter().map(|v| Scalar::Boolean(v.is_null())).collect();
        Self::from_coerced(DataType::Boolean, values)
    }

    #[must_use]
    pub fn is_not_null(&self) -> Self {
        let values = self.iter().map(|v| Scalar::Boolean(!v.is_null())).collect();
        Self::from_coerced(DataType::Boolean, values)
    }

    fn check_len(&self, other: &Self) -> Result<(), ColumnError> {
        if self.len != other.len {
            return Err(ColumnError::LengthMismatch {
                left: self.len,
                right: other.len,
            });
        }
        Ok(())
    }

    fn arithmetic_dtype(
        left: &DataType,
        right: &DataType,
        op: ArithmeticOp,
    ) -> Result<DataType, ColumnError> {
        let common = supertype(left, right)?;
        let out = match (&common, op) {
            (DataType::Null, _) => DataType::Null,
            (DataType::Utf8, ArithmeticOp::Add) => DataType::Utf8,
            (DataType::Float32, _) => DataType::Float32,
            (DataType::Boolean, op) if op.integer_kernel().is_none() => DataType::Float64,
            (dtype, op) if op.integer_kernel().is_none() && dtype.is_numeric() => DataType::Float64,
            (DataType::Boolean, _) => DataType::Int64,
            (dtype, _) if dtype.is_numeric() => common.clone(),
            (dtype, op) => {
                return Err(ColumnError::UnsupportedOperation {
                    op,
                    dtype: dtype.clone(),
                });
            }
        };
        Ok(out)
    }

    /// Element-wise arithmetic after supercasting both dtypes. Integer
    /// overflow wraps within the output width; integer remainder by zero and
    /// nulls on either side produce nulls.
    pub fn binary_numeric(&self, right: &Self, op: ArithmeticOp) -> Result<Self, ColumnError> {
        self.check_len(right)?;
        let out_dtype = Self::arithmetic_dtype(&self.dtype, &right.dtype, op)?;
        let values = self
            .iter()
            .zip(right.iter())
            .map(|(l, r)| apply_arithmetic(l, r, op, &out_dtype))
            .collect();
        Self::new(out_dtype, values)
    }

    pub fn scalar_numeric(&self, scalar: &Scalar, op: ArithmeticOp) -> Result<Self, ColumnError> {
        let out_dtype = Self::arithmetic_dtype(&self.dtype, &scalar.dtype(), op)?;
        let values = self
            .iter()
            .map(|v| apply_arithmetic(v, scalar, op, &out_dtype))
            .collect();
        Self::new(out_dtype, values)
    }

    pub fn binary_comparison(&self, right: &Self, op: ComparisonOp) -> Result<Self, ColumnError> {
        self.check_len(right)?;
        let common = supertype(&self.dtype, &right.dtype)?;
        let values = self
            .iter()
            .zip(right.iter())
            .map(|(l, r)| compare_values(l, r, &common, op))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_coerced(DataType::Boolean, values))
    }

    /// Compare every element against a scalar. A null scalar yields an
    /// all-null result.
    pub fn compare_scalar(&self, scalar: &Scalar, op: ComparisonOp) -> Result<Self, ColumnError> {
        let common = supertype(&self.dtype, &scalar.dtype())?;
        let values = self
            .iter()
            .map(|v| compare_values(v, scalar, &common, op))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_coerced(DataType::Boolean, values))
    }

    fn kleene(
        &self,
        right: &Self,
        combine: impl Fn(Option<bool>, Option<bool>) -> Option<bool>,
    ) -> Result<Self, ColumnError> {
        self.check_len(right)?;
        let values = self
            .as_bools()?
            .into_iter()
            .zip(right.as_bools()?)
            .map(|(l, r)| combine(l, r).map_or(Scalar::Null, Scalar::Boolean))
            .collect();
        Ok(Self::from_coerced(DataType::Boolean, values))
    }

    /// Three-valued AND: `false` wins over null.
    pub fn and(&self, right: &Self) -> Result<Self, ColumnError> {
        self.kleene(right, |l, r| match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        })
    }

    /// Three-valued OR: `true` wins over null.
    pub fn or(&self, right: &Self) -> Result<Self, ColumnError> {
        self.kleene(right, |l, r| match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        })
    }

    pub fn not(&self) -> Result<Self, ColumnError> {
        let values = self
            .as_bools()?
            .into_iter()
            .map(|v| v.map_or(Scalar::Null, |b| Scalar::Boolean(!b)))
            .collect();
        Ok(Self::from_coerced(DataType::Boolean, values))
    }

    /// Distinct non-null values of a categorical or string column, in
    /// first-occurrence order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashMap::<&str, ()>::new();
        let mut out = Vec::new();
        for value in self.iter() {
            if let Scalar::Utf8(text) = value
                && seen.insert(text.as_str(), ()).is_none()
            {
                out.push(text.clone());
            }
        }
        out
    }

    /// Dictionary codes aligned with [`Column::categories`]; nulls stay null.
    #[must_use]
    pub fn category_codes(&self) -> Self {
        let mut codes = HashMap::<ScalarKey<'_>, u64>::new();
        let values = self
            .iter()
            .map(|value| {
                if value.is_null() {
                    return Scalar::Null;
                }
                let next = codes.len() as u64;
                Scalar::UInt(*codes.entry(value.key()).or_insert(next))
            })
            .collect();
        Self::from_coerced(DataType::UInt32, values)
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype && self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Serialize for Column {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Column", 2)?;
        state.serialize_field("dtype", &self.dtype)?;
        state.serialize_field("values", self.values().as_ref())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            dtype: DataType,
            values: Vec<Scalar>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.dtype, raw.values).map_err(serde::de::Error::custom)
    }
}
