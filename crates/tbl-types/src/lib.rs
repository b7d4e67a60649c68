#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod folds;
mod temporal;

pub use temporal::{
    Duration, TimeUnit, date_to_naive, datetime_to_naive, naive_to_date, naive_to_datetime,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    Date,
    Datetime(TimeUnit),
    Categorical,
    List(Box<DataType>),
    Struct(Vec<Field>),
}

impl DataType {
    #[must_use]
    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Datetime(_))
    }

    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::List(_) | Self::Struct(_))
    }

    /// Element type of a `List`.
    #[must_use]
    pub fn inner(&self) -> Option<&DataType> {
        match self {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }

    fn integer_bits(&self) -> Option<u32> {
        match self {
            Self::Int8 | Self::UInt8 => Some(8),
            Self::Int16 | Self::UInt16 => Some(16),
            Self::Int32 | Self::UInt32 => Some(32),
            Self::Int64 | Self::UInt64 => Some(64),
            _ => None,
        }
    }

    /// Inclusive value range of an integer dtype.
    #[must_use]
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        let bits = self.integer_bits()?;
        if self.is_signed_integer() {
            let half = 1_i128 << (bits - 1);
            Some((-half, half - 1))
        } else {
            Some((0, (1_i128 << bits) - 1))
        }
    }

    fn signed_with_bits(bits: u32) -> Self {
        match bits {
            8 => Self::Int8,
            16 => Self::Int16,
            32 => Self::Int32,
            _ => Self::Int64,
        }
    }

    fn unsigned_with_bits(bits: u32) -> Self {
        match bits {
            8 => Self::UInt8,
            16 => Self::UInt16,
            32 => Self::UInt32,
            _ => Self::UInt64,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean => f.write_str("bool"),
            Self::Int8 => f.write_str("i8"),
            Self::Int16 => f.write_str("i16"),
            Self::Int32 => f.write_str("i32"),
            Self::Int64 => f.write_str("i64"),
            Self::UInt8 => f.write_str("u8"),
            Self::UInt16 => f.write_str("u16"),
            Self::UInt32 => f.write_str("u32"),
            Self::UInt64 => f.write_str("u64"),
            Self::Float32 => f.write_str("f32"),
            Self::Float64 => f.write_str("f64"),
            Self::Utf8 => f.write_str("str"),
            Self::Date => f.write_str("date"),
            Self::Datetime(unit) => write!(f, "datetime[{unit}]"),
            Self::Categorical => f.write_str("cat"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Struct(fields) => {
                f.write_str("struct{")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.dtype)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A single physical value. Narrow integer and `Float32` dtypes are logical;
/// their values are carried by the 64-bit variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Utf8(String),
    /// Days since the unix epoch.
    Date(i32),
    Datetime(i64, TimeUnit),
    List(Vec<Scalar>),
    Struct(Vec<Scalar>),
}

impl Scalar {
    /// Natural dtype of this value when no column dtype is imposed.
    #[must_use]
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int(_) => DataType::Int64,
            Self::UInt(_) => DataType::UInt64,
            Self::Float(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Date(_) => DataType::Date,
            Self::Datetime(_, unit) => DataType::Datetime(*unit),
            Self::List(items) => {
                DataType::List(Box::new(infer_dtype(items).unwrap_or(DataType::Null)))
            }
            Self::Struct(items) => DataType::Struct(
                items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| Field::new(format!("field_{idx}"), item.dtype()))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn coalesce(&self, other: &Self) -> Self {
        if self.is_null() {
            other.clone()
        } else {
            self.clone()
        }
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Int(v) => Ok(*v as f64),
            Self::UInt(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            other => Err(TypeError::NonNumeric {
                value: other.to_string(),
            }),
        }
    }

    /// Integer view of integral values, including temporal physical values.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Boolean(v) => Some(i128::from(*v)),
            Self::Int(v) => Some(i128::from(*v)),
            Self::UInt(v) => Some(i128::from(*v)),
            Self::Date(v) => Some(i128::from(*v)),
            Self::Datetime(v, _) => Some(i128::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(v) => Some(v),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => 1,
            Self::Date(_) | Self::Datetime(..) => 2,
            Self::Utf8(_) => 3,
            Self::List(_) => 4,
            Self::Struct(_) => 5,
            Self::Null => 6,
        }
    }

    /// Total order used by sorting and min/max. Nulls compare greater than
    /// every value; floats use IEEE total ordering (NaN last).
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::UInt(a), Self::UInt(b)) => a.cmp(b),
            (Self::Int(a), Self::UInt(b)) => i128::from(*a).cmp(&i128::from(*b)),
            (Self::UInt(a), Self::Int(b)) => i128::from(*a).cmp(&i128::from(*b)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Float(_), Self::Int(_) | Self::UInt(_))
            | (Self::Int(_) | Self::UInt(_), Self::Float(_)) => {
                let lhs = self.to_f64().unwrap_or(f64::NAN);
                let rhs = other.to_f64().unwrap_or(f64::NAN);
                lhs.total_cmp(&rhs)
            }
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Datetime(a, ua), Self::Datetime(b, ub)) => {
                if ua == ub {
                    a.cmp(b)
                } else {
                    (i128::from(*a) * i128::from(ua.nanos_per_unit()))
                        .cmp(&(i128::from(*b) * i128::from(ub.nanos_per_unit())))
                }
            }
            (Self::List(a), Self::List(b)) | (Self::Struct(a), Self::Struct(b)) => a
                .iter()
                .zip(b)
                .map(|(lhs, rhs)| lhs.total_cmp(rhs))
                .find(|order| order.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    /// Hashable identity of this value: nulls equal nulls, all NaNs are equal.
    #[must_use]
    pub fn key(&self) -> ScalarKey<'_> {
        ScalarKey::from_scalar(self)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Utf8(v) => f.write_str(v),
            Self::Date(days) => match date_to_naive(*days) {
                Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
                None => write!(f, "date({days})"),
            },
            Self::Datetime(value, unit) => match datetime_to_naive(*value, *unit) {
                Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
                None => write!(f, "datetime({value}{unit})"),
            },
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Struct(items) => {
                f.write_str("{")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Borrowed hash key for grouping, joining and deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKey<'a> {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    FloatBits(u64),
    Utf8(&'a str),
    Date(i32),
    Datetime(i64, TimeUnit),
    List(Vec<ScalarKey<'a>>),
    Struct(Vec<ScalarKey<'a>>),
}

impl<'a> ScalarKey<'a> {
    #[must_use]
    pub fn from_scalar(value: &'a Scalar) -> Self {
        match value {
            Scalar::Null => Self::Null,
            Scalar::Boolean(v) => Self::Boolean(*v),
            Scalar::Int(v) => Self::Int(*v),
            // Values that fit i64 hash like signed ints so mixed physical
            // variants of one logical value collide.
            Scalar::UInt(v) => match i64::try_from(*v) {
                Ok(signed) => Self::Int(signed),
                Err(_) => Self::UInt(*v),
            },
            Scalar::Float(v) => Self::FloatBits(if v.is_nan() {
                f64::NAN.to_bits()
            } else if *v == 0.0 {
                0.0_f64.to_bits()
            } else {
                v.to_bits()
            }),
            Scalar::Utf8(v) => Self::Utf8(v.as_str()),
            Scalar::Date(v) => Self::Date(*v),
            Scalar::Datetime(v, unit) => Self::Datetime(*v, *unit),
            Scalar::List(items) => Self::List(items.iter().map(Self::from_scalar).collect()),
            Scalar::Struct(items) => Self::Struct(items.iter().map(Self::from_scalar).collect()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("no common supertype for {left} and {right}")]
    IncompatibleTypes { left: DataType, right: DataType },
    #[error("cannot cast value {value} to {to}")]
    InvalidCast { value: String, to: DataType },
    #[error("casting value {value} to {to} would lose information")]
    LossyCast { value: String, to: DataType },
    #[error("value {value} is not numeric")]
    NonNumeric { value: String },
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

fn integer_supertype(left: &DataType, right: &DataType) -> Option<DataType> {
    let (left_bits, right_bits) = (left.integer_bits()?, right.integer_bits()?);
    let out = match (left.is_signed_integer(), right.is_signed_integer()) {
        (true, true) => DataType::signed_with_bits(left_bits.max(right_bits)),
        (false, false) => DataType::unsigned_with_bits(left_bits.max(right_bits)),
        (true, false) => mixed_sign_supertype(left_bits, right_bits),
        (false, true) => mixed_sign_supertype(right_bits, left_bits),
    };
    Some(out)
}

fn mixed_sign_supertype(signed_bits: u32, unsigned_bits: u32) -> DataType {
    if unsigned_bits >= 64 {
        return DataType::Float64;
    }
    DataType::signed_with_bits(signed_bits.max(unsigned_bits * 2))
}

fn struct_supertype(left: &[Field], right: &[Field]) -> Result<Option<DataType>, TypeError> {
    if left.len() != right.len() || left.iter().zip(right).any(|(l, r)| l.name != r.name) {
        return Ok(None);
    }
    let fields = left
        .iter()
        .zip(right)
        .map(|(l, r)| Ok(Field::new(l.name.clone(), supertype(&l.dtype, &r.dtype)?)))
        .collect::<Result<Vec<_>, TypeError>>()?;
    Ok(Some(DataType::Struct(fields)))
}

/// Minimal common type both inputs can be represented as.
pub fn supertype(left: &DataType, right: &DataType) -> Result<DataType, TypeError> {
    use DataType::{Boolean, Date, Datetime, Float32, Float64, List, Null, Struct, Utf8};

    if left == right {
        return Ok(left.clone());
    }

    let out = match (left, right) {
        (Null, other) | (other, Null) => Some(other.clone()),
        (Boolean, other) | (other, Boolean) if other.is_numeric() => Some(other.clone()),
        (a, b) if a.is_integer() && b.is_integer() => integer_supertype(a, b),
        (Float64, other) | (other, Float64) if other.is_numeric() => Some(Float64),
        (Float32, other) | (other, Float32) if other.is_integer() => Some(Float32),
        (Utf8, other) | (other, Utf8) if !other.is_nested() => Some(Utf8),
        (Date, Datetime(unit)) | (Datetime(unit), Date) => Some(Datetime(*unit)),
        (Datetime(a), Datetime(b)) => Some(Datetime(a.finer(*b))),
        (List(a), List(b)) => Some(List(Box::new(supertype(a, b)?))),
        (Struct(a), Struct(b)) => struct_supertype(a, b)?,
        _ => None,
    };

    out.ok_or_else(|| TypeError::IncompatibleTypes {
        left: left.clone(),
        right: right.clone(),
    })
}

pub fn infer_dtype(values: &[Scalar]) -> Result<DataType, TypeError> {
    let mut current = DataType::Null;
    for value in values {
        if value.is_null() {
            continue;
        }
        current = supertype(&current, &value.dtype())?;
    }
    Ok(current)
}

fn invalid_cast(value: &Scalar, to: &DataType) -> TypeError {
    TypeError::InvalidCast {
        value: value.to_string(),
        to: to.clone(),
    }
}

fn lossy_cast(value: &Scalar, to: &DataType) -> TypeError {
    TypeError::LossyCast {
        value: value.to_string(),
        to: to.clone(),
    }
}

fn cast_to_boolean(value: Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    match &value {
        Scalar::Boolean(_) => Ok(value),
        Scalar::Int(0) | Scalar::UInt(0) => Ok(Scalar::Boolean(false)),
        Scalar::Int(1) | Scalar::UInt(1) => Ok(Scalar::Boolean(true)),
        Scalar::Float(v) if *v == 0.0 => Ok(Scalar::Boolean(false)),
        Scalar::Float(v) if *v == 1.0 => Ok(Scalar::Boolean(true)),
        Scalar::Utf8(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Scalar::Boolean(true)),
        Scalar::Utf8(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Scalar::Boolean(false)),
        _ => Err(invalid_cast(&value, target)),
    }
}

fn cast_to_integer(value: Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    let Some((low, high)) = target.integer_bounds() else {
        return Err(invalid_cast(&value, target));
    };

    let wide = match &value {
        Scalar::Float(v) => {
            if !v.is_finite() || v.trunc() != *v || *v < low as f64 || *v > high as f64 {
                return Err(lossy_cast(&value, target));
            }
            *v as i128
        }
        Scalar::Utf8(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| invalid_cast(&value, target))?,
        other => other
            .as_i128()
            .ok_or_else(|| invalid_cast(&value, target))?,
    };

    if wide < low || wide > high {
        return Err(lossy_cast(&value, target));
    }
    if target.is_signed_integer() {
        i64::try_from(wide)
            .map(Scalar::Int)
            .map_err(|_| lossy_cast(&value, target))
    } else {
        u64::try_from(wide)
            .map(Scalar::UInt)
            .map_err(|_| lossy_cast(&value, target))
    }
}

fn cast_to_float(value: Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    let out = match &value {
        Scalar::Boolean(_) | Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => {
            value.to_f64()?
        }
        Scalar::Utf8(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid_cast(&value, target))?,
        _ => return Err(invalid_cast(&value, target)),
    };
    if matches!(target, DataType::Float32) {
        return Ok(Scalar::Float(f64::from(out as f32)));
    }
    Ok(Scalar::Float(out))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

fn parse_datetime(text: &str) -> Option<chrono::NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
    let trimmed = text.trim();
    FORMATS
        .iter()
        .find_map(|format| chrono::NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| parse_date(trimmed).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

fn cast_to_date(value: Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    let days = match &value {
        Scalar::Date(_) => return Ok(value),
        Scalar::Datetime(v, unit) => i32::try_from(v.div_euclid(unit.per_day()))
            .map_err(|_| lossy_cast(&value, target))?,
        Scalar::Int(_) | Scalar::UInt(_) => value
            .as_i128()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| lossy_cast(&value, target))?,
        Scalar::Utf8(s) => parse_date(s)
            .map(naive_to_date)
            .ok_or_else(|| invalid_cast(&value, target))?,
        _ => return Err(invalid_cast(&value, target)),
    };
    Ok(Scalar::Date(days))
}

fn cast_to_datetime(value: Scalar, unit: TimeUnit, target: &DataType) -> Result<Scalar, TypeError> {
    let physical = match &value {
        Scalar::Datetime(v, from) => from
            .convert(*v, unit)
            .ok_or_else(|| lossy_cast(&value, target))?,
        Scalar::Date(days) => i64::from(*days)
            .checked_mul(unit.per_day())
            .ok_or_else(|| lossy_cast(&value, target))?,
        Scalar::Int(v) => *v,
        Scalar::UInt(v) => i64::try_from(*v).map_err(|_| lossy_cast(&value, target))?,
        Scalar::Utf8(s) => parse_datetime(s)
            .and_then(|ts| naive_to_datetime(ts, unit))
            .ok_or_else(|| invalid_cast(&value, target))?,
        _ => return Err(invalid_cast(&value, target)),
    };
    Ok(Scalar::Datetime(physical, unit))
}

/// Cast a scalar to a target dtype, taking ownership to skip clones when the
/// value already has the right representation.
pub fn cast_scalar_owned(value: Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    if value.is_null() {
        return Ok(Scalar::Null);
    }

    match target {
        DataType::Null => Err(invalid_cast(&value, target)),
        DataType::Boolean => cast_to_boolean(value, target),
        DataType::Float32 | DataType::Float64 => cast_to_float(value, target),
        DataType::Utf8 | DataType::Categorical => match value {
            Scalar::Utf8(_) => Ok(value),
            Scalar::List(_) | Scalar::Struct(_) => Err(invalid_cast(&value, target)),
            other => Ok(Scalar::Utf8(other.to_string())),
        },
        DataType::Date => cast_to_date(value, target),
        DataType::Datetime(unit) => cast_to_datetime(value, *unit, target),
        DataType::List(inner) => match value {
            Scalar::List(items) => items
                .into_iter()
                .map(|item| cast_scalar_owned(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Scalar::List),
            other => Err(invalid_cast(&other, target)),
        },
        DataType::Struct(fields) => match value {
            Scalar::Struct(items) if items.len() == fields.len() => items
                .into_iter()
                .zip(fields)
                .map(|(item, field)| cast_scalar_owned(item, &field.dtype))
                .collect::<Result<Vec<_>, _>>()
                .map(Scalar::Struct),
            other => Err(invalid_cast(&other, target)),
        },
        integer => cast_to_integer(value, integer),
    }
}

/// Cast a scalar reference to a target dtype.
pub fn cast_scalar(value: &Scalar, target: &DataType) -> Result<Scalar, TypeError> {
    cast_scalar_owned(value.clone(), target)
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{
        DataType, Field, Scalar, TimeUnit, TypeError, cast_scalar, infer_dtype, supertype,
    };

    #[test]
    fn dtype_inference_coerces_numeric_values() {
        let values = vec![Scalar::Boolean(true), Scalar::Int(7), Scalar::Float(3.5)];
        assert_eq!(
            infer_dtype(&values).expect("dtype should infer"),
            DataType::Float64
        );
    }

    #[test]
    fn inference_skips_nulls() {
        let values = vec![Scalar::Null, Scalar::from("a"), Scalar::Null];
        assert_eq!(infer_dtype(&values).expect("infer"), DataType::Utf8);
        assert_eq!(infer_dtype(&[Scalar::Null]).expect("infer"), DataType::Null);
    }

    #[test]
    fn supertype_table_matches_documented_pairs() {
        let cases = [
            (DataType::Int64, DataType::Utf8, DataType::Utf8),
            (DataType::Float32, DataType::Int64, DataType::Float32),
            (DataType::Float32, DataType::Float64, DataType::Float64),
            (DataType::Int8, DataType::Int32, DataType::Int32),
            (DataType::UInt8, DataType::Int8, DataType::Int16),
            (DataType::UInt32, DataType::Int32, DataType::Int64),
            (DataType::UInt64, DataType::Int64, DataType::Float64),
            (DataType::Boolean, DataType::UInt16, DataType::UInt16),
            (DataType::Null, DataType::Date, DataType::Date),
            (
                DataType::Date,
                DataType::Datetime(TimeUnit::Milliseconds),
                DataType::Datetime(TimeUnit::Milliseconds),
            ),
            (
                DataType::Datetime(TimeUnit::Milliseconds),
                DataType::Datetime(TimeUnit::Nanoseconds),
                DataType::Datetime(TimeUnit::Nanoseconds),
            ),
            (DataType::Categorical, DataType::Utf8, DataType::Utf8),
        ];
        for (left, right, expected) in cases {
            assert_eq!(supertype(&left, &right).expect("supertype"), expected);
            assert_eq!(
                supertype(&right, &left).expect("supertype is symmetric"),
                expected
            );
        }
    }

    #[test]
    fn supertype_recurses_into_lists_and_structs() {
        let left = DataType::List(Box::new(DataType::Int32));
        let right = DataType::List(Box::new(DataType::Float64));
        assert_eq!(
            supertype(&left, &right).expect("list"),
            DataType::List(Box::new(DataType::Float64))
        );

        let a = DataType::Struct(vec![Field::new("x", DataType::Int8)]);
        let b = DataType::Struct(vec![Field::new("x", DataType::Int64)]);
        assert_eq!(
            supertype(&a, &b).expect("struct"),
            DataType::Struct(vec![Field::new("x", DataType::Int64)])
        );
    }

    #[test]
    fn supertype_rejects_unrelated_types() {
        let err = supertype(&DataType::List(Box::new(DataType::Int64)), &DataType::Utf8)
            .expect_err("must fail");
        assert_eq!(err.to_string(), "no common supertype for list[i64] and str");
        assert!(supertype(&DataType::Date, &DataType::Int64).is_err());
        assert!(supertype(&DataType::Categorical, &DataType::Float64).is_err());
    }

    #[test]
    fn integer_narrowing_checks_range() {
        assert_eq!(
            cast_scalar(&Scalar::Int(127), &DataType::Int8).expect("fits"),
            Scalar::Int(127)
        );
        assert!(matches!(
            cast_scalar(&Scalar::Int(128), &DataType::Int8),
            Err(TypeError::LossyCast { .. })
        ));
        assert!(matches!(
            cast_scalar(&Scalar::Int(-1), &DataType::UInt32),
            Err(TypeError::LossyCast { .. })
        ));
        assert_eq!(
            cast_scalar(&Scalar::Int(7), &DataType::UInt8).expect("unsigned"),
            Scalar::UInt(7)
        );
    }

    #[test]
    fn float_to_int_rejects_fractions() {
        assert!(matches!(
            cast_scalar(&Scalar::Float(1.5), &DataType::Int64),
            Err(TypeError::LossyCast { .. })
        ));
        assert_eq!(
            cast_scalar(&Scalar::Float(4.0), &DataType::Int64).expect("integral"),
            Scalar::Int(4)
        );
    }

    #[test]
    fn float32_cast_rounds_through_single_precision() {
        let out = cast_scalar(&Scalar::Float(0.1), &DataType::Float32).expect("cast");
        assert_eq!(out, Scalar::Float(f64::from(0.1_f32)));
    }

    #[test]
    fn values_cast_to_utf8_use_display_form() {
        assert_eq!(
            cast_scalar(&Scalar::Int(3), &DataType::Utf8).expect("cast"),
            Scalar::from("3")
        );
        assert_eq!(
            cast_scalar(&Scalar::Float(2.0), &DataType::Utf8).expect("cast"),
            Scalar::from("2.0")
        );
        assert_eq!(
            cast_scalar(&Scalar::Date(0), &DataType::Utf8).expect("cast"),
            Scalar::from("1970-01-01")
        );
    }

    #[test]
    fn temporal_casts_convert_units() {
        let date = cast_scalar(&Scalar::from("2024-02-29"), &DataType::Date).expect("parse");
        assert_eq!(date, Scalar::Date(19_782));

        let ts = cast_scalar(&date, &DataType::Datetime(TimeUnit::Milliseconds)).expect("widen");
        assert_eq!(
            ts,
            Scalar::Datetime(19_782 * 86_400_000, TimeUnit::Milliseconds)
        );

        let back = cast_scalar(&ts, &DataType::Date).expect("narrow");
        assert_eq!(back, date);

        let parsed = cast_scalar(
            &Scalar::from("1970-01-01 00:00:01.5"),
            &DataType::Datetime(TimeUnit::Microseconds),
        )
        .expect("parse datetime");
        assert_eq!(parsed, Scalar::Datetime(1_500_000, TimeUnit::Microseconds));
    }

    #[test]
    fn null_casts_to_null_for_every_target() {
        for target in [
            DataType::Int8,
            DataType::Utf8,
            DataType::Date,
            DataType::List(Box::new(DataType::Boolean)),
        ] {
            assert_eq!(cast_scalar(&Scalar::Null, &target).expect("null"), Scalar::Null);
        }
    }

    #[test]
    fn list_cast_is_elementwise() {
        let value = Scalar::List(vec![Scalar::Int(1), Scalar::Null]);
        let out = cast_scalar(&value, &DataType::List(Box::new(DataType::Float64)))
            .expect("cast list");
        assert_eq!(out, Scalar::List(vec![Scalar::Float(1.0), Scalar::Null]));
    }

    #[test]
    fn total_cmp_orders_nulls_last_and_mixes_numeric_kinds() {
        assert_eq!(Scalar::Null.total_cmp(&Scalar::Int(1)), Ordering::Greater);
        assert_eq!(Scalar::Int(-1).total_cmp(&Scalar::UInt(0)), Ordering::Less);
        assert_eq!(Scalar::Float(2.5).total_cmp(&Scalar::Int(2)), Ordering::Greater);
        assert_eq!(
            Scalar::from("b").total_cmp(&Scalar::from("a")),
            Ordering::Greater
        );
        assert_eq!(
            Scalar::Datetime(1, TimeUnit::Milliseconds)
                .total_cmp(&Scalar::Datetime(1_000, TimeUnit::Microseconds)),
            Ordering::Equal
        );
    }

    #[test]
    fn keys_treat_nan_and_signed_zero_as_equal() {
        assert_eq!(
            Scalar::Float(f64::NAN).key(),
            Scalar::Float(-f64::NAN).key()
        );
        assert_eq!(Scalar::Float(0.0).key(), Scalar::Float(-0.0).key());
        assert_eq!(Scalar::Int(5).key(), Scalar::UInt(5).key());
        assert_ne!(Scalar::Null.key(), Scalar::Int(0).key());
    }

    #[test]
    fn dtype_serde_round_trip() {
        let dtype = DataType::Struct(vec![
            Field::new("a", DataType::List(Box::new(DataType::Datetime(TimeUnit::Nanoseconds)))),
            Field::new("b", DataType::Categorical),
        ]);
        let json = serde_json::to_string(&dtype).expect("serialize");
        let back: DataType = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, dtype);
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        assert_eq!(Scalar::from(None::<i64>), Scalar::Null);
        assert_eq!(Scalar::from(Some(3_i64)), Scalar::Int(3));
    }
}
