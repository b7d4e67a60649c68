#![forbid(unsafe_code)]

//! Series, Schema and DataFrame: the table model every engine in the
//! workspace is written against.

use std::fmt;

use serde::{Deserialize, Serialize};
use tbl_columnar::ColumnError;
use tbl_types::TypeError;
use thiserror::Error;

mod fold;
mod frame;
mod row;
mod schema;
mod series;
pub mod sort;
pub mod unique;

pub use frame::DataFrame;
pub use row::{Row, Rows};
pub use schema::Schema;
pub use series::Series;
pub use sort::SortOptions;
pub use unique::UniqueKeep;

pub use tbl_columnar::{ArithmeticOp, Column, ComparisonOp};
pub use tbl_types::{DataType, Duration, Field, Scalar, TimeUnit};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("column {0:?} not found")]
    ColumnNotFound(String),
    #[error("duplicate column name {0:?}")]
    DuplicateColumn(String),
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error(transparent)]
    TypeCoercion(#[from] TypeError),
    #[error("exploded columns have different list lengths in row {row}")]
    ExplodeLengthMismatch { row: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Column(ColumnError),
}

impl From<ColumnError> for FrameError {
    fn from(err: ColumnError) -> Self {
        match err {
            ColumnError::Type(inner) => Self::TypeCoercion(inner),
            ColumnError::LengthMismatch { left, right } => Self::LengthMismatch {
                expected: left,
                actual: right,
            },
            other => Self::Column(other),
        }
    }
}

/// How folds treat nulls: skip them, or let any null poison the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullStrategy {
    #[default]
    Ignore,
    Propagate,
}

/// An opaque computation producing a column from a frame.
///
/// Used by [`DataFrame::filter_with`] and by custom group aggregations.
pub trait Evaluator: fmt::Debug + Send + Sync {
    fn evaluate(&self, df: &DataFrame) -> Result<Series, FrameError>;
}
