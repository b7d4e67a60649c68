#![forbid(unsafe_code)]

//! Shape-changing transformations: long to wide and back, transposition,
//! and flattening of list and struct columns.

use tbl_columnar::ColumnError;
use tbl_frame::{DataFrame, FrameError};
use tbl_groupby::GroupByError;
use tbl_types::TypeError;
use thiserror::Error;

mod explode;
mod melt;
mod pivot;
mod transpose;

pub use explode::{explode, unnest};
pub use melt::{MeltArgs, melt};
pub use pivot::{PivotArgs, pivot};
pub use transpose::{ColumnNames, TransposeArgs, transpose};

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    GroupBy(#[from] GroupByError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ColumnError> for ReshapeError {
    fn from(err: ColumnError) -> Self {
        Self::Frame(err.into())
    }
}

/// Fail with `ColumnNotFound` unless every name is a column of `df`.
pub(crate) fn require_columns(df: &DataFrame, names: &[String]) -> Result<(), ReshapeError> {
    for name in names {
        df.column(name)?;
    }
    Ok(())
}

pub(crate) fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}

/// Reshape methods on [`DataFrame`].
pub trait ReshapeExt {
    fn melt(&self, args: &MeltArgs) -> Result<DataFrame, ReshapeError>;

    fn pivot(&self, args: &PivotArgs) -> Result<DataFrame, ReshapeError>;

    fn transpose(&self, args: &TransposeArgs) -> Result<DataFrame, ReshapeError>;

    fn explode(&self, columns: &[&str]) -> Result<DataFrame, ReshapeError>;

    fn unnest(&self, columns: &[&str]) -> Result<DataFrame, ReshapeError>;
}

impl ReshapeExt for DataFrame {
    fn melt(&self, args: &MeltArgs) -> Result<DataFrame, ReshapeError> {
        melt(self, args)
    }

    fn pivot(&self, args: &PivotArgs) -> Result<DataFrame, ReshapeError> {
        pivot(self, args)
    }

    fn transpose(&self, args: &TransposeArgs) -> Result<DataFrame, ReshapeError> {
        transpose(self, args)
    }

    fn explode(&self, columns: &[&str]) -> Result<DataFrame, ReshapeError> {
        explode(self, columns)
    }

    fn unnest(&self, columns: &[&str]) -> Result<DataFrame, ReshapeError> {
        unnest(self, columns)
    }
}
