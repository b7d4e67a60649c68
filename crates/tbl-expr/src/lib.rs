#![forbid(unsafe_code)]

//! A small expression tree evaluated eagerly against a [`DataFrame`].
//!
//! Expressions plug into [`Evaluator`], so they work as row predicates for
//! [`DataFrame::filter_with`] and as custom group aggregations.

use std::ops;

use log::trace;
use serde::{Deserialize, Serialize};
use tbl_frame::{
    ArithmeticOp, ComparisonOp, DataFrame, DataType, Evaluator, FrameError, Scalar, Series,
};
use tbl_types::{TypeError, folds};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("operands of length {left} and {right} cannot be broadcast")]
    LengthMismatch { left: usize, right: usize },
    #[error("filter predicate must be boolean, got {0}")]
    NonBooleanMask(DataType),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ExprError> for FrameError {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::Frame(inner) => inner,
            ExprError::Type(inner) => Self::TypeCoercion(inner),
            ExprError::LengthMismatch { left, right } => Self::LengthMismatch {
                expected: left,
                actual: right,
            },
            other @ ExprError::NonBooleanMask(_) => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// Whole-column reductions. Each produces a single-row series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Std { ddof: u8 },
    Var { ddof: u8 },
    Count,
    First,
    Last,
    NUnique,
}

fn as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Reduction {
    fn apply(self, input: &Series) -> Result<Series, ExprError> {
        let same = input.dtype().clone();
        let (value, dtype) = match self {
            Self::Sum => (
                input.sum(),
                folds::sum_dtype(input.dtype()).unwrap_or(DataType::Null),
            ),
            Self::Mean => (input.mean(), DataType::Float64),
            Self::Median => (input.median(), DataType::Float64),
            Self::Std { ddof } => (input.std(ddof), DataType::Float64),
            Self::Var { ddof } => (input.var(ddof), DataType::Float64),
            Self::Min => (input.min(), same),
            Self::Max => (input.max(), same),
            Self::First => (folds::first(&input.values()), same),
            Self::Last => (folds::last(&input.values()), same),
            Self::Count => (
                Scalar::Int(as_i64(folds::count(&input.values()))),
                DataType::Int64,
            ),
            Self::NUnique => (Scalar::Int(as_i64(input.n_unique())), DataType::Int64),
        };
        Ok(Series::with_dtype(input.name(), dtype, vec![value])?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Column {
        name: String,
    },
    /// Broadcast to the frame height.
    Literal {
        value: Scalar,
    },
    Arithmetic {
        left: Box<Expr>,
        right: Box<Expr>,
        op: ArithmeticOp,
    },
    Compare {
        left: Box<Expr>,
        right: Box<Expr>,
        op: ComparisonOp,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        expr: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
    },
    IsNotNull {
        expr: Box<Expr>,
    },
    Reduce {
        expr: Box<Expr>,
        func: Reduction,
    },
    Alias {
        expr: Box<Expr>,
        name: String,
    },
}

#[must_use]
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column { name: name.into() }
}

#[must_use]
pub fn lit(value: impl Into<Scalar>) -> Expr {
    Expr::Literal {
        value: value.into(),
    }
}

/// Repeat a single-row operand so both sides have the same length.
fn broadcast(left: Series, right: Series) -> Result<(Series, Series), ExprError> {
    match (left.len(), right.len()) {
        (l, r) if l == r => Ok((left, right)),
        (1, r) => Ok((left.take(&vec![0; r])?, right)),
        (l, 1) => {
            let right = right.take(&vec![0; l])?;
            Ok((left, right))
        }
        (l, r) => Err(ExprError::LengthMismatch { left: l, right: r }),
    }
}

fn fit_height(series: Series, height: usize) -> Result<Series, ExprError> {
    if series.len() == 1 && height != 1 {
        return Ok(series.take(&vec![0; height])?);
    }
    if series.len() != height {
        return Err(ExprError::LengthMismatch {
            left: height,
            right: series.len(),
        });
    }
    Ok(series)
}

impl Expr {
    fn binary(self, other: Self, op: ArithmeticOp) -> Self {
        Self::Arithmetic {
            left: Box::new(self),
            right: Box::new(other),
            op,
        }
    }

    fn compare(self, other: Self, op: ComparisonOp) -> Self {
        Self::Compare {
            left: Box::new(self),
            right: Box::new(other),
            op,
        }
    }

    fn reduce(self, func: Reduction) -> Self {
        Self::Reduce {
            expr: Box::new(self),
            func,
        }
    }

    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        self.compare(other, ComparisonOp::Gt)
    }

    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        self.compare(other, ComparisonOp::Lt)
    }

    #[must_use]
    pub fn gt_eq(self, other: Self) -> Self {
        self.compare(other, ComparisonOp::Ge)
    }

    #[must_use]
    pub fn lt_eq(self, other: Self) -> Self {
        self.compare(other, ComparisonOp::Le)
    }

    #[must_use]
    pub fn equal(self, other: Self) -> Self {
        self.compare(other, ComparisonOp::Eq)
    }

    #[must_use]
    pub fn not_equal(self, other: Self) -> Self {
        self.compare(other, ComparisonOp::Ne)
    }

    /// Three-valued AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Three-valued OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
        }
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNotNull {
            expr: Box::new(self),
        }
    }

    #[must_use]
    pub fn sum(self) -> Self {
        self.reduce(Reduction::Sum)
    }

    #[must_use]
    pub fn mean(self) -> Self {
        self.reduce(Reduction::Mean)
    }

    #[must_use]
    pub fn min(self) -> Self {
        self.reduce(Reduction::Min)
    }

    #[must_use]
    pub fn max(self) -> Self {
        self.reduce(Reduction::Max)
    }

    #[must_use]
    pub fn median(self) -> Self {
        self.reduce(Reduction::Median)
    }

    #[must_use]
    pub fn std(self, ddof: u8) -> Self {
        self.reduce(Reduction::Std { ddof })
    }

    #[must_use]
    pub fn var(self, ddof: u8) -> Self {
        self.reduce(Reduction::Var { ddof })
    }

    #[must_use]
    pub fn count(self) -> Self {
        self.reduce(Reduction::Count)
    }

    #[must_use]
    pub fn first(self) -> Self {
        self.reduce(Reduction::First)
    }

    #[must_use]
    pub fn last(self) -> Self {
        self.reduce(Reduction::Last)
    }

    #[must_use]
    pub fn n_unique(self) -> Self {
        self.reduce(Reduction::NUnique)
    }

    #[must_use]
    pub fn alias(self, name: impl Into<String>) -> Self {
        Self::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    /// Output column name: the alias, else the leftmost column reference.
    #[must_use]
    pub fn output_name(&self) -> &str {
        match self {
            Self::Column { name } | Self::Alias { name, .. } => name,
            Self::Literal { .. } => "literal",
            Self::Arithmetic { left, .. }
            | Self::Compare { left, .. }
            | Self::And { left, .. }
            | Self::Or { left, .. } => left.output_name(),
            Self::Not { expr }
            | Self::IsNull { expr }
            | Self::IsNotNull { expr }
            | Self::Reduce { expr, .. } => expr.output_name(),
        }
    }

    /// Evaluate against `df`. Reductions yield one row; everything else
    /// yields `df.height()` rows unless it only combines reductions.
    pub fn eval(&self, df: &DataFrame) -> Result<Series, ExprError> {
        match self {
            Self::Column { name } => Ok(df.column(name)?.clone()),
            Self::Literal { value } => Ok(Series::with_dtype(
                "literal",
                value.dtype(),
                vec![value.clone(); df.height()],
            )?),
            Self::Arithmetic { left, right, op } => {
                let (lhs, rhs) = broadcast(left.eval(df)?, right.eval(df)?)?;
                let out = match op {
                    ArithmeticOp::Add => lhs.add(&rhs),
                    ArithmeticOp::Sub => lhs.sub(&rhs),
                    ArithmeticOp::Mul => lhs.mul(&rhs),
                    ArithmeticOp::Div => lhs.div(&rhs),
                    ArithmeticOp::Rem => lhs.rem(&rhs),
                };
                Ok(out?)
            }
            Self::Compare { left, right, op } => {
                let (lhs, rhs) = broadcast(left.eval(df)?, right.eval(df)?)?;
                Ok(lhs.compare(&rhs, *op)?)
            }
            Self::And { left, right } => {
                let (lhs, rhs) = broadcast(left.eval(df)?, right.eval(df)?)?;
                Ok(lhs.and(&rhs)?)
            }
            Self::Or { left, right } => {
                let (lhs, rhs) = broadcast(left.eval(df)?, right.eval(df)?)?;
                Ok(lhs.or(&rhs)?)
            }
            Self::Not { expr } => Ok(expr.eval(df)?.not()?),
            Self::IsNull { expr } => Ok(expr.eval(df)?.is_null()),
            Self::IsNotNull { expr } => Ok(expr.eval(df)?.is_not_null()),
            Self::Reduce { expr, func } => func.apply(&expr.eval(df)?),
            Self::Alias { expr, name } => Ok(expr.eval(df)?.with_name(name.as_str())),
        }
    }
}

impl Evaluator for Expr {
    fn evaluate(&self, df: &DataFrame) -> Result<Series, FrameError> {
        Ok(self.eval(df)?)
    }
}

macro_rules! arithmetic_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                self.binary(rhs, $op)
            }
        }
    };
}

arithmetic_op!(Add, add, ArithmeticOp::Add);
arithmetic_op!(Sub, sub, ArithmeticOp::Sub);
arithmetic_op!(Mul, mul, ArithmeticOp::Mul);
arithmetic_op!(Div, div, ArithmeticOp::Div);
arithmetic_op!(Rem, rem, ArithmeticOp::Rem);

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not {
            expr: Box::new(self),
        }
    }
}

/// Rows of `df` where `predicate` is true. Null counts as false.
pub fn filter(df: &DataFrame, predicate: &Expr) -> Result<DataFrame, ExprError> {
    let mask = predicate.eval(df)?;
    if mask.dtype() != &DataType::Boolean {
        return Err(ExprError::NonBooleanMask(mask.dtype().clone()));
    }
    let mask = fit_height(mask, df.height())?;
    let out = df.filter(&mask)?;
    trace!(
        "filter on {:?} kept {} of {} rows",
        predicate.output_name(),
        out.height(),
        df.height()
    );
    Ok(out)
}

/// A new frame of one column per expression. Single-row results are
/// broadcast unless every result is a single row.
pub fn select(df: &DataFrame, exprs: &[Expr]) -> Result<DataFrame, ExprError> {
    let columns = exprs
        .iter()
        .map(|expr| expr.eval(df))
        .collect::<Result<Vec<_>, _>>()?;
    let height = if columns.iter().all(|series| series.len() == 1) {
        1
    } else {
        df.height()
    };
    let columns = columns
        .into_iter()
        .map(|series| fit_height(series, height))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Add each result to `df`, replacing a column of the same name.
pub fn with_columns(df: &DataFrame, exprs: &[Expr]) -> Result<DataFrame, ExprError> {
    let mut out = df.clone();
    for expr in exprs {
        let series = fit_height(expr.eval(df)?, df.height())?;
        out.with_column(series)?;
    }
    Ok(out)
}
