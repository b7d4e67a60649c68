#![forbid(unsafe_code)]

//! Fixtures and invariant checks shared by the cross-crate tests.

use std::cmp::Ordering;
use std::collections::HashSet;

use tbl_frame::{DataFrame, FrameError, Scalar};
use thiserror::Error;

/// A broken frame or operation invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("column {name:?} has {len} rows but the frame has {height}")]
    RaggedColumn {
        name: String,
        len: usize,
        height: usize,
    },
    #[error("column name {0:?} appears twice")]
    DuplicateName(String),
    #[error("rows {row} and {next} of {column:?} are out of order")]
    Unsorted {
        column: String,
        row: usize,
        next: usize,
    },
    #[error("column {0:?} is missing")]
    MissingColumn(String),
}

/// Every column is `height` long and every name is unique.
pub fn check_shape(df: &DataFrame) -> Result<(), Violation> {
    let mut seen = HashSet::new();
    for series in df {
        if series.len() != df.height() {
            return Err(Violation::RaggedColumn {
                name: series.name().to_owned(),
                len: series.len(),
                height: df.height(),
            });
        }
        if !seen.insert(series.name()) {
            return Err(Violation::DuplicateName(series.name().to_owned()));
        }
    }
    Ok(())
}

/// `column` is monotonic in the given direction, with nulls last.
pub fn check_sorted(df: &DataFrame, column: &str, descending: bool) -> Result<(), Violation> {
    let series = df
        .column(column)
        .map_err(|_| Violation::MissingColumn(column.to_owned()))?;
    let values = series.values();
    for (row, pair) in values.windows(2).enumerate() {
        let order = match (pair[0].is_null(), pair[1].is_null()) {
            (true, false) => Ordering::Greater,
            (false, true) | (true, true) => Ordering::Less,
            (false, false) if descending => pair[1].total_cmp(&pair[0]),
            (false, false) => pair[0].total_cmp(&pair[1]),
        };
        if order == Ordering::Greater {
            return Err(Violation::Unsorted {
                column: column.to_owned(),
                row,
                next: row + 1,
            });
        }
    }
    Ok(())
}

/// `{foo: [1, 2, 3], bar: [6, 7, 8], ham: ["a", "b", "c"]}`.
pub fn scenario_frame() -> Result<DataFrame, FrameError> {
    DataFrame::from_columns([
        ("foo", [1, 2, 3].map(Scalar::Int).to_vec()),
        ("bar", [6, 7, 8].map(Scalar::Int).to_vec()),
        ("ham", ["a", "b", "c"].map(Scalar::from).to_vec()),
    ])
}

/// Trades keyed by millisecond-ish integer time and ticker, sorted by time.
pub fn trades() -> Result<DataFrame, FrameError> {
    DataFrame::from_columns([
        ("time", [20, 20, 30, 41, 48, 49, 72, 75].map(Scalar::Int).to_vec()),
        (
            "ticker",
            ["MSFT", "MSFT", "GOOG", "MSFT", "GOOG", "AAPL", "GOOG", "MSFT"]
                .map(Scalar::from)
                .to_vec(),
        ),
        (
            "price",
            [51.95, 51.95, 720.77, 51.92, 720.92, 98.0, 721.0, 52.01]
                .map(Scalar::Float)
                .to_vec(),
        ),
        ("quantity", [75, 155, 100, 100, 100, 100, 50, 10].map(Scalar::Int).to_vec()),
    ])
}

/// Quotes for [`trades`], sorted by time.
pub fn quotes() -> Result<DataFrame, FrameError> {
    DataFrame::from_columns([
        ("time", [20, 20, 30, 30, 41, 49, 72, 75].map(Scalar::Int).to_vec()),
        (
            "ticker",
            ["GOOG", "MSFT", "MSFT", "GOOG", "GOOG", "AAPL", "GOOG", "MSFT"]
                .map(Scalar::from)
                .to_vec(),
        ),
        (
            "bid",
            [720.50, 51.95, 51.97, 720.50, 720.61, 97.99, 720.50, 52.01]
                .map(Scalar::Float)
                .to_vec(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use tbl_frame::{DataFrame, Scalar, Series};

    use super::{Violation, check_shape, check_sorted, scenario_frame};

    #[test]
    fn fixtures_are_well_formed() {
        let df = scenario_frame().expect("scenario");
        check_shape(&df).expect("shape");
        check_sorted(&df, "foo", false).expect("ascending");
        assert_eq!(
            check_sorted(&df, "bar", true),
            Err(Violation::Unsorted {
                column: "bar".to_owned(),
                row: 0,
                next: 1
            })
        );
        assert!(matches!(
            check_sorted(&df, "nope", false),
            Err(Violation::MissingColumn(_))
        ));
    }

    #[test]
    fn nulls_must_trail() {
        let df = DataFrame::new(vec![
            Series::from_values("x", vec![Scalar::Int(2), Scalar::Null, Scalar::Null]).expect("x"),
            Series::from_values("y", vec![Scalar::Null, Scalar::Int(1), Scalar::Int(1)]).expect("y"),
        ])
        .expect("frame");
        check_sorted(&df, "x", true).expect("nulls last");
        assert!(check_sorted(&df, "y", false).is_err());
    }
}
