use log::debug;
use tbl_frame::{DataFrame, Scalar, Series};
use tbl_groupby::{AggFunc, AggSpec, GroupBy, GroupByOptions};

use crate::{ReshapeError, as_strs, require_columns};

/// Long to wide. Not serializable: the aggregate may be a custom evaluator.
#[derive(Debug, Clone)]
pub struct PivotArgs {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    /// Value columns; every column outside `index` and `columns` when empty.
    pub values: Vec<String>,
    pub aggregate: AggFunc,
    pub separator: String,
    pub sort_columns: bool,
    pub maintain_order: bool,
}

impl Default for PivotArgs {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
            values: Vec::new(),
            aggregate: AggFunc::First,
            separator: "_".to_owned(),
            sort_columns: false,
            maintain_order: true,
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}

impl PivotArgs {
    #[must_use]
    pub fn new(index: &[&str], columns: &[&str], values: &[&str]) -> Self {
        Self {
            index: owned(index),
            columns: owned(columns),
            values: owned(values),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_aggregate(mut self, aggregate: AggFunc) -> Self {
        self.aggregate = aggregate;
        self
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    #[must_use]
    pub fn sort_columns(mut self, sort: bool) -> Self {
        self.sort_columns = sort;
        self
    }

    #[must_use]
    pub fn maintain_order(mut self, maintain: bool) -> Self {
        self.maintain_order = maintain;
        self
    }
}

pub fn pivot(df: &DataFrame, args: &PivotArgs) -> Result<DataFrame, ReshapeError> {
    if args.index.is_empty() || args.columns.is_empty() {
        return Err(ReshapeError::InvalidArgument(
            "pivot needs at least one index and one columns key".to_owned(),
        ));
    }
    require_columns(df, &args.index)?;
    require_columns(df, &args.columns)?;
    require_columns(df, &args.values)?;
    let is_key = |name: &str| args.index.iter().chain(&args.columns).any(|k| k == name);
    let values = if args.values.is_empty() {
        df.column_names()
            .into_iter()
            .filter(|name| !is_key(name))
            .map(str::to_owned)
            .collect()
    } else {
        args.values.clone()
    };

    let keys = args
        .index
        .iter()
        .chain(&args.columns)
        .map(String::as_str)
        .collect::<Vec<_>>();
    let options = GroupByOptions {
        maintain_order: args.maintain_order,
        ..GroupByOptions::default()
    };
    let specs = values
        .iter()
        .map(|value| AggSpec::new(value.as_str(), args.aggregate.clone()))
        .collect::<Vec<_>>();
    let long = GroupBy::new(df, &keys, options)?.agg(&specs)?;

    let index = as_strs(&args.index);
    let row_groups = long.partition_rows(Some(index.as_slice()))?;
    let mut row_of = vec![0; long.height()];
    for (out, rows) in row_groups.iter().enumerate() {
        for &row in rows {
            row_of[row] = out;
        }
    }

    let label_columns = args
        .columns
        .iter()
        .map(|name| long.column(name).map(Series::values))
        .collect::<Result<Vec<_>, _>>()?;
    let label_keys = as_strs(&args.columns);
    let mut labels = long
        .partition_rows(Some(label_keys.as_slice()))?
        .into_iter()
        .map(|rows| {
            let label = label_columns
                .iter()
                .map(|column| column[rows[0]].to_string())
                .collect::<Vec<_>>()
                .join(&args.separator);
            (label, rows)
        })
        .collect::<Vec<_>>();
    if args.sort_columns {
        labels.sort_by(|a, b| a.0.cmp(&b.0));
    }
    debug!(
        "pivot: {} rows x {} column groups x {} values",
        row_groups.len(),
        labels.len(),
        values.len()
    );

    let firsts = row_groups.iter().map(|rows| rows[0]).collect::<Vec<_>>();
    let mut columns = long.select(&index)?.take(&firsts)?.into_columns();
    for value in &values {
        let aggregated = long.column(value)?;
        let cells = aggregated.values();
        for (label, rows) in &labels {
            let name = if values.len() > 1 {
                format!("{value}{}{label}", args.separator)
            } else {
                label.clone()
            };
            let mut out = vec![Scalar::Null; row_groups.len()];
            for &row in rows {
                out[row_of[row]] = cells[row].clone();
            }
            columns.push(Series::with_dtype(name, aggregated.dtype().clone(), out)?);
        }
    }
    Ok(DataFrame::new(columns)?)
}
