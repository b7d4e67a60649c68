use serde::{Deserialize, Serialize};
use tbl_frame::{DataFrame, DataType, Scalar, Series};
use tbl_types::supertype;

use crate::{ReshapeError, require_columns};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeltArgs {
    pub id_vars: Vec<String>,
    /// Columns to stack; every non-id column when empty.
    pub value_vars: Vec<String>,
    pub variable_name: String,
    pub value_name: String,
}

impl Default for MeltArgs {
    fn default() -> Self {
        Self {
            id_vars: Vec::new(),
            value_vars: Vec::new(),
            variable_name: "variable".to_owned(),
            value_name: "value".to_owned(),
        }
    }
}

impl MeltArgs {
    #[must_use]
    pub fn new(id_vars: &[&str], value_vars: &[&str]) -> Self {
        Self {
            id_vars: id_vars.iter().map(|s| (*s).to_owned()).collect(),
            value_vars: value_vars.iter().map(|s| (*s).to_owned()).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_names(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.variable_name = variable.into();
        self.value_name = value.into();
        self
    }
}

/// Wide to long: one output row per input row and value column, grouped by
/// input row.
pub fn melt(df: &DataFrame, args: &MeltArgs) -> Result<DataFrame, ReshapeError> {
    require_columns(df, &args.id_vars)?;
    require_columns(df, &args.value_vars)?;
    let value_vars = if args.value_vars.is_empty() {
        df.column_names()
            .into_iter()
            .filter(|name| !args.id_vars.iter().any(|id| id == name))
            .map(str::to_owned)
            .collect()
    } else {
        args.value_vars.clone()
    };

    let mut common = DataType::Null;
    for name in &value_vars {
        common = supertype(&common, df.column(name)?.dtype())?;
    }
    let stacked = value_vars
        .iter()
        .map(|name| Ok(df.column(name)?.cast(&common)?.to_vec()))
        .collect::<Result<Vec<_>, ReshapeError>>()?;

    let width = value_vars.len();
    let rows = df.height() * width;
    let mut repeat = Vec::with_capacity(rows);
    let mut variables = Vec::with_capacity(rows);
    let mut values = Vec::with_capacity(rows);
    for row in 0..df.height() {
        for (name, column) in value_vars.iter().zip(&stacked) {
            repeat.push(row);
            variables.push(Scalar::Utf8(name.clone()));
            values.push(column[row].clone());
        }
    }

    let mut columns = Vec::with_capacity(args.id_vars.len() + 2);
    for id in &args.id_vars {
        columns.push(df.column(id)?.take(&repeat)?);
    }
    columns.push(Series::with_dtype(
        args.variable_name.as_str(),
        DataType::Utf8,
        variables,
    )?);
    columns.push(Series::with_dtype(args.value_name.as_str(), common, values)?);
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use tbl_frame::{DataFrame, DataType, FrameError, Scalar};

    use super::{MeltArgs, melt};
    use crate::ReshapeError;

    fn wide() -> DataFrame {
        DataFrame::from_columns([
            ("id", ["a", "b"].map(Scalar::from).to_vec()),
            ("x", vec![Scalar::Int(1), Scalar::Int(2)]),
            ("y", vec![Scalar::Float(0.5), Scalar::Null]),
        ])
        .expect("frame")
    }

    #[test]
    fn stacks_by_row_then_variable() {
        let out = melt(&wide(), &MeltArgs::new(&["id"], &["x", "y"])).expect("melt");
        assert_eq!(out.shape(), (4, 3));
        assert_eq!(
            out.column("id").expect("id").to_vec(),
            ["a", "a", "b", "b"].map(Scalar::from).to_vec()
        );
        assert_eq!(
            out.column("variable").expect("variable").to_vec(),
            ["x", "y", "x", "y"].map(Scalar::from).to_vec()
        );
        let value = out.column("value").expect("value");
        assert_eq!(value.dtype(), &DataType::Float64);
        assert_eq!(
            value.to_vec(),
            vec![
                Scalar::Float(1.0),
                Scalar::Float(0.5),
                Scalar::Float(2.0),
                Scalar::Null
            ]
        );
    }

    #[test]
    fn empty_value_vars_take_every_other_column() {
        let args = MeltArgs::new(&["id"], &[]).with_names("key", "val");
        let out = melt(&wide(), &args).expect("melt");
        assert_eq!(out.column_names(), vec!["id", "key", "val"]);
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn incompatible_value_columns_fail() {
        let df = DataFrame::from_columns([
            ("d", vec![Scalar::Date(1)]),
            ("x", vec![Scalar::Int(1)]),
        ])
        .expect("frame");
        assert!(matches!(
            melt(&df, &MeltArgs::new(&[], &["d", "x"])),
            Err(ReshapeError::Type(_))
        ));
        assert!(matches!(
            melt(&df, &MeltArgs::new(&["nope"], &[])),
            Err(ReshapeError::Frame(FrameError::ColumnNotFound(_)))
        ));
    }

    #[test]
    fn args_deserialize_with_default_names() {
        let args: MeltArgs = serde_json::from_str(r#"{"id_vars":["id"]}"#).expect("deserialize");
        assert_eq!(args, MeltArgs::new(&["id"], &[]));
        assert_eq!(args.variable_name, "variable");

        let long = melt(&wide(), &args).expect("melt");
        assert_eq!(long.column_names(), vec!["id", "variable", "value"]);
    }
}
