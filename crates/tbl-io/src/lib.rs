#![forbid(unsafe_code)]

//! The only crate in the workspace that touches bytes: frames to and from
//! JSON and CSV.

use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use serde::{Deserialize, Serialize};
use tbl_columnar::ColumnError;
use tbl_frame::{DataFrame, DataType, FrameError, Scalar, Schema, Series};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl From<ColumnError> for IoError {
    fn from(err: ColumnError) -> Self {
        Self::Frame(err.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Schema plus values; every dtype survives a round trip.
    Json,
    /// Header row plus text fields; dtypes are inferred on read.
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Without headers, columns are named `column_0`, `column_1`, ...
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
        }
    }
}

pub fn serialize(df: &DataFrame, format: Format) -> Result<Vec<u8>, IoError> {
    match format {
        Format::Json => to_json(df),
        Format::Csv => write_csv(df, &CsvOptions::default()),
    }
}

pub fn deserialize(bytes: &[u8], format: Format) -> Result<DataFrame, IoError> {
    match format {
        Format::Json => from_json(bytes),
        Format::Csv => read_csv(bytes, &CsvOptions::default()),
    }
}

// ── JSON ────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct JsonFrame {
    schema: Schema,
    columns: Vec<Vec<Scalar>>,
}

/// JSON has no NaN or infinity; non-finite floats are written as nulls.
fn json_safe(value: &Scalar) -> Scalar {
    match value {
        Scalar::Float(v) if !v.is_finite() => Scalar::Null,
        Scalar::List(items) => Scalar::List(items.iter().map(json_safe).collect()),
        Scalar::Struct(items) => Scalar::Struct(items.iter().map(json_safe).collect()),
        other => other.clone(),
    }
}

pub fn to_json(df: &DataFrame) -> Result<Vec<u8>, IoError> {
    let document = JsonFrame {
        schema: df.schema(),
        columns: df
            .iter()
            .map(|series| series.iter().map(json_safe).collect())
            .collect(),
    };
    Ok(serde_json::to_vec(&document)?)
}

pub fn from_json(bytes: &[u8]) -> Result<DataFrame, IoError> {
    let document: JsonFrame = serde_json::from_slice(bytes)?;
    if document.schema.len() != document.columns.len() {
        return Err(IoError::Malformed(format!(
            "schema has {} fields but {} columns were given",
            document.schema.len(),
            document.columns.len()
        )));
    }
    let columns = document
        .schema
        .iter()
        .zip(document.columns)
        .map(|(field, values)| Series::with_dtype(field.name.as_str(), field.dtype.clone(), values))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DataFrame::new(columns)?)
}

// ── CSV ─────────────────────────────────────────────────────────────────

/// Narrowest type seen so far in a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Int,
    Float,
    Bool,
    Text,
}

impl Inferred {
    fn of(field: &str) -> Self {
        if field.parse::<i64>().is_ok() {
            Self::Int
        } else if field.parse::<f64>().is_ok() {
            Self::Float
        } else if field.parse::<bool>().is_ok() {
            Self::Bool
        } else {
            Self::Text
        }
    }

    fn widen(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            _ => Self::Text,
        }
    }

    fn dtype(self) -> DataType {
        match self {
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Bool => DataType::Boolean,
            Self::Text => DataType::Utf8,
        }
    }

    fn parse(self, field: &str) -> Scalar {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Scalar::Null;
        }
        match self {
            Self::Int => trimmed.parse().map_or(Scalar::Null, Scalar::Int),
            Self::Float => trimmed.parse().map_or(Scalar::Null, Scalar::Float),
            Self::Bool => trimmed.parse().map_or(Scalar::Null, Scalar::Boolean),
            Self::Text => Scalar::Utf8(field.to_owned()),
        }
    }
}

fn infer_column(fields: &[String]) -> Inferred {
    fields
        .iter()
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .map(Inferred::of)
        .reduce(Inferred::widen)
        .unwrap_or(Inferred::Text)
}

/// Parse CSV. Each column becomes `Int64`, `Float64`, `Boolean` or `Utf8`,
/// whichever is narrowest for all of its non-empty fields; empty fields are
/// null.
pub fn read_csv(input: &[u8], options: &CsvOptions) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_headers)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }
    let names = if options.has_headers {
        headers.iter().map(str::to_owned).collect::<Vec<_>>()
    } else {
        (0..headers.len()).map(|i| format!("column_{i}")).collect()
    };

    let row_hint = input.len() / (names.len() * 8).max(1);
    let mut raw: Vec<Vec<String>> = (0..names.len())
        .map(|_| Vec::with_capacity(row_hint))
        .collect();
    for record in reader.records() {
        let record = record?;
        for (idx, column) in raw.iter_mut().enumerate() {
            column.push(record.get(idx).unwrap_or_default().to_owned());
        }
    }

    let columns = names
        .into_iter()
        .zip(raw)
        .map(|(name, fields)| {
            let inferred = infer_column(&fields);
            let values = fields.iter().map(|field| inferred.parse(field)).collect();
            Series::with_dtype(name, inferred.dtype(), values)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let df = DataFrame::new(columns)?;
    debug!("read csv: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    read_csv(input.as_bytes(), &CsvOptions::default())
}

fn csv_field(value: &Scalar) -> String {
    match value {
        Scalar::Null => String::new(),
        other => other.to_string(),
    }
}

/// Write CSV; nulls become empty fields. A frame without columns writes
/// nothing.
pub fn write_csv(df: &DataFrame, options: &CsvOptions) -> Result<Vec<u8>, IoError> {
    if df.width() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());
    if options.has_headers {
        writer.write_record(df.column_names())?;
    }
    let columns = df.iter().map(Series::values).collect::<Vec<_>>();
    for row in 0..df.height() {
        writer.write_record(columns.iter().map(|values| csv_field(&values[row])))?;
    }
    Ok(writer.into_inner().map_err(|err| err.into_error())?)
}

pub fn write_csv_string(df: &DataFrame) -> Result<String, IoError> {
    Ok(String::from_utf8(write_csv(df, &CsvOptions::default())?)?)
}
