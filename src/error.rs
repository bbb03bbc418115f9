//! Fatal error taxonomy. Per-field problems are verdicts, never errors.

use std::path::PathBuf;

use thiserror::Error;

/// The schema asset is unreadable or malformed. Raised before any dataset access.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unable to read schema '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to parse schema: {0}")]
    Parse(String),

    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),

    #[error("field '{field}': {message}")]
    InvalidIdentifier { field: String, message: String },

    #[error("field '{field}': unknown datatype token '{token}'")]
    UnknownDatatype { field: String, token: String },

    #[error("field '{field}': allowed value {literal} is not valid for datatype {datatype}")]
    InvalidAllowedValue {
        field: String,
        literal: String,
        datatype: String,
    },

    #[error("field '{field}': invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        source: regex::Error,
    },

    #[error("field '{field}': {message}")]
    InvalidEntry { field: String, message: String },
}

/// The dataset cannot be opened or is not a recognized container. Raised before evaluation.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unable to open dataset '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("dataset '{path}' is unreadable: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("dataset '{path}' is not a recognized container format: {message}")]
    UnrecognizedFormat { path: PathBuf, message: String },

    #[error("dataset '{0}' is netCDF; rebuild with the `netcdf` feature or convert it with `ncks --json`")]
    NetcdfUnsupported(PathBuf),
}

/// The report could not be produced or written. Raised after evaluation.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported report format for '{0}' (expected .md, .html, .pdf, .json or .csv)")]
    UnsupportedFormat(PathBuf),

    #[error("unable to write report '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to encode report: {0}")]
    Encode(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<csv::Error> for RenderError {
    fn from(err: csv::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Any fatal failure of a validation run.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("report error: {0}")]
    Render(#[from] RenderError),
}
