//! Run configuration resolved once from the command line and environment.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SchemaError;
use crate::evaluate::SweepSelection;
use crate::report::ReportFormat;
use crate::schema::{load_schema, Schema, SCHEMA_FILE_NAME};

/// Where the rule set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    File(PathBuf),
    /// The copy compiled into the binary.
    Embedded,
}

impl SchemaLocation {
    /// Explicit path (flag or `FM301_SCHEMA`), else `fm301_metadata.json` next to the
    /// executable, else the embedded copy.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        if let Some(path) = explicit {
            return Self::File(path);
        }
        match env::current_exe() {
            Ok(exe) => Self::beside(&exe),
            Err(err) => {
                debug!(error = %err, "unable to locate executable; using embedded schema");
                Self::Embedded
            }
        }
    }

    fn beside(exe: &Path) -> Self {
        match exe.parent().map(|dir| dir.join(SCHEMA_FILE_NAME)) {
            Some(candidate) if candidate.is_file() => Self::File(candidate),
            _ => Self::Embedded,
        }
    }

    pub fn load(&self) -> Result<Schema, SchemaError> {
        match self {
            Self::File(path) => load_schema(path),
            Self::Embedded => Schema::embedded(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Embedded => "embedded".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub dataset: PathBuf,
    pub output: PathBuf,
    pub schema: SchemaLocation,
    pub sweeps: SweepSelection,
    /// `None` picks the format from the output extension.
    pub format: Option<ReportFormat>,
    /// Extra JSON dump of the full results.
    pub results_json: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(dataset: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            output: output.into(),
            schema: SchemaLocation::Embedded,
            sweeps: SweepSelection::default(),
            format: None,
            results_json: None,
        }
    }
}
