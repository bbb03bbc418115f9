//! Compliance report: section summaries, per-group breakdown and per-field detail rows.

mod assemble;
mod export_csv;
mod html;
mod markdown;
mod pdf;
mod render;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::evaluate::{SweepSelection, Verdict};

pub use assemble::assemble;
pub use export_csv::CsvRenderer;
pub use html::HtmlRenderer;
pub use markdown::MarkdownRenderer;
pub use pdf::PdfRenderer;
pub use render::{
    render_to_vec, stage_report, write_report, DocumentRenderer, JsonRenderer, ReportFormat,
    StagedReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Mandatory,
    Optional,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mandatory => "Mandatory",
            Self::Optional => "Optional",
        }
    }
}

/// Classification of a section, or of the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOutcome {
    Pass,
    FailMandatory,
    FailOptional,
}

impl SectionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::FailMandatory => "Fail Mandatory",
            Self::FailOptional => "Fail Optional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub section: Section,
    /// Rows that entered the report (not-applicable rules excluded).
    pub evaluated: usize,
    pub passed: usize,
    pub missing: usize,
    pub wrong_datatype: usize,
    pub wrong_value: usize,
    pub outcome: SectionOutcome,
}

impl SectionSummary {
    pub fn failed(&self) -> usize {
        self.missing + self.wrong_datatype + self.wrong_value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub mandatory: SectionSummary,
    pub optional: SectionSummary,
    pub overall: SectionOutcome,
}

/// Pass / fail counts for one dataset group (global attributes, a sweep, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub passed: usize,
    pub fail_mandatory: usize,
    pub fail_optional: usize,
}

/// One evaluated field as it appears in the detail tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub section: Section,
    pub group: String,
    pub field: String,
    pub kind: String,
    pub requirement: String,
    pub available: bool,
    pub expected_datatype: String,
    pub observed_datatype: Option<String>,
    pub expected_values: Option<String>,
    pub observed_value: Option<String>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub dataset: String,
    pub schema: String,
    pub sweeps: SweepSelection,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportMetadata {
    pub fn new(dataset: impl Into<String>, schema: impl Into<String>, sweeps: SweepSelection) -> Self {
        Self {
            dataset: dataset.into(),
            schema: schema.into(),
            sweeps,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub groups: Vec<GroupSummary>,
    /// Mandatory rows first, then the optional rows that were evaluated.
    pub rows: Vec<DetailRow>,
}

impl Report {
    pub fn mandatory_rows(&self) -> impl Iterator<Item = &DetailRow> {
        self.rows.iter().filter(|row| row.section == Section::Mandatory)
    }

    pub fn optional_rows(&self) -> impl Iterator<Item = &DetailRow> {
        self.rows.iter().filter(|row| row.section == Section::Optional)
    }
}
