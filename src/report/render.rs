//! Report rendering seam and output handling.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::RenderError;

use super::{CsvRenderer, HtmlRenderer, MarkdownRenderer, PdfRenderer, Report};

/// Produces one report artifact from an assembled report.
pub trait DocumentRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[value(name = "md")]
    Markdown,
    Html,
    Json,
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn renderer(&self) -> Box<dyn DocumentRenderer> {
        match self {
            Self::Markdown => Box::new(MarkdownRenderer::default()),
            Self::Html => Box::new(HtmlRenderer),
            Self::Json => Box::new(JsonRenderer),
            Self::Csv => Box::new(CsvRenderer),
            Self::Pdf => Box::new(PdfRenderer),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }
}

/// The whole report serialized as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> Result<(), RenderError> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

pub fn render_to_vec(report: &Report, renderer: &dyn DocumentRenderer) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    renderer.render(report, &mut buffer)?;
    Ok(buffer)
}

/// A rendered report sitting in a temporary file beside its destination.
/// Dropping it without [StagedReport::commit] removes the temporary file and leaves
/// the destination untouched.
pub struct StagedReport {
    path: PathBuf,
    format: ReportFormat,
    file: NamedTempFile,
}

impl StagedReport {
    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged file over the destination.
    pub fn commit(self) -> Result<ReportFormat, RenderError> {
        let Self { path, format, file } = self;
        file.persist(&path).map_err(|err| RenderError::Write {
            path: path.clone(),
            source: err.error,
        })?;
        debug!(path = %path.display(), format = format.as_str(), "report committed");
        Ok(format)
    }
}

/// Render into a temporary file in the destination directory. Nothing at `path` is
/// touched until the staged report is committed.
pub fn stage_report(
    report: &Report,
    path: &Path,
    format: Option<ReportFormat>,
) -> Result<StagedReport, RenderError> {
    let format = format
        .or_else(|| ReportFormat::from_path(path))
        .ok_or_else(|| RenderError::UnsupportedFormat(path.to_path_buf()))?;

    let bytes = render_to_vec(report, format.renderer().as_ref())?;
    debug!(path = %path.display(), format = format.as_str(), bytes = bytes.len(), "staging report");

    let write_error = |source: std::io::Error| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory).map_err(write_error)?;
    file.write_all(&bytes).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;

    Ok(StagedReport {
        path: path.to_path_buf(),
        format,
        file,
    })
}

/// Render and write one report. A failed write leaves any previous file at `path` as it was.
pub fn write_report(
    report: &Report,
    path: &Path,
    format: Option<ReportFormat>,
) -> Result<ReportFormat, RenderError> {
    stage_report(report, path, format)?.commit()
}
