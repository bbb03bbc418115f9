//! Detail rows as CSV, one line per evaluated field.

use std::io::Write;

use crate::error::RenderError;

use super::{DocumentRenderer, Report};

const HEADER: [&str; 11] = [
    "section",
    "group",
    "field",
    "kind",
    "requirement",
    "available",
    "expected_datatype",
    "observed_datatype",
    "expected_values",
    "observed_value",
    "verdict",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl DocumentRenderer for CsvRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(HEADER)?;
        for row in &report.rows {
            writer.write_record([
                row.section.label(),
                row.group.as_str(),
                row.field.as_str(),
                row.kind.as_str(),
                row.requirement.as_str(),
                if row.available { "yes" } else { "no" },
                row.expected_datatype.as_str(),
                row.observed_datatype.as_deref().unwrap_or(""),
                row.expected_values.as_deref().unwrap_or(""),
                row.observed_value.as_deref().unwrap_or(""),
                row.verdict.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
