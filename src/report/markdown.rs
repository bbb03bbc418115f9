//! Markdown rendering of the compliance report. Also the body of the HTML report.

use std::fmt::Write as _;
use std::io::Write;

use crate::error::RenderError;
use crate::evaluate::Verdict;

use super::{DetailRow, DocumentRenderer, Report, SectionSummary};

pub(super) const DETAIL_HEADER: [&str; 8] = [
    "Group",
    "Name",
    "Available",
    "Expected Dtype",
    "Actual Dtype",
    "Expected Value",
    "Actual Value",
    "Result",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer {
    /// Wrap result cells in `<span class="pass|fail">` for the HTML stylesheet.
    highlight_results: bool,
}

impl MarkdownRenderer {
    pub fn with_highlights() -> Self {
        Self {
            highlight_results: true,
        }
    }

    pub fn document(&self, report: &Report) -> String {
        let mut doc = String::new();
        let meta = &report.metadata;

        let _ = writeln!(doc, "# WMO FM 301 Validation Report\n");
        let _ = writeln!(doc, "- **Dataset:** {}", escape(&meta.dataset));
        let _ = writeln!(doc, "- **Schema:** {}", escape(&meta.schema));
        let _ = writeln!(doc, "- **Sweeps checked:** {}", meta.sweeps.as_str());
        let _ = writeln!(
            doc,
            "- **Generated:** {} by fm301check {}\n",
            meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            meta.tool_version
        );

        let _ = writeln!(doc, "## Section Summary\n");
        let _ = writeln!(
            doc,
            "| Section | Evaluated | Pass | Missing | Wrong Dtype | Wrong Value | Outcome |"
        );
        let _ = writeln!(doc, "|---|---:|---:|---:|---:|---:|---|");
        let summary = &report.summary;
        summary_row(&mut doc, "Mandatory", &summary.mandatory);
        summary_row(&mut doc, "Optional (used)", &summary.optional);
        let _ = writeln!(
            doc,
            "| **Overall** | {} | {} | {} | {} | {} | **{}** |\n",
            summary.mandatory.evaluated + summary.optional.evaluated,
            summary.mandatory.passed + summary.optional.passed,
            summary.mandatory.missing + summary.optional.missing,
            summary.mandatory.wrong_datatype + summary.optional.wrong_datatype,
            summary.mandatory.wrong_value + summary.optional.wrong_value,
            summary.overall.label()
        );

        let _ = writeln!(doc, "## Results by Group\n");
        if report.groups.is_empty() {
            let _ = writeln!(doc, "_No fields evaluated._\n");
        } else {
            let _ = writeln!(doc, "| Group | Pass | Fail Mandatory | Fail Optional |");
            let _ = writeln!(doc, "|---|---:|---:|---:|");
            for group in &report.groups {
                let _ = writeln!(
                    doc,
                    "| {} | {} | {} | {} |",
                    escape(&group.group),
                    group.passed,
                    group.fail_mandatory,
                    group.fail_optional
                );
            }
            let _ = writeln!(doc);
        }

        let _ = writeln!(doc, "## Mandatory Fields\n");
        self.detail_table(
            &mut doc,
            report.mandatory_rows(),
            "_No mandatory fields declared._",
        );

        let _ = writeln!(doc, "## Optional Fields (used)\n");
        self.detail_table(
            &mut doc,
            report.optional_rows(),
            "_No optional fields present in the dataset._",
        );

        let _ = writeln!(doc, "---\n");
        let _ = writeln!(
            doc,
            "Optional fields absent from the dataset are not listed. Generated by fm301check."
        );
        doc
    }

    fn detail_table<'a>(
        &self,
        doc: &mut String,
        rows: impl Iterator<Item = &'a DetailRow>,
        empty_note: &str,
    ) {
        let mut rows = rows.peekable();
        if rows.peek().is_none() {
            let _ = writeln!(doc, "{empty_note}\n");
            return;
        }

        let _ = writeln!(doc, "| {} |", DETAIL_HEADER.join(" | "));
        let _ = writeln!(doc, "|{}", "---|".repeat(DETAIL_HEADER.len()));
        for row in rows {
            let cells = [
                escape(&row.group),
                escape(&row.field),
                if row.available { "Yes" } else { "No" }.to_string(),
                escape(&row.expected_datatype),
                escape(row.observed_datatype.as_deref().unwrap_or("")),
                escape(row.expected_values.as_deref().unwrap_or("")),
                escape(row.observed_value.as_deref().unwrap_or("")),
                self.result_cell(row.verdict),
            ];
            let _ = writeln!(doc, "| {} |", cells.join(" | "));
        }
        let _ = writeln!(doc);
    }

    fn result_cell(&self, verdict: Verdict) -> String {
        if !self.highlight_results {
            return verdict.label().to_string();
        }
        let class = if verdict.is_failure() { "fail" } else { "pass" };
        format!("<span class=\"{class}\">{}</span>", verdict.label())
    }
}

fn summary_row(doc: &mut String, label: &str, section: &SectionSummary) {
    let _ = writeln!(
        doc,
        "| {label} | {} | {} | {} | {} | {} | {} |",
        section.evaluated,
        section.passed,
        section.missing,
        section.wrong_datatype,
        section.wrong_value,
        section.outcome.label()
    );
}

/// Escape Markdown punctuation and flatten newlines so values stay inside their cell.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '|' | '#' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' | '\r' => escaped.push(' '),
            '\0' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> Result<(), RenderError> {
        out.write_all(self.document(report).as_bytes())?;
        Ok(())
    }
}
