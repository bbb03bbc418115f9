//! PDF rendering on A4 landscape pages. The overview fills page one; each detail
//! table starts on a fresh page and repeats its header after a page break.

use std::io::Write;

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::error::RenderError;

use super::markdown::DETAIL_HEADER;
use super::{DetailRow, DocumentRenderer, Report, SectionSummary};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const ROW_HEIGHT: f32 = 5.5;
const TABLE_FONT: f32 = 7.5;
const BODY_FONT: f32 = 9.0;
const PT_TO_MM: f32 = 0.3528;
/// Approximate Helvetica advance, in ems.
const CHAR_WIDTH_EM: f32 = 0.55;

const SUMMARY_HEADER: [&str; 7] = [
    "Section",
    "Evaluated",
    "Pass",
    "Missing",
    "Wrong Dtype",
    "Wrong Value",
    "Outcome",
];
const SUMMARY_WIDTHS: [f32; 7] = [50.0, 28.0, 28.0, 28.0, 30.0, 30.0, 40.0];
const GROUP_HEADER: [&str; 4] = ["Group", "Pass", "Fail Mandatory", "Fail Optional"];
const GROUP_WIDTHS: [f32; 4] = [80.0, 30.0, 40.0, 40.0];
const DETAIL_WIDTHS: [f32; 8] = [35.0, 60.0, 18.0, 24.0, 22.0, 48.0, 40.0, 26.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> Result<(), RenderError> {
        let pages = lay_out(report)?;
        let bytes = pages.doc.save_to_bytes().map_err(encode_error)?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

fn encode_error(err: printpdf::Error) -> RenderError {
    RenderError::Encode(err.to_string())
}

/// A table row: its cells and whether it is drawn as a failure.
type TableRow = (Vec<String>, bool);

fn lay_out(report: &Report) -> Result<Pages, RenderError> {
    let mut pages = Pages::new("WMO FM 301 Validation Report")?;
    let meta = &report.metadata;

    pages.heading("WMO FM 301 Validation Report", 16.0);
    pages.text(&format!("Dataset: {}", meta.dataset));
    pages.text(&format!("Schema: {}", meta.schema));
    pages.text(&format!("Sweeps checked: {}", meta.sweeps.as_str()));
    pages.text(&format!(
        "Generated: {} by fm301check {}",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        meta.tool_version
    ));
    pages.gap(4.0);

    let summary = &report.summary;
    let overall = vec![
        "Overall".to_string(),
        (summary.mandatory.evaluated + summary.optional.evaluated).to_string(),
        (summary.mandatory.passed + summary.optional.passed).to_string(),
        (summary.mandatory.missing + summary.optional.missing).to_string(),
        (summary.mandatory.wrong_datatype + summary.optional.wrong_datatype).to_string(),
        (summary.mandatory.wrong_value + summary.optional.wrong_value).to_string(),
        summary.overall.label().to_string(),
    ];
    let overall_failed = summary.mandatory.failed() + summary.optional.failed() > 0;
    pages.heading("Section Summary", 12.0);
    pages.table(
        &SUMMARY_HEADER,
        &SUMMARY_WIDTHS,
        &[
            summary_row("Mandatory", &summary.mandatory),
            summary_row("Optional (used)", &summary.optional),
            (overall, overall_failed),
        ],
    );

    pages.heading("Results by Group", 12.0);
    if report.groups.is_empty() {
        pages.text("No fields evaluated.");
    } else {
        let rows: Vec<TableRow> = report
            .groups
            .iter()
            .map(|group| {
                let cells = vec![
                    group.group.clone(),
                    group.passed.to_string(),
                    group.fail_mandatory.to_string(),
                    group.fail_optional.to_string(),
                ];
                (cells, group.fail_mandatory + group.fail_optional > 0)
            })
            .collect();
        pages.table(&GROUP_HEADER, &GROUP_WIDTHS, &rows);
    }

    pages.new_page();
    pages.heading("Mandatory Fields", 12.0);
    pages.detail_table(report.mandatory_rows(), "No mandatory fields declared.");

    pages.new_page();
    pages.heading("Optional Fields (used)", 12.0);
    pages.detail_table(
        report.optional_rows(),
        "No optional fields present in the dataset.",
    );

    pages.gap(4.0);
    pages.text("Optional fields absent from the dataset are not listed. Generated by fm301check.");
    Ok(pages)
}

fn summary_row(label: &str, section: &SectionSummary) -> TableRow {
    let cells = vec![
        label.to_string(),
        section.evaluated.to_string(),
        section.passed.to_string(),
        section.missing.to_string(),
        section.wrong_datatype.to_string(),
        section.wrong_value.to_string(),
        section.outcome.label().to_string(),
    ];
    (cells, section.failed() > 0)
}

fn detail_cells(row: &DetailRow) -> TableRow {
    let cells = vec![
        row.group.clone(),
        row.field.clone(),
        if row.available { "Yes" } else { "No" }.to_string(),
        row.expected_datatype.clone(),
        row.observed_datatype.clone().unwrap_or_default(),
        row.expected_values.clone().unwrap_or_default(),
        row.observed_value.clone().unwrap_or_default(),
        row.verdict.label().to_string(),
    ];
    (cells, row.verdict.is_failure())
}

/// Cursor over the document: the page being drawn and how far down it is.
struct Pages {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Distance of the cursor from the bottom edge, in mm.
    y: f32,
    count: usize,
}

impl Pages {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(encode_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(encode_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        layer.set_outline_thickness(0.3);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            count: 1,
        })
    }

    fn new_page(&mut self) {
        self.count += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Page {}", self.count),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.layer.set_outline_thickness(0.3);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    /// Headings never end a page: they move down with at least two rows of what follows.
    fn heading(&mut self, text: &str, size: f32) {
        let height = size * PT_TO_MM;
        if !self.fits(height + 3.0 + 2.0 * ROW_HEIGHT) {
            self.new_page();
        }
        self.y -= height;
        self.set_color(false);
        self.layer
            .use_text(printable(text), size, Mm(MARGIN), Mm(self.y), &self.bold);
        self.y -= 3.0;
    }

    fn text(&mut self, text: &str) {
        let height = BODY_FONT * PT_TO_MM + 1.5;
        if !self.fits(height) {
            self.new_page();
        }
        self.y -= height;
        self.set_color(false);
        let line = fit(text, PAGE_WIDTH - 2.0 * MARGIN, BODY_FONT);
        self.layer
            .use_text(line, BODY_FONT, Mm(MARGIN), Mm(self.y), &self.regular);
    }

    fn detail_table<'a>(&mut self, rows: impl Iterator<Item = &'a DetailRow>, empty_note: &str) {
        let rows: Vec<TableRow> = rows.map(detail_cells).collect();
        if rows.is_empty() {
            self.text(empty_note);
        } else {
            self.table(&DETAIL_HEADER, &DETAIL_WIDTHS, &rows);
        }
    }

    fn table(&mut self, header: &[&str], widths: &[f32], rows: &[TableRow]) {
        let header: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
        let width: f32 = widths.iter().sum();

        if !self.fits(2.0 * ROW_HEIGHT) {
            self.new_page();
        }
        self.rule(width);
        self.row(&header, widths, true, false);
        for (cells, failed) in rows {
            if !self.fits(ROW_HEIGHT) {
                self.new_page();
                self.rule(width);
                self.row(&header, widths, true, false);
            }
            self.row(cells, widths, false, *failed);
        }
        self.y -= 4.0;
    }

    fn row(&mut self, cells: &[String], widths: &[f32], header: bool, failed: bool) {
        let baseline = self.y - ROW_HEIGHT + 1.6;
        let font = if header { &self.bold } else { &self.regular };
        self.set_color(failed);
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            self.layer.use_text(
                fit(cell, *width - 2.0, TABLE_FONT),
                TABLE_FONT,
                Mm(x + 1.0),
                Mm(baseline),
                font,
            );
            x += width;
        }
        self.y -= ROW_HEIGHT;
        self.rule(widths.iter().sum());
    }

    fn rule(&self, width: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(MARGIN + width), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn set_color(&self, failed: bool) {
        let red = if failed { 0.75 } else { 0.0 };
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(red, 0.0, 0.0, None)));
    }
}

/// The builtin fonts only cover Latin-1; anything outside ASCII becomes `?`.
fn printable(raw: &str) -> String {
    raw.chars()
        .filter(|ch| *ch != '\0')
        .map(|ch| match ch {
            '\n' | '\r' | '\t' => ' ',
            ch if ch.is_ascii() && !ch.is_ascii_control() => ch,
            _ => '?',
        })
        .collect()
}

/// Cut text that would overflow `width` mm at `size` pt, marking the cut with `...`.
fn fit(raw: &str, width: f32, size: f32) -> String {
    let text = printable(raw);
    let capacity = (width / (size * PT_TO_MM * CHAR_WIDTH_EM)).floor().max(3.0) as usize;
    if text.chars().count() <= capacity {
        return text;
    }
    let mut cut: String = text.chars().take(capacity - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{SweepSelection, Verdict};
    use crate::report::{assemble, render_to_vec, ReportMetadata, Section};

    fn report_with_rows(count: usize) -> Report {
        let mut report = assemble(&[], ReportMetadata::new("volume.nc", "bundled", SweepSelection::First));
        report.rows = (0..count)
            .map(|index| DetailRow {
                section: if index % 2 == 0 { Section::Mandatory } else { Section::Optional },
                group: "sweep_0".to_string(),
                field: format!("field_{index}"),
                kind: "variable".to_string(),
                requirement: "mandatory".to_string(),
                available: index % 3 != 0,
                expected_datatype: "double".to_string(),
                observed_datatype: Some("float".to_string()),
                expected_values: None,
                observed_value: Some("1.5".to_string()),
                verdict: if index % 3 == 0 { Verdict::MissingMandatory } else { Verdict::Pass },
            })
            .collect();
        report
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_to_vec(&report_with_rows(6), &PdfRenderer).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn detail_sections_start_on_their_own_pages() {
        let pages = lay_out(&report_with_rows(4)).unwrap();
        assert_eq!(pages.count, 3);
    }

    #[test]
    fn long_tables_continue_on_new_pages() {
        let pages = lay_out(&report_with_rows(200)).unwrap();
        assert!(pages.count > 4, "only {} pages", pages.count);
    }

    #[test]
    fn long_cells_are_cut_to_the_column() {
        let long = "x".repeat(200);
        let cell = fit(&long, 20.0, TABLE_FONT);
        assert!(cell.ends_with("..."));
        assert!(cell.len() < 20);
        assert_eq!(fit("sweep_0", 20.0, TABLE_FONT), "sweep_0");
    }

    #[test]
    fn text_outside_the_builtin_fonts_is_replaced() {
        assert_eq!(printable("déjà\nvu\0"), "d?j? vu");
    }
}
