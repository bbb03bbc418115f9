//! Paginated HTML report: the Markdown document inside a print stylesheet
//! (A4 landscape, headers repeated on every page, detail tables on new pages).

use std::io::Write;

use pulldown_cmark::{html, Options, Parser};

use crate::error::RenderError;

use super::{DocumentRenderer, MarkdownRenderer, Report};

const STYLESHEET: &str = r#"
@page { size: A4 landscape; margin: 20px; }
body { font-family: Helvetica, Arial, sans-serif; font-size: 10pt; margin: 20px; }
h1 { font-size: 18pt; }
h2 { font-size: 13pt; margin-top: 18px; }
h2:nth-of-type(n+3) { break-before: page; page-break-before: always; }
table { border-collapse: collapse; width: 100%; margin-bottom: 16px; }
thead { display: table-header-group; }
tr { break-inside: avoid; page-break-inside: avoid; }
th { background: #808080; color: #f5f5f5; font-weight: bold; }
th, td { border: 0.5px solid #000; padding: 2px 4px; vertical-align: top; text-align: center; font-size: 8pt; overflow-wrap: anywhere; }
.fail { color: #c00000; font-weight: bold; }
.pass { color: #006100; }
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn document(&self, report: &Report) -> String {
        let markdown = MarkdownRenderer::with_highlights().document(report);
        let mut body = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut body, Parser::new_ext(&markdown, Options::ENABLE_TABLES));

        let title = html_escape(&format!(
            "FM 301 validation report: {}",
            report.metadata.dataset
        ));
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLESHEET}</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
        )
    }
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl DocumentRenderer for HtmlRenderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> Result<(), RenderError> {
        out.write_all(self.document(report).as_bytes())?;
        Ok(())
    }
}
