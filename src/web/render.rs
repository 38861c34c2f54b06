//! Server-side HTML for the single demo page.

use crate::model::nsl_kdd::NON_FEATURE_COLUMNS;
use crate::scoring::{PredictionResult, ScoringError, EXPORT_FILE_NAME, USER_MESSAGE};
use crate::table::FeatureTable;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fmt::Write;

pub const TITLE: &str = "Intrusion Detection (NSL-KDD) — ML Demo";
pub const DESCRIPTION: &str =
    "Upload a CSV of network records and the model will predict <b>Normal</b> or <b>Intrusion</b> + probability.";
pub const UPLOAD_PROMPT: &str = "Upload a CSV to start.";

const STYLE: &str = "body{margin:0;font-family:sans-serif;display:flex}\
aside{width:18rem;min-height:100vh;padding:1rem;background:#f0f2f6}\
main{flex:1;padding:1rem 2rem;overflow-x:auto}\
table{border-collapse:collapse;font-size:.85rem}\
th,td{border:1px solid #ddd;padding:.2rem .5rem;text-align:right;white-space:nowrap}\
.info{background:#e8f0fe;padding:.6rem}.warn{background:#fff8e1;padding:.6rem}\
.error{background:#fde8e8;padding:.6rem}pre{background:#f6f6f6;padding:.6rem;white-space:pre-wrap}\
.button{display:inline-block;padding:.4rem .8rem;border:1px solid #999;border-radius:4px}";

/// What the main column shows after a render cycle.
pub enum PageBody<'a> {
    /// No file supplied: prompt only.
    AwaitingUpload,
    Scored {
        preview: &'a FeatureTable,
        result: &'a PredictionResult,
        result_rows: usize,
        csv: &'a [u8],
    },
    /// The upload itself could not be received (too large, broken form).
    Rejected { message: &'a str },
    /// Scoring stopped; the preview is shown when decoding got that far.
    Failed {
        preview: Option<&'a FeatureTable>,
        error: &'a ScoringError,
    },
}

pub struct Page<'a> {
    pub model_name: &'a str,
    pub expected_columns: Option<usize>,
    pub body: PageBody<'a>,
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn table_html(out: &mut String, table: &FeatureTable) {
    out.push_str("<table><thead><tr><th></th>");
    for c in table.columns() {
        let _ = write!(out, "<th>{}</th>", escape(c));
    }
    out.push_str("</tr></thead><tbody>");
    for (i, row) in table.rows().iter().enumerate() {
        let _ = write!(out, "<tr><th>{}</th>", i);
        for v in row {
            let _ = write!(out, "<td>{}</td>", escape(&v.to_string()));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn preview_html(out: &mut String, preview: &FeatureTable) {
    out.push_str("<h3>Preview of Uploaded Data</h3>");
    table_html(out, preview);
}

impl Page<'_> {
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(16 * 1024);
        let _ = write!(
            out,
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>NSL-KDD Intrusion Detection Demo</title>\
             <style>{}</style></head><body>",
            STYLE
        );
        self.sidebar(&mut out);

        out.push_str("<main>");
        let _ = write!(out, "<h1>{}</h1><p>{}</p>", escape(TITLE), DESCRIPTION);
        match &self.body {
            PageBody::AwaitingUpload => {
                let _ = write!(out, "<div class=\"warn\">{}</div>", UPLOAD_PROMPT);
            }
            PageBody::Scored {
                preview,
                result,
                result_rows,
                csv,
            } => {
                preview_html(&mut out, preview);

                out.push_str("<h3>Predictions</h3>");
                table_html(&mut out, &result.table.head(*result_rows));

                let s = &result.summary;
                let _ = write!(
                    out,
                    "<h3>Summary</h3><p>Normal: <b>{}</b> | Intrusion: <b>{}</b> | Total: <b>{}</b></p>",
                    s.normal, s.intrusion, s.total
                );

                let _ = write!(
                    out,
                    "<a class=\"button\" download=\"{}\" href=\"data:text/csv;charset=utf-8;base64,{}\">Download predictions as CSV</a>",
                    EXPORT_FILE_NAME,
                    BASE64.encode(csv)
                );
            }
            PageBody::Rejected { message } => {
                let _ = write!(
                    out,
                    "<div class=\"error\">The upload could not be read.</div><pre>{}</pre><div class=\"warn\">{}</div>",
                    escape(message),
                    UPLOAD_PROMPT
                );
            }
            PageBody::Failed { preview, error } => {
                if let Some(preview) = preview {
                    preview_html(&mut out, preview);
                }
                let _ = write!(
                    out,
                    "<div class=\"error\">{}</div><pre>{}</pre>",
                    escape(USER_MESSAGE),
                    escape(&error.detail())
                );
            }
        }
        out.push_str("</main></body></html>");
        out
    }

    fn sidebar(&self, out: &mut String) {
        out.push_str(
            "<aside><h2>Upload Data</h2>\
             <form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\
             <label>Upload CSV file<br><input type=\"file\" name=\"file\" accept=\".csv,text/csv\"></label>\
             <p><button type=\"submit\">Predict</button></p></form><hr>",
        );
        let _ = write!(
            out,
            "<div class=\"info\">Tip: CSV must contain the same feature columns as the NSL-KDD dataset (without {}).",
            NON_FEATURE_COLUMNS.join("/")
        );
        if let Some(n) = self.expected_columns {
            let _ = write!(out, " Model <code>{}</code> expects {} columns.", escape(self.model_name), n);
        }
        out.push_str("</div></aside>");
    }
}
