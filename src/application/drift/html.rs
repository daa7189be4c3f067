//! Static HTML rendering of drift reports

use crate::domain::drift::ColumnDrift;
use crate::domain::errors::DriftError;
use chrono::Utc;
use std::fmt::Write as _;
use std::path::Path;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:4px 10px;text-align:left}\
.drift{color:#b00020;font-weight:bold}";

pub(super) fn render(title: &str, summary: &[(&str, String)], columns: &[ColumnDrift]) -> String {
    let mut page = String::new();
    let _ = write!(
        page,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n<p>Generated {}</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        title = escape(title),
    );

    page.push_str("<table>\n");
    for (label, value) in summary {
        let _ = writeln!(
            page,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(label),
            escape(value)
        );
    }
    page.push_str("</table>\n<h2>Columns</h2>\n<table>\n");
    page.push_str(
        "<tr><th>Column</th><th>Type</th><th>Stat test</th><th>Threshold</th>\
         <th>Drift score</th><th>Drift detected</th></tr>\n",
    );
    for c in columns {
        let class = if c.drift_detected { " class=\"drift\"" } else { "" };
        let _ = writeln!(
            page,
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.6}</td><td>{}</td></tr>",
            escape(&c.column),
            c.kind.as_str(),
            escape(c.stattest.name()),
            c.stattest.threshold(),
            c.drift_score,
            if c.drift_detected { "Detected" } else { "Not detected" },
        );
    }
    page.push_str("</table>\n</body>\n</html>\n");
    page
}

pub(super) fn write(path: &Path, page: &str) -> Result<(), DriftError> {
    let write_error = |e: std::io::Error| DriftError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, page).map_err(write_error)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
