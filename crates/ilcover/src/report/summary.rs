//! Coverage summary table.
//!
//! One row per source file, ordered ascending by hit percentage so the
//! least-covered files surface first. Rendered as its own HTML document,
//! with a JSON companion for machine consumers.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::CoverResult;
use crate::report::SummaryRow;

const HEADERS: [&str; 4] = ["Source files", "Blocks", "Blocks covered", "Coverage %"];

/// Summary table generator over the per-file rows.
#[derive(Debug)]
pub struct SummaryTable<'a> {
    rows: &'a [SummaryRow],
}

impl<'a> SummaryTable<'a> {
    /// Create a table over the given rows.
    #[must_use]
    pub fn new(rows: &'a [SummaryRow]) -> Self {
        Self { rows }
    }

    /// Generate the summary HTML document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut sorted: Vec<&SummaryRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| a.percent.total_cmp(&b.percent));

        let mut table = String::new();
        table.push_str("<table width=\"50%\">\n");
        table.push_str("<caption>Coverage summary</caption>\n");
        table.push_str("<tr>\n");
        for (i, heading) in HEADERS.iter().enumerate() {
            if i == 0 {
                let _ = writeln!(table, "<th width=\"40%\">{heading}</th>");
            } else {
                let _ = writeln!(table, " <th>{heading}</th>");
            }
        }
        table.push_str("</tr>\n");
        for row in sorted {
            let _ = writeln!(
                table,
                "<tr>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n<td>{}</td>\n</tr>",
                row.file, row.total_blocks, row.hit_blocks, row.percent
            );
        }
        table.push_str("</table>\n");

        format!(
            "<html>\n<head>\n<style>\n\
             table, th {{ border: 1px solid black; border-collapse: collapse; text-align:left; }}\n\
             td {{ border: 1px solid black; border-collapse: collapse; }}\n\
             </style>\n</head>\n<body>\n<div>\n{table}</div>\n</body>\n</html>\n"
        )
    }

    /// Write the HTML document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> CoverResult<()> {
        std::fs::write(path, self.generate())?;
        Ok(())
    }

    /// Serialize the rows (ascending by percentage) as pretty JSON.
    pub fn to_json(&self) -> CoverResult<String> {
        let mut sorted: Vec<&SummaryRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| a.percent.total_cmp(&b.percent));
        Ok(serde_json::to_string_pretty(&sorted)?)
    }

    /// Write the JSON companion to `path`.
    pub fn save_json(&self, path: impl AsRef<Path>) -> CoverResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(file: &str, total: usize, hit: usize, percent: f64) -> SummaryRow {
        SummaryRow {
            file: file.to_string(),
            total_blocks: total,
            hit_blocks: hit,
            percent,
        }
    }

    #[test]
    fn rows_are_ordered_ascending_by_percentage() {
        let rows = vec![
            row("high.pas", 10, 9, 90.0),
            row("low.pas", 10, 1, 10.0),
            row("mid.pas", 10, 5, 50.0),
        ];
        let html = SummaryTable::new(&rows).generate();
        let low = html.find("low.pas").unwrap();
        let mid = html.find("mid.pas").unwrap();
        let high = html.find("high.pas").unwrap();
        assert!(low < mid && mid < high);
    }

    #[test]
    fn table_carries_caption_and_headers() {
        let rows = vec![row("f.pas", 3, 1, 33.3)];
        let html = SummaryTable::new(&rows).generate();
        assert!(html.contains("<caption>Coverage summary</caption>"));
        for heading in HEADERS {
            assert!(html.contains(heading), "missing header {heading}");
        }
        assert!(html.contains("<td>f.pas</td>"));
        assert!(html.contains("<td>33.3</td>"));
    }

    #[test]
    fn json_companion_round_trips() {
        let rows = vec![row("b.pas", 4, 4, 100.0), row("a.pas", 2, 0, 0.0)];
        let json = SummaryTable::new(&rows).to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["file"], "a.pas");
        assert_eq!(parsed[0]["percent"], 0.0);
        assert_eq!(parsed[1]["hit_blocks"], 4);
    }
}
