//! Report renderer.
//!
//! Takes the run's block list and hit trace, removes redundant (nested)
//! blocks, and emits one highlighted HTML document per source file plus the
//! summary rows the summary table is built from.

mod html;
mod summary;

pub use summary::SummaryTable;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::block::Block;
use crate::error::{CoverError, CoverResult};
use crate::trace::HitTrace;

/// Per-file coverage line of the summary table.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    /// Source file name (without directories)
    pub file: String,
    /// Blocks attributed to the file
    pub total_blocks: usize,
    /// Blocks hit at least once
    pub hit_blocks: usize,
    /// Hit percentage, rounded to one decimal
    pub percent: f64,
}

/// Renders the HTML report set for one run.
#[derive(Debug)]
pub struct Renderer<'a> {
    blocks: &'a [Block],
    trace: &'a HitTrace,
}

impl<'a> Renderer<'a> {
    /// Create a renderer over a run's blocks and trace.
    #[must_use]
    pub fn new(blocks: &'a [Block], trace: &'a HitTrace) -> Self {
        Self { blocks, trace }
    }

    /// Render one HTML document per source file into `report_dir` and
    /// return the per-file summary rows.
    ///
    /// Also logs the run-wide hit percentage across all blocks.
    pub fn render_all(&self, report_dir: &Path) -> CoverResult<Vec<SummaryRow>> {
        self.trace.ensure_covers(self.blocks.len())?;
        std::fs::create_dir_all(report_dir)?;

        let mut rows = Vec::new();
        for file in distinct_files(self.blocks) {
            let survivors = reduce(self.blocks.iter().filter(|b| b.file == file).collect())?;
            let source = std::fs::read_to_string(file)?;
            let (html, hit_blocks) = html::render_file(&source, &survivors, self.trace)?;
            std::fs::write(html_path(report_dir, file), html)?;

            let total_blocks = survivors.len();
            rows.push(SummaryRow {
                file: file_name(file),
                total_blocks,
                hit_blocks,
                percent: round1(100.0 * hit_blocks as f64 / total_blocks as f64),
            });
        }

        let hit = self.trace.hit_block_count(self.blocks);
        let total = self.blocks.len();
        if total > 0 {
            info!(
                "coverage: {hit}/{total}, {}%",
                round1(100.0 * hit as f64 / total as f64)
            );
        }
        Ok(rows)
    }
}

/// Source files in first-seen block order.
fn distinct_files(blocks: &[Block]) -> Vec<&str> {
    let mut files: Vec<&str> = Vec::new();
    for block in blocks {
        if !files.contains(&block.file.as_str()) {
            files.push(&block.file);
        }
    }
    files
}

/// Drop redundant outer blocks and order the survivors for markup.
///
/// Sorts ascending by start position with ties broken descending by end
/// position, so an enclosing block sorts directly before anything it
/// contains. Scanning adjacent pairs back to front then drops every outer
/// block in favor of its more specific inner one. Survivors that still
/// overlap without nesting indicate inconsistent debug info and are
/// rejected rather than mis-rendered. The result comes back reversed, in
/// descending document order, ready for offset-stable markup insertion.
fn reduce(mut blocks: Vec<&Block>) -> CoverResult<Vec<&Block>> {
    blocks.sort_by(|a, b| {
        a.start_position()
            .cmp(&b.start_position())
            .then(b.end_position().cmp(&a.end_position()))
    });

    let mut i = blocks.len().saturating_sub(1);
    while i > 0 {
        if blocks[i - 1].contains(blocks[i]) {
            blocks.remove(i - 1);
        }
        i -= 1;
    }

    for pair in blocks.windows(2) {
        if pair[0].overlaps(pair[1]) {
            return Err(CoverError::OverlappingBlocks {
                first: pair[0].to_string(),
                second: pair[1].to_string(),
            });
        }
    }

    blocks.reverse();
    Ok(blocks)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned())
}

fn html_path(report_dir: &Path, source: &str) -> PathBuf {
    let stem = Path::new(source)
        .file_stem()
        .map_or_else(|| source.to_string(), |s| s.to_string_lossy().into_owned());
    report_dir.join(format!("{stem}.html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(id: usize, sl: u32, el: u32, sc: u32, ec: u32) -> Block {
        Block {
            id,
            file: "f.pas".to_string(),
            start_line: sl,
            end_line: el,
            start_col: sc,
            end_col: ec,
        }
    }

    mod reduce_tests {
        use super::*;

        #[test]
        fn outer_block_is_dropped_in_favor_of_inner() {
            let a = block(0, 2, 2, 0, 10);
            let b = block(1, 2, 2, 2, 5);
            let survivors = reduce(vec![&a, &b]).unwrap();
            assert_eq!(survivors.len(), 1);
            assert_eq!(survivors[0].id, 1);
        }

        #[test]
        fn disjoint_blocks_all_survive_in_descending_order() {
            let a = block(0, 1, 1, 0, 5);
            let b = block(1, 2, 2, 0, 5);
            let c = block(2, 3, 3, 0, 5);
            let survivors = reduce(vec![&a, &c, &b]).unwrap();
            let ids: Vec<usize> = survivors.iter().map(|s| s.id).collect();
            assert_eq!(ids, vec![2, 1, 0]);
        }

        #[test]
        fn chain_of_nested_blocks_keeps_only_innermost() {
            let outer = block(0, 1, 5, 0, 20);
            let mid = block(1, 2, 4, 0, 20);
            let inner = block(2, 3, 3, 2, 8);
            let survivors = reduce(vec![&outer, &mid, &inner]).unwrap();
            assert_eq!(survivors.len(), 1);
            assert_eq!(survivors[0].id, 2);
        }

        #[test]
        fn partial_overlap_is_rejected() {
            let a = block(0, 2, 2, 0, 10);
            let b = block(1, 2, 2, 5, 20);
            let err = reduce(vec![&a, &b]).unwrap_err();
            assert!(matches!(err, CoverError::OverlappingBlocks { .. }));
        }

        proptest! {
            #[test]
            fn no_nesting_survives_reduction(
                spans in proptest::collection::vec((0u32..20, 0u32..40, 0u32..40), 1..12)
            ) {
                let blocks: Vec<Block> = spans
                    .iter()
                    .enumerate()
                    .map(|(id, &(line, c1, c2))| {
                        block(id, line, line, c1.min(c2), c1.max(c2))
                    })
                    .collect();
                // Single-line blocks on one line either nest or coincide,
                // so reduction cannot hit the overlap check.
                let survivors = reduce(blocks.iter().collect());
                prop_assume!(survivors.is_ok());
                let survivors = survivors.unwrap();
                for (i, a) in survivors.iter().enumerate() {
                    for b in survivors.iter().skip(i + 1) {
                        prop_assert!(
                            !(a.contains(b) && a.id != b.id),
                            "{a} still contains {b}"
                        );
                        prop_assert!(
                            !(b.contains(a) && a.id != b.id),
                            "{b} still contains {a}"
                        );
                    }
                }
            }
        }
    }

    mod summary_math_tests {
        use super::*;

        #[test]
        fn one_of_three_hit_is_a_third() {
            assert_eq!(round1(100.0 * 1.0 / 3.0), 33.3);
            assert_eq!(round1(100.0 * 2.0 / 3.0), 66.7);
            assert_eq!(round1(100.0), 100.0);
        }

        #[test]
        fn distinct_files_keep_first_seen_order() {
            let mut a = block(0, 1, 1, 0, 5);
            a.file = "b.pas".to_string();
            let b = block(1, 1, 1, 0, 5);
            let mut c = block(2, 2, 2, 0, 5);
            c.file = "b.pas".to_string();
            let blocks = vec![a, b, c];
            assert_eq!(distinct_files(&blocks), vec!["b.pas", "f.pas"]);
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn renders_file_report_and_summary_row() {
            let dir = tempfile::tempdir().unwrap();
            let source_path = dir.path().join("prog.pas");
            std::fs::write(&source_path, "begin\n  WriteLn;\n  ReadLn;\nend.\n").unwrap();

            let file = source_path.to_string_lossy().into_owned();
            let mut blocks = vec![
                block(0, 1, 1, 2, 9),
                block(1, 2, 2, 2, 8),
                block(2, 3, 3, 0, 3),
            ];
            for b in &mut blocks {
                b.file = file.clone();
            }
            let trace = HitTrace::parse("0\n3\n0\n").unwrap();

            let report_dir = dir.path().join("HTML");
            let rows = Renderer::new(&blocks, &trace)
                .render_all(&report_dir)
                .unwrap();

            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].file, "prog.pas");
            assert_eq!(rows[0].total_blocks, 3);
            assert_eq!(rows[0].hit_blocks, 1);
            assert_eq!(rows[0].percent, 33.3);

            let html = std::fs::read_to_string(report_dir.join("prog.html")).unwrap();
            assert!(html.contains(r#"<span class="hit tooltip">"#));
            assert!(html.contains(r#"<span class="unhit">"#));
            assert!(html.contains("Hit count: 3"));
        }

        #[test]
        fn short_trace_aborts_rendering() {
            let blocks = vec![block(0, 0, 0, 0, 1), block(1, 1, 1, 0, 1)];
            let trace = HitTrace::parse("1\n").unwrap();
            let dir = tempfile::tempdir().unwrap();
            let err = Renderer::new(&blocks, &trace)
                .render_all(dir.path())
                .unwrap_err();
            assert!(matches!(err, CoverError::TraceTooShort { .. }));
        }
    }
}
