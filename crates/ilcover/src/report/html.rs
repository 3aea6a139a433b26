//! Per-file HTML rendering.
//!
//! Overlays hit/unhit span markup and hit-count tooltips onto source text
//! and wraps it into a self-contained HTML document.
//!
//! Literal `<` and `>` in the source are swapped for placeholder characters
//! before any tag is inserted, then converted to HTML entities at the very
//! end, so escaping can never corrupt an inserted tag. Columns are char
//! offsets, which the placeholders preserve.

use std::fmt::Write as _;

use crate::block::Block;
use crate::error::{CoverError, CoverResult};
use crate::trace::HitTrace;

// Placeholders standing in for literal angle brackets while tags are
// inserted. Not produced by any supported source language.
const LT_PLACEHOLDER: char = '\u{00ab}';
const GT_PLACEHOLDER: char = '\u{00bb}';

const STYLE: &str = r#"<style>
.hit { background-color:aqua; }
.unhit { background-color:orange; }
.tooltip { position: relative; display: inline; }
.tooltiptext {
  border: 1px solid black;
  visibility: hidden;
  text-align: center;
  background-color:yellow;
  color:black;
  padding: 5px;
  width:150px;
  word-wrap:break-word;
  position: absolute;
  left: 110%;
  z-index:10;
}
.tooltip:hover .tooltiptext { visibility: visible; }
</style>"#;

/// Render one source file with its surviving blocks marked up.
///
/// `blocks` must already be redundancy-free and in descending document
/// order: markup is inserted back to front so earlier insertions never
/// shift the offsets of blocks still to be processed. Returns the HTML
/// document and the number of hit blocks.
pub fn render_file(
    source: &str,
    blocks: &[&Block],
    trace: &HitTrace,
) -> CoverResult<(String, usize)> {
    let mut code: Vec<String> = source
        .lines()
        .map(|l| {
            l.replace('<', &LT_PLACEHOLDER.to_string())
                .replace('>', &GT_PLACEHOLDER.to_string())
        })
        .collect();

    let mut hit_blocks = 0;
    for block in blocks {
        let hit = trace.is_hit(block.id);
        if hit {
            hit_blocks += 1;
        }
        mark_block(&mut code, block, hit, trace.hit_count(block.id))?;
    }

    let mut html = String::new();
    let _ = writeln!(html, "<html><head>{STYLE}</head>");
    let _ = writeln!(html, "<body><pre>");
    let _ = writeln!(html, "{}", code.join("\n"));
    let _ = writeln!(html, "</pre></body></html>");

    let html = html
        .replace(LT_PLACEHOLDER, "&lt;")
        .replace(GT_PLACEHOLDER, "&gt;");
    Ok((html, hit_blocks))
}

/// Insert the opening/closing markup for one block.
///
/// A single-line block wraps exactly its column range. A multi-line block
/// wraps each covered line independently, from its first non-whitespace
/// character to its end, so the `<pre>` newline handling stays intact.
fn mark_block(code: &mut [String], block: &Block, hit: bool, hits: u64) -> CoverResult<()> {
    let open = if hit {
        r#"<span class="hit tooltip">"#
    } else {
        r#"<span class="unhit">"#
    };

    if block.end_line > block.start_line {
        for line_idx in block.start_line..=block.end_line {
            let line = line_mut(code, block, line_idx)?;
            let end = line.chars().count();
            let start = first_non_whitespace(line);
            insert_at(line, end, "</span>", block, line_idx)?;
            if hit {
                insert_at(line, end, &tooltip(hits), block, line_idx)?;
            }
            insert_at_unchecked(line, start, open);
        }
        return Ok(());
    }

    let end_line = line_mut(code, block, block.end_line)?;
    insert_at(end_line, block.end_col as usize, "</span>", block, block.end_line)?;
    if hit {
        insert_at(end_line, block.end_col as usize, &tooltip(hits), block, block.end_line)?;
    }
    let start_line = line_mut(code, block, block.start_line)?;
    insert_at(start_line, block.start_col as usize, open, block, block.start_line)?;
    Ok(())
}

fn tooltip(hits: u64) -> String {
    format!(r#"<span class="tooltip tooltiptext"> Hit count: {hits} </span>"#)
}

fn line_mut<'a>(code: &'a mut [String], block: &Block, line_idx: u32) -> CoverResult<&'a mut String> {
    code.get_mut(line_idx as usize)
        .ok_or_else(|| CoverError::LineOutOfRange {
            file: block.file.clone(),
            line: line_idx as usize,
        })
}

/// Insert `text` at char offset `col`, failing if the line is too short.
///
/// A column past the line's end means the source on disk no longer matches
/// the debug info the blocks were built from.
fn insert_at(
    line: &mut String,
    col: usize,
    text: &str,
    block: &Block,
    line_idx: u32,
) -> CoverResult<()> {
    let byte = byte_offset(line, col).ok_or_else(|| CoverError::ColumnOutOfRange {
        file: block.file.clone(),
        line: line_idx as usize,
        col,
    })?;
    line.insert_str(byte, text);
    Ok(())
}

// For offsets derived from the line itself rather than from debug info.
fn insert_at_unchecked(line: &mut String, col: usize, text: &str) {
    if let Some(byte) = byte_offset(line, col) {
        line.insert_str(byte, text);
    }
}

fn byte_offset(line: &str, col: usize) -> Option<usize> {
    if col == line.chars().count() {
        return Some(line.len());
    }
    line.char_indices().nth(col).map(|(byte, _)| byte)
}

fn first_non_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}
