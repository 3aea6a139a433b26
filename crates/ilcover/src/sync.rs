//! Position synchronizer.
//!
//! The disassembler is run twice over the same binary: once with source-line
//! directives (`/LINENUM`) and once without. The two outputs share the same
//! instruction labels and relative ordering, but differ in how much metadata
//! they print between methods. This module merges every line directive from
//! the annotated output into the token-only output, anchored on the shared
//! `IL_xxxx:` labels and resynchronized at each `.method /*` boundary.
//!
//! Any anchor that cannot be located is a data-consistency violation between
//! the two disassemblies and aborts the run; guessing a position would
//! silently corrupt every block allocated after it.

use crate::error::{CoverError, CoverResult};
use crate::syntax;

/// Merge the line directives of `annotated` into `tokens`.
///
/// Both arguments are complete disassembly texts. Blank lines carry no
/// positional meaning and are discarded up front. Returns the merged line
/// stream: the token-only text with every non-sentinel directive inserted at
/// its anchored position.
pub fn synchronize(annotated: &str, tokens: &str) -> CoverResult<Vec<String>> {
    let annotated: Vec<&str> = non_blank_lines(annotated);
    let merged: Vec<String> = non_blank_lines(tokens)
        .into_iter()
        .map(String::from)
        .collect();
    Merger { annotated, merged, cursor: 0 }.run()
}

fn non_blank_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.trim().is_empty()).collect()
}

/// Two-cursor merge state: a read index over the annotated lines and a
/// write/scan cursor into the growing merged stream.
struct Merger<'a> {
    annotated: Vec<&'a str>,
    merged: Vec<String>,
    cursor: usize,
}

impl Merger<'_> {
    fn run(mut self) -> CoverResult<Vec<String>> {
        for n1 in 0..self.annotated.len() {
            let line = self.annotated[n1];
            if syntax::is_method_boundary(line) {
                self.seek_method(line)?;
            } else if syntax::is_directive(line) && !syntax::is_sentinel_directive(line) {
                self.insert_directive(n1)?;
            }
        }
        Ok(self.merged)
    }

    /// Advance the cursor to just past the identical method marker line.
    ///
    /// Method markers compare by exact full-line equality; the disassembler
    /// prints them identically in both modes.
    fn seek_method(&mut self, line: &str) -> CoverResult<()> {
        while self.cursor < self.merged.len() {
            if self.merged[self.cursor] == line {
                self.cursor += 1;
                return Ok(());
            }
            self.cursor += 1;
        }
        Err(CoverError::MethodNotFound { line: line.to_string() })
    }

    /// Anchor the directive at index `n1` on a neighboring label and insert
    /// it into the merged stream.
    ///
    /// The label on the *following* annotated line places the directive
    /// immediately before the matching label in the merged stream; failing
    /// that, the label on the *preceding* line places it immediately after.
    fn insert_directive(&mut self, n1: usize) -> CoverResult<()> {
        let directive = self.annotated[n1];

        let following = self.annotated.get(n1 + 1).and_then(|l| syntax::il_label(l));
        if let Some(label) = following {
            self.seek_label(label, directive)?;
            self.merged.insert(self.cursor, directive.to_string());
            self.cursor += 1;
            return Ok(());
        }

        let preceding = n1
            .checked_sub(1)
            .and_then(|p| syntax::il_label(self.annotated[p]));
        if let Some(label) = preceding {
            self.seek_label(label, directive)?;
            self.merged.insert(self.cursor + 1, directive.to_string());
            self.cursor += 1;
            return Ok(());
        }

        Err(CoverError::SyncFailed { directive: directive.to_string() })
    }

    /// Advance the cursor to the merged line carrying `label`.
    ///
    /// Hitting a method boundary first means the label exists only in the
    /// annotated disassembly, which the merge must not tolerate.
    fn seek_label(&mut self, label: &str, directive: &str) -> CoverResult<()> {
        while self.cursor < self.merged.len() {
            let line = &self.merged[self.cursor];
            if syntax::is_method_boundary(line) {
                return Err(CoverError::SyncFailed { directive: directive.to_string() });
            }
            if syntax::il_label(line) == Some(label) {
                return Ok(());
            }
            self.cursor += 1;
        }
        Err(CoverError::SyncFailed { directive: directive.to_string() })
    }
}
