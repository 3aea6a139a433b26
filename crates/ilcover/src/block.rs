//! Coverage block model.
//!
//! A [`Block`] is the fundamental coverage unit: one contiguous,
//! non-branching source region behind a single probe. Blocks are allocated
//! by the injector in document order, are immutable afterwards, and their
//! ids double as indices into the hit trace.

use std::fmt;

use crate::syntax::LineDirective;

/// Scale folding a (line, column) pair into one ordering key.
///
/// Larger than any realistic column count; used only for interval
/// comparison, never for column arithmetic.
const POSITION_SCALE: u32 = 10_000;

/// One contiguous source region instrumented with exactly one probe.
///
/// Lines and columns are 0-based inclusive; directive values are 1-based,
/// the shift happens in [`BlockAllocator::allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Sequential id, unique per run, index into the hit trace
    pub id: usize,
    /// Source file path
    pub file: String,
    /// First covered line, 0-based inclusive
    pub start_line: u32,
    /// Last covered line, 0-based inclusive
    pub end_line: u32,
    /// First covered column, 0-based inclusive
    pub start_col: u32,
    /// Last covered column, 0-based inclusive
    pub end_col: u32,
}

impl Block {
    /// Ordering key of the block's start.
    #[must_use]
    pub fn start_position(&self) -> u32 {
        self.start_line * POSITION_SCALE + self.start_col
    }

    /// Ordering key of the block's end.
    #[must_use]
    pub fn end_position(&self) -> u32 {
        self.end_line * POSITION_SCALE + self.end_col
    }

    /// Whether `other` lies entirely within this block.
    ///
    /// Requires the same file; comparison is by position keys on both ends.
    #[must_use]
    pub fn contains(&self, other: &Block) -> bool {
        self.file == other.file
            && other.start_position() >= self.start_position()
            && other.end_position() <= self.end_position()
    }

    /// Whether `other` starts inside this block but ends past it.
    ///
    /// Such pairs cannot be rendered as nested spans and are rejected by the
    /// renderer's consistency check.
    #[must_use]
    pub fn overlaps(&self, other: &Block) -> bool {
        self.file == other.file
            && other.start_position() <= self.end_position()
            && other.end_position() > self.end_position()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{} : {},{} of {}",
            self.start_line, self.end_line, self.start_col, self.end_col, self.file
        )
    }
}

/// Allocates blocks with sequential ids, threading the "last seen file"
/// through directives that elide the file name.
///
/// One allocator lives for one instrumentation run, shared across modules so
/// ids stay globally sequential and trace-aligned.
#[derive(Debug, Default)]
pub struct BlockAllocator {
    next_id: usize,
    last_file: String,
}

impl BlockAllocator {
    /// Create a fresh allocator with no blocks and no remembered file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks allocated so far; also the next id.
    #[must_use]
    pub fn count(&self) -> usize {
        self.next_id
    }

    /// Build the next block from a directive, shifting the 1-based directive
    /// fields to 0-based and inheriting the last seen file when the
    /// directive's file is empty.
    pub fn allocate(&mut self, directive: &LineDirective) -> Block {
        let file = if directive.file.is_empty() {
            self.last_file.clone()
        } else {
            directive.file.clone()
        };
        self.last_file = file.clone();

        let id = self.next_id;
        self.next_id += 1;
        Block {
            id,
            file,
            start_line: directive.start_line.saturating_sub(1),
            end_line: directive.end_line.saturating_sub(1),
            start_col: directive.start_col.saturating_sub(1),
            end_col: directive.end_col.saturating_sub(1),
        }
    }
}
