//! Hit trace interpreter.
//!
//! The instrumented program writes one non-negative integer per line, line
//! `i` holding the hit count of block id `i`. Interpretation is a direct
//! index lookup; the only failure modes are a malformed count and a trace
//! shorter than the number of blocks allocated.

use std::path::Path;

use crate::block::Block;
use crate::error::{CoverError, CoverResult};

/// The ordered per-block hit counts of one run.
#[derive(Debug, Clone)]
pub struct HitTrace {
    counts: Vec<u64>,
}

impl HitTrace {
    /// Parse a trace from its textual form, one count per line.
    pub fn parse(text: &str) -> CoverResult<Self> {
        let mut counts = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let count = line.parse().map_err(|_| CoverError::MalformedTrace {
                line_no: idx + 1,
                text: line.to_string(),
            })?;
            counts.push(count);
        }
        Ok(Self { counts })
    }

    /// Read and parse the runner's trace artifact.
    pub fn from_file(path: impl AsRef<Path>) -> CoverResult<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Number of entries in the trace.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the trace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Fail unless the trace covers `block_count` blocks.
    pub fn ensure_covers(&self, block_count: usize) -> CoverResult<()> {
        if self.counts.len() < block_count {
            return Err(CoverError::TraceTooShort {
                expected: block_count,
                actual: self.counts.len(),
            });
        }
        Ok(())
    }

    /// Hit count of the given block id; ids past the trace read as zero.
    #[must_use]
    pub fn hit_count(&self, id: usize) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Whether the block was entered at least once.
    #[must_use]
    pub fn is_hit(&self, id: usize) -> bool {
        self.hit_count(id) > 0
    }

    /// Number of the given blocks that were hit at least once.
    #[must_use]
    pub fn hit_block_count(&self, blocks: &[Block]) -> usize {
        blocks.iter().filter(|b| self.is_hit(b.id)).count()
    }
}
