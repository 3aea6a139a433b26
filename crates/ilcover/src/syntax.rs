//! Grammar of the disassembly annotations this engine cares about.
//!
//! Three token shapes drive the whole pipeline:
//!
//! - line directives: `.line <sl>,<el> : <sc>,<ec> '<file>'`
//! - instruction labels: `IL_` + exactly four hex digits + `:`
//! - method boundaries: lines beginning with `.method /*`
//!
//! Everything else in a disassembly is carried through opaquely.

use std::sync::LazyLock;

use regex::Regex;

/// Reserved startLine value meaning "no source mapping" (`0xFEEFEE`).
///
/// Directives carrying this value are ignored by both the synchronizer and
/// the injector.
pub const NO_SOURCE_LINE: u32 = 16_707_566;

static LINE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.line (\d+),(\d+) : (\d+),(\d+) '(.*)'").unwrap());

static IL_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^IL_[0-9a-fA-F]{4}:").unwrap());

/// A parsed `.line` directive, fields exactly as written (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDirective {
    /// First source line, 1-based inclusive
    pub start_line: u32,
    /// Last source line, 1-based inclusive
    pub end_line: u32,
    /// First source column, 1-based inclusive
    pub start_col: u32,
    /// Last source column, 1-based inclusive
    pub end_col: u32,
    /// Source file path; empty when the directive inherits the last seen file
    pub file: String,
}

impl LineDirective {
    /// Parse a directive out of a disassembly line.
    ///
    /// Returns `None` when the line does not match the grammar; callers that
    /// already know the line starts with `.line ` treat that as fatal.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LINE_DIRECTIVE.captures(line)?;
        // The four numeric groups are \d+ so the parses cannot fail; a value
        // too large for u32 is a grammar violation like any other.
        Some(Self {
            start_line: caps[1].parse().ok()?,
            end_line: caps[2].parse().ok()?,
            start_col: caps[3].parse().ok()?,
            end_col: caps[4].parse().ok()?,
            file: caps[5].to_string(),
        })
    }

    /// Whether this is the "no source mapping" sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.start_line == NO_SOURCE_LINE
    }
}

/// Whether the (trimmed) line is a `.line` directive of any kind.
#[must_use]
pub fn is_directive(line: &str) -> bool {
    line.trim_start().starts_with(".line")
}

/// Whether the (trimmed) line is the "no source mapping" sentinel directive.
#[must_use]
pub fn is_sentinel_directive(line: &str) -> bool {
    line.trim_start().starts_with(".line 16707566")
}

/// The `IL_xxxx:` label at the start of the (trimmed) line, if any.
#[must_use]
pub fn il_label(line: &str) -> Option<&str> {
    IL_LABEL.find(line.trim_start()).map(|m| m.as_str())
}

/// Whether the (trimmed) line is a method boundary marker.
#[must_use]
pub fn is_method_boundary(line: &str) -> bool {
    line.trim_start().starts_with(".method /*")
}
