//! Result and error types for ilcover.

use thiserror::Error;

/// Result type for coverage operations
pub type CoverResult<T> = Result<T, CoverError>;

/// Errors that can occur while instrumenting and reporting coverage.
///
/// All of these are fatal for the current run: there is no partial-success
/// mode and no retry. The pipeline driver still restores backups on every
/// failure path.
#[derive(Debug, Error)]
pub enum CoverError {
    /// A line directive's anchor label was not found in the token-only
    /// disassembly before the next method boundary
    #[error("could not match line directive against token stream: {directive}")]
    SyncFailed {
        /// The directive line that failed to anchor
        directive: String,
    },

    /// A method boundary present in the annotated disassembly never appears
    /// in the token-only disassembly
    #[error("method boundary not found in token-only disassembly: {line}")]
    MethodNotFound {
        /// The method marker line
        line: String,
    },

    /// A `.line` directive did not match the expected grammar
    #[error("unexpected .line directive shape: {line}")]
    MalformedDirective {
        /// The offending line
        line: String,
    },

    /// A hit-trace line was not a non-negative integer
    #[error("hit trace line {line_no} is not a count: {text:?}")]
    MalformedTrace {
        /// 1-based line number in the trace file
        line_no: usize,
        /// The offending text
        text: String,
    },

    /// The hit trace has fewer entries than blocks were instrumented
    #[error("hit trace has {actual} entries but {expected} blocks were instrumented")]
    TraceTooShort {
        /// Number of blocks allocated for the run
        expected: usize,
        /// Number of entries in the trace
        actual: usize,
    },

    /// Two surviving blocks overlap without one containing the other
    #[error("blocks overlap without nesting: {first} vs {second}")]
    OverlappingBlocks {
        /// The earlier block, in document order
        first: String,
        /// The later block
        second: String,
    },

    /// A block refers to a line the source file does not have
    #[error("{file} has no line {line}")]
    LineOutOfRange {
        /// Source file path
        file: String,
        /// 0-based line index
        line: usize,
    },

    /// A block column lies past the end of its source line
    #[error("column {col} is past the end of {file}:{line}")]
    ColumnOutOfRange {
        /// Source file path
        file: String,
        /// 0-based line index
        line: usize,
        /// 0-based column index
        col: usize,
    },

    /// An external tool exited with a non-zero code
    #[error("process {name} returned code {code}")]
    ProcessFailed {
        /// Program that failed
        name: String,
        /// Its exit code
        code: i32,
    },

    /// An external tool could not be launched at all
    #[error("failed to launch {name}: {source}")]
    ProcessSpawn {
        /// Program that could not be started
        name: String,
        /// Underlying launch error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while writing the JSON summary
    #[error("summary serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
