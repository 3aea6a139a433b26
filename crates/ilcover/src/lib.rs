//! ilcover: bytecode-level code coverage for IL modules.
//!
//! The engine reconciles two differently-formatted disassemblies of the same
//! binary to recover source positions, rewrites the instruction stream with
//! hit-counting probes, and turns the resulting hit trace into per-line
//! highlighted HTML reports plus a summary table.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐   ┌───────────┐
//! │ ildasm   │──►│ synchronize  │──►│ inject   │──►│ ilasm +   │
//! │ (twice)  │   │ directives   │   │ probes   │   │ run       │
//! └──────────┘   └──────────────┘   └──────────┘   └─────┬─────┘
//!                                                        │ hits.txt
//!                                   ┌──────────┐   ┌─────▼─────┐
//!                                   │ HTML +   │◄──│ interpret │
//!                                   │ summary  │   │ trace     │
//!                                   └──────────┘   └───────────┘
//! ```
//!
//! [`Analyzer`] drives the whole pipeline; the stage modules are usable on
//! their own for testing or embedding.

#![warn(missing_docs)]

pub mod block;
pub mod error;
pub mod instrument;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod sync;
pub mod syntax;
pub mod trace;

pub use block::{Block, BlockAllocator};
pub use error::{CoverError, CoverResult};
pub use instrument::{instrument, Instrumented};
pub use pipeline::Analyzer;
pub use report::{Renderer, SummaryRow, SummaryTable};
pub use sync::synchronize;
pub use syntax::LineDirective;
pub use trace::HitTrace;
