//! External process invocation.
//!
//! Every collaborator (disassembler, assembler, instrumented program) runs
//! synchronously; the pipeline blocks until it exits and treats a non-zero
//! exit code as fatal for the run.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{CoverError, CoverResult};

/// Run a program to completion, failing on a non-zero exit code.
///
/// Output streams are inherited so the tool's own diagnostics stay visible.
pub fn exec_program<I, S>(program: impl AsRef<Path>, args: I) -> CoverResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    debug!("executing {}", program.display());
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| CoverError::ProcessSpawn {
            name: program.display().to_string(),
            source,
        })?;
    if !status.success() {
        return Err(CoverError::ProcessFailed {
            name: program.display().to_string(),
            code: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}
