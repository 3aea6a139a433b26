//! Pipeline driver.
//!
//! Runs the full coverage pass over a module set, strictly sequentially:
//! backup, disassemble twice and synchronize, inject probes, assemble, run
//! the instrumented program, interpret the hit trace, render reports.
//! Backups are restored unconditionally, whether the stages succeeded or
//! not; restoration is the only cleanup any failure path is guaranteed.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::block::{Block, BlockAllocator};
use crate::error::CoverResult;
use crate::instrument;
use crate::process::exec_program;
use crate::report::{Renderer, SummaryRow, SummaryTable};
use crate::sync::synchronize;
use crate::trace::HitTrace;

/// Name of the hit-count artifact the instrumented program writes.
const HITS_FILE: &str = "hits.txt";

/// Coverage analyzer for one working directory and module set.
#[derive(Debug)]
pub struct Analyzer {
    dir: PathBuf,
    run_exe: String,
    modules: Vec<String>,
    report_dir: PathBuf,
}

impl Analyzer {
    /// Create an analyzer rooted at `dir`, running `run_exe` over the given
    /// module binaries. Reports default to `<dir>/HTML`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, run_exe: impl Into<String>, modules: Vec<String>) -> Self {
        let dir = dir.into();
        let report_dir = dir.join("HTML");
        Self {
            dir,
            run_exe: run_exe.into(),
            modules,
            report_dir,
        }
    }

    /// Override where the HTML reports are written.
    #[must_use]
    pub fn with_report_dir(mut self, report_dir: impl Into<PathBuf>) -> Self {
        self.report_dir = report_dir.into();
        self
    }

    /// Where the summary document ends up.
    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.report_dir.join("summary.html")
    }

    /// Run the whole pipeline. Returns the per-file summary rows.
    pub fn run(&self) -> CoverResult<Vec<SummaryRow>> {
        for module in &self.modules {
            self.make_backup(module)?;
        }
        let result = self.run_stages();
        for module in &self.modules {
            // Must happen on failure too; a restore error on the failure
            // path is logged rather than masking the primary error.
            if let Err(e) = self.restore_backup(module) {
                warn!("restoring backup of {module} failed: {e}");
            }
        }
        result
    }

    fn run_stages(&self) -> CoverResult<Vec<SummaryRow>> {
        for module in &self.modules {
            self.disassemble(module)?;
        }

        let mut allocator = BlockAllocator::new();
        let mut blocks: Vec<Block> = Vec::new();
        for module in &self.modules {
            blocks.extend(self.add_instrumentation(module, &mut allocator)?);
        }
        for module in &self.modules {
            self.assemble(module)?;
        }

        self.run_program()?;

        let trace = HitTrace::from_file(self.dir.join(HITS_FILE))?;
        let rows = Renderer::new(&blocks, &trace).render_all(&self.report_dir)?;

        let table = SummaryTable::new(&rows);
        table.save(self.summary_path())?;
        table.save_json(self.report_dir.join("summary.json"))?;
        Ok(rows)
    }

    /// Copy the module binary and its debug-info sidecar to `Backups/`.
    fn make_backup(&self, module: &str) -> CoverResult<()> {
        info!("making backups of {module}");
        let backups = self.dir.join("Backups");
        std::fs::create_dir_all(&backups)?;
        std::fs::copy(self.dir.join(module), backups.join(module))?;
        let pdb = sidecar(module);
        std::fs::copy(self.dir.join(&pdb), backups.join(&pdb))?;
        Ok(())
    }

    /// Copy the module binary and sidecar back from `Backups/`.
    fn restore_backup(&self, module: &str) -> CoverResult<()> {
        info!("restoring backups of {module}");
        let backups = self.dir.join("Backups");
        std::fs::copy(backups.join(module), self.dir.join(module))?;
        let pdb = sidecar(module);
        std::fs::copy(backups.join(&pdb), self.dir.join(&pdb))?;
        Ok(())
    }

    /// Disassemble the module twice and persist the synchronized merge as
    /// `<stem>.original.asm`, discarding the two temporary disassemblies.
    fn disassemble(&self, module: &str) -> CoverResult<()> {
        info!("disassembling {module}");
        let lines_asm = self.dir.join("lines.asm");
        let nolines_asm = self.dir.join("nolines.asm");
        let module_path = self.dir.join(module);

        exec_program(
            self.dir.join("ASMFramework/ildasm.exe"),
            [
                "/LINENUM".to_string(),
                "/TOKENS".to_string(),
                format!("/out={}", lines_asm.display()),
                module_path.display().to_string(),
            ],
        )?;
        exec_program(
            self.dir.join("ASMCore/ildasm.exe"),
            [
                "/TOKENS".to_string(),
                format!("/out={}", nolines_asm.display()),
                module_path.display().to_string(),
            ],
        )?;

        let annotated = std::fs::read_to_string(&lines_asm)?;
        let tokens = std::fs::read_to_string(&nolines_asm)?;
        let merged = synchronize(&annotated, &tokens)?;

        std::fs::write(
            self.dir.join(format!("{}.original.asm", stem(module))),
            merged.join("\n"),
        )?;
        std::fs::remove_file(&lines_asm)?;
        std::fs::remove_file(&nolines_asm)?;
        Ok(())
    }

    /// Inject probes into the merged stream, writing `<stem>.asm` for the
    /// assembler and returning the module's blocks.
    fn add_instrumentation(
        &self,
        module: &str,
        allocator: &mut BlockAllocator,
    ) -> CoverResult<Vec<Block>> {
        info!("instrumenting {module}");
        let stem = stem(module);
        let merged = std::fs::read_to_string(self.dir.join(format!("{stem}.original.asm")))?;
        let lines: Vec<String> = merged.lines().map(String::from).collect();

        let instrumented = instrument::instrument(&lines, allocator)?;
        std::fs::write(
            self.dir.join(format!("{stem}.asm")),
            instrumented.lines.join("\n"),
        )?;
        Ok(instrumented.blocks)
    }

    /// Assemble `<stem>.asm` back into the module binary, overwriting it.
    fn assemble(&self, module: &str) -> CoverResult<()> {
        info!("assembling {module}");
        let module_path = self.dir.join(module);
        std::fs::remove_file(&module_path)?;
        exec_program(
            self.dir.join("ASMCore/ilasm.exe"),
            [
                "/QUIET".to_string(),
                "/dll".to_string(),
                "/PE64".to_string(),
                "/X64".to_string(),
                self.dir.join(format!("{}.asm", stem(module))).display().to_string(),
                format!("/output={}", module_path.display()),
            ],
        )?;
        Ok(())
    }

    /// Run the instrumented program to gather the hit trace.
    fn run_program(&self) -> CoverResult<()> {
        info!("running {}", self.run_exe);
        exec_program(self.dir.join(&self.run_exe), std::iter::empty::<&str>())
    }
}

fn stem(module: &str) -> String {
    Path::new(module)
        .file_stem()
        .map_or_else(|| module.to_string(), |s| s.to_string_lossy().into_owned())
}

fn sidecar(module: &str) -> String {
    format!("{}.pdb", stem(module))
}
