//! ilcover CLI: instrument IL modules and report code coverage.
//!
//! ## Usage
//!
//! ```bash
//! ilcover --dir P:/Bin --run-exe PSITest.exe parser.dll
//! ilcover --dir ./bin --run-exe app.exe a.dll b.dll --report-dir ./coverage
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ilcover::Analyzer;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Bytecode-level code coverage for IL modules
#[derive(Debug, Parser)]
#[command(name = "ilcover", version, about)]
struct Cli {
    /// Working directory holding the modules and the assembler tools
    #[arg(long, env = "ILCOVER_DIR")]
    dir: PathBuf,

    /// Entry executable to run after instrumentation
    #[arg(long)]
    run_exe: String,

    /// Module file names to instrument, relative to the working directory
    #[arg(required = true)]
    modules: Vec<String>,

    /// Where to write the HTML reports (default: <dir>/HTML)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// More log output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ilcover::CoverResult<()> {
    let mut analyzer = Analyzer::new(&cli.dir, cli.run_exe, cli.modules);
    if let Some(report_dir) = cli.report_dir {
        analyzer = analyzer.with_report_dir(report_dir);
    }
    let summary = analyzer.summary_path();
    let rows = analyzer.run()?;

    for row in &rows {
        println!(
            "{:40} {:>6} blocks {:>6} covered {:>6.1}%",
            row.file, row.total_blocks, row.hit_blocks, row.percent
        );
    }
    println!("report: {}", summary.display());
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_modules_and_flags() {
        let cli = Cli::parse_from([
            "ilcover",
            "--dir",
            "/work",
            "--run-exe",
            "app.exe",
            "--report-dir",
            "/reports",
            "-v",
            "a.dll",
            "b.dll",
        ]);
        assert_eq!(cli.dir, PathBuf::from("/work"));
        assert_eq!(cli.run_exe, "app.exe");
        assert_eq!(cli.modules, vec!["a.dll", "b.dll"]);
        assert_eq!(cli.report_dir, Some(PathBuf::from("/reports")));
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn modules_are_required() {
        assert!(Cli::try_parse_from(["ilcover", "--dir", "/w", "--run-exe", "x.exe"]).is_err());
    }
}
