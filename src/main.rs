//! `check_mseed` command.
//!
//! Checks a series of miniSEED files for decode errors, structural warnings,
//! gaps and overlaps between consecutive files, and gaps inside files.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use mseedcheck::inputs::expand_patterns;
use mseedcheck::{Auditor, CheckOptions, GapReportWriter, MseedDecoder, Tolerance};

#[derive(Parser, Debug)]
#[command(
    name = "check_mseed",
    about = "Check miniSEED files for integrity and time continuity",
    version,
    long_about = "check_mseed: miniSEED continuity checker\n\nFiles are checked in the order given. Each file's first sample is compared\nwith the end of the previous decodable file; differences larger than the\ntolerance are reported as gaps or overlaps."
)]
struct Cli {
    /// Also list the segments of every file
    #[arg(short, long)]
    verbose: bool,

    /// Tolerance as a fraction of the sample interval
    #[arg(short, long, default_value = "0.1")]
    tolerance: Tolerance,

    /// Append gaps (positive) and overlaps (negative) to this file
    #[arg(short = 'g', long = "gap-report", value_name = "FILE")]
    gap_report: Option<PathBuf>,

    /// Files, directories or wildcard patterns, checked in order
    #[arg(required = true, value_name = "PATTERN")]
    patterns: Vec<String>,
}

fn run(cli: Cli) -> Result<()> {
    let files = expand_patterns(&cli.patterns);
    info!("checking {} files with tolerance {}", files.len(), cli.tolerance);

    let options = CheckOptions {
        tolerance: cli.tolerance,
        verbose: cli.verbose,
    };

    let mut auditor = Auditor::new(MseedDecoder, options, io::stdout().lock());
    if let Some(path) = &cli.gap_report {
        let report =
            GapReportWriter::open(path).with_context(|| format!("cannot open gap report {}", path.display()))?;
        auditor = auditor.with_report(report);
    }

    auditor.run(&files).context("failed to write results")?;
    auditor.finish().context("failed to write summary")?;
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
