//! Per-file audit loop
//!
//! [`check_file`] is the pure core: it takes one file's decode result and
//! trailer time, updates an explicit [`CheckContext`] and returns the
//! findings to report. [`Auditor`] drives it over a list of paths with a
//! concrete decoder, writing findings to an output sink and cross-file
//! events to an optional gap report.

use std::fmt;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use log::debug;

use crate::continuity::{internal_gaps, ContinuityChecker, Tolerance, Transition};
use crate::decoder::{DecodeOutcome, SegmentDecoder, TrailerInspector};
use crate::error::Result;
use crate::report::GapReportWriter;
use crate::stats::CheckStats;
use crate::types::{FileIdentity, Segment};
use crate::utils::plural;

/// Settings of one checking run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CheckOptions {
    pub tolerance: Tolerance,
    /// Also list each file's segments
    pub verbose: bool,
}

/// All mutable state of a checking run
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    pub checker: ContinuityChecker,
    pub stats: CheckStats,
}

impl CheckContext {
    pub fn new(tolerance: Tolerance) -> Self {
        CheckContext {
            checker: ContinuityChecker::new(tolerance),
            stats: CheckStats::default(),
        }
    }
}

/// Everything the core needs to know about one file
#[derive(Debug, Clone)]
pub struct FileInput {
    pub identity: FileIdentity,
    pub decoder: String,
    pub outcome: DecodeOutcome,
    /// `None` when the trailer could not be read
    pub trailer_end: Option<NaiveDateTime>,
}

/// One reportable line produced while checking a file
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Undecodeable { file: String, decoder: String },
    FormatError { file: String, message: String },
    Gap { file: String, previous: FileIdentity, seconds: f64 },
    Overlap { file: String, previous: FileIdentity, seconds: f64 },
    /// Discontinuities inside a single file
    DataGaps { file: String, count: usize },
    /// Segment listing, verbose mode only
    Contents { segments: Vec<Segment> },
}

impl Finding {
    /// Gap-report entry for cross-file events: previous file path and
    /// signed seconds
    pub fn report_entry(&self) -> Option<(&Path, f64)> {
        match self {
            Finding::Gap { previous, seconds, .. } => Some((previous.path.as_path(), *seconds)),
            Finding::Overlap { previous, seconds, .. } => Some((previous.path.as_path(), -*seconds)),
            _ => None,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Undecodeable { file, decoder } => write!(f, "{}: {} undecodeable", file, decoder),
            Finding::FormatError { file, message } => write!(f, "{}: format error: {}", file, message),
            Finding::Gap { file, previous, seconds } => {
                write!(f, "{}: {:.4} s gap from {}", file, seconds, previous.name)
            }
            Finding::Overlap { file, previous, seconds } => {
                write!(f, "{}: {:.4} s overlap with {}", file, seconds, previous.name)
            }
            Finding::DataGaps { file, count } => write!(f, "{}: {} data gap{}", file, count, plural(*count)),
            Finding::Contents { segments } => {
                write!(f, "{} Trace(s) in Stream:", segments.len())?;
                for segment in segments {
                    write!(f, "\n{}", segment)?;
                }
                Ok(())
            }
        }
    }
}

/// Checks one file against the running context
///
/// Undecodeable files count as an error and leave the continuity state
/// alone; they are not counted as checked. For decoded files only the most
/// recent format warning is reported, and at most one error is counted.
pub fn check_file(ctx: &mut CheckContext, input: FileInput, verbose: bool) -> Vec<Finding> {
    let FileInput {
        identity,
        decoder,
        outcome,
        trailer_end,
    } = input;
    let mut findings = Vec::new();

    let decoded = match outcome {
        DecodeOutcome::Decoded(decoded) => decoded,
        DecodeOutcome::Undecodeable { reason } => {
            debug!("{}: {}", identity.path.display(), reason);
            ctx.stats.record_error();
            findings.push(Finding::Undecodeable {
                file: identity.name,
                decoder,
            });
            return findings;
        }
    };

    if let Some(latest) = decoded.warnings.last() {
        ctx.stats.record_error();
        if decoded.warnings.len() > 1 {
            debug!(
                "{}: {} earlier format warnings not reported",
                identity.name,
                decoded.warnings.len() - 1
            );
        }
        findings.push(Finding::FormatError {
            file: identity.name.clone(),
            message: latest.to_string(),
        });
    }

    if let Some(event) = ctx.checker.evaluate(&identity, &decoded.segments, trailer_end) {
        match event.transition {
            Transition::Gap(seconds) => {
                ctx.stats.record_gaps(1);
                findings.push(Finding::Gap {
                    file: identity.name.clone(),
                    previous: event.previous,
                    seconds,
                });
            }
            Transition::Overlap(seconds) => {
                ctx.stats.record_overlap();
                findings.push(Finding::Overlap {
                    file: identity.name.clone(),
                    previous: event.previous,
                    seconds,
                });
            }
            Transition::Contiguous => {}
        }
    }

    let internal = internal_gaps(&decoded.segments);
    if internal > 0 {
        ctx.stats.record_gaps(internal);
        findings.push(Finding::DataGaps {
            file: identity.name.clone(),
            count: internal,
        });
    }

    if verbose {
        findings.push(Finding::Contents {
            segments: decoded.segments,
        });
    }

    ctx.stats.record_file_checked();
    findings
}

/// Drives [`check_file`] over files in order
///
/// # Examples
///
/// ```rust
/// use mseedcheck::{Auditor, CheckOptions, MseedDecoder};
///
/// # mseedcheck::doctest_utils::create_simple_test_file("auditor_example.mseed")?;
/// let mut out = Vec::new();
/// let mut auditor = Auditor::new(MseedDecoder, CheckOptions::default(), &mut out);
/// auditor.run(["auditor_example.mseed"])?;
/// let stats = auditor.finish()?;
///
/// assert_eq!(stats.files_checked, 1);
/// assert_eq!(String::from_utf8_lossy(&out), "1 file checked, 0 errors, 0 gaps, 0 overlaps\n");
/// # std::fs::remove_file("auditor_example.mseed").ok();
/// # Ok::<(), mseedcheck::MseedError>(())
/// ```
pub struct Auditor<D, W> {
    decoder: D,
    options: CheckOptions,
    context: CheckContext,
    report: Option<GapReportWriter>,
    out: W,
}

impl<D, W> Auditor<D, W>
where
    D: SegmentDecoder + TrailerInspector,
    W: Write,
{
    pub fn new(decoder: D, options: CheckOptions, out: W) -> Self {
        Auditor {
            decoder,
            options,
            context: CheckContext::new(options.tolerance),
            report: None,
            out,
        }
    }

    /// Journals cross-file gaps and overlaps to `report`
    pub fn with_report(mut self, report: GapReportWriter) -> Self {
        self.report = Some(report);
        self
    }

    pub fn stats(&self) -> CheckStats {
        self.context.stats
    }

    pub fn context(&self) -> &CheckContext {
        &self.context
    }

    /// Checks every path in order
    pub fn run<I, P>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.check_path(path.as_ref())?;
        }
        Ok(())
    }

    /// Decodes and checks one file, writing its findings
    ///
    /// Only I/O failures on the output or report sinks are errors; problems
    /// with the file itself become findings.
    pub fn check_path(&mut self, path: &Path) -> Result<Vec<Finding>> {
        let identity = FileIdentity::from_path(path);
        let outcome = self.decoder.decode(path);

        // 只有解码出数据段的文件才需要读取尾记录
        let trailer_end = match &outcome {
            DecodeOutcome::Decoded(decoded) if !decoded.segments.is_empty() => {
                match self.decoder.trailer_end_time(path) {
                    Ok(end) => Some(end),
                    Err(e) => {
                        debug!("{}: trailer unreadable: {}", path.display(), e);
                        None
                    }
                }
            }
            _ => None,
        };

        let input = FileInput {
            identity,
            decoder: self.decoder.name().to_string(),
            outcome,
            trailer_end,
        };
        let findings = check_file(&mut self.context, input, self.options.verbose);

        for finding in &findings {
            writeln!(self.out, "{}", finding)?;
            if let (Some(report), Some((previous, seconds))) = (self.report.as_mut(), finding.report_entry()) {
                report.record(previous, seconds)?;
            }
        }

        Ok(findings)
    }

    /// Writes the summary line and returns the final counters
    pub fn finish(mut self) -> Result<CheckStats> {
        let stats = self.context.stats;
        writeln!(self.out, "{}", stats)?;
        self.out.flush()?;
        Ok(stats)
    }
}
