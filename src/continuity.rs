//! File-to-file continuity classification
//!
//! A [`ContinuityChecker`] carries the end time and identity of the last
//! non-empty file it has seen and compares each new file's first segment
//! against it:
//!
//! ```text
//! diff = previous_end + interval - start
//! diff < 0 and |diff| > tolerance * interval  => gap of |diff|
//! diff > 0 and  diff  > tolerance * interval  => overlap of diff
//! otherwise                                    => contiguous
//! ```
//!
//! Files must be fed in their listing order; reordering changes the result.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use log::warn;

use crate::error::{MseedError, Result};
use crate::types::{FileIdentity, Segment};
use crate::utils::seconds_between;
use crate::DEFAULT_TOLERANCE;

/// Allowed timing slack, as a fraction of the expected sample interval
///
/// # Examples
///
/// ```rust
/// use mseedcheck::Tolerance;
///
/// let tol: Tolerance = "0.25".parse()?;
/// assert_eq!(tol.threshold(2.0), 0.5);
/// assert!("-1".parse::<Tolerance>().is_err());
/// # Ok::<(), mseedcheck::MseedError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance(f64);

impl Tolerance {
    /// # Errors
    ///
    /// * `MseedError::InvalidTolerance` - negative, NaN or infinite
    pub fn new(fraction: f64) -> Result<Self> {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(MseedError::InvalidTolerance(fraction.to_string()));
        }
        Ok(Tolerance(fraction))
    }

    pub fn fraction(&self) -> f64 {
        self.0
    }

    /// Largest |diff| still considered contiguous for `interval`
    pub fn threshold(&self, interval: f64) -> f64 {
        self.0 * interval
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance(DEFAULT_TOLERANCE)
    }
}

impl FromStr for Tolerance {
    type Err = MseedError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| MseedError::InvalidTolerance(s.to_string()))?;
        Tolerance::new(value)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of one file-to-file transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Contiguous,
    /// Missing data, magnitude in seconds
    Gap(f64),
    /// Duplicated time span, magnitude in seconds
    Overlap(f64),
}

impl Transition {
    /// Signed duration as written to the gap report: positive for gaps,
    /// negative for overlaps
    pub fn signed_seconds(&self) -> f64 {
        match *self {
            Transition::Contiguous => 0.0,
            Transition::Gap(s) => s,
            Transition::Overlap(s) => -s,
        }
    }
}

/// Classifies `diff = previous_end + interval - start`
///
/// Values inside the closed band `[-tolerance*interval, tolerance*interval]`
/// are contiguous.
pub fn classify(diff: f64, interval: f64, tolerance: Tolerance) -> Transition {
    let threshold = tolerance.threshold(interval);
    if diff < 0.0 && diff.abs() > threshold {
        Transition::Gap(diff.abs())
    } else if diff > 0.0 && diff > threshold {
        Transition::Overlap(diff)
    } else {
        Transition::Contiguous
    }
}

/// Number of discontinuities inside a file split into `segments`
pub fn internal_gaps(segments: &[Segment]) -> usize {
    segments.len().saturating_sub(1)
}

/// The last non-empty file evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct LastFile {
    pub identity: FileIdentity,
    pub end_time: NaiveDateTime,
}

/// Cross-file memory of a checking run; `None` until the first usable file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinuityState {
    last: Option<LastFile>,
}

impl ContinuityState {
    pub fn last(&self) -> Option<&LastFile> {
        self.last.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}

/// A transition that was actually evaluated against a predecessor
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub previous: FileIdentity,
    pub transition: Transition,
}

/// Stateful classifier of consecutive files
#[derive(Debug, Clone, Default)]
pub struct ContinuityChecker {
    tolerance: Tolerance,
    state: ContinuityState,
}

impl ContinuityChecker {
    pub fn new(tolerance: Tolerance) -> Self {
        ContinuityChecker {
            tolerance,
            state: ContinuityState::default(),
        }
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn state(&self) -> &ContinuityState {
        &self.state
    }

    /// Evaluates `file` against the carried state and advances the state
    ///
    /// Returns `None` when no transition was evaluated: the file has no
    /// segments (state untouched) or it is the first usable file of the run.
    /// The new state takes `trailer_end` as the file's end time; when the
    /// trailer is unavailable the latest decoded segment end is used.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use mseedcheck::{ContinuityChecker, FileIdentity, Segment, SourceId, Tolerance, Transition};
    ///
    /// let t = |s: u32| NaiveDate::from_ymd_opt(2015, 1, 3).unwrap().and_hms_opt(0, 0, s).unwrap();
    /// let seg = |s: u32| Segment {
    ///     source: SourceId::default(),
    ///     start: t(s),
    ///     sample_interval: 1.0,
    ///     sample_count: 10,
    /// };
    ///
    /// let mut checker = ContinuityChecker::new(Tolerance::default());
    /// let a = FileIdentity::from_path("A");
    /// let b = FileIdentity::from_path("B");
    ///
    /// assert!(checker.evaluate(&a, &[seg(1)], Some(t(10))).is_none());
    /// let event = checker.evaluate(&b, &[seg(13)], Some(t(22))).unwrap();
    /// assert_eq!(event.previous.name, "A");
    /// assert_eq!(event.transition, Transition::Gap(2.0));
    /// ```
    pub fn evaluate(
        &mut self,
        file: &FileIdentity,
        segments: &[Segment],
        trailer_end: Option<NaiveDateTime>,
    ) -> Option<TransitionEvent> {
        let first = segments.first()?;

        let event = self.state.last.as_ref().map(|last| {
            let interval = first.sample_interval;
            let diff = seconds_between(&first.start, &last.end_time) + interval;
            TransitionEvent {
                previous: last.identity.clone(),
                transition: classify(diff, interval, self.tolerance),
            }
        });

        let end_time = match trailer_end {
            Some(end) => end,
            None => {
                // segments非空，max必然存在
                let latest = segments.iter().map(Segment::end_time).max().unwrap_or(first.start);
                warn!(
                    "{}: trailer end time unavailable, using decoded end {}",
                    file.name, latest
                );
                latest
            }
        };

        self.state.last = Some(LastFile {
            identity: file.clone(),
            end_time,
        });

        event
    }
}
