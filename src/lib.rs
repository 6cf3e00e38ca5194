//! # miniSEED continuity checker
//!
//! A pure Rust library and command line tool for checking a series of
//! miniSEED waveform files for integrity and time continuity.
//!
//! Files are checked in the order given. For each one the checker reports
//! whether it could be decoded at all, the latest structural warning raised
//! while decoding, whether its first sample follows on from the end of the
//! previous usable file (gap or overlap beyond a tolerance) and how many
//! discontinuities it contains internally. A summary line closes the run.
//!
//! ## Quick Start
//!
//! ### Checking a series of files
//!
//! ```rust
//! use chrono::NaiveDate;
//! use mseedcheck::{Auditor, CheckOptions, MseedDecoder, MseedWriter, SourceId, Result};
//!
//! fn main() -> Result<()> {
//!     let start = NaiveDate::from_ymd_opt(2015, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!     let source = SourceId::new("XX", "TEST", "", "BHZ");
//!
//!     // Two hours of 1 Hz data with a 30 s hole between the files
//!     let mut writer = MseedWriter::create("day_a.mseed", source.clone())?;
//!     let next = writer.write_samples(start, 1.0, &vec![0; 3600])?;
//!     writer.finalize()?;
//!
//!     let mut writer = MseedWriter::create("day_b.mseed", source)?;
//!     writer.write_samples(next + chrono::Duration::seconds(30), 1.0, &vec![0; 3600])?;
//!     writer.finalize()?;
//!
//!     let mut out = Vec::new();
//!     let mut auditor = Auditor::new(MseedDecoder, CheckOptions::default(), &mut out);
//!     auditor.run(["day_a.mseed", "day_b.mseed"])?;
//!     let stats = auditor.finish()?;
//!
//!     assert_eq!(stats.gaps, 1);
//!     assert_eq!(
//!         String::from_utf8_lossy(&out),
//!         "day_b.mseed: 30.0000 s gap from day_a.mseed\n\
//!          2 files checked, 0 errors, 1 gap, 0 overlaps\n"
//!     );
//!     # std::fs::remove_file("day_a.mseed").ok();
//!     # std::fs::remove_file("day_b.mseed").ok();
//!     Ok(())
//! }
//! ```
//!
//! ### Reading segments directly
//!
//! ```rust
//! use mseedcheck::{MseedReader, Result};
//!
//! fn main() -> Result<()> {
//!     # mseedcheck::doctest_utils::create_simple_test_file("lib_example.mseed")?;
//!     let reader = MseedReader::open("lib_example.mseed")?;
//!     let decoded = reader.read_segments()?;
//!
//!     for segment in &decoded.segments {
//!         println!("{}", segment);
//!     }
//!     for warning in &decoded.warnings {
//!         println!("warning: {}", warning);
//!     }
//!     # std::fs::remove_file("lib_example.mseed").ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Tolerance
//!
//! The tolerance is a fraction of the sample interval of the incoming file.
//! With the default of 0.1 a 100 Hz file may start up to 1 ms early or late
//! without being reported.

pub mod audit;
pub mod codec;
pub mod continuity;
pub mod decoder;
pub mod error;
pub mod inputs;
pub mod reader;
pub mod record;
pub mod report;
pub mod stats;
pub mod types;
pub mod utils;
pub mod writer;

#[doc(hidden)]
pub mod doctest_utils; // For internal doctest support

// Re-export main types for convenience
pub use audit::{check_file, Auditor, CheckContext, CheckOptions, FileInput, Finding};
pub use continuity::{classify, ContinuityChecker, ContinuityState, LastFile, Tolerance, Transition, TransitionEvent};
pub use decoder::{DecodeOutcome, MseedDecoder, SegmentDecoder, TrailerInspector};
pub use error::{MseedError, Result};
pub use reader::{DecodedFile, MseedReader};
pub use report::GapReportWriter;
pub use stats::CheckStats;
pub use types::{ByteOrder, Encoding, FileIdentity, FormatWarning, Segment, SourceId, WarningKind};
pub use writer::MseedWriter;

// Important constants
pub const DEFAULT_TOLERANCE: f64 = 0.1;
/// Format name used in "undecodeable" reports
pub const DECODER_NAME: &str = "MSEED";
pub const MIN_RECORD_LENGTH: usize = 128;
pub const MAX_RECORD_LENGTH: usize = 65536;

/// Library version
///
/// Returns the current version of the mseedcheck library.
///
/// # Examples
///
/// ```rust
/// let version = mseedcheck::version();
/// assert!(!version.is_empty());
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
