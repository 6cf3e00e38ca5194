//! Capabilities the checker needs from a waveform file format
//!
//! The audit loop only talks to these two traits, so any decoder that can
//! produce segments and a trailer end time is substitutable.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::reader::{DecodedFile, MseedReader};
use crate::DECODER_NAME;

/// Outcome of decoding one file
///
/// A failure is an ordinary value: the audit loop skips the file without
/// touching its continuity state.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Decoded(DecodedFile),
    Undecodeable { reason: String },
}

/// Turns a file into an ordered list of segments plus format warnings
pub trait SegmentDecoder {
    /// Short format name used in "undecodeable" reports
    fn name(&self) -> &str;

    fn decode(&self, path: &Path) -> DecodeOutcome;
}

/// Reports the end time of a file's last record without a full decode
pub trait TrailerInspector {
    fn trailer_end_time(&self, path: &Path) -> Result<NaiveDateTime>;
}

/// miniSEED implementation of both capabilities
#[derive(Debug, Clone, Copy, Default)]
pub struct MseedDecoder;

impl SegmentDecoder for MseedDecoder {
    fn name(&self) -> &str {
        DECODER_NAME
    }

    fn decode(&self, path: &Path) -> DecodeOutcome {
        match MseedReader::open(path).and_then(|reader| reader.read_segments()) {
            Ok(decoded) => DecodeOutcome::Decoded(decoded),
            Err(e) => DecodeOutcome::Undecodeable { reason: e.to_string() },
        }
    }
}

impl TrailerInspector for MseedDecoder {
    fn trailer_end_time(&self, path: &Path) -> Result<NaiveDateTime> {
        MseedReader::trailer_end_time(path)
    }
}
