use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::utils::{format_timestamp, seconds_to_duration};

/// Byte order of the multi-byte header fields and data words of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    pub fn u16(self, b: &[u8]) -> u16 {
        let raw = [b[0], b[1]];
        match self {
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
        }
    }

    pub fn i16(self, b: &[u8]) -> i16 {
        self.u16(b) as i16
    }

    pub fn u32(self, b: &[u8]) -> u32 {
        let raw = [b[0], b[1], b[2], b[3]];
        match self {
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
        }
    }

    pub fn i32(self, b: &[u8]) -> i32 {
        self.u32(b) as i32
    }

    pub fn u64(self, b: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&b[..8]);
        match self {
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
        }
    }
}

/// Data encoding declared in blockette 1000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Int16,
    Int32,
    Float32,
    Float64,
    Steim1,
    Steim2,
    Other(u8),
}

impl Encoding {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Encoding::Ascii,
            1 => Encoding::Int16,
            3 => Encoding::Int32,
            4 => Encoding::Float32,
            5 => Encoding::Float64,
            10 => Encoding::Steim1,
            11 => Encoding::Steim2,
            other => Encoding::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Encoding::Ascii => 0,
            Encoding::Int16 => 1,
            Encoding::Int32 => 3,
            Encoding::Float32 => 4,
            Encoding::Float64 => 5,
            Encoding::Steim1 => 10,
            Encoding::Steim2 => 11,
            Encoding::Other(code) => code,
        }
    }
}

/// SEED source identifier, rendered as `NET.STA.LOC.CHA`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl SourceId {
    pub fn new(network: &str, station: &str, location: &str, channel: &str) -> Self {
        SourceId {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.network, self.station, self.location, self.channel)
    }
}

/// An internally contiguous run of samples with a fixed sample interval
///
/// A file that decodes into N segments contains N-1 internal
/// discontinuities.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source: SourceId,
    pub start: NaiveDateTime,
    /// 采样间隔（秒）
    pub sample_interval: f64,
    pub sample_count: usize,
}

impl Segment {
    pub fn sample_rate(&self) -> f64 {
        1.0 / self.sample_interval
    }

    /// Time of the last sample in the segment
    pub fn end_time(&self) -> NaiveDateTime {
        let span = self.sample_count.saturating_sub(1) as f64 * self.sample_interval;
        self.start + seconds_to_duration(span)
    }

    /// Time at which the sample following the last one is expected
    pub fn next_sample_time(&self) -> NaiveDateTime {
        let span = self.sample_count as f64 * self.sample_interval;
        self.start + seconds_to_duration(span)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} - {} | {:.1} Hz, {} samples",
            self.source,
            format_timestamp(&self.start),
            format_timestamp(&self.end_time()),
            self.sample_rate(),
            self.sample_count
        )
    }
}

/// Structural irregularity the decoder tolerated
#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    /// Last Steim sample disagrees with the reverse integration constant
    XnMismatch { last: i32, xn: i32 },
    SampleCountMismatch { expected: usize, decoded: usize },
    UnsupportedEncoding(u8),
    /// Data section runs past the end of the record
    DataOverrun,
    BrokenBlocketteChain,
    /// Bytes left at the end of the file that do not form a full record
    TruncatedRecord { bytes: u64 },
    /// Record header past the first one that failed to parse; skipped
    InvalidRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatWarning {
    /// 记录在文件中的字节偏移
    pub offset: u64,
    pub kind: WarningKind,
}

impl FormatWarning {
    pub fn new(offset: u64, kind: WarningKind) -> Self {
        FormatWarning { offset, kind }
    }
}

impl fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::XnMismatch { last, xn } => write!(
                f,
                "record at offset {}: last sample ({}) does not match reverse integration constant Xn ({})",
                self.offset, last, xn
            ),
            WarningKind::SampleCountMismatch { expected, decoded } => write!(
                f,
                "record at offset {}: header declares {} samples, decoded {}",
                self.offset, expected, decoded
            ),
            WarningKind::UnsupportedEncoding(code) => write!(
                f,
                "record at offset {}: unsupported data encoding {}",
                self.offset, code
            ),
            WarningKind::DataOverrun => write!(
                f,
                "record at offset {}: data section extends past end of record",
                self.offset
            ),
            WarningKind::BrokenBlocketteChain => write!(
                f,
                "record at offset {}: blockette chain is broken",
                self.offset
            ),
            WarningKind::InvalidRecord => write!(
                f,
                "record at offset {}: invalid record header, record skipped",
                self.offset
            ),
            WarningKind::TruncatedRecord { bytes } => write!(
                f,
                "{} trailing bytes at offset {} do not form a complete record",
                bytes, self.offset
            ),
        }
    }
}

/// Identity of an input file: its path and the name used in reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub name: String,
}

impl FileIdentity {
    /// Builds an identity whose display name is the file's base name
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        FileIdentity { path, name }
    }
}
