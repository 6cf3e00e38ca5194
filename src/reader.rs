use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::debug;

use crate::codec::decode_data;
use crate::error::{MseedError, Result};
use crate::record::{probe_record_length, RecordHeader, FIXED_HEADER_LEN};
use crate::types::{FormatWarning, Segment, WarningKind};
use crate::utils::seconds_between;
use crate::{MAX_RECORD_LENGTH, MIN_RECORD_LENGTH};

/// Relative sample-rate difference still treated as the same rate
const RATE_TOLERANCE: f64 = 1e-4;

/// Result of decoding a whole file: its segments and tolerated irregularities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFile {
    pub segments: Vec<Segment>,
    /// 按出现顺序排列的格式警告
    pub warnings: Vec<FormatWarning>,
}

/// miniSEED file reader
///
/// Loads a file, walks its records and assembles them into contiguous
/// segments per source identifier.
///
/// # Examples
///
/// ```rust
/// use mseedcheck::MseedReader;
///
/// # mseedcheck::doctest_utils::create_simple_test_file("reader_example.mseed")?;
/// let reader = MseedReader::open("reader_example.mseed")?;
/// let decoded = reader.read_segments()?;
///
/// for segment in &decoded.segments {
///     println!("{}", segment);
/// }
/// assert_eq!(decoded.segments.len(), 1);
/// assert!(decoded.warnings.is_empty());
/// # std::fs::remove_file("reader_example.mseed").ok();
/// # Ok::<(), mseedcheck::MseedError>(())
/// ```
pub struct MseedReader {
    path: PathBuf,
    data: Vec<u8>,
    /// 首条记录的长度，记录未声明长度时使用
    record_length: usize,
}

impl MseedReader {
    /// Opens a miniSEED file and validates its first record header
    ///
    /// # Errors
    ///
    /// * `MseedError::FileNotFound` - file doesn't exist or can't be read
    /// * `MseedError::EmptyFile` - zero-length file
    /// * `MseedError::InvalidHeader` - first record is not miniSEED
    /// * `MseedError::UnknownRecordLength` - no blockette 1000 and no
    ///   detectable record boundary
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(&path)
            .map_err(|e| MseedError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;

        if data.is_empty() {
            return Err(MseedError::EmptyFile);
        }

        let first = RecordHeader::parse(&data, 0)?;
        let record_length = match first.record_length {
            Some(len) => len,
            None => probe_record_length(&data, data.len() as u64).ok_or_else(|| {
                MseedError::UnknownRecordLength(path.as_ref().display().to_string())
            })?,
        };

        Ok(MseedReader {
            path: path.as_ref().to_path_buf(),
            data,
            record_length,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Decodes every record and assembles contiguous segments
    ///
    /// Records without samples or without a sample rate contribute no
    /// segment. A record continues a segment when it has the same source
    /// and rate and starts within half a sample of the expected time.
    /// Segments come back in the order they first appear in the file.
    ///
    /// A corrupt record header past the first record is reported as a
    /// format warning; decoding resumes at the next valid header, so the
    /// hole shows up as a break between segments.
    ///
    /// # Errors
    ///
    /// * `MseedError::InvalidHeader` - the first record header is corrupt
    pub fn read_segments(&self) -> Result<DecodedFile> {
        let mut decoded = DecodedFile::default();
        let total = self.data.len();
        let mut offset = 0usize;

        while offset < total {
            let remaining = total - offset;
            if remaining < FIXED_HEADER_LEN {
                decoded.warnings.push(FormatWarning::new(
                    offset as u64,
                    WarningKind::TruncatedRecord { bytes: remaining as u64 },
                ));
                break;
            }

            let header = match self.parse_record(offset) {
                Ok(header) => header,
                Err(e) if offset == 0 => return Err(e),
                Err(_) => {
                    decoded
                        .warnings
                        .push(FormatWarning::new(offset as u64, WarningKind::InvalidRecord));
                    match self.next_valid_record(offset) {
                        Some(next) => {
                            debug!("{}: resuming at offset {} after bad record at {}", self.path.display(), next, offset);
                            offset = next;
                            continue;
                        }
                        None => break,
                    }
                }
            };

            let length = header.record_length.unwrap_or(self.record_length);
            if length > remaining {
                decoded.warnings.push(FormatWarning::new(
                    offset as u64,
                    WarningKind::TruncatedRecord { bytes: remaining as u64 },
                ));
                break;
            }

            let record = &self.data[offset..offset + length];
            for kind in &header.warnings {
                decoded.warnings.push(FormatWarning::new(offset as u64, kind.clone()));
            }
            self.check_data(&header, record, offset as u64, &mut decoded.warnings);
            append_record(&mut decoded.segments, &header, offset as u64);

            offset += length;
        }

        Ok(decoded)
    }

    /// Parses the header at `offset`, keeping the blockette walk inside the
    /// record
    fn parse_record(&self, offset: usize) -> Result<RecordHeader> {
        let total = self.data.len();
        let nominal_end = total.min(offset + self.record_length);
        let header = RecordHeader::parse(&self.data[offset..nominal_end], offset as u64)?;

        // 记录自身声明的长度与文件首条记录不同时按声明长度重新解析
        match header.record_length {
            Some(len) if len != nominal_end - offset && offset + len <= total => {
                RecordHeader::parse(&self.data[offset..offset + len], offset as u64)
            }
            _ => Ok(header),
        }
    }

    /// Scans forward in minimum-record-length steps for the next parsable
    /// header
    fn next_valid_record(&self, bad: usize) -> Option<usize> {
        let total = self.data.len();
        (1..)
            .map(|step| bad + step * MIN_RECORD_LENGTH)
            .take_while(|&candidate| candidate + FIXED_HEADER_LEN <= total)
            .find(|&candidate| RecordHeader::parse(&self.data[candidate..], candidate as u64).is_ok())
    }

    /// Cheaply reads the end time of the last record in a file
    ///
    /// Only the first record header (for the record length) and the header
    /// of the final record are read.
    ///
    /// # Errors
    ///
    /// * `MseedError::EmptyFile` - zero-length file
    /// * `MseedError::InvalidHeader` - first or last header is corrupt, for
    ///   example when the file ends in a partial record
    pub fn trailer_end_time<P: AsRef<Path>>(path: P) -> Result<NaiveDateTime> {
        let file = File::open(&path)
            .map_err(|e| MseedError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        let size = file.metadata()?.len();
        if size == 0 {
            return Err(MseedError::EmptyFile);
        }
        let mut reader = BufReader::new(file);

        // 读取足够探测记录长度的开头部分
        let probe_len = size.min((MAX_RECORD_LENGTH + FIXED_HEADER_LEN) as u64) as usize;
        let mut head = vec![0u8; probe_len];
        reader.read_exact(&mut head)?;

        let first = RecordHeader::parse(&head, 0)?;
        let record_length = match first.record_length {
            Some(len) => len,
            None => probe_record_length(&head, size).ok_or_else(|| {
                MseedError::UnknownRecordLength(path.as_ref().display().to_string())
            })?,
        } as u64;

        if record_length > size {
            return Err(MseedError::UnknownRecordLength(format!(
                "{}: record length {} exceeds file size {}",
                path.as_ref().display(),
                record_length,
                size
            )));
        }

        let last_offset = size - record_length;
        reader.seek(SeekFrom::Start(last_offset))?;
        let mut last = vec![0u8; record_length as usize];
        reader.read_exact(&mut last)?;

        let trailer = RecordHeader::parse(&last, last_offset)?;
        Ok(trailer.end_time())
    }

    /// 校验数据段与头部的一致性
    fn check_data(&self, header: &RecordHeader, record: &[u8], offset: u64, warnings: &mut Vec<FormatWarning>) {
        if header.sample_count == 0 {
            return;
        }
        if header.data_offset < FIXED_HEADER_LEN || header.data_offset >= record.len() {
            warnings.push(FormatWarning::new(offset, WarningKind::DataOverrun));
            return;
        }
        let Some(encoding) = header.encoding else {
            debug!("{}: record at {} has no blockette 1000, data not checked", self.path.display(), offset);
            return;
        };

        let (_, kinds) = decode_data(
            encoding,
            header.data_byte_order,
            &record[header.data_offset..],
            header.sample_count,
        );
        warnings.extend(kinds.into_iter().map(|kind| FormatWarning::new(offset, kind)));
    }
}

/// Adds one record's samples to the segment list
fn append_record(segments: &mut Vec<Segment>, header: &RecordHeader, offset: u64) {
    let Some(interval) = header.sample_interval() else {
        debug!("record at {} has no sample rate, skipped", offset);
        return;
    };
    if header.sample_count == 0 {
        debug!("record at {} has no samples, skipped", offset);
        return;
    }

    let continues = segments.iter_mut().rev().find(|seg| {
        seg.source == header.source
            && ((seg.sample_rate() - header.sample_rate) / header.sample_rate).abs() <= RATE_TOLERANCE
            && seconds_between(&seg.next_sample_time(), &header.start).abs() <= 0.5 * interval
    });

    match continues {
        Some(seg) => seg.sample_count += header.sample_count,
        None => segments.push(Segment {
            source: header.source.clone(),
            start: header.start,
            sample_interval: interval,
            sample_count: header.sample_count,
        }),
    }
}
