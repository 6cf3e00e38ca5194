use chrono::NaiveDateTime;

use crate::error::{MseedError, Result};
use crate::types::{ByteOrder, Encoding, SourceId, WarningKind};
use crate::utils::{btime_to_datetime, nominal_sample_rate, seconds_to_duration};
use crate::{MAX_RECORD_LENGTH, MIN_RECORD_LENGTH};

/// Size of the fixed section of data header
pub const FIXED_HEADER_LEN: usize = 48;

/// Activity flag bit 1: time correction already applied to the start time
const TIME_CORRECTION_APPLIED: u8 = 0x02;

const MAX_BLOCKETTES: usize = 32;

/// Parsed fixed header of one miniSEED record plus the blockettes the
/// checker cares about (100, 1000, 1001)
///
/// # Examples
///
/// ```rust
/// use mseedcheck::record::RecordHeader;
///
/// # mseedcheck::doctest_utils::create_simple_test_file("header_example.mseed")?;
/// let bytes = std::fs::read("header_example.mseed")?;
/// let header = RecordHeader::parse(&bytes, 0)?;
///
/// println!("{} starts at {}", header.source, header.start);
/// assert_eq!(header.record_length, Some(512));
/// assert!(header.sample_rate > 0.0);
/// # std::fs::remove_file("header_example.mseed").ok();
/// # Ok::<(), mseedcheck::MseedError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub quality: char,
    pub source: SourceId,
    /// 已校正的开始时间
    pub start: NaiveDateTime,
    pub sample_count: usize,
    pub sample_rate: f64,
    pub activity_flags: u8,
    /// 时间校正（0.0001秒为单位）
    pub time_correction: i32,
    pub data_offset: usize,
    pub byte_order: ByteOrder,
    /// Word order of the data section, from blockette 1000
    pub data_byte_order: ByteOrder,
    pub encoding: Option<Encoding>,
    pub record_length: Option<usize>,
    /// Problems found while walking the blockette chain
    pub warnings: Vec<WarningKind>,
}

impl RecordHeader {
    /// Parses the record header at the start of `buf`
    ///
    /// `offset` is the position of the record in its file and is only used
    /// for error reporting.
    ///
    /// # Errors
    ///
    /// * `MseedError::InvalidHeader` - fewer than 48 bytes, bad signature
    ///   bytes, unrecognisable byte order or an impossible start time
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self> {
        if !is_valid_header(buf) {
            return Err(MseedError::InvalidHeader(offset));
        }
        let order = detect_byte_order(buf).ok_or(MseedError::InvalidHeader(offset))?;

        let source = SourceId {
            network: ascii_field(&buf[18..20]),
            station: ascii_field(&buf[8..13]),
            location: ascii_field(&buf[13..15]),
            channel: ascii_field(&buf[15..18]),
        };

        let btime = btime_to_datetime(
            order.u16(&buf[20..22]),
            order.u16(&buf[22..24]),
            buf[24],
            buf[25],
            buf[26],
            order.u16(&buf[28..30]),
        )
        .map_err(|_| MseedError::InvalidHeader(offset))?;

        let sample_count = order.u16(&buf[30..32]) as usize;
        let mut sample_rate = nominal_sample_rate(order.i16(&buf[32..34]), order.i16(&buf[34..36]));
        let activity_flags = buf[36];
        let blockette_count = buf[39] as usize;
        let time_correction = order.i32(&buf[40..44]);
        let data_offset = order.u16(&buf[44..46]) as usize;
        let first_blockette = order.u16(&buf[46..48]) as usize;

        let mut header = RecordHeader {
            quality: buf[6] as char,
            source,
            start: btime,
            sample_count,
            sample_rate,
            activity_flags,
            time_correction,
            data_offset,
            byte_order: order,
            data_byte_order: order,
            encoding: None,
            record_length: None,
            warnings: Vec::new(),
        };

        let mut micro_offset = 0i64;
        let mut next = first_blockette;
        let mut walked = 0;
        while next != 0 && walked < MAX_BLOCKETTES.max(blockette_count) {
            if next < FIXED_HEADER_LEN || next + 4 > buf.len() {
                header.warnings.push(WarningKind::BrokenBlocketteChain);
                break;
            }
            let b = &buf[next..];
            let kind = order.u16(&b[0..2]);
            let following = order.u16(&b[2..4]) as usize;

            match kind {
                1000 if b.len() >= 8 => {
                    header.encoding = Some(Encoding::from_code(b[4]));
                    header.data_byte_order = if b[5] == 0 {
                        ByteOrder::LittleEndian
                    } else {
                        ByteOrder::BigEndian
                    };
                    let exponent = b[6] as u32;
                    if (7..=16).contains(&exponent) {
                        header.record_length = Some(1usize << exponent);
                    }
                }
                1001 if b.len() >= 8 => {
                    micro_offset = b[5] as i8 as i64;
                }
                100 if b.len() >= 8 => {
                    let actual = f32::from_bits(order.u32(&b[4..8])) as f64;
                    if actual.is_finite() && actual > 0.0 {
                        sample_rate = actual;
                    }
                }
                1000 | 1001 | 100 => {
                    header.warnings.push(WarningKind::BrokenBlocketteChain);
                    break;
                }
                // 其他blockette跳过
                _ => {}
            }

            if following != 0 && following <= next {
                header.warnings.push(WarningKind::BrokenBlocketteChain);
                break;
            }
            next = following;
            walked += 1;
        }

        header.sample_rate = sample_rate;
        header.start += chrono::Duration::microseconds(micro_offset);
        if activity_flags & TIME_CORRECTION_APPLIED == 0 && time_correction != 0 {
            header.start += chrono::Duration::microseconds(time_correction as i64 * 100);
        }

        Ok(header)
    }

    /// Sample interval in seconds, or `None` for records without a rate
    pub fn sample_interval(&self) -> Option<f64> {
        if self.sample_rate > 0.0 {
            Some(1.0 / self.sample_rate)
        } else {
            None
        }
    }

    /// Time of the last sample in the record
    pub fn end_time(&self) -> NaiveDateTime {
        match self.sample_interval() {
            Some(interval) if self.sample_count > 0 => {
                self.start + seconds_to_duration((self.sample_count - 1) as f64 * interval)
            }
            _ => self.start,
        }
    }
}

/// Quick signature check on the first 48 bytes of a candidate record
///
/// Sequence number must be digits, spaces or NULs; the quality indicator
/// one of `D`, `R`, `Q`, `M`; hour, minute and second in range.
pub fn is_valid_header(buf: &[u8]) -> bool {
    if buf.len() < FIXED_HEADER_LEN {
        return false;
    }
    let sequence_ok = buf[0..6]
        .iter()
        .all(|&c| c.is_ascii_digit() || c == b' ' || c == 0);
    sequence_ok
        && matches!(buf[6], b'D' | b'R' | b'Q' | b'M')
        && (buf[7] == b' ' || buf[7] == 0)
        && buf[24] <= 23
        && buf[25] <= 59
        && buf[26] <= 60
}

/// Detects header byte order from the plausibility of the BTIME year and day
pub fn detect_byte_order(buf: &[u8]) -> Option<ByteOrder> {
    if buf.len() < 24 {
        return None;
    }
    let plausible = |order: ByteOrder| {
        let year = order.u16(&buf[20..22]);
        let day = order.u16(&buf[22..24]);
        (1900..=2100).contains(&year) && (1..=366).contains(&day)
    };
    if plausible(ByteOrder::BigEndian) {
        Some(ByteOrder::BigEndian)
    } else if plausible(ByteOrder::LittleEndian) {
        Some(ByteOrder::LittleEndian)
    } else {
        None
    }
}

/// Record length for files without blockette 1000
///
/// Looks for the next valid header at power-of-two offsets; a file holding
/// exactly one record of power-of-two size is also accepted.
pub fn probe_record_length(buf: &[u8], file_len: u64) -> Option<usize> {
    let mut len = MIN_RECORD_LENGTH;
    while len <= MAX_RECORD_LENGTH {
        if buf.len() >= len + FIXED_HEADER_LEN {
            let candidate = &buf[len..];
            if is_valid_header(candidate) && detect_byte_order(candidate).is_some() {
                return Some(len);
            }
        }
        len <<= 1;
    }
    let whole = file_len as usize;
    if whole.is_power_of_two() && (MIN_RECORD_LENGTH..=MAX_RECORD_LENGTH).contains(&whole) {
        return Some(whole);
    }
    None
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal big-endian header: 2015-003 01:02:03.0400, 100 Hz, 50 samples
    fn raw_header() -> Vec<u8> {
        let mut h = vec![0u8; 64];
        h[0..6].copy_from_slice(b"000001");
        h[6] = b'D';
        h[7] = b' ';
        h[8..13].copy_from_slice(b"ABC  ");
        h[13..15].copy_from_slice(b"00");
        h[15..18].copy_from_slice(b"BHZ");
        h[18..20].copy_from_slice(b"GB");
        h[20..22].copy_from_slice(&2015u16.to_be_bytes());
        h[22..24].copy_from_slice(&3u16.to_be_bytes());
        h[24] = 1;
        h[25] = 2;
        h[26] = 3;
        h[28..30].copy_from_slice(&400u16.to_be_bytes());
        h[30..32].copy_from_slice(&50u16.to_be_bytes());
        h[32..34].copy_from_slice(&100i16.to_be_bytes());
        h[34..36].copy_from_slice(&1i16.to_be_bytes());
        h[39] = 1;
        h[44..46].copy_from_slice(&64u16.to_be_bytes());
        h[46..48].copy_from_slice(&48u16.to_be_bytes());
        h[48..50].copy_from_slice(&1000u16.to_be_bytes());
        h[52] = 10;
        h[53] = 1;
        h[54] = 9;
        h
    }

    #[test]
    fn test_parse_fixed_header() {
        let header = RecordHeader::parse(&raw_header(), 0).unwrap();
        assert_eq!(header.source.to_string(), "GB.ABC.00.BHZ");
        assert_eq!(header.start.to_string(), "2015-01-03 01:02:03.040");
        assert_eq!(header.sample_count, 50);
        assert_eq!(header.sample_rate, 100.0);
        assert_eq!(header.encoding, Some(Encoding::Steim1));
        assert_eq!(header.record_length, Some(512));
        assert_eq!(header.byte_order, ByteOrder::BigEndian);
        assert!(header.warnings.is_empty());
        assert_eq!(header.end_time().to_string(), "2015-01-03 01:02:03.530");
    }

    #[test]
    fn test_time_correction_applied_only_when_flag_clear() {
        let mut raw = raw_header();
        raw[40..44].copy_from_slice(&5000i32.to_be_bytes());
        let header = RecordHeader::parse(&raw, 0).unwrap();
        assert_eq!(header.start.to_string(), "2015-01-03 01:02:03.540");

        raw[36] = TIME_CORRECTION_APPLIED;
        let header = RecordHeader::parse(&raw, 0).unwrap();
        assert_eq!(header.start.to_string(), "2015-01-03 01:02:03.040");
    }

    #[test]
    fn test_little_endian_detection() {
        let mut raw = raw_header();
        raw[20..22].copy_from_slice(&2015u16.to_le_bytes());
        raw[22..24].copy_from_slice(&3u16.to_le_bytes());
        assert_eq!(detect_byte_order(&raw), Some(ByteOrder::LittleEndian));
    }

    #[test]
    fn test_rejects_garbage() {
        let garbage = vec![0xAB; 64];
        assert!(!is_valid_header(&garbage));
        assert!(matches!(RecordHeader::parse(&garbage, 128), Err(MseedError::InvalidHeader(128))));
        assert!(RecordHeader::parse(&raw_header()[..40], 0).is_err());
    }

    #[test]
    fn test_broken_blockette_chain_is_a_warning() {
        let mut raw = raw_header();
        raw[46..48].copy_from_slice(&600u16.to_be_bytes());
        let header = RecordHeader::parse(&raw, 0).unwrap();
        assert_eq!(header.warnings, vec![WarningKind::BrokenBlocketteChain]);
        assert_eq!(header.record_length, None);
    }

    #[test]
    fn test_probe_record_length() {
        let mut file = raw_header();
        file[46..48].copy_from_slice(&0u16.to_be_bytes());
        file.resize(256, 0);
        file.extend_from_slice(&raw_header());
        file.resize(512, 0);
        assert_eq!(probe_record_length(&file, 512), Some(256));
        assert_eq!(probe_record_length(&file[..256], 256), Some(256));
        assert_eq!(probe_record_length(&file[..200], 200), None);
    }
}
