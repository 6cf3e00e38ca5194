use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{MseedError, Result};
use crate::record::FIXED_HEADER_LEN;
use crate::types::{Encoding, SourceId};
use crate::utils::{datetime_to_btime, seconds_to_duration};
use crate::{MAX_RECORD_LENGTH, MIN_RECORD_LENGTH};

/// 数据段在记录中的起始偏移（固定头48字节 + blockette 1000共8字节，补齐到64）
const DATA_OFFSET: usize = 64;

/// miniSEED writer producing data-only records with blockette 1000
///
/// Samples are split across as many fixed-length records as needed; the
/// start time of each record advances by the samples already written.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use mseedcheck::{Encoding, MseedWriter, SourceId};
///
/// let start = NaiveDate::from_ymd_opt(2015, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let mut writer = MseedWriter::create("writer_example.mseed", SourceId::new("XX", "TEST", "", "BHZ"))?;
/// writer.set_encoding(Encoding::Steim1)?;
///
/// let samples: Vec<i32> = (0..500).map(|i| (i % 50) - 25).collect();
/// let next = writer.write_samples(start, 20.0, &samples)?;
/// writer.finalize()?;
///
/// // 500 samples at 20 Hz
/// assert_eq!(next, start + chrono::Duration::seconds(25));
/// # std::fs::remove_file("writer_example.mseed").ok();
/// # Ok::<(), mseedcheck::MseedError>(())
/// ```
pub struct MseedWriter {
    file: BufWriter<File>,
    source: SourceId,
    record_length: usize,
    encoding: Encoding,
    sequence: u32,
}

impl MseedWriter {
    /// Creates (or truncates) a miniSEED file
    ///
    /// Defaults: 512-byte records, INT32 encoding.
    ///
    /// # Errors
    ///
    /// * `MseedError::FileNotFound` - the file cannot be created
    pub fn create<P: AsRef<Path>>(path: P, source: SourceId) -> Result<Self> {
        let file = File::create(&path)
            .map_err(|e| MseedError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;

        Ok(MseedWriter {
            file: BufWriter::new(file),
            source,
            record_length: 512,
            encoding: Encoding::Int32,
            sequence: 1,
        })
    }

    /// Sets the record length; must be a power of two from 128 to 65536
    pub fn set_record_length(&mut self, length: usize) -> Result<()> {
        if !length.is_power_of_two() || !(MIN_RECORD_LENGTH..=MAX_RECORD_LENGTH).contains(&length) {
            return Err(MseedError::InvalidParameter(format!("record length {}", length)));
        }
        self.record_length = length;
        Ok(())
    }

    /// Selects the data encoding; INT16, INT32 and Steim-1 are supported
    pub fn set_encoding(&mut self, encoding: Encoding) -> Result<()> {
        match encoding {
            Encoding::Int16 | Encoding::Int32 | Encoding::Steim1 => {
                self.encoding = encoding;
                Ok(())
            }
            other => Err(MseedError::InvalidParameter(format!(
                "encoding {} not supported for writing",
                other.code()
            ))),
        }
    }

    /// Number of samples that fit into one record with the current settings
    pub fn samples_per_record(&self) -> usize {
        let data_len = self.record_length - DATA_OFFSET;
        match self.encoding {
            Encoding::Int16 => data_len / 2,
            // 每个差分占一个32位字：首帧13个，其余每帧15个
            Encoding::Steim1 => {
                let frames = data_len / 64;
                13 + 15 * (frames - 1)
            }
            _ => data_len / 4,
        }
    }

    /// Writes `samples` as one contiguous run starting at `start`
    ///
    /// Returns the time at which the next contiguous sample would start.
    ///
    /// # Errors
    ///
    /// * `MseedError::InvalidParameter` - the sample rate cannot be
    ///   expressed as a SEED factor/multiplier pair
    /// * `MseedError::Io` - write failure
    pub fn write_samples(&mut self, start: NaiveDateTime, sample_rate: f64, samples: &[i32]) -> Result<NaiveDateTime> {
        let (factor, multiplier) = rate_to_factor(sample_rate)?;
        let interval = 1.0 / sample_rate;
        let per_record = self.samples_per_record();

        let mut written = 0usize;
        for chunk in samples.chunks(per_record) {
            let record_start = start + seconds_to_duration(written as f64 * interval);
            let record = self.build_record(record_start, factor, multiplier, chunk);
            self.file.write_all(&record)?;
            written += chunk.len();
            self.sequence = self.sequence % 999_999 + 1;
        }

        Ok(start + seconds_to_duration(written as f64 * interval))
    }

    /// Flushes buffered records to disk
    pub fn finalize(mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    fn build_record(&self, start: NaiveDateTime, factor: i16, multiplier: i16, samples: &[i32]) -> Vec<u8> {
        let mut rec = vec![0u8; self.record_length];

        // 固定头部
        rec[0..6].copy_from_slice(format!("{:06}", self.sequence).as_bytes());
        rec[6] = b'D';
        rec[7] = b' ';
        put_padded(&mut rec[8..13], &self.source.station);
        put_padded(&mut rec[13..15], &self.source.location);
        put_padded(&mut rec[15..18], &self.source.channel);
        put_padded(&mut rec[18..20], &self.source.network);

        let (year, day, hour, minute, second, fract) = datetime_to_btime(&start);
        rec[20..22].copy_from_slice(&year.to_be_bytes());
        rec[22..24].copy_from_slice(&day.to_be_bytes());
        rec[24] = hour;
        rec[25] = minute;
        rec[26] = second;
        rec[28..30].copy_from_slice(&fract.to_be_bytes());
        rec[30..32].copy_from_slice(&(samples.len() as u16).to_be_bytes());
        rec[32..34].copy_from_slice(&factor.to_be_bytes());
        rec[34..36].copy_from_slice(&multiplier.to_be_bytes());
        rec[39] = 1;
        rec[44..46].copy_from_slice(&(DATA_OFFSET as u16).to_be_bytes());
        rec[46..48].copy_from_slice(&(FIXED_HEADER_LEN as u16).to_be_bytes());

        // Blockette 1000
        rec[48..50].copy_from_slice(&1000u16.to_be_bytes());
        rec[52] = self.encoding.code();
        rec[53] = 1;
        rec[54] = self.record_length.trailing_zeros() as u8;

        let data = &mut rec[DATA_OFFSET..];
        match self.encoding {
            Encoding::Int16 => {
                for (slot, s) in data.chunks_exact_mut(2).zip(samples) {
                    slot.copy_from_slice(&(*s as i16).to_be_bytes());
                }
            }
            Encoding::Steim1 => encode_steim1(samples, data),
            _ => {
                for (slot, s) in data.chunks_exact_mut(4).zip(samples) {
                    slot.copy_from_slice(&s.to_be_bytes());
                }
            }
        }

        rec
    }
}

/// Steim-1 encoding using one 32-bit difference per word
fn encode_steim1(samples: &[i32], data: &mut [u8]) {
    let (Some(&first), Some(&last)) = (samples.first(), samples.last()) else {
        return;
    };

    let mut diffs = Vec::with_capacity(samples.len());
    diffs.push(0i32);
    for pair in samples.windows(2) {
        diffs.push(pair[1].wrapping_sub(pair[0]));
    }

    let mut pending = diffs.into_iter();
    for (frame_index, frame) in data.chunks_exact_mut(64).enumerate() {
        let mut control = 0u32;
        let first_word = if frame_index == 0 {
            frame[4..8].copy_from_slice(&first.to_be_bytes());
            frame[8..12].copy_from_slice(&last.to_be_bytes());
            3
        } else {
            1
        };
        for word_index in first_word..16 {
            let Some(diff) = pending.next() else {
                break;
            };
            frame[word_index * 4..word_index * 4 + 4].copy_from_slice(&diff.to_be_bytes());
            control |= 3 << (30 - 2 * word_index);
        }
        frame[0..4].copy_from_slice(&control.to_be_bytes());
    }
}

/// Expresses a sample rate as a SEED factor/multiplier pair
fn rate_to_factor(rate: f64) -> Result<(i16, i16)> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(MseedError::InvalidParameter(format!("sample rate {}", rate)));
    }
    if rate >= 1.0 && rate.fract() == 0.0 && rate <= i16::MAX as f64 {
        return Ok((rate as i16, 1));
    }
    let period = 1.0 / rate;
    if (period - period.round()).abs() < 1e-9 && period.round() <= i16::MAX as f64 {
        return Ok((-(period.round() as i16), 1));
    }
    Err(MseedError::InvalidParameter(format!("sample rate {} has no factor/multiplier form", rate)))
}

fn put_padded(field: &mut [u8], value: &str) {
    for (i, slot) in field.iter_mut().enumerate() {
        *slot = value.as_bytes().get(i).copied().unwrap_or(b' ');
    }
}
