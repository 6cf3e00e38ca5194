//! Decoding of record data sections
//!
//! The checker never needs the sample values themselves; decoding is done
//! to validate the data section against its header (sample count, Steim
//! integration constants).

use crate::types::{ByteOrder, Encoding, WarningKind};
use crate::utils::sign_extend;

/// Steim frame size in bytes
pub const STEIM_FRAME_LEN: usize = 64;

/// Decoded contents of one data section
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int(Vec<i32>),
    Float(Vec<f64>),
    Text(String),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Int(v) => v.len(),
            Samples::Float(v) => v.len(),
            Samples::Text(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes up to `expected` samples from `data`
///
/// Returns the samples together with any irregularities noticed; a short
/// or inconsistent data section never aborts decoding.
pub fn decode_data(
    encoding: Encoding,
    order: ByteOrder,
    data: &[u8],
    expected: usize,
) -> (Samples, Vec<WarningKind>) {
    let mut warnings = Vec::new();

    let samples = match encoding {
        Encoding::Ascii => {
            return (Samples::Text(String::from_utf8_lossy(data).into_owned()), warnings);
        }
        Encoding::Int16 => Samples::Int(
            data.chunks_exact(2)
                .take(expected)
                .map(|c| order.i16(c) as i32)
                .collect(),
        ),
        Encoding::Int32 => Samples::Int(data.chunks_exact(4).take(expected).map(|c| order.i32(c)).collect()),
        Encoding::Float32 => Samples::Float(
            data.chunks_exact(4)
                .take(expected)
                .map(|c| f32::from_bits(order.u32(c)) as f64)
                .collect(),
        ),
        Encoding::Float64 => Samples::Float(
            data.chunks_exact(8)
                .take(expected)
                .map(|c| f64::from_bits(order.u64(c)))
                .collect(),
        ),
        Encoding::Steim1 | Encoding::Steim2 => {
            let (values, xn) = decode_steim(encoding, order, data, expected);
            if let (Some(&last), Some(xn)) = (values.last(), xn) {
                if values.len() == expected && last != xn {
                    warnings.push(WarningKind::XnMismatch { last, xn });
                }
            }
            Samples::Int(values)
        }
        Encoding::Other(code) => {
            warnings.push(WarningKind::UnsupportedEncoding(code));
            return (Samples::Int(Vec::new()), warnings);
        }
    };

    if samples.len() != expected {
        warnings.push(WarningKind::SampleCountMismatch {
            expected,
            decoded: samples.len(),
        });
    }

    (samples, warnings)
}

/// Integrates Steim-1/2 differences into samples
///
/// Returns the samples (truncated to `expected`) and the reverse
/// integration constant Xn from the first frame, if present.
fn decode_steim(encoding: Encoding, order: ByteOrder, data: &[u8], expected: usize) -> (Vec<i32>, Option<i32>) {
    let mut diffs: Vec<i32> = Vec::with_capacity(expected);
    let mut x0 = None;
    let mut xn = None;

    'frames: for (frame_index, frame) in data.chunks_exact(STEIM_FRAME_LEN).enumerate() {
        let control = order.u32(&frame[0..4]);
        for word_index in 1..16 {
            let word = order.u32(&frame[word_index * 4..word_index * 4 + 4]);
            let nibble = (control >> (30 - 2 * word_index)) & 0x03;

            // 第一帧的第1、2个字是积分常数X0和Xn
            if frame_index == 0 && word_index == 1 {
                x0 = Some(word as i32);
                continue;
            }
            if frame_index == 0 && word_index == 2 {
                xn = Some(word as i32);
                continue;
            }

            match (encoding, nibble) {
                (_, 0) => {}
                (_, 1) => {
                    for shift in [24, 16, 8, 0] {
                        diffs.push(sign_extend(word >> shift, 8));
                    }
                }
                (Encoding::Steim1, 2) => {
                    diffs.push(sign_extend(word >> 16, 16));
                    diffs.push(sign_extend(word, 16));
                }
                (Encoding::Steim1, _) => diffs.push(word as i32),
                // Steim-2: 高两位(dnib)决定打包方式
                (_, 2) => match word >> 30 {
                    1 => unpack_steim2(word, 1, 30, &mut diffs),
                    2 => unpack_steim2(word, 2, 15, &mut diffs),
                    3 => unpack_steim2(word, 3, 10, &mut diffs),
                    _ => {}
                },
                _ => match word >> 30 {
                    0 => unpack_steim2(word, 5, 6, &mut diffs),
                    1 => unpack_steim2(word, 6, 5, &mut diffs),
                    2 => unpack_steim2(word, 7, 4, &mut diffs),
                    _ => {}
                },
            }

            if diffs.len() >= expected {
                break 'frames;
            }
        }
    }

    let Some(first) = x0 else {
        return (Vec::new(), xn);
    };

    let count = diffs.len().min(expected);
    let mut samples = Vec::with_capacity(count);
    if count > 0 {
        samples.push(first);
        // 第一个差分相对于上一记录，忽略
        for diff in diffs.iter().take(count).skip(1) {
            let prev = *samples.last().unwrap_or(&first);
            samples.push(prev.wrapping_add(*diff));
        }
    }

    (samples, xn)
}

/// Unpacks `count` sign-extended differences of `width` bits from a Steim-2 word
fn unpack_steim2(word: u32, count: u32, width: u32, diffs: &mut Vec<i32>) {
    let mask = (1u32 << width) - 1;
    for i in (0..count).rev() {
        diffs.push(sign_extend((word >> (i * width)) & mask, width));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a single Steim-1 frame holding 32-bit differences
    fn steim1_frame(x0: i32, xn: i32, diffs: &[i32]) -> Vec<u8> {
        let mut control = 0u32;
        let mut words = vec![0u32; 16];
        words[1] = x0 as u32;
        words[2] = xn as u32;
        for (i, d) in diffs.iter().enumerate() {
            let w = 3 + i;
            words[w] = *d as u32;
            control |= 3 << (30 - 2 * w);
        }
        words[0] = control;
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_steim1_integration() {
        let frame = steim1_frame(10, 16, &[0, 1, 2, 3]);
        let (samples, warnings) = decode_data(Encoding::Steim1, ByteOrder::BigEndian, &frame, 4);
        assert_eq!(samples, Samples::Int(vec![10, 11, 13, 16]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_steim1_xn_mismatch_warns() {
        let frame = steim1_frame(10, 99, &[0, 1, 2, 3]);
        let (_, warnings) = decode_data(Encoding::Steim1, ByteOrder::BigEndian, &frame, 4);
        assert_eq!(warnings, vec![WarningKind::XnMismatch { last: 16, xn: 99 }]);
    }

    #[test]
    fn test_steim1_byte_differences() {
        let mut frame = steim1_frame(5, 2, &[]);
        // word 3: four 8-bit differences 0, -1, -1, -1
        let control = 1u32 << (30 - 2 * 3);
        frame[0..4].copy_from_slice(&control.to_be_bytes());
        frame[12..16].copy_from_slice(&[0x00, 0xff, 0xff, 0xff]);
        let (samples, warnings) = decode_data(Encoding::Steim1, ByteOrder::BigEndian, &frame, 4);
        assert_eq!(samples, Samples::Int(vec![5, 4, 3, 2]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_steim2_packed_differences() {
        let mut frame = steim1_frame(100, 103, &[]);
        // nibble 3, dnib 0: five 6-bit differences 0, 1, 1, 1, 0
        let control = 3u32 << (30 - 2 * 3);
        let word: u32 = (1 << 18) | (1 << 12) | (1 << 6);
        frame[0..4].copy_from_slice(&control.to_be_bytes());
        frame[12..16].copy_from_slice(&word.to_be_bytes());
        let (samples, warnings) = decode_data(Encoding::Steim2, ByteOrder::BigEndian, &frame, 5);
        assert_eq!(samples, Samples::Int(vec![100, 101, 102, 103, 103]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_short_data_reports_count_mismatch() {
        let data = [0u8, 1, 0, 2, 0, 3];
        let (samples, warnings) = decode_data(Encoding::Int16, ByteOrder::BigEndian, &data, 5);
        assert_eq!(samples, Samples::Int(vec![1, 2, 3]));
        assert_eq!(
            warnings,
            vec![WarningKind::SampleCountMismatch { expected: 5, decoded: 3 }]
        );
    }

    #[test]
    fn test_unsupported_encoding() {
        let (samples, warnings) = decode_data(Encoding::Other(30), ByteOrder::BigEndian, &[0; 16], 4);
        assert!(samples.is_empty());
        assert_eq!(warnings, vec![WarningKind::UnsupportedEncoding(30)]);
    }

    #[test]
    fn test_float_and_text() {
        let data: Vec<u8> = [1.5f32, -2.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        let (samples, _) = decode_data(Encoding::Float32, ByteOrder::LittleEndian, &data, 2);
        assert_eq!(samples, Samples::Float(vec![1.5, -2.0]));

        let (text, warnings) = decode_data(Encoding::Ascii, ByteOrder::BigEndian, b"log line", 8);
        assert_eq!(text, Samples::Text("log line".to_string()));
        assert!(warnings.is_empty());
    }
}
