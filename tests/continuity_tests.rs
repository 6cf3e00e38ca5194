use chrono::{Duration, NaiveDate, NaiveDateTime};
use mseedcheck::{
    Auditor, CheckOptions, DecodeOutcome, DecodedFile, FormatWarning, MseedError, Result, Segment, SegmentDecoder,
    SourceId, TrailerInspector, WarningKind,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// 模拟解码器：按路径返回预设的解码结果
#[derive(Default)]
struct MockDecoder {
    files: HashMap<PathBuf, (DecodeOutcome, Option<NaiveDateTime>)>,
}

impl MockDecoder {
    fn add(&mut self, name: &str, segments: Vec<Segment>, trailer: Option<NaiveDateTime>) -> &mut Self {
        let outcome = DecodeOutcome::Decoded(DecodedFile {
            segments,
            warnings: Vec::new(),
        });
        self.files.insert(PathBuf::from(name), (outcome, trailer));
        self
    }

    fn add_warned(&mut self, name: &str, segments: Vec<Segment>, trailer: Option<NaiveDateTime>, warnings: Vec<FormatWarning>) -> &mut Self {
        let outcome = DecodeOutcome::Decoded(DecodedFile { segments, warnings });
        self.files.insert(PathBuf::from(name), (outcome, trailer));
        self
    }

    fn add_failed(&mut self, name: &str) -> &mut Self {
        let outcome = DecodeOutcome::Undecodeable {
            reason: "not miniSEED".to_string(),
        };
        self.files.insert(PathBuf::from(name), (outcome, None));
        self
    }
}

impl SegmentDecoder for MockDecoder {
    fn name(&self) -> &str {
        "MOCK"
    }

    fn decode(&self, path: &Path) -> DecodeOutcome {
        match self.files.get(path) {
            Some((outcome, _)) => outcome.clone(),
            None => DecodeOutcome::Undecodeable {
                reason: "unknown file".to_string(),
            },
        }
    }
}

impl TrailerInspector for MockDecoder {
    fn trailer_end_time(&self, path: &Path) -> Result<NaiveDateTime> {
        self.files
            .get(path)
            .and_then(|(_, trailer)| *trailer)
            .ok_or_else(|| MseedError::InvalidHeader(0))
    }
}

fn at(seconds: f64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2015, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap()
        + Duration::microseconds((seconds * 1e6).round() as i64)
}

fn seg(start: f64, count: usize) -> Segment {
    Segment {
        source: SourceId::new("XX", "TEST", "", "BHZ"),
        start: at(start),
        sample_interval: 1.0,
        sample_count: count,
    }
}

fn run(decoder: MockDecoder, files: &[&str]) -> (String, mseedcheck::CheckStats) {
    let mut out = Vec::new();
    let stats = {
        let mut auditor = Auditor::new(decoder, CheckOptions::default(), &mut out);
        auditor.run(files).unwrap();
        auditor.finish().unwrap()
    };
    (String::from_utf8(out).unwrap(), stats)
}

#[test]
fn test_within_tolerance() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(10.0)));
    decoder.add("B", vec![seg(11.05, 10)], Some(at(20.05)));

    let (out, _) = run(decoder, &["A", "B"]);
    assert_eq!(out, "2 files checked, 0 errors, 0 gaps, 0 overlaps\n");
}

#[test]
fn test_gap_and_overlap() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(10.0)));
    decoder.add("B", vec![seg(11.5, 10)], Some(at(20.5)));
    decoder.add("C", vec![seg(18.5, 10)], Some(at(27.5)));

    let (out, stats) = run(decoder, &["A", "B", "C"]);
    assert_eq!(
        out,
        "B: 0.5000 s gap from A\n\
         C: 3.0000 s overlap with B\n\
         3 files checked, 0 errors, 1 gap, 1 overlap\n"
    );
    assert_eq!(stats.gaps, 1);
    assert_eq!(stats.overlaps, 1);
}

#[test]
fn test_undecodeable_uses_decoder_name() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(10.0)));
    decoder.add_failed("B");
    decoder.add("C", vec![seg(11.0, 10)], Some(at(20.0)));

    let (out, stats) = run(decoder, &["A", "B", "C"]);
    assert_eq!(out, "B: MOCK undecodeable\n2 files checked, 1 error, 0 gaps, 0 overlaps\n");
    assert_eq!(stats.errors, 1);
}

#[test]
fn test_empty_file_is_transparent() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(10.0)));
    decoder.add("EMPTY", vec![], None);
    decoder.add("C", vec![seg(11.0, 10)], Some(at(20.0)));

    let (out, stats) = run(decoder, &["A", "EMPTY", "C"]);
    assert_eq!(out, "3 files checked, 0 errors, 0 gaps, 0 overlaps\n");
    assert_eq!(stats.files_checked, 3);
}

#[test]
fn test_format_error_keeps_continuity() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(10.0)));
    decoder.add_warned(
        "B",
        vec![seg(11.0, 10)],
        Some(at(20.0)),
        vec![
            FormatWarning::new(0, WarningKind::BrokenBlocketteChain),
            FormatWarning::new(512, WarningKind::SampleCountMismatch { expected: 10, decoded: 9 }),
        ],
    );
    decoder.add("C", vec![seg(21.0, 10)], Some(at(30.0)));

    let (out, stats) = run(decoder, &["A", "B", "C"]);
    assert_eq!(
        out,
        "B: format error: record at offset 512: header declares 10 samples, decoded 9\n\
         3 files checked, 1 error, 0 gaps, 0 overlaps\n"
    );
    assert_eq!(stats.errors, 1);
}

#[test]
fn test_trailer_defines_previous_end() {
    // 尾记录结束时间晚于解码出的数据段结束时间时以尾记录为准
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(15.0)));
    decoder.add("B", vec![seg(16.0, 10)], Some(at(25.0)));

    let (out, _) = run(decoder, &["A", "B"]);
    assert_eq!(out, "2 files checked, 0 errors, 0 gaps, 0 overlaps\n");
}

#[test]
fn test_missing_trailer_falls_back_to_segments() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], None);
    decoder.add("B", vec![seg(11.0, 10)], None);

    let (out, _) = run(decoder, &["A", "B"]);
    assert_eq!(out, "2 files checked, 0 errors, 0 gaps, 0 overlaps\n");
}

#[test]
fn test_data_gaps_and_transition_in_one_file() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(1.0, 10)], Some(at(10.0)));
    decoder.add("B", vec![seg(14.0, 10), seg(40.0, 10), seg(70.0, 10)], Some(at(79.0)));

    let (out, stats) = run(decoder, &["A", "B"]);
    assert_eq!(
        out,
        "B: 3.0000 s gap from A\n\
         B: 2 data gaps\n\
         2 files checked, 0 errors, 3 gaps, 0 overlaps\n"
    );
    assert_eq!(stats.gaps, 3);
}

#[test]
fn test_counters_never_decrease() {
    let mut decoder = MockDecoder::default();
    decoder.add("A", vec![seg(0.0, 10)], Some(at(9.0)));
    decoder.add_failed("B");
    decoder.add("C", vec![seg(30.0, 10), seg(50.0, 10)], Some(at(59.0)));
    decoder.add("D", vec![seg(40.0, 10)], Some(at(49.0)));

    let mut out = Vec::new();
    let mut auditor = Auditor::new(decoder, CheckOptions::default(), &mut out);
    let mut previous = auditor.stats();
    for name in ["A", "B", "C", "D", "B"] {
        auditor.check_path(Path::new(name)).unwrap();
        let current = auditor.stats();
        assert!(current.files_checked >= previous.files_checked);
        assert!(current.errors >= previous.errors);
        assert!(current.gaps >= previous.gaps);
        assert!(current.overlaps >= previous.overlaps);
        previous = current;
    }
    assert_eq!(previous.files_checked, 3);
    assert_eq!(previous.errors, 2);
}
