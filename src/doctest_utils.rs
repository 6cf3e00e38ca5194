// Internal utilities for documentation tests
// This file contains helper functions to generate test files for doctests

use crate::{Encoding, MseedWriter, Result, SourceId};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;

/// Start time shared by the generated test files: 2015-01-03T00:00:00
pub fn test_start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2015, 1, 3)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Creates a simple Steim-1 miniSEED file for documentation examples
///
/// 1000 samples of a 1 Hz sine at 100 Hz in 512-byte records, source
/// `XX.TEST..BHZ`.
pub fn create_simple_test_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let mut writer = MseedWriter::create(&path, SourceId::new("XX", "TEST", "", "BHZ"))?;
    writer.set_encoding(Encoding::Steim1)?;

    let samples: Vec<i32> = (0..1000)
        .map(|i| {
            let t = i as f64 / 100.0;
            (500.0 * (2.0 * std::f64::consts::PI * t).sin()) as i32
        })
        .collect();

    writer.write_samples(test_start_time(), 100.0, &samples)?;
    writer.finalize()?;
    Ok(())
}
