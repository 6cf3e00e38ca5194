use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{MseedError, Result};

/// Append-only journal of cross-file gaps and overlaps
///
/// One line per event, `<previous file> <signed seconds>`, flushed after
/// every write. Gaps are positive, overlaps negative.
///
/// # Examples
///
/// ```rust
/// use mseedcheck::GapReportWriter;
///
/// let mut report = GapReportWriter::from_writer(Vec::new());
/// report.record(std::path::Path::new("/data/A.mseed"), 0.5)?;
/// report.record(std::path::Path::new("/data/B.mseed"), -2.0)?;
///
/// let text = String::from_utf8(report.into_inner()).unwrap();
/// assert_eq!(text, "/data/A.mseed 0.5000\n/data/B.mseed -2.0000\n");
/// # Ok::<(), mseedcheck::MseedError>(())
/// ```
pub struct GapReportWriter<W: Write = File> {
    sink: W,
}

impl GapReportWriter<File> {
    /// Opens `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| MseedError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(GapReportWriter { sink: file })
    }
}

impl<W: Write> GapReportWriter<W> {
    pub fn from_writer(sink: W) -> Self {
        GapReportWriter { sink }
    }

    pub fn record(&mut self, previous: &Path, signed_seconds: f64) -> Result<()> {
        writeln!(self.sink, "{} {:.4}", previous.display(), signed_seconds)?;
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_appends_across_opens() {
        let filename = "test_gap_report.txt";
        std::fs::remove_file(filename).ok();

        {
            let mut report = GapReportWriter::open(filename).unwrap();
            report.record(Path::new("A.mseed"), 0.5).unwrap();
        }
        {
            let mut report = GapReportWriter::open(filename).unwrap();
            report.record(Path::new("B.mseed"), -1.25).unwrap();
        }

        let text = std::fs::read_to_string(filename).unwrap();
        assert_eq!(text, "A.mseed 0.5000\nB.mseed -1.2500\n");

        std::fs::remove_file(filename).ok();
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("gaps.txt");
        assert!(matches!(GapReportWriter::open(&path), Err(MseedError::FileNotFound(_))));
        assert!(!path.exists());
    }
}
