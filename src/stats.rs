use std::fmt;

use crate::utils::plural;

/// Run-wide counters of files checked, errors, gaps and overlaps
///
/// Counters only ever grow. `Display` renders the closing summary line.
///
/// # Examples
///
/// ```rust
/// use mseedcheck::CheckStats;
///
/// let mut stats = CheckStats::default();
/// stats.record_file_checked();
/// stats.record_gaps(2);
/// assert_eq!(stats.to_string(), "1 file checked, 0 errors, 2 gaps, 0 overlaps");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub files_checked: usize,
    /// 解码失败或带格式警告的文件数
    pub errors: usize,
    pub gaps: usize,
    pub overlaps: usize,
}

impl CheckStats {
    pub fn record_file_checked(&mut self) {
        self.files_checked += 1;
    }

    /// One per file, however many warnings it produced
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_gaps(&mut self, count: usize) {
        self.gaps += count;
    }

    pub fn record_overlap(&mut self) {
        self.overlaps += 1;
    }
}

impl fmt::Display for CheckStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file{} checked, {} error{}, {} gap{}, {} overlap{}",
            self.files_checked,
            plural(self.files_checked),
            self.errors,
            plural(self.errors),
            self.gaps,
            plural(self.gaps),
            self.overlaps,
            plural(self.overlaps)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_pluralization() {
        let stats = CheckStats::default();
        assert_eq!(stats.to_string(), "0 files checked, 0 errors, 0 gaps, 0 overlaps");

        let stats = CheckStats {
            files_checked: 1,
            errors: 1,
            gaps: 1,
            overlaps: 1,
        };
        assert_eq!(stats.to_string(), "1 file checked, 1 error, 1 gap, 1 overlap");

        let stats = CheckStats {
            files_checked: 12,
            errors: 2,
            gaps: 3,
            overlaps: 0,
        };
        assert_eq!(stats.to_string(), "12 files checked, 2 errors, 3 gaps, 0 overlaps");
    }

    #[test]
    fn test_counters_accumulate() {
        let mut stats = CheckStats::default();
        stats.record_file_checked();
        stats.record_file_checked();
        stats.record_error();
        stats.record_gaps(0);
        stats.record_gaps(2);
        stats.record_overlap();
        assert_eq!(
            stats,
            CheckStats {
                files_checked: 2,
                errors: 1,
                gaps: 2,
                overlaps: 1
            }
        );
    }
}
