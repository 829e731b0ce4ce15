// src/assembly/firing_times.rs
//! Firing-time lists
//!
//! Text format: the first line holds the count `N`, the next `N` lines that
//! do not start with `#` hold one integer firing time each. Blank lines are
//! skipped. Times use a base finer than the EMG buffer (see
//! `signal.firing_time_resolution`).

use crate::error::{EmgErrorBuilder, EmgResult, FileFormat, IoResultExt};
use std::path::Path;

const COMPONENT: &str = "firing_times";

/// Firing times of one motor unit, in file order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FiringTimes {
    times: Vec<u64>,
}

impl FiringTimes {
    /// Firing list from raw times
    pub fn new(times: Vec<u64>) -> Self {
        Self { times }
    }

    /// Read and parse a firing-time file
    pub fn load(path: &Path) -> EmgResult<Self> {
        let text = std::fs::read_to_string(path).io_err(COMPONENT, "read", path)?;
        Self::parse(&text, path)
    }

    /// Parse file contents; `path` only labels errors
    pub fn parse(text: &str, path: &Path) -> EmgResult<Self> {
        let fail = |reason: String| EmgErrorBuilder::new(COMPONENT, "parse").format(FileFormat::FiringTimes, path, reason);

        let mut lines = text.lines().enumerate();
        let (_, first) = lines.next().ok_or_else(|| fail("empty file".to_string()))?;
        let count: usize = first
            .trim()
            .parse()
            .map_err(|_| fail(format!("line 1: '{}' is not a firing count", first.trim())))?;

        let mut times = Vec::with_capacity(count.min(1 << 16));
        for (index, line) in lines {
            if times.len() == count {
                break;
            }
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let time = line
                .parse::<u64>()
                .map_err(|_| fail(format!("line {}: '{}' is not a firing time", index + 1, line)))?;
            times.push(time);
        }

        if times.len() < count {
            return Err(fail(format!("expected {} firing times, found {}", count, times.len())));
        }
        Ok(Self { times })
    }

    /// Times in file order
    pub fn times(&self) -> &[u64] {
        &self.times
    }

    /// Number of firings
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// No firings
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Times in file order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.times.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> EmgResult<FiringTimes> {
        FiringTimes::parse(text, Path::new("mu0001.txt"))
    }

    #[test]
    fn test_parse_with_comments() {
        let times = parse("3\n# header comment\n100\n250\n# mid\n900\n").unwrap();
        assert_eq!(times.times(), &[100, 250, 900]);
    }

    #[test]
    fn test_extra_lines_ignored() {
        let times = parse("2\n10\n20\n30\n").unwrap();
        assert_eq!(times.len(), 2);
    }

    #[test]
    fn test_order_not_verified() {
        let times = parse("2\n500\n100\n").unwrap();
        assert_eq!(times.times(), &[500, 100]);
    }

    #[test]
    fn test_zero_count() {
        assert!(parse("0\n").unwrap().is_empty());
    }

    #[test]
    fn test_format_errors() {
        assert!(parse("").unwrap_err().is_format_error());
        assert!(parse("three\n1\n2\n3\n").unwrap_err().is_format_error());
        assert!(parse("3\n1\n2\n").unwrap_err().is_format_error());

        let err = parse("2\n1\nabc\n").unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_missing_file_is_resource_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(FiringTimes::load(&dir.path().join("missing.txt")).unwrap_err().is_resource_error());
    }
}
