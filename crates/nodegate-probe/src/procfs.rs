//! `/proc`-style capacity reports.
//!
//! Memory comes from a meminfo report (`Key:   value kB` lines), CPU
//! count from a cpuinfo report (one `processor : N` line per logical
//! CPU). Both files are re-read on every call.

use std::path::{Path, PathBuf};

use tracing::debug;

use nodegate_core::config::{DEFAULT_CPUINFO_PATH, DEFAULT_MEMINFO_PATH};

use crate::{ProbeError, ProbeResult, ResourceProbe};

const MEM_AVAILABLE: &str = "MemAvailable";
/// Summed when the kernel does not report `MemAvailable`.
const MEM_FALLBACK: [&str; 3] = ["MemFree", "Buffers", "Cached"];
const PROCESSOR_MARKER: &str = "processor";

/// Probe backed by meminfo and cpuinfo files.
#[derive(Debug, Clone)]
pub struct ProcProbe {
    meminfo_path: PathBuf,
    cpuinfo_path: PathBuf,
}

impl Default for ProcProbe {
    fn default() -> Self {
        Self::with_paths(DEFAULT_MEMINFO_PATH, DEFAULT_CPUINFO_PATH)
    }
}

impl ProcProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(meminfo_path: impl AsRef<Path>, cpuinfo_path: impl AsRef<Path>) -> Self {
        Self {
            meminfo_path: meminfo_path.as_ref().to_path_buf(),
            cpuinfo_path: cpuinfo_path.as_ref().to_path_buf(),
        }
    }

    /// Read a report. Bytes that are not UTF-8 are replaced rather than
    /// failing the read; a bad value then surfaces as `Malformed`.
    fn read(path: &Path) -> ProbeResult<String> {
        let bytes = std::fs::read(path).map_err(|source| ProbeError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl ResourceProbe for ProcProbe {
    fn available_memory_kb(&self) -> ProbeResult<u64> {
        let report = Self::read(&self.meminfo_path)?;
        let available = parse_available_memory(&report)?;
        debug!(path = ?self.meminfo_path, available_kb = available, "read available memory");
        Ok(available)
    }

    fn total_cpu_units(&self) -> ProbeResult<f64> {
        let report = Self::read(&self.cpuinfo_path)?;
        let cpus = count_processors(&report);
        debug!(path = ?self.cpuinfo_path, cpus, "read cpu count");
        Ok(cpus)
    }
}

/// Extract available memory (kB) from a meminfo report.
///
/// Uses the first `MemAvailable` line. Without one, falls back to
/// `MemFree + Buffers + Cached`. A value that is not a non-negative
/// integer is an error rather than zero.
pub fn parse_available_memory(report: &str) -> ProbeResult<u64> {
    // Fallback fields only matter when MemAvailable is absent, so their
    // parse errors are held until the scan is over.
    let mut fallback: Vec<ProbeResult<u64>> = Vec::new();

    for line in report.lines() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else { continue };
        let key = key.trim_end_matches(':');

        if key == MEM_AVAILABLE {
            return parse_field(key, fields.next());
        }
        if MEM_FALLBACK.contains(&key) {
            fallback.push(parse_field(key, fields.next()));
        }
    }

    if fallback.is_empty() {
        return Err(ProbeError::MissingField(MEM_AVAILABLE.to_string()));
    }
    let estimate = fallback.into_iter().sum::<ProbeResult<u64>>()?;
    debug!(estimate_kb = estimate, "no MemAvailable line, using free+buffers+cached");
    Ok(estimate)
}

fn parse_field(field: &str, value: Option<&str>) -> ProbeResult<u64> {
    let raw = value.unwrap_or_default();
    raw.parse().map_err(|_| ProbeError::Malformed {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Count logical CPUs in a cpuinfo report.
pub fn count_processors(report: &str) -> f64 {
    report
        .lines()
        .filter(|line| line.starts_with(PROCESSOR_MARKER))
        .count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MEMINFO: &str = "MemTotal:       16384000 kB
MemFree:         1234567 kB
MemAvailable:    8000000 kB
Buffers:          123456 kB
Cached:          2345678 kB
";

    const CPUINFO: &str = "processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R)

processor\t: 1
vendor_id\t: GenuineIntel

processor\t: 2

processor\t: 3
";

    #[test]
    fn test_parse_meminfo() {
        assert_eq!(parse_available_memory(MEMINFO).unwrap(), 8000000);
    }

    #[test]
    fn test_parse_meminfo_no_available() {
        let sample = "MemTotal:       16384000 kB
MemFree:         1000000 kB
Buffers:          500000 kB
Cached:          2000000 kB
";
        assert_eq!(
            parse_available_memory(sample).unwrap(),
            1000000 + 500000 + 2000000
        );
    }

    #[test]
    fn malformed_available_value_is_an_error() {
        let sample = "MemTotal: 16384000 kB\nMemAvailable: lots kB\n";
        match parse_available_memory(sample) {
            Err(ProbeError::Malformed { field, value }) => {
                assert_eq!(field, "MemAvailable");
                assert_eq!(value, "lots");
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn bad_fallback_field_is_ignored_when_available_is_present() {
        let sample = "MemTotal: 100 kB\nMemFree: n/a kB\nMemAvailable: 8000 kB\n";
        assert_eq!(parse_available_memory(sample).unwrap(), 8000);
    }

    #[test]
    fn bad_fallback_field_fails_without_available() {
        let sample = "MemTotal: 100 kB\nMemFree: n/a kB\nBuffers: 10 kB\n";
        let err = parse_available_memory(sample).unwrap_err();
        assert!(matches!(err, ProbeError::Malformed { field, .. } if field == "MemFree"));
    }

    #[test]
    fn missing_value_is_malformed() {
        let err = parse_available_memory("MemAvailable:\n").unwrap_err();
        assert!(matches!(err, ProbeError::Malformed { .. }));
    }

    #[test]
    fn negative_value_is_malformed() {
        let err = parse_available_memory("MemAvailable: -5 kB\n").unwrap_err();
        assert!(matches!(err, ProbeError::Malformed { .. }));
    }

    #[test]
    fn report_without_memory_fields() {
        let err = parse_available_memory("MemTotal: 1024 kB\n").unwrap_err();
        assert!(matches!(err, ProbeError::MissingField(field) if field == "MemAvailable"));
    }

    #[test]
    fn test_count_processors() {
        assert_eq!(count_processors(CPUINFO), 4.0);
        assert_eq!(count_processors(""), 0.0);
    }

    #[test]
    fn proc_probe_reads_files() {
        let mut meminfo = tempfile::NamedTempFile::new().unwrap();
        meminfo.write_all(MEMINFO.as_bytes()).unwrap();
        let mut cpuinfo = tempfile::NamedTempFile::new().unwrap();
        cpuinfo.write_all(CPUINFO.as_bytes()).unwrap();

        let probe = ProcProbe::with_paths(meminfo.path(), cpuinfo.path());
        assert_eq!(probe.available_memory_kb().unwrap(), 8000000);
        assert_eq!(probe.total_cpu_units().unwrap(), 4.0);
    }

    #[test]
    fn proc_probe_rereads_on_every_call() {
        let mut meminfo = tempfile::NamedTempFile::new().unwrap();
        meminfo.write_all(b"MemAvailable: 100 kB\n").unwrap();
        let probe = ProcProbe::with_paths(meminfo.path(), "/nonexistent/cpuinfo");
        assert_eq!(probe.available_memory_kb().unwrap(), 100);

        std::fs::write(meminfo.path(), "MemAvailable: 200 kB\n").unwrap();
        assert_eq!(probe.available_memory_kb().unwrap(), 200);
    }

    #[test]
    fn non_utf8_report_is_not_unreadable() {
        let mut meminfo = tempfile::NamedTempFile::new().unwrap();
        meminfo.write_all(b"Vendor: \xff\xfe\nMemAvailable: 4096 kB\n").unwrap();
        let probe = ProcProbe::with_paths(meminfo.path(), "/nonexistent/cpuinfo");
        assert_eq!(probe.available_memory_kb().unwrap(), 4096);

        std::fs::write(meminfo.path(), b"MemAvailable: 40\xff96 kB\n").unwrap();
        let err = probe.available_memory_kb().unwrap_err();
        assert!(matches!(err, ProbeError::Malformed { .. }));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let probe = ProcProbe::with_paths("/nonexistent/meminfo", "/nonexistent/cpuinfo");

        let err = probe.available_memory_kb().unwrap_err();
        assert!(err.is_unreadable());
        let err = probe.total_cpu_units().unwrap_err();
        assert!(err.is_unreadable());
    }
}
