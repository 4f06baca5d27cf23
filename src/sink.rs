use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink rejected {name}: {reason}")]
    Rejected { name: String, reason: String },
    #[error("I/O error writing {name}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Destination for rendered reports.
///
/// Implementations accept a named byte payload and return a location
/// string identifying where it landed. Writes are one-shot; failure is
/// reported to the caller, never retried internally.
pub trait ReportSink: Send + Sync {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<String, SinkError>;
}

/// Writes reports into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportSink for DirSink {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<String, SinkError> {
        fs::create_dir_all(&self.dir).map_err(|source| SinkError::Io {
            name: name.to_string(),
            source,
        })?;

        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|source| SinkError::Io {
            name: name.to_string(),
            source,
        })?;

        Ok(path.display().to_string())
    }
}

/// Captures writes in memory. Test double for the filesystem sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names and payloads written so far, in order.
    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<String, SinkError> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), bytes.to_vec()));
        Ok(format!("memory:{name}"))
    }
}

pub fn default_sink(dir: PathBuf) -> Box<dyn ReportSink> {
    Box::new(DirSink::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_sink_creates_directory_and_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirSink::new(tmp.path().join("nested").join("reports"));

        let location = sink.write("report_test.json", b"{}").unwrap();

        assert!(location.ends_with("report_test.json"));
        let written = fs::read(tmp.path().join("nested/reports/report_test.json")).unwrap();
        assert_eq!(written, b"{}");
    }

    #[test]
    fn memory_sink_captures_writes_in_order() {
        let sink = MemorySink::new();
        sink.write("a.json", b"first").unwrap();
        sink.write("b.csv", b"second").unwrap();

        let writes = sink.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].0, "a.json");
        assert_eq!(writes[1].1, b"second");
    }
}
