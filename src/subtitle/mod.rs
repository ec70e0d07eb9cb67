pub mod srt;

use crate::error::{Result, SubtransError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One timed subtitle. Timing is never touched by translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// A parsed subtitle file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleDocument {
    pub fn new(entries: Vec<SubtitleEntry>) -> Self {
        Self { entries }
    }

    /// Open and parse an `.srt` file.
    pub fn open(path: &Path) -> Result<Self> {
        ensure_supported(path)?;
        let raw = std::fs::read_to_string(path)?;
        let entries = srt::parse(&raw)?;
        Ok(Self { entries })
    }

    /// Write the document as UTF-8 SRT.
    pub fn save(&self, path: &Path) -> Result<()> {
        SrtFile::new(path).write(&self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reject anything that is not an `.srt` file before it reaches a job.
pub fn ensure_supported(path: &Path) -> Result<()> {
    let is_srt = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("srt"));

    if is_srt {
        Ok(())
    } else {
        Err(SubtransError::UnsupportedFormat(path.display().to_string()))
    }
}

/// Persistence target for a finished (or cancelled) job.
pub trait DocumentWriter: Send + Sync {
    fn write(&self, entries: &[SubtitleEntry]) -> Result<()>;
}

/// Writes SRT to a path, replacing the file atomically.
#[derive(Debug, Clone)]
pub struct SrtFile {
    path: PathBuf,
}

impl SrtFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentWriter for SrtFile {
    fn write(&self, entries: &[SubtitleEntry]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        std::io::Write::write_all(&mut tmp, srt::format(entries).as_bytes())?;
        tmp.persist(&self.path).map_err(|e| SubtransError::Io(e.error))?;
        Ok(())
    }
}
