//! Reading the tail of the cycle log.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::journal::MemoryJournal;

const CHUNK_SIZE: u64 = 8 * 1024;

/// Something that can hand out the most recent log lines.
pub trait LogSource: Send + Sync {
    /// Up to `n` most recent non-empty lines, oldest first
    fn tail(&self, n: usize) -> Result<Vec<String>>;
}

/// Tails a log file without reading it whole.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSource for FileLogSource {
    fn tail(&self, n: usize) -> Result<Vec<String>> {
        read_tail(&self.path, n)
    }
}

impl LogSource for MemoryJournal {
    fn tail(&self, n: usize) -> Result<Vec<String>> {
        let lines = self.lines();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].to_vec())
    }
}

impl<T: LogSource + ?Sized> LogSource for std::sync::Arc<T> {
    fn tail(&self, n: usize) -> Result<Vec<String>> {
        (**self).tail(n)
    }
}

fn count_lines(buf: &[u8]) -> usize {
    buf.split(|b| *b == b'\n')
        .filter(|l| !l.iter().all(u8::is_ascii_whitespace))
        .count()
}

/// Read the last `n` non-empty lines of `path`, scanning backwards in chunks.
pub fn read_tail(path: &Path, n: usize) -> Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut file = File::open(path)?;
    let mut pos = file.metadata()?.len();
    let mut buf: Vec<u8> = Vec::new();

    // One extra line so a partially read first line can be dropped
    while pos > 0 && count_lines(&buf) <= n {
        let read = CHUNK_SIZE.min(pos);
        pos -= read;
        file.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0u8; read as usize];
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].to_vec())
}
