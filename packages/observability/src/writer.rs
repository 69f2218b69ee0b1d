//! Append-only JSONL log file writer.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Line-flushed writer shared by every event the subscriber emits.
#[derive(Clone)]
pub struct LogFileWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl LogFileWriter {
    /// Open (or create) the log file in append mode, creating parent directories.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        // One event per write; flush so concurrent tails see whole lines.
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_writer_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portal.jsonl");

        let mut first = LogFileWriter::open(&path).unwrap();
        first.write_all(b"{\"a\":1}\n").unwrap();

        let mut second = LogFileWriter::open(&path).unwrap();
        second.write_all(b"{\"b\":2}\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn test_writer_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("portal.jsonl");

        assert!(LogFileWriter::open(&path).is_ok());
        assert!(path.parent().unwrap().exists());
    }
}
