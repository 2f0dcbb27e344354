// Random-access sink - buffered appends plus positional overwrites
//
// Appends are collected in memory and written at the end of the flushed
// region on `flush`. `write_at` patches bytes wherever they currently live:
// in the pending buffer, on disk, or split across both. The file cursor is
// never relied on; every disk write seeks explicitly.
//
// A failed write at the end of the file may leave a partial frame behind.
// Such bytes are cut off before the next write reaches the file, so the
// file never holds data past the last successful append.

use statelog_core::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Pending bytes kept in memory before they are pushed to the file
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Suffix of the sibling file a `replace` is staged in
const STAGING_SUFFIX: &str = ".compact";

pub struct RandomAccessSink {
    path: PathBuf,
    file: File,
    buffer: Vec<u8>,
    flushed_len: u64,
    buffer_capacity: usize,
    /// The file may hold bytes past `flushed_len` from a failed write
    dirty_tail: bool,
}

impl RandomAccessSink {
    /// Create (or truncate) the file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        Self::create_with_capacity(path, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn create_with_capacity(path: &Path, buffer_capacity: usize) -> Result<Self> {
        let file = open_truncated(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            buffer: Vec::with_capacity(buffer_capacity),
            flushed_len: 0,
            buffer_capacity,
            dirty_tail: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical length: flushed bytes plus pending bytes
    pub fn len(&self) -> u64 {
        self.flushed_len + self.buffer.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes not yet handed to the file
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append `data` and return the offset it was placed at
    ///
    /// On error nothing of `data` is part of the sink.
    pub fn append(&mut self, data: &[u8]) -> Result<u64> {
        let position = self.len();

        if self.buffer.len() + data.len() > self.buffer_capacity {
            self.write_buffer()?;
        }

        if data.len() > self.buffer_capacity {
            self.write_tail(data)?;
        } else {
            self.buffer.extend_from_slice(data);
        }

        Ok(position)
    }

    /// Overwrite `data.len()` bytes starting at `offset`
    ///
    /// The range must lie within what has already been appended.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.len() {
            return Err(Error::InvalidOperation(format!(
                "Write of {} bytes at offset {} runs past end of log ({} bytes)",
                data.len(),
                offset,
                self.len()
            )));
        }

        // Part of the range that is already on disk
        let split = if offset < self.flushed_len {
            let on_disk = (self.flushed_len.min(end) - offset) as usize;
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(&data[..on_disk])?;
            on_disk
        } else {
            0
        };

        if split < data.len() {
            let start = (offset + split as u64 - self.flushed_len) as usize;
            self.buffer[start..start + data.len() - split].copy_from_slice(&data[split..]);
        }

        Ok(())
    }

    /// Replace the whole file with `chunks` and return the offset of each chunk
    ///
    /// The new contents are written and synced to a sibling file that is then
    /// renamed over the log, so a crash leaves either the old or the new file
    /// in place. On error the sink still refers to the old file, pending
    /// bytes included.
    pub fn replace(&mut self, chunks: &[Vec<u8>]) -> Result<Vec<u64>> {
        let staging = staging_path(&self.path);

        let staged = write_staging(&staging, chunks)
            .and_then(|staged| fs::rename(&staging, &self.path).map(|()| staged));
        let (file, offsets, len) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                return Err(e.into());
            }
        };

        self.file = file;
        self.flushed_len = len;
        self.buffer.clear();
        self.dirty_tail = false;

        if let Err(e) = sync_parent(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to sync log directory");
        }
        Ok(offsets)
    }

    /// Push pending bytes to the file and sync them to stable storage
    pub fn flush(&mut self) -> Result<()> {
        self.write_buffer()?;
        self.trim_tail()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn write_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let buffer = std::mem::take(&mut self.buffer);
        let result = self.write_tail(&buffer);
        self.buffer = buffer;
        result?;
        self.buffer.clear();
        Ok(())
    }

    /// Write `data` right after the flushed region
    fn write_tail(&mut self, data: &[u8]) -> Result<()> {
        self.trim_tail()?;

        let written = self
            .file
            .seek(SeekFrom::Start(self.flushed_len))
            .and_then(|_| self.file.write_all(data));
        if let Err(e) = written {
            self.dirty_tail = true;
            if let Err(trim_error) = self.trim_tail() {
                tracing::warn!(error = %trim_error, "failed to cut partial write from log tail");
            }
            return Err(e.into());
        }

        self.flushed_len += data.len() as u64;
        Ok(())
    }

    fn trim_tail(&mut self) -> Result<()> {
        if self.dirty_tail {
            self.file.set_len(self.flushed_len)?;
            self.dirty_tail = false;
        }
        Ok(())
    }

    /// Swap the underlying file handle, returning the previous one
    #[cfg(test)]
    pub(crate) fn swap_file(&mut self, file: File) -> File {
        std::mem::replace(&mut self.file, file)
    }
}

/// Sibling path a compaction of `path` is staged at
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn open_truncated(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn write_staging(path: &Path, chunks: &[Vec<u8>]) -> io::Result<(File, Vec<u64>, u64)> {
    let mut file = open_truncated(path)?;
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut len = 0u64;

    {
        let mut out = BufWriter::new(&mut file);
        for chunk in chunks {
            offsets.push(len);
            out.write_all(chunk)?;
            len += chunk.len() as u64;
        }
        out.flush()?;
    }
    file.sync_all()?;

    Ok((file, offsets, len))
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => File::open(parent)?.sync_all(),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
