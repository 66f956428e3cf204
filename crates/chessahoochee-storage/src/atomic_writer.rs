//! Crash-safe JSON documents on disk
//!
//! A document is written to `<path>.tmp`, synced, then renamed over the
//! target. Readers see either the old or the new document, never a torn one.

use crate::traits::{StorageError, StorageResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Writer for a single JSON document, committed with a rename
pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    out: BufWriter<File>,
    committed: bool,
}

impl AtomicWriter {
    /// Start a new document at `path`, creating parent directories
    pub fn create<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let final_path = path.as_ref().to_path_buf();
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = Self::temp_path(&final_path);
        let out = BufWriter::new(File::create(&temp_path)?);

        Ok(Self {
            temp_path,
            final_path,
            out,
            committed: false,
        })
    }

    /// Serialize `value` into the pending document
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> StorageResult<()> {
        serde_json::to_writer_pretty(&mut self.out, value)
            .map_err(|e| StorageError::Serialization(format!("Failed to encode document: {}", e)))
    }

    /// Flush, sync and move the document into place
    pub fn commit(mut self) -> StorageResult<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        fs::rename(&self.temp_path, &self.final_path)?;
        self.committed = true;
        Ok(())
    }

    fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Replace the document at `path` with `value`
pub fn write_json<P, T>(path: P, value: &T) -> StorageResult<()>
where
    P: AsRef<Path>,
    T: Serialize + ?Sized,
{
    let mut writer = AtomicWriter::create(path)?;
    writer.write_json(value)?;
    writer.commit()
}

/// Read the document at `path`; `None` when it does not exist yet
pub fn read_json<P, T>(path: P) -> StorageResult<Option<T>>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Io(e)),
    };
    serde_json::from_str(&content).map(Some).map_err(|e| {
        StorageError::InvalidData(format!("Corrupt document {}: {}", path.display(), e))
    })
}
