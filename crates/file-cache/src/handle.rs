//! Per-open session state and the operations against it.

use std::io::SeekFrom;
use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{FileCacheError, Result};

/// Access requested at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn readable(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/// One caller's open file reference.
///
/// A handle is created at open, owned by a single caller, and consumed at
/// release. Its view of the content is pinned to the descriptor obtained at
/// open; no freshness re-check happens mid-session.
#[derive(Debug)]
pub struct SessionHandle {
    pub(crate) file: File,
    /// Set only when this handle owns a brand-new, not-yet-published
    /// replacement file.
    pub(crate) replacement_path: Option<PathBuf>,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
    pub(crate) modified: bool,
}

impl SessionHandle {
    pub fn readable(&self) -> bool {
        self.readable
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    /// Positioned read of up to `len` bytes at `offset`. The returned
    /// buffer is short when end-of-file is reached first.
    pub async fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Positioned write of `data` at `offset`. Fails with
    /// [`FileCacheError::AccessDenied`] (no bytes written, modified flag
    /// untouched) when the handle was opened without write access.
    pub async fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if !self.writable {
            tracing::debug!("write on non-writable handle");
            return Err(FileCacheError::AccessDenied);
        }
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.write_all(data).await?;
        self.modified = true;
        Ok(data.len())
    }

    /// Resize the underlying file to `len` bytes.
    pub async fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len).await?;
        Ok(())
    }

    /// Rewind and read the handle's complete current content.
    pub(crate) async fn read_full(&mut self) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(0)).await?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Current size, by seeking to end-of-file.
    pub(crate) async fn end_offset(&mut self) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::End(0)).await?)
    }
}
