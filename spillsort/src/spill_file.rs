//! Temp-file helpers for spill runs
//!
//! A spill file lives exactly as long as its writer unless the caller asks to
//! keep it for post-mortem inspection. Deletion is tied to the handle, so an
//! abandoned writer cannot leak files.

use std::fs::File;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::{Error, Result};

/// File name prefix for spill files
pub const SPILL_PREFIX: &str = "spillsort-";

/// A uniquely named temp file owned by a spill writer
#[derive(Debug)]
pub struct SpillFile {
    file: NamedTempFile,
    keep: bool,
}

impl SpillFile {
    /// Create a uniquely named file under `dir`
    ///
    /// Fails if `dir` does not exist or is unwritable. The `keep` flag only
    /// affects the later deletion policy.
    pub fn create(dir: &Path, prefix: &str, keep: bool) -> Result<Self> {
        let file = Builder::new().prefix(prefix).tempfile_in(dir)?;
        debug!("created spill file {} (keep={keep})", file.path().display());
        Ok(Self { file, keep })
    }

    /// Path of the file on disk
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Duplicate the underlying handle
    ///
    /// The clone shares the file cursor with the original, so the write
    /// pipeline and position queries stay in agreement; readers use the clone
    /// for positional reads only.
    pub fn try_clone_handle(&self) -> Result<File> {
        Ok(self.file.as_file().try_clone()?)
    }

    /// Close the file, deleting it unless `keep` was requested
    ///
    /// Open duplicate handles stay readable after deletion; the directory
    /// entry is gone either way.
    pub fn close(self) -> Result<()> {
        if self.keep {
            let (_, path) = self.file.keep().map_err(|e| Error::Io(e.error))?;
            debug!("kept spill file {}", path.display());
            Ok(())
        } else {
            self.file.close()?;
            Ok(())
        }
    }
}
