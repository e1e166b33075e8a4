//! Write buffer that spills to a temporary file past a size threshold.
//!
//! The temp file is the external state here: it is registered with a
//! [`Cleaner`] the moment it is created, removed by [`SpooledBuffer::close`],
//! and removed by the cleaner's worker (with a warning) if the buffer is
//! dropped without being closed.

use crate::{Cleanable, Cleaner, Tracked};
use lazyclean_core::{Error, Result, DEFAULT_SPOOL_THRESHOLD, SPOOL_FILE_PREFIX};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// In-memory buffer that moves to disk once it outgrows `threshold` bytes.
#[derive(Debug)]
pub struct SpooledBuffer {
    cleaner: Cleaner,
    threshold: usize,
    directory: Option<PathBuf>,
    memory: Vec<u8>,
    spill: Option<Spill>,
    len: usize,
    closed: bool,
}

// Field order matters: the file is closed before the owner reports the leak.
#[derive(Debug)]
struct Spill {
    file: File,
    path: PathBuf,
    cleanable: Cleanable,
    _owner: Tracked<()>,
}

impl SpooledBuffer {
    pub fn new(cleaner: &Cleaner, threshold: usize) -> Self {
        Self {
            cleaner: cleaner.clone(),
            threshold,
            directory: None,
            memory: Vec::new(),
            spill: None,
            len: 0,
            closed: false,
        }
    }

    /// Buffer on the global cleaner with the default threshold
    pub fn with_defaults() -> Self {
        Self::new(Cleaner::global(), DEFAULT_SPOOL_THRESHOLD)
    }

    /// Spill into `directory` instead of the system temp directory
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_spilled(&self) -> bool {
        self.spill.is_some()
    }

    /// Path of the spill file, once there is one
    pub fn path(&self) -> Option<&Path> {
        self.spill.as_ref().map(|spill| spill.path.as_path())
    }

    /// Everything written so far
    pub fn contents(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::closed("spooled buffer"));
        }

        match self.spill.as_mut() {
            Some(spill) => {
                spill
                    .file
                    .flush()
                    .map_err(|e| Error::file_system(&spill.path, "flush spool file", e))?;
                fs::read(&spill.path).map_err(|e| Error::file_system(&spill.path, "read spool file", e))
            }
            None => Ok(self.memory.clone()),
        }
    }

    /// Release the buffer and remove the spill file. Calling it again is a
    /// no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.memory = Vec::new();

        if let Some(Spill {
            file,
            cleanable,
            _owner,
            ..
        }) = self.spill.take()
        {
            drop(file);
            cleanable.clean()?;
        }
        Ok(())
    }

    fn spill_to_disk(&mut self) -> Result<()> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SPOOL_FILE_PREFIX);

        let created = match &self.directory {
            Some(directory) => builder
                .tempfile_in(directory)
                .map_err(|e| Error::file_system(directory, "create spool file", e)),
            None => builder
                .tempfile()
                .map_err(|e| Error::file_system(std::env::temp_dir(), "create spool file", e)),
        }?;

        let (mut file, path) = created
            .keep()
            .map_err(|e| Error::file_system(e.file.path(), "persist spool file", e.error))?;

        let owner = Tracked::new(());
        let action_path = path.clone();
        let cleanable = self
            .cleaner
            .register(&owner, move |leak: bool| remove_spool_file(&action_path, leak));

        if let Err(e) = file.write_all(&self.memory) {
            drop(file);
            cleanable.clean()?;
            return Err(Error::file_system(&path, "write spool file", e));
        }

        tracing::debug!("Spooled {} bytes to {}", self.memory.len(), path.display());
        self.memory = Vec::new();
        self.spill = Some(Spill {
            file,
            path,
            cleanable,
            _owner: owner,
        });
        Ok(())
    }
}

impl Write for SpooledBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other(Error::closed("spooled buffer")));
        }

        if self.spill.is_none() && self.memory.len() + buf.len() > self.threshold {
            self.spill_to_disk()
                .map_err(io::Error::other)?;
        }

        match self.spill.as_mut() {
            Some(spill) => spill.file.write_all(buf)?,
            None => self.memory.extend_from_slice(buf),
        }
        self.len += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.spill.as_mut() {
            Some(spill) => spill.file.flush(),
            None => Ok(()),
        }
    }
}

fn remove_spool_file(path: &Path, leak: bool) -> io::Result<()> {
    if leak {
        tracing::warn!(
            "Spooled buffer was dropped without close(), removing {}",
            path.display()
        );
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
