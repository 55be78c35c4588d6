//! Low-level filesystem operations for dataset storage.
//!
//! This module centralizes all path handling and raw file I/O used by the
//! dataset backend:
//!
//! - Resolving a [`DatasetLocation`] plus a relative path into a concrete
//!   local path.
//! - Atomic replacement of a dataset document via write-then-rename, so a
//!   batch of staged edits becomes visible all at once or not at all.
//! - Create-only writes used when a dataset is first created, so an existing
//!   dataset is never silently clobbered.
//!
//! Keeping these conventions in one place lets the `table` and `sync` layers
//! work with typed locations and small helpers instead of hard-coded path
//! concatenation. Only the local filesystem is supported, but the location
//! type is an enum so a future object-storage adapter can be introduced
//! without rewriting the higher layers.

use snafu::{Backtrace, prelude::*};
use std::{
    error::Error,
    fmt, io,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Where a dataset lives.
///
/// Currently only local filesystem directories are supported; the enum shape
/// leaves room for remote backends later.
#[derive(Clone, Debug)]
pub enum DatasetLocation {
    /// A dataset rooted at a local directory.
    Local(PathBuf),
}

impl DatasetLocation {
    /// Create a location for a local dataset directory.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        DatasetLocation::Local(root.into())
    }
}

/// Backend-specific failure wrapped by [`StorageError`].
///
/// Only a local filesystem backend exists today; its I/O errors are wrapped
/// here so higher layers can attach path context without caring which
/// backend produced the failure.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors produced by storage operations.
#[derive(Debug, Snafu)]
pub enum StorageError {
    /// The requested path does not exist.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying backend error.
        source: BackendError,
        /// Backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// The target path already exists and the operation requested
    /// create-new semantics.
    #[snafu(display("Path already exists: {path}"))]
    AlreadyExists {
        /// The path that already exists.
        path: String,
        /// Underlying backend error.
        source: BackendError,
        /// Backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// Any other I/O failure.
    #[snafu(display("I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the failure occurred.
        path: String,
        /// Underlying backend error.
        source: BackendError,
        /// Backtrace captured when the error occurred.
        backtrace: Backtrace,
    },
}

/// Resolve a relative path against a dataset location.
fn join_local(location: &DatasetLocation, rel: &Path) -> PathBuf {
    match location {
        DatasetLocation::Local(root) => root.join(rel),
    }
}

async fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: parent.display().to_string(),
            })?;
    }
    Ok(())
}

/// Removes a temporary file on drop unless disarmed after a successful
/// rename, so failed atomic writes do not leave `.tmp` litter behind.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort cleanup; we are most likely already unwinding
            // from another error.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Atomically replace the file at `rel_path` under `location` with
/// `contents`.
///
/// The payload is written to a sibling temporary file, synced, and renamed
/// into place. Readers observe either the previous document or the new one,
/// never a torn write. This is the primitive behind the edit session's
/// all-or-nothing batch commit.
///
/// # Errors
///
/// Returns [`StorageError::OtherIo`] when filesystem I/O fails at any step.
pub async fn write_atomic(
    location: &DatasetLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    match location {
        DatasetLocation::Local(_) => {
            let abs = join_local(location, rel_path);

            create_parent_dir(&abs).await?;

            let tmp_path = abs.with_extension("tmp");
            let mut guard = TempFileGuard::new(tmp_path.clone());

            {
                let mut file = fs::File::create(&tmp_path)
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: tmp_path.display().to_string(),
                    })?;

                file.write_all(contents)
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: tmp_path.display().to_string(),
                    })?;

                file.sync_all()
                    .await
                    .map_err(BackendError::Local)
                    .context(OtherIoSnafu {
                        path: tmp_path.display().to_string(),
                    })?;
            }

            fs::rename(&tmp_path, &abs)
                .await
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: abs.display().to_string(),
                })?;

            // Renamed into place; nothing left to clean up.
            guard.disarm();

            Ok(())
        }
    }
}

/// Create a *new* file at `rel_path` and write `contents`, failing with
/// [`StorageError::AlreadyExists`] if the file is already present.
///
/// Used when creating a dataset so an existing one is never overwritten.
pub async fn write_new(
    location: &DatasetLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    match location {
        DatasetLocation::Local(_) => {
            let abs = join_local(location, rel_path);
            create_parent_dir(&abs).await?;

            let path_str = abs.display().to_string();

            // Atomic "create only if not exists" on the target path.
            let open_result = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&abs)
                .await;

            let mut file = match open_result {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(BackendError::Local(e))
                        .context(AlreadyExistsSnafu { path: path_str });
                }
                Err(e) => {
                    return Err(BackendError::Local(e)).context(OtherIoSnafu { path: path_str });
                }
            };

            file.write_all(contents)
                .await
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: abs.display().to_string(),
                })?;

            file.sync_all()
                .await
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: abs.display().to_string(),
                })?;

            Ok(())
        }
    }
}

/// Read the file at `rel_path` under `location` into a `String`.
///
/// A missing file maps to [`StorageError::NotFound`] so callers can
/// distinguish "dataset does not exist" from real I/O trouble.
pub async fn read_to_string(location: &DatasetLocation, rel_path: &Path) -> StorageResult<String> {
    match location {
        DatasetLocation::Local(_) => {
            let abs = join_local(location, rel_path);

            match fs::read_to_string(&abs).await {
                Ok(s) => Ok(s),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackendError::Local(e))
                    .context(NotFoundSnafu {
                        path: abs.display().to_string(),
                    }),
                Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu {
                    path: abs.display().to_string(),
                }),
            }
        }
    }
}
