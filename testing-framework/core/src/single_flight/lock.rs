use std::{
    fs::{File, OpenOptions},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use fs2::FileExt;

use crate::error::StressError;

const LOCK_EXTENSION: &str = "lock";

/// Exclusive advisory lock on `<dir>/<key>.lock`.
///
/// Held for as long as the value lives; released on drop (RAII). The lock file
/// itself stays on disk so every opener contends on the same inode.
#[derive(Debug)]
pub struct KeyLock {
    file: File,
    path: PathBuf,
    key: String,
}

impl KeyLock {
    /// Takes the lock for `key` without waiting.
    ///
    /// # Errors
    ///
    /// `StressError::DuplicateJob` when another holder (thread or process) has
    /// it, `StressError::InvalidKey` for keys that are not safe file names.
    pub fn try_acquire(dir: &Path, key: &str) -> Result<Self, StressError> {
        validate_key(key)?;
        let path = dir.join(format!("{key}.{LOCK_EXTENSION}"));
        let lock_err = |source: io::Error| StressError::Lock {
            path: path.clone(),
            source,
        };

        // Never truncate on open: the current holder's pid lives in the file.
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(lock_err)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                return Err(StressError::DuplicateJob {
                    key: key.to_owned(),
                });
            }
            Err(err) => return Err(lock_err(err)),
        }

        let mut file = file;
        file.set_len(0).map_err(lock_err)?;
        writeln!(file, "{}", std::process::id()).map_err(lock_err)?;

        Ok(Self {
            file,
            path,
            key: key.to_owned(),
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(key = %self.key, %err, "failed to release key lock");
        }
    }
}

fn validate_key(key: &str) -> Result<(), StressError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StressError::InvalidKey {
            key: key.to_owned(),
        })
    }
}
