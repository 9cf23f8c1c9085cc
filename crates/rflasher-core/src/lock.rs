//! Cross-process advisory lock
//!
//! A single host may have more than one actor touching the same flash bus
//! (a running session, plus a second invocation started by mistake). The
//! lock is a named file whose exclusive lock is held for the duration of a
//! session; acquisition polls up to a caller-supplied timeout rather than
//! failing immediately on contention.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

use crate::error::{Error, Result};

/// Default acquisition timeout for an interactive session
pub const DEFAULT_TIMEOUT_INTERACTIVE: Duration = Duration::from_secs(180);
/// Default acquisition timeout for a scripted/non-interactive caller
pub const DEFAULT_TIMEOUT_SCRIPTED: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A held advisory lock, backed by a file
///
/// Dropping this releases the lock. There is no partial-access mode:
/// failing to acquire within the timeout is always fatal to the caller.
#[derive(Debug)]
pub struct AdvisoryLock {
    file: File,
    path: PathBuf,
}

impl AdvisoryLock {
    /// Acquire the named lock, waiting up to `timeout` for a contending
    /// holder to release it
    ///
    /// The backing file is created if it doesn't exist; its contents are
    /// not used for anything beyond holding the lock.
    pub fn acquire(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|_| Error::IoError)?;

        let deadline = Instant::now() + timeout;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(Self { file, path }),
                Err(e) if is_contended(&e) => {
                    if Instant::now() >= deadline {
                        return Err(Error::Timeout);
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(_) => return Err(Error::IoError),
            }
        }
    }

    /// Path of the backing lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock
    ///
    /// Equivalent to dropping the value; gives the release a name at the
    /// call site for callers that push it onto a [`crate::shutdown::ShutdownRegistry`].
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock) || e.raw_os_error() == Some(11)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_round_trips() {
        let path = std::env::temp_dir().join(format!("rflasher-lock-test-{}", std::process::id()));
        let lock = AdvisoryLock::acquire(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(lock.path(), path.as_path());
        lock.release();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let path =
            std::env::temp_dir().join(format!("rflasher-lock-test-contend-{}", std::process::id()));
        let held = AdvisoryLock::acquire(&path, Duration::from_secs(1)).unwrap();
        let result = AdvisoryLock::acquire(&path, Duration::from_millis(200));
        assert!(matches!(result, Err(Error::Timeout)));
        drop(held);
        let _ = std::fs::remove_file(&path);
    }
}
