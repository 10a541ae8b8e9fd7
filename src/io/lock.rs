use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Name of the lock file kept next to `store.json`
pub const LOCK_FILE: &str = "store.lock";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Exclusive advisory lock over a store directory.
///
/// Held for the whole read-modify-write cycle of a store call so that two
/// `tl` processes never interleave writes. Released when dropped. The lock
/// file itself is left in place.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("flock on {path} failed: {source}")]
    Flock {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out after {waited:?} waiting for {path}: another tl process is writing")]
    Timeout { path: PathBuf, waited: Duration },
}

impl StoreLock {
    /// Take the lock if it is free right now.
    pub fn try_acquire(store_dir: &Path) -> Result<Option<Self>, LockError> {
        let path = store_dir.join(LOCK_FILE);
        let file = open_lock_file(&path)?;
        match try_flock(&file) {
            Ok(true) => Ok(Some(StoreLock { _file: file, path })),
            Ok(false) => Ok(None),
            Err(source) => Err(LockError::Flock { path, source }),
        }
    }

    /// Wait up to `timeout` for the lock, backing off between attempts.
    pub fn acquire(store_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let start = Instant::now();
        let mut backoff = MIN_BACKOFF;
        loop {
            if let Some(lock) = Self::try_acquire(store_dir)? {
                return Ok(lock);
            }
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: store_dir.join(LOCK_FILE),
                    waited,
                });
            }
            tracing::debug!(dir = %store_dir.display(), ?backoff, "store lock busy");
            thread::sleep(backoff.min(timeout - waited));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    pub fn acquire_default(store_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(store_dir, DEFAULT_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|source| LockError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// `Ok(false)` when another holder has the lock.
#[cfg(unix)]
fn try_flock(file: &File) -> Result<bool, std::io::Error> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and open for this call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn try_flock(_file: &File) -> Result<bool, std::io::Error> {
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = StoreLock::acquire_default(tmp.path()).unwrap();
        assert!(lock.path().ends_with(LOCK_FILE));
        drop(lock);
        assert!(tmp.path().join(LOCK_FILE).exists());
        assert!(StoreLock::try_acquire(tmp.path()).unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn busy_lock_is_reported_then_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = StoreLock::acquire_default(tmp.path()).unwrap();
        assert!(StoreLock::try_acquire(tmp.path()).unwrap().is_none());

        let second = StoreLock::acquire(tmp.path(), Duration::from_millis(40));
        match second {
            Err(LockError::Timeout { waited, .. }) => {
                assert!(waited >= Duration::from_millis(40))
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn missing_directory_is_an_open_error() {
        let tmp = TempDir::new().unwrap();
        let err = StoreLock::try_acquire(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, LockError::Open { .. }));
    }
}
