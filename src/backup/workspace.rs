use crate::error::{BackupError, Result};
use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub const WORKSPACE_PREFIX: &str = "yorokobi-backup";

const MAX_CREATE_ATTEMPTS: usize = 8;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Removed by [`Workspace::release`] or, failing that, when dropped, so early
/// returns and panics during submission still clean up.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn create(root: &Path, prefix: &str, label: &str) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| {
            BackupError::Workspace(format!("cannot create staging root {}: {}", root.display(), e))
        })?;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let path = root.join(unique_name(prefix, label));
            match create_private_dir(&path) {
                Ok(()) => {
                    debug!("Created workspace {}", path.display());
                    return Ok(Self {
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(BackupError::Workspace(format!(
                        "cannot create {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(BackupError::Workspace(format!(
            "no free workspace name under {} after {} attempts",
            root.display(),
            MAX_CREATE_ATTEMPTS
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        release(&self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = release(&self.path) {
            warn!("Failed to remove workspace {}: {}", self.path.display(), e);
        }
    }
}

pub fn release(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed workspace {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BackupError::Workspace(format!(
            "cannot remove {}: {}",
            path.display(),
            e
        ))),
    }
}

fn unique_name(prefix: &str, label: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        prefix,
        label,
        Utc::now().format("%Y%m%d%H%M%S%6f"),
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir(path)
}
