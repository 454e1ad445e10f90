use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

/// Ephemeral checkout directory owned by a single pipeline invocation.
///
/// The directory is not created by [`Workspace::allocate`], the clone creates it.
/// It must be either removed with [`Workspace::remove`] or handed off with
/// [`Workspace::into_path`].
#[derive(Debug, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn allocate(base_dir: &Path) -> Workspace {
        let path = base_dir.join(Uuid::new_v4().to_string());
        debug!("Allocated workspace {}", path.display());
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transfers ownership of the directory to the caller.
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn remove(self) -> std::io::Result<()> {
        debug!("Removing workspace {}", self.path.display());
        match std::fs::remove_dir_all(&self.path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            otherwise => otherwise,
        }
    }
}
