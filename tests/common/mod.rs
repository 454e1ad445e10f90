#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use repofetch::{
    archive::{ArchiveError, Archiver},
    git::{CloneError, RepositoryClient},
    hook::{HookBindings, HookError, ScriptEngine},
    CredentialVariant,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneCall {
    pub url: String,
    pub branch: String,
    pub credential: CredentialVariant,
    pub destination: PathBuf,
}

/// Writes a small source tree instead of talking to a remote.
#[derive(Default, Clone)]
pub struct FakeClient {
    pub calls: Arc<Mutex<Vec<CloneCall>>>,
}

impl FakeClient {
    pub fn calls(&self) -> Vec<CloneCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RepositoryClient for FakeClient {
    fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        credential: &CredentialVariant,
        destination: &Path,
    ) -> Result<(), CloneError> {
        self.calls.lock().unwrap().push(CloneCall {
            url: url.to_owned(),
            branch: branch.to_owned(),
            credential: credential.clone(),
            destination: destination.to_path_buf(),
        });
        std::fs::create_dir_all(destination.join("src"))?;
        std::fs::create_dir_all(destination.join("docs"))?;
        std::fs::write(destination.join("README.md"), "# repo\n")?;
        std::fs::write(destination.join("src/main.rs"), "fn main() {}\n")?;
        std::fs::write(destination.join("docs/guide.md"), "guide\n")?;
        Ok(())
    }
}

pub struct RejectingClient;

impl RepositoryClient for RejectingClient {
    fn clone_branch(
        &self,
        _url: &str,
        _branch: &str,
        _credential: &CredentialVariant,
        _destination: &Path,
    ) -> Result<(), CloneError> {
        Err(CloneError::Git(git2::Error::new(
            git2::ErrorCode::Auth,
            git2::ErrorClass::Http,
            "authentication rejected",
        )))
    }
}

/// Records its arguments and writes an empty archive.
#[derive(Default, Clone)]
pub struct RecordingArchiver {
    pub calls: Arc<Mutex<Vec<(PathBuf, PathBuf, String)>>>,
}

impl Archiver for RecordingArchiver {
    fn write_archive(
        &self,
        source: &Path,
        destination: &Path,
        exclusions: &str,
    ) -> Result<(), ArchiveError> {
        assert!(source.is_dir(), "checkout must exist while archiving");
        self.calls.lock().unwrap().push((
            source.to_path_buf(),
            destination.to_path_buf(),
            exclusions.to_owned(),
        ));
        std::fs::write(destination, b"")?;
        Ok(())
    }
}

pub struct FailingArchiver;

impl Archiver for FailingArchiver {
    fn write_archive(&self, _: &Path, _: &Path, _: &str) -> Result<(), ArchiveError> {
        Err(ArchiveError::IO(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}

pub struct FailingEngine;

impl ScriptEngine for FailingEngine {
    fn execute(&self, script: &Path, _: &HookBindings<'_>) -> Result<(), HookError> {
        Err(HookError::MissingScript(script.to_path_buf()))
    }
}

/// Records the checkout path and whether it existed when the hook ran.
#[derive(Default, Clone)]
pub struct RecordingEngine {
    pub calls: Arc<Mutex<Vec<(PathBuf, bool, String)>>>,
}

impl ScriptEngine for RecordingEngine {
    fn execute(&self, _: &Path, bindings: &HookBindings<'_>) -> Result<(), HookError> {
        self.calls.lock().unwrap().push((
            bindings.path.to_path_buf(),
            bindings.path.join("README.md").is_file(),
            bindings.params.branch.clone(),
        ));
        Ok(())
    }
}
