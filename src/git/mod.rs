mod client;

use std::path::Path;

use git2::{ErrorClass, ErrorCode};
use thiserror::Error;

use crate::model::{CredentialVariant, SCAN_BRANCH_PREFIX};

pub use client::GitRepositoryClient;

/// Checks out a single branch of a remote repository.
pub trait RepositoryClient: Send + Sync {
    /// Blocking single-branch clone of `url` into `destination`.
    ///
    /// `branch` may be a short name or a full `refs/heads/` ref. An empty branch
    /// checks out the remote default branch. Implementations must release every
    /// transport resource before returning.
    fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        credential: &CredentialVariant,
        destination: &Path,
    ) -> Result<(), CloneError>;
}

#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Clone failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneErrorKind {
    Authentication,
    Network,
    BranchNotFound,
    Filesystem,
    Other,
}

impl CloneError {
    pub fn kind(&self) -> CloneErrorKind {
        match self {
            CloneError::Git(error) => classify(error),
            CloneError::IO(_) => CloneErrorKind::Filesystem,
            CloneError::Other(_) => CloneErrorKind::Other,
        }
    }
}

fn classify(error: &git2::Error) -> CloneErrorKind {
    match (error.code(), error.class()) {
        (ErrorCode::Auth, _) => CloneErrorKind::Authentication,
        (ErrorCode::NotFound, ErrorClass::Reference) => CloneErrorKind::BranchNotFound,
        (ErrorCode::Exists, _) => CloneErrorKind::Filesystem,
        (_, ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl) => {
            CloneErrorKind::Network
        }
        (ErrorCode::Certificate, _) => CloneErrorKind::Network,
        (_, ErrorClass::Os | ErrorClass::Filesystem) => CloneErrorKind::Filesystem,
        _ => CloneErrorKind::Other,
    }
}

/// Short branch name, `None` for the remote default branch.
pub(crate) fn short_branch_name(branch: &str) -> Option<&str> {
    let branch = branch.trim();
    let branch = branch.strip_prefix(SCAN_BRANCH_PREFIX).unwrap_or(branch);
    if branch.is_empty() {
        None
    } else {
        Some(branch)
    }
}
