//! Clone, hook, package and cleanup for a single [`FetchRequest`].

use std::path::Path;

use log::{error, info, warn};
use thiserror::Error;

use crate::{
    archive::{archive_path, ArchiveError, Archiver},
    git::{CloneError, CloneErrorKind, RepositoryClient},
    hook::HookRunner,
    model::{redact_url, resolve_remote, CredentialError, FetchRequest, PipelineResult},
    workspace::Workspace,
};

/// Failure of the fetch pipeline.
///
/// Every variant renders the same message. Use [`FetchError::kind`] or
/// [`std::error::Error::source`] to tell them apart.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unable to clone Git Url.")]
    InvalidUrl(#[from] CredentialError),
    #[error("Unable to clone Git Url.")]
    Clone(#[from] CloneError),
    #[error("Unable to clone Git Url.")]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Authentication,
    Network,
    BranchNotFound,
    Filesystem,
    Archive,
    Other,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidUrl(_) => FailureKind::InvalidUrl,
            FetchError::Clone(error) => match error.kind() {
                CloneErrorKind::Authentication => FailureKind::Authentication,
                CloneErrorKind::Network => FailureKind::Network,
                CloneErrorKind::BranchNotFound => FailureKind::BranchNotFound,
                CloneErrorKind::Filesystem => FailureKind::Filesystem,
                CloneErrorKind::Other => FailureKind::Other,
            },
            FetchError::Archive(_) => FailureKind::Archive,
        }
    }
}

/// Runs the whole pipeline. Nothing is retried.
pub fn prepare_repository_file(
    workspace_dir: &Path,
    client: &dyn RepositoryClient,
    hook: &HookRunner,
    archiver: &dyn Archiver,
    request: FetchRequest,
    package_as_archive: bool,
) -> Result<PipelineResult, FetchError> {
    let workspace = Workspace::allocate(workspace_dir);

    clone(client, &request, &workspace)?;
    info!("After Clone");

    hook.run(&request, workspace.path());

    finalize(
        workspace_dir,
        archiver,
        workspace,
        package_as_archive,
        &request.exclude_patterns,
    )
    .map_err(|err| {
        error!("{}", err);
        FetchError::Archive(err)
    })
}

fn clone(
    client: &dyn RepositoryClient,
    request: &FetchRequest,
    workspace: &Workspace,
) -> Result<(), FetchError> {
    let remote = resolve_remote(&request.repository_url).map_err(|err| {
        error!("{}", err);
        FetchError::InvalidUrl(err)
    })?;

    client
        .clone_branch(
            &remote.url,
            &request.branch,
            &remote.credential,
            workspace.path(),
        )
        .map_err(|err| {
            error!(
                "Could not clone {}: {}",
                redact_url(&request.repository_url),
                err
            );
            FetchError::Clone(err)
        })
}

/// Hands the checkout over as is, or archives it and removes it.
///
/// When archiving fails the checkout is left on disk and the error is returned.
pub fn finalize(
    workspace_dir: &Path,
    archiver: &dyn Archiver,
    workspace: Workspace,
    package_as_archive: bool,
    exclude_patterns: &[String],
) -> Result<PipelineResult, ArchiveError> {
    if !package_as_archive {
        return Ok(PipelineResult::Checkout(workspace.into_path()));
    }

    let destination = archive_path(workspace_dir);
    info!("running zip file");
    if let Err(err) = archiver.write_archive(
        workspace.path(),
        &destination,
        &exclude_patterns.join(","),
    ) {
        warn!(
            "Archive failed, leaving checkout {} in place",
            workspace.path().display()
        );
        return Err(err);
    }

    let checkout = workspace.path().to_path_buf();
    if let Err(err) = workspace.remove() {
        warn!("Error deleting file {} - {}", checkout.display(), err);
    }

    Ok(PipelineResult::Archive(destination))
}
