use std::path::{Path, PathBuf};

use crate::{
    archive::Archiver,
    git::RepositoryClient,
    hook::HookRunner,
    model::{FetchRequest, PipelineResult},
    pipeline::{self, FetchError},
};

mod builder;

pub use builder::{BuildError, RepoFetchBuilder};

/// Repository materialization entry point.
///
/// Settings are fixed at build time. A single instance can serve concurrent
/// requests from several threads, each request works in its own workspace.
pub struct RepoFetch {
    workspace_dir: PathBuf,
    client: Box<dyn RepositoryClient>,
    archiver: Box<dyn Archiver>,
    hook: HookRunner,
}

impl RepoFetch {
    pub fn builder() -> RepoFetchBuilder {
        RepoFetchBuilder::default()
    }

    /// Directory holding ephemeral checkouts and produced archives.
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    pub fn hook_script(&self) -> Option<&Path> {
        self.hook.script()
    }

    /// Clones `request`, runs the post clone hook and, when the request asks for it,
    /// packages the checkout into an archive.
    pub fn prepare_repository_file(
        &self,
        request: FetchRequest,
    ) -> Result<PipelineResult, FetchError> {
        let package_as_archive = request.package_as_archive;
        self.prepare_repository_file_with(request, package_as_archive)
    }

    /// Same as [`RepoFetch::prepare_repository_file`] with an explicit packaging mode.
    pub fn prepare_repository_file_with(
        &self,
        request: FetchRequest,
        package_as_archive: bool,
    ) -> Result<PipelineResult, FetchError> {
        pipeline::prepare_repository_file(
            &self.workspace_dir,
            self.client.as_ref(),
            &self.hook,
            self.archiver.as_ref(),
            request,
            package_as_archive,
        )
    }

    /// Archives `branch` of a repository whose url embeds its credentials.
    ///
    /// A non empty branch is resolved under `refs/heads/`.
    pub fn prepare_scan_archive(
        &self,
        repository_url: &str,
        exclude_patterns: Vec<String>,
        branch: &str,
    ) -> Result<PathBuf, FetchError> {
        let request = FetchRequest::for_scan(repository_url, exclude_patterns, branch);
        self.prepare_repository_file_with(request, true)
            .map(PipelineResult::into_path)
    }
}

impl std::fmt::Debug for RepoFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoFetch")
            .field("workspace_dir", &self.workspace_dir)
            .field("hook", &self.hook)
            .finish_non_exhaustive()
    }
}
