pub mod credentials;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use credentials::{resolve_remote, CredentialError, CredentialVariant, ResolvedRemote};

/// Ref prefix applied to branches passed through [`FetchRequest::for_scan`].
pub const SCAN_BRANCH_PREFIX: &str = "refs/heads/";

/// Everything needed to materialize one repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub repository_url: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_package_as_archive")]
    pub package_as_archive: bool,
}

fn default_package_as_archive() -> bool {
    true
}

impl FetchRequest {
    pub fn new(repository_url: impl Into<String>) -> Self {
        FetchRequest {
            repository_url: repository_url.into(),
            branch: String::new(),
            exclude_patterns: Vec::new(),
            package_as_archive: true,
        }
    }

    /// Builds a request for a scan: branches get the `refs/heads/` prefix and
    /// the checkout is always archived.
    pub fn for_scan(
        repository_url: impl Into<String>,
        exclude_patterns: Vec<String>,
        branch: &str,
    ) -> Self {
        let request = FetchRequest::new(repository_url).with_exclude_patterns(exclude_patterns);
        if branch.is_empty() {
            request
        } else {
            request.with_branch(format!("{SCAN_BRANCH_PREFIX}{branch}"))
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_package_as_archive(mut self, package_as_archive: bool) -> Self {
        self.package_as_archive = package_as_archive;
        self
    }

    /// Exclusion patterns joined the way archivers expect them. Empty when no
    /// patterns are set.
    pub fn exclusions(&self) -> String {
        self.exclude_patterns.join(",")
    }
}

// The url may carry credentials, keep them out of logs.
impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("repository_url", &redact_url(&self.repository_url))
            .field("branch", &self.branch)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("package_as_archive", &self.package_as_archive)
            .finish()
    }
}

/// Strips the user-info segment from a url so it can be logged.
pub fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<unparseable url>".to_owned(),
    }
}

/// The single path handed back by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    /// Compressed archive of the checkout. The checkout itself is gone.
    Archive(PathBuf),
    /// Raw checkout directory, now owned by the caller.
    Checkout(PathBuf),
}

impl PipelineResult {
    pub fn path(&self) -> &Path {
        match self {
            PipelineResult::Archive(path) | PipelineResult::Checkout(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            PipelineResult::Archive(path) | PipelineResult::Checkout(path) => path,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, PipelineResult::Archive(_))
    }
}
