use std::{cell::Cell, path::Path};

use git2::{
    build::RepoBuilder, cert::Cert, AutotagOption, CertificateCheckStatus, Config, Cred,
    CredentialType, Direction, ErrorClass, ErrorCode, FetchOptions, Remote, RemoteCallbacks,
};
use log::{debug, info, trace};
use ssh_key::{known_hosts::HostPatterns, KnownHosts};

use super::{short_branch_name, CloneError, RepositoryClient};
use crate::model::{CredentialVariant, SCAN_BRANCH_PREFIX};

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";
const DEFAULT_DEPTH: i32 = 1;

/// [`RepositoryClient`] backed by libgit2.
#[derive(Debug, Clone)]
pub struct GitRepositoryClient {
    depth: Option<i32>,
}

impl Default for GitRepositoryClient {
    fn default() -> Self {
        GitRepositoryClient {
            depth: Some(DEFAULT_DEPTH),
        }
    }
}

impl GitRepositoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// History depth to fetch. `None` fetches the full history of the branch.
    pub fn with_depth(mut self, depth: Option<i32>) -> Self {
        self.depth = depth;
        self
    }

    fn fetch_options<'a>(
        &self,
        url: &str,
        credential: &'a CredentialVariant,
    ) -> FetchOptions<'a> {
        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(remote_callbacks(credential))
            .download_tags(AutotagOption::None);

        // The local transport cannot negotiate shallow fetches.
        if let Some(depth) = self.depth.filter(|_| !url.starts_with("file://")) {
            fetch_options.depth(depth);
        }

        fetch_options
    }

    /// Asks the remote which branch its HEAD points to.
    fn remote_default_branch(
        &self,
        url: &str,
        credential: &CredentialVariant,
    ) -> Result<String, CloneError> {
        let mut remote = Remote::create_detached(url)?;
        let connection =
            remote.connect_auth(Direction::Fetch, Some(remote_callbacks(credential)), None)?;
        let head = connection.default_branch()?;
        let head = head
            .as_str()
            .ok_or_else(|| CloneError::Other("Remote HEAD is not valid UTF-8".to_owned()))?;

        head.strip_prefix(SCAN_BRANCH_PREFIX)
            .map(str::to_owned)
            .ok_or_else(|| CloneError::Other(format!("Remote HEAD {head} is not a branch")))
    }
}

impl RepositoryClient for GitRepositoryClient {
    fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        credential: &CredentialVariant,
        destination: &Path,
    ) -> Result<(), CloneError> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let branch = match short_branch_name(branch) {
            Some(branch) => branch.to_owned(),
            None => {
                let branch = self.remote_default_branch(url, credential)?;
                debug!("No branch requested, remote default branch is {}", branch);
                branch
            }
        };

        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        trace!("Restricting clone to refspec {}", refspec);

        let mut repo_builder = RepoBuilder::new();
        repo_builder
            .fetch_options(self.fetch_options(url, credential))
            .branch(&branch)
            .remote_create(move |repo, name, url| repo.remote_with_fetch(name, url, &refspec));

        info!("Cloning code locally to {}", destination.display());
        // Dropping the repository closes the remote and its transport.
        drop(repo_builder.clone(url, destination)?);

        Ok(())
    }
}

/// Credential and host key callbacks for a single remote operation.
///
/// Each credential type is offered at most once, so a rejected credential fails
/// the operation instead of looping.
fn remote_callbacks(credential: &CredentialVariant) -> RemoteCallbacks<'_> {
    let git_config = Config::open_default().ok();
    let userpass_attempted = Cell::new(false);
    let ssh_attempted = Cell::new(false);

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed_types| {
        trace!(
            "Requested credentials for {}, username {:?}, allowed types {:?}",
            url,
            username,
            allowed_types
        );
        if allowed_types.contains(CredentialType::USERNAME) {
            return Cred::username(username.unwrap_or("git"));
        }
        if allowed_types.contains(CredentialType::SSH_KEY) && !ssh_attempted.replace(true) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT)
            && !userpass_attempted.replace(true)
        {
            return match (credential.userpass(), &git_config) {
                (Some((login, secret)), _) => Cred::userpass_plaintext(login, secret),
                (None, Some(git_config)) => Cred::credential_helper(git_config, url, username),
                (None, None) => Err(auth_error("no credentials available")),
            };
        }
        Err(auth_error("no valid authentication available"))
    });
    callbacks.certificate_check(|certificate, host| Ok(verify_host_key(certificate, host)));

    callbacks
}

fn auth_error(message: &str) -> git2::Error {
    git2::Error::new(ErrorCode::Auth, ErrorClass::Callback, message)
}

/// Accepts an ssh host key listed for `host` in the system known_hosts file.
/// Anything else is left to libgit2's own verification.
fn verify_host_key(certificate: &Cert<'_>, host: &str) -> CertificateCheckStatus {
    let Some(hostkey) = certificate.as_hostkey().and_then(|h| h.hostkey()) else {
        return CertificateCheckStatus::CertificatePassthrough;
    };

    let entries = match KnownHosts::read_file(GLOBAL_KNOWN_HOSTS) {
        Ok(entries) => entries,
        Err(error) => {
            trace!("Skipping {}: {}", GLOBAL_KNOWN_HOSTS, error);
            return CertificateCheckStatus::CertificatePassthrough;
        }
    };

    let host = host.to_ascii_lowercase();
    let known = entries
        .iter()
        .filter(|entry| known_host_matches(&host, entry.host_patterns()))
        .any(|entry| entry.public_key().to_bytes().as_deref() == Ok(hostkey));

    if known {
        trace!("Host key of {} found in {}", host, GLOBAL_KNOWN_HOSTS);
        CertificateCheckStatus::CertificateOk
    } else {
        trace!("Host key of {} not found in {}", host, GLOBAL_KNOWN_HOSTS);
        CertificateCheckStatus::CertificatePassthrough
    }
}

/// Plain and negated host names. Wildcards and hashed names never match.
fn known_host_matches(host: &str, patterns: &HostPatterns) -> bool {
    let HostPatterns::Patterns(patterns) = patterns else {
        return false;
    };

    let (negated, plain): (Vec<_>, Vec<_>) = patterns
        .iter()
        .map(|pattern| pattern.to_ascii_lowercase())
        .partition(|pattern| pattern.starts_with('!'));

    !negated.iter().any(|pattern| pattern[1..] == *host)
        && plain.iter().any(|pattern| pattern == host)
}
