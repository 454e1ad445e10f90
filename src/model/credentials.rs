use std::fmt::{Debug, Formatter};

use log::{debug, info};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

const OAUTH2_PREFIX: &str = "oauth2:";
const OAUTH2_LOGIN: &str = "oauth2";
const GITLAB_CI_LOGIN: &str = "gitlab-ci-token";
const BITBUCKET_HOST: &str = "bitbucket.org";
const BITBUCKET_LOGIN: &str = "x-token-auth";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Invalid repository url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Could not rewrite credentials of repository url")]
    Rewrite,
}

/// Authentication strategy inferred from the user-info of a repository url.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum CredentialVariant {
    #[default]
    None,
    UsernamePassword {
        user: String,
        pass: String,
    },
    /// GitLab style `oauth2:<token>` user-info.
    OAuth2Token {
        token: String,
    },
    BitbucketXToken {
        token: String,
    },
    BareToken {
        token: String,
    },
}

impl CredentialVariant {
    /// The username/password pair handed to the transport, if any.
    pub fn userpass(&self) -> Option<(&str, &str)> {
        match self {
            CredentialVariant::None => None,
            CredentialVariant::UsernamePassword { user, pass } => Some((user, pass)),
            CredentialVariant::OAuth2Token { token } => Some((OAUTH2_LOGIN, token)),
            CredentialVariant::BitbucketXToken { token } => Some((BITBUCKET_LOGIN, token)),
            CredentialVariant::BareToken { token } => Some((token, "")),
        }
    }

    pub fn login(&self) -> Option<&str> {
        self.userpass().map(|(login, _)| login)
    }

    pub fn secret(&self) -> Option<&str> {
        self.userpass().map(|(_, secret)| secret)
    }

    pub fn is_none(&self) -> bool {
        self == &CredentialVariant::None
    }

    fn kind(&self) -> &'static str {
        match self {
            CredentialVariant::None => "None",
            CredentialVariant::UsernamePassword { .. } => "UsernamePassword",
            CredentialVariant::OAuth2Token { .. } => "OAuth2Token",
            CredentialVariant::BitbucketXToken { .. } => "BitbucketXToken",
            CredentialVariant::BareToken { .. } => "BareToken",
        }
    }
}

impl Debug for CredentialVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialVariant::UsernamePassword { user, .. } => f
                .debug_struct("UsernamePassword")
                .field("user", user)
                .field("pass", &"***")
                .finish(),
            CredentialVariant::None => f.write_str("None"),
            other => f
                .debug_struct(other.kind())
                .field("token", &"***")
                .finish(),
        }
    }
}

/// Repository url ready to clone, with the credential to clone it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRemote {
    pub url: String,
    pub credential: CredentialVariant,
}

/// Classifies the user-info embedded in `url` into a [`CredentialVariant`].
///
/// Rules, first match wins:
/// 1. no user-info: unauthenticated;
/// 2. `oauth2:<token>`: GitLab token, the url is rewritten to log in as `gitlab-ci-token`;
/// 3. `<user>:<pass>`: plain username and password. Any other `:` split attaches no credential;
/// 4. bitbucket.org host: the user-info is an `x-token-auth` token;
/// 5. anything else is a bare token used as the username.
pub fn resolve_remote(url: &str) -> Result<ResolvedRemote, CredentialError> {
    let mut parsed = Url::parse(url)?;
    let user_info = user_info(url);

    if user_info.is_empty() {
        info!("No user-info in repository url, cloning without credentials");
        return Ok(ResolvedRemote {
            url: url.to_owned(),
            credential: CredentialVariant::None,
        });
    }

    if let Some(token) = user_info.strip_prefix(OAUTH2_PREFIX) {
        debug!("Using gitlab clone");
        parsed
            .set_username(GITLAB_CI_LOGIN)
            .and_then(|_| parsed.set_password(Some(token)))
            .map_err(|_| CredentialError::Rewrite)?;
        return Ok(ResolvedRemote {
            url: parsed.to_string(),
            credential: CredentialVariant::OAuth2Token {
                token: token.to_owned(),
            },
        });
    }

    let credential = if user_info.contains(':') {
        match user_info.split(':').collect::<Vec<_>>().as_slice() {
            [user, pass] if !user.is_empty() && !pass.is_empty() => {
                debug!("Using clone with username/password");
                CredentialVariant::UsernamePassword {
                    user: (*user).to_owned(),
                    pass: (*pass).to_owned(),
                }
            }
            _ => {
                info!("No credential attached, user-info is not a user:password pair");
                CredentialVariant::None
            }
        }
    } else if is_bitbucket(&parsed) {
        debug!("Using bitbucket token clone");
        CredentialVariant::BitbucketXToken { token: user_info }
    } else {
        info!("Using user-info as a token without password");
        CredentialVariant::BareToken { token: user_info }
    };

    Ok(ResolvedRemote {
        url: url.to_owned(),
        credential,
    })
}

// Decoded `user[:password]` segment exactly as written, empty when the url carries none.
// `Url::password` drops an empty password together with its `:`, so the raw authority is read.
fn user_info(url: &str) -> String {
    let Some((_, rest)) = url.split_once("://") else {
        return String::new();
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    match authority.rsplit_once('@') {
        Some((user_info, _)) => percent_decode_str(user_info)
            .decode_utf8_lossy()
            .into_owned(),
        None => String::new(),
    }
}

fn is_bitbucket(url: &Url) -> bool {
    url.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        host == BITBUCKET_HOST || host.ends_with(&format!(".{BITBUCKET_HOST}"))
    })
}
