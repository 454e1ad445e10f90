pub mod archive;
pub mod cli;
pub mod config;
pub mod git;
pub mod hook;
pub mod model;
pub mod pipeline;
pub mod workspace;

mod api;

pub use api::{BuildError, RepoFetch, RepoFetchBuilder};
pub use model::{CredentialVariant, FetchRequest, PipelineResult};
pub use pipeline::{FailureKind, FetchError};
