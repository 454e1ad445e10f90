use std::path::PathBuf;

use clap::Parser;

/// Clones a git repository into an ephemeral workspace and packages it for scanning.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    /// Repository url, credentials may be embedded as user-info
    pub url: String,
    /// Branch to check out, the remote default branch when empty
    #[clap(short, long, default_value = "")]
    pub branch: String,
    /// Glob patterns left out of the archive, repeatable or comma separated
    #[clap(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,
    /// Keep the raw checkout instead of producing an archive
    #[clap(long)]
    pub no_archive: bool,
    /// Location of ephemeral checkouts and archives
    #[clap(short, long)]
    pub workspace_dir: Option<PathBuf>,
    /// Script run against every checkout before packaging
    #[clap(long)]
    pub hook_script: Option<PathBuf>,
    /// Program that runs the hook script, e.g. `sh`
    #[clap(long)]
    pub hook_interpreter: Option<PathBuf>,
    /// TOML configuration file
    #[clap(short, long, env = "REPOFETCH_CONFIG")]
    pub config: Option<PathBuf>,
}
