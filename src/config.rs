use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings read once at startup. Unset values fall back to the builder defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepoFetchConfig {
    pub workspace_dir: Option<PathBuf>,
    pub hook_script: Option<PathBuf>,
    pub hook_interpreter: Option<PathBuf>,
}

impl RepoFetchConfig {
    /// Reads the optional TOML `file`, then `REPOFETCH_*` environment variables.
    /// Environment values win.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let raw_config = RawConfig::load(file, None)?;

        Ok(Self {
            workspace_dir: raw_config.workspace.dir,
            hook_script: raw_config.hook.script,
            hook_interpreter: raw_config.hook.interpreter,
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    workspace: WorkspaceConfig,
    #[serde(default)]
    hook: HookConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct WorkspaceConfig {
    dir: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct HookConfig {
    script: Option<PathBuf>,
    interpreter: Option<PathBuf>,
}

impl RawConfig {
    fn load(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }
        builder
            .add_source(
                Environment::with_prefix("REPOFETCH")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
