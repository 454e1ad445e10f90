use std::{env, path::PathBuf};

use home::home_dir;
use log::debug;
use thiserror::Error;

use crate::{
    archive::{Archiver, ZipArchiver},
    config::RepoFetchConfig,
    git::{GitRepositoryClient, RepositoryClient},
    hook::{HookRunner, ProcessScriptEngine, ScriptEngine},
    RepoFetch,
};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Workspace location {location} is not a directory")]
    BadLocation { location: String },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Default)]
pub struct RepoFetchBuilder {
    workspace_directory_path: Option<PathBuf>,
    hook_script: Option<PathBuf>,
    hook_interpreter: Option<PathBuf>,
    repository_client: Option<Box<dyn RepositoryClient>>,
    archiver: Option<Box<dyn Archiver>>,
    script_engine: Option<Box<dyn ScriptEngine>>,
}

impl RepoFetchBuilder {
    /// Applies every value set in `config`.
    pub fn config(mut self, config: RepoFetchConfig) -> Self {
        if let Some(dir) = config.workspace_dir {
            self.workspace_directory_path = Some(dir);
        }
        if let Some(script) = config.hook_script {
            self.hook_script = Some(script);
        }
        if let Some(interpreter) = config.hook_interpreter {
            self.hook_interpreter = Some(interpreter);
        }
        self
    }

    /// Location of ephemeral checkouts and archives.
    ///
    /// Defaults to `$HOME/.repofetch/workspaces`.
    pub fn workspace_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_directory_path = Some(path.into());
        self
    }

    /// Script run after every clone, see [`crate::hook::ProcessScriptEngine`].
    pub fn hook_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.hook_script = Some(path.into());
        self
    }

    /// Program used to run the hook script, e.g. `sh`.
    ///
    /// Only applies to the default script engine. Without it the script must be executable.
    pub fn hook_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.hook_interpreter = Some(interpreter.into());
        self
    }

    /// Defaults to [`GitRepositoryClient`].
    pub fn repository_client(mut self, client: impl RepositoryClient + 'static) -> Self {
        self.repository_client = Some(Box::new(client));
        self
    }

    /// Defaults to [`ZipArchiver`].
    pub fn archiver(mut self, archiver: impl Archiver + 'static) -> Self {
        self.archiver = Some(Box::new(archiver));
        self
    }

    /// Defaults to [`ProcessScriptEngine`].
    pub fn script_engine(mut self, engine: impl ScriptEngine + 'static) -> Self {
        self.script_engine = Some(Box::new(engine));
        self
    }

    pub fn try_build(self) -> Result<RepoFetch, BuildError> {
        let Self {
            workspace_directory_path,
            hook_script,
            hook_interpreter,
            repository_client,
            archiver,
            script_engine,
        } = self;
        let root = env::current_dir()?;

        let workspace_dir =
            root.join(workspace_directory_path.unwrap_or_else(default_workspace_directory));
        if workspace_dir.exists() {
            if !workspace_dir.is_dir() {
                return Err(BuildError::BadLocation {
                    location: workspace_dir.to_string_lossy().to_string(),
                });
            }
        } else {
            std::fs::create_dir_all(&workspace_dir)?;
        }
        debug!("Using workspace directory {}", workspace_dir.display());

        let script_engine = script_engine.unwrap_or_else(|| {
            Box::new(match hook_interpreter {
                Some(interpreter) => ProcessScriptEngine::with_interpreter(interpreter),
                None => ProcessScriptEngine::default(),
            })
        });
        let hook = HookRunner::new(hook_script.map(|script| root.join(script)), script_engine);

        Ok(RepoFetch {
            workspace_dir,
            client: repository_client.unwrap_or_else(|| Box::new(GitRepositoryClient::new())),
            archiver: archiver.unwrap_or_else(|| Box::new(ZipArchiver)),
            hook,
        })
    }
}

fn default_workspace_directory() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".repofetch/workspaces"),
        None => env::temp_dir().join("repofetch"),
    }
}
