use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use log::{debug, error, info};
use thiserror::Error;

use crate::model::FetchRequest;

/// Environment variable holding the checkout path.
pub const PATH_VAR: &str = "REPOFETCH_PATH";
/// Environment variable holding the fetch request serialized as TOML.
pub const PARAMS_VAR: &str = "REPOFETCH_PARAMS";

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Post clone script {0} does not exist")]
    MissingScript(PathBuf),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Could not serialize hook parameters: {0}")]
    Params(#[from] toml::ser::Error),
    #[error("Post clone script {script} exited with {status}")]
    Failed { script: PathBuf, status: ExitStatus },
    #[error("Post clone script {0} panicked")]
    Panicked(PathBuf),
}

/// Values visible to a post clone script.
#[derive(Debug, Clone, Copy)]
pub struct HookBindings<'a> {
    pub params: &'a FetchRequest,
    pub path: &'a Path,
}

/// Runs a post clone script with the given bindings.
pub trait ScriptEngine: Send + Sync {
    fn execute(&self, script: &Path, bindings: &HookBindings<'_>) -> Result<(), HookError>;
}

/// Executes the script as a child process.
///
/// The script runs from its own directory and receives the checkout path both as its
/// first argument and in [`PATH_VAR`]. The request is available as TOML in [`PARAMS_VAR`].
/// Without an interpreter the script file itself must be executable.
#[derive(Debug, Default, Clone)]
pub struct ProcessScriptEngine {
    interpreter: Option<PathBuf>,
}

impl ProcessScriptEngine {
    /// Runs scripts as `<interpreter> <script> <checkout>`.
    pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
        ProcessScriptEngine {
            interpreter: Some(interpreter.into()),
        }
    }
}

impl ScriptEngine for ProcessScriptEngine {
    fn execute(&self, script: &Path, bindings: &HookBindings<'_>) -> Result<(), HookError> {
        let script = script
            .canonicalize()
            .map_err(|_| HookError::MissingScript(script.to_path_buf()))?;
        if !script.is_file() {
            return Err(HookError::MissingScript(script));
        }

        let params = toml::to_string(bindings.params)?;
        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(&script);
                command
            }
            None => Command::new(&script),
        };
        command
            .arg(bindings.path)
            .env(PATH_VAR, bindings.path)
            .env(PARAMS_VAR, params);
        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }

        debug!("Spawning post clone script {}", script.display());
        let status = command.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(HookError::Failed { script, status })
        }
    }
}

/// Best-effort post clone hook. Failures are logged and never propagate.
pub struct HookRunner {
    script: Option<PathBuf>,
    engine: Box<dyn ScriptEngine>,
}

impl HookRunner {
    pub fn new(script: Option<PathBuf>, engine: Box<dyn ScriptEngine>) -> Self {
        HookRunner { script, engine }
    }

    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    pub fn run(&self, request: &FetchRequest, checkout: &Path) {
        let Some(script) = &self.script else {
            return;
        };

        info!("Running post clone script {}", script.display());
        let bindings = HookBindings {
            params: request,
            path: checkout,
        };
        let result = catch_unwind(AssertUnwindSafe(|| self.engine.execute(script, &bindings)))
            .unwrap_or_else(|_| Err(HookError::Panicked(script.clone())));

        if let Err(error) = result {
            error!(
                "Error occurred while executing Post Clone Script {}: {}",
                script.display(),
                error
            );
        }
    }
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner")
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}
