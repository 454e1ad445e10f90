use std::path::PathBuf;

use log::debug;

use crate::{cli::args::CliArgs, config::RepoFetchConfig, model::FetchRequest, RepoFetch};

/// Handler for the default command
/// Loads configuration, lets command line arguments override it and runs the pipeline
pub fn do_fetch(args: CliArgs) -> anyhow::Result<PathBuf> {
    let CliArgs {
        url,
        branch,
        exclude,
        no_archive,
        workspace_dir,
        hook_script,
        hook_interpreter,
        config,
    } = args;

    let config = RepoFetchConfig::load(config.as_deref())?;
    debug!("Loaded configuration: {:?}", config);

    let mut builder = RepoFetch::builder().config(config);
    if let Some(workspace_dir) = workspace_dir {
        builder = builder.workspace_directory(workspace_dir);
    }
    if let Some(hook_script) = hook_script {
        builder = builder.hook_script(hook_script);
    }
    if let Some(hook_interpreter) = hook_interpreter {
        builder = builder.hook_interpreter(hook_interpreter);
    }
    let repofetch = builder.try_build()?;

    let request = FetchRequest::new(url)
        .with_branch(branch)
        .with_exclude_patterns(exclude)
        .with_package_as_archive(!no_archive);

    Ok(repofetch.prepare_repository_file(request)?.into_path())
}
