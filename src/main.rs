use clap::Parser;
use repofetch::cli::{args::CliArgs, command_handlers::do_fetch};

fn run() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();
    let path = do_fetch(cli_args)?;
    println!("{}", path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
