mod cli;
mod handlers;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use handlers::{dev, repl};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            print!("{}", e);
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprint!("{}", e);
            return Ok(ExitCode::from(1));
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let code = runtime.block_on(async {
        match cli.command {
            Commands::Repl => repl::handle_repl().await,
            Commands::Dev {
                command,
                watch,
                interval,
            } => dev::handle_dev(command, watch, interval).await,
        }
    })?;

    Ok(ExitCode::from(code))
}
