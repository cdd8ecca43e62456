//! `houio`: inspect and convert Houdini geometry files.

mod cmd;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "houio", version, about = "Inspect and convert bgeo/geo files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every parser event of a file, one per line.
    Log(cmd::log::Args),
    /// Summarise counts, attributes and primitives.
    Info(cmd::info::Args),
    /// Re-encode a file as binary or text.
    Convert(cmd::convert::Args),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Log(args) => cmd::log::run(args),
        Command::Info(args) => cmd::info::run(args),
        Command::Convert(args) => cmd::convert::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("houio: {err}");
            ExitCode::FAILURE
        }
    }
}
