use clap::Parser;
use tracing::Level;

mod cli;
mod commands;
mod exit_codes;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let exit_code = match cli.command {
        cli::Command::Process(args) => commands::process::execute(args),
        cli::Command::Batch(args) => commands::batch::execute(args).await,
        cli::Command::Simulate(args) => commands::simulate::execute(args),
    };

    std::process::exit(exit_code);
}
