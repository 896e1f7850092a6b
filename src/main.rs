//! archlens CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use archlens::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Analyze(args) => cli::run_analyze(args),
        Commands::Languages => cli::run_languages(),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "archlens=info",
        _ => "archlens=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
