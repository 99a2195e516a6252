//! `key-audit` entry point.
//!
//! Usage:
//!   key-audit vault.db                        - key ids only
//!   key-audit vault.db --key-dir ./keys       - key ids and statuses
//!   key-audit vault.db --key-ring ring.json --as-of 2024-06-01T00:00:00Z --summary

use clap::Parser;
use key_audit::cli::Cli;
use key_audit::logging::init_logging;
use key_audit::runner::run_sqlite;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.into_config() {
        Ok(config) => {
            let mut stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr();
            run_sqlite(&config, &mut stdout, &mut stderr).await.map(|_| ())
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
