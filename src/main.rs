//! Banking engine CLI
//!
//! Operates a bank whose state lives in journals under a data directory.
//!
//! # Usage
//!
//! ```bash
//! banking-engine person register-natural --national-id 1712345678 \
//!     --first-name Ana --last-name Perez --birth-date 1990-01-31 \
//!     --email ana@example.com --phone 0999999999
//! banking-engine account open-savings --owner 1 --deposit 100.00
//! banking-engine deposit 1 25.50
//! banking-engine code issue --account 1 --amount 20.00
//! banking-engine pay settle --service EEQ_LUZ --reference 1234567 --amount 45.50
//! banking-engine replay --ephemeral --accounts accounts.csv operations.csv > balances.csv
//! ```
//!
//! Results go to stdout, logs to stderr (`RUST_LOG`, default `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (rejected operation, unreadable file, storage failure, etc.)

use rust_banking_engine::cli;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
