//! # plata command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Create Tokio runtime
//!   └─> Execute the command (run / init-db / inspect)
//! ```
//!
//! ```bash
//! PLATA_SALT=... DATABASE_URL=postgres://... plata run --input-dir input
//! plata run --no-db --salt dev-salt
//! plata init-db
//! plata inspect input/Clientes-2024-01-31.csv
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // The store and the batch runner are async (sqlx), so commands run
    // inside a Tokio runtime.
    tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command))
}
