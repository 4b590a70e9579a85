//! # tabstat command line
//!
//! Every subcommand reads its input through a worker, runs the operation on
//! another worker and prints the JSON response to stdout. Logs go to stderr
//! (`RUST_LOG=debug` shows progress events).
//!
//! ```bash
//! tabstat ingest sales.xlsx --max-rows 100
//! tabstat transform sales.csv --recipe '{"dropna": ["region"], "typeCast": {"amount": "number"}}'
//! tabstat ttest sales.csv --mode independent --col-a north --col-b south
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // JSON responses go to stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    tabstat::logging::init(cli.log_dir.as_deref())?;
    cli::run(cli)
}
