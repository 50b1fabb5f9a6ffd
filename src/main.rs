//! `molerat` binary entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use molerat::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose, "sync");
    let log = Arc::new(logging::Logger::new("sync"));

    commands::sync::run(&args, &log)
}
