mod ant;
mod colony;
mod config;
mod grid;
mod manager;
mod pheromone;
mod report;
mod stats;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    run_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run,

    Show {
        #[arg(long)]
        result_idx: usize,
    },

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.run_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Run => mgr.run_colony()?,
        Command::Show { result_idx } => mgr.show_result(result_idx)?,
        Command::Clean => mgr.clean_results()?,
    }

    Ok(())
}
