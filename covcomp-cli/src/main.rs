#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use cmd::{compress, dump, peaks, stats, wiggle};
use human_panic::setup_panic;
use lazy_static::lazy_static;

use crate::logging::init_logging;
use crate::progress_bar::CovProgressBar;

mod cli;
mod cmd;
mod csv_stat;
mod logging;
mod opts;
mod progress_bar;

lazy_static! {
    pub(crate) static ref PROGRESS_BAR: CovProgressBar = CovProgressBar::new();
}

fn main() -> anyhow::Result<()> {
    setup_panic!();

    let cli: Cli = Cli::parse();

    if !cli.no_progress {
        PROGRESS_BAR.show();
    }

    init_logging(cli.verbose.log_level_filter()).expect("Could not initialize logging");

    match &cli.command {
        Commands::Compress {
            input,
            output,
            index_stride,
        } => {
            let reader = input.open()?;
            PROGRESS_BAR.set_total_bytes(0);
            let output = output
                .clone()
                .unwrap_or_else(|| input.with_extension("cov"))
                .create(true)?;

            compress::compress(
                reader,
                output,
                *index_stride,
                Arc::new(PROGRESS_BAR.clone()),
            )
            .context("Failed to compress given file")?;
        }
        Commands::Dump {
            input,
            output,
            sequence,
        } => {
            let output = output.create(false)?;

            dump::dump(input.path(), output, sequence.as_deref())
                .context("Failed to dump given archive")?;
        }
        Commands::Stats { input, csv, json } => {
            stats::stats(input.path(), *csv, *json)
                .context("Failed to compute archive statistics")?;
        }
        Commands::Peaks {
            input,
            output,
            threshold,
            sequence,
        } => {
            let output = output.create(false)?;

            peaks::peaks(
                input.path(),
                output,
                *threshold,
                sequence.as_deref(),
            )
            .context("Failed to find peaks in given archive")?;
        }
        Commands::Wiggle {
            input,
            output,
            window,
            bin,
            name,
        } => {
            let output = output.create(false)?;
            let name = name.clone().unwrap_or_else(|| input.stem());

            wiggle::wiggle(input.path(), output, *window, *bin, &name)
                .context("Failed to write a wiggle track for given archive")?;
        }
    }

    PROGRESS_BAR.finish();
    Ok(())
}
