pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod inspect;
pub mod io_utils;
pub mod pipeline;
pub mod stages;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    config::{PipelineConfig, StageDescriptor, StageSpec},
    data::{RawScalar, TypeTag, TypedValue},
    dataset::{Dataset, Record},
    diagnostics::{ColumnStats, Decision, Diagnostic, DiagnosticLog, Measurement},
    error::{ConfigError, DatasetError, PipelineError, StageError},
    pipeline::{Pipeline, PipelineBuilder, PipelineOutcome},
    stages::{Stage, StageKind},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_scrub", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => clean::execute(&args),
        Commands::Inspect(args) => inspect::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
