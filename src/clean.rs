use std::{fs::File, io::BufWriter};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::CleanArgs,
    config::PipelineConfig,
    diagnostics::Diagnostic,
    io_utils::{self, LoadOptions},
    pipeline::{Pipeline, StageTiming},
    table,
};

#[derive(Debug, Serialize)]
struct DiagnosticsReport<'a> {
    input_rows: usize,
    output_rows: usize,
    schema: &'a [String],
    diagnostics: &'a [Diagnostic],
    timings: &'a [StageTiming],
}

pub fn execute(args: &CleanArgs) -> Result<()> {
    let options = LoadOptions::resolve(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        &args.null_tokens,
    )?;
    let output_path = args.output.as_deref();
    let writing_to_stdout = output_path.is_none_or(io_utils::is_dash);
    let output_delimiter =
        io_utils::resolve_output_delimiter(output_path, args.output_delimiter, options.delimiter);
    info!(
        "Cleaning '{}' -> {:?} with pipeline {:?} (delimiter '{}', output '{}')",
        args.input.display(),
        output_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        args.pipeline,
        crate::printable_delimiter(options.delimiter),
        crate::printable_delimiter(output_delimiter)
    );

    let config = PipelineConfig::load(&args.pipeline)
        .with_context(|| format!("Loading pipeline definition from {:?}", args.pipeline))?;
    let dataset = io_utils::read_dataset(&args.input, &options)?;
    let input_rows = dataset.row_count();
    let pipeline = Pipeline::from_config(&config, dataset.schema())
        .with_context(|| format!("Building pipeline from {:?}", args.pipeline))?;
    info!(
        "Running {} stage(s): {}",
        pipeline.len(),
        pipeline.stage_names().join(" -> ")
    );

    let outcome = pipeline.run(dataset)?;
    info!(
        "Pipeline produced {} row(s) across {} column(s) from {} input row(s)",
        outcome.dataset.row_count(),
        outcome.dataset.column_count(),
        input_rows
    );

    if let Some(path) = &args.diagnostics {
        let report = DiagnosticsReport {
            input_rows,
            output_rows: outcome.dataset.row_count(),
            schema: outcome.dataset.schema(),
            diagnostics: &outcome.diagnostics,
            timings: &outcome.timings,
        };
        let file = File::create(path)
            .with_context(|| format!("Creating diagnostics file {path:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("Writing diagnostics to {path:?}"))?;
        info!(
            "{} diagnostic(s) written to {path:?}",
            outcome.diagnostics.len()
        );
    }

    if args.table && writing_to_stdout {
        print!("{}", table::render_dataset(&outcome.dataset));
        return Ok(());
    }
    let writer = io_utils::open_output(output_path)?;
    io_utils::write_dataset(writer, &outcome.dataset, output_delimiter)
}
