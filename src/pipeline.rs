//! Ordered stage execution.
//!
//! A [`Pipeline`] is built against the schema of the dataset it will run
//! on. Building walks the planned schema stage by stage so a stage that
//! references an absent column is rejected before any row is touched.
//! Running folds the stages in order and stops at the first failure.

use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use log::{debug, error, info};
use serde::Serialize;

use crate::{
    config::PipelineConfig,
    dataset::Dataset,
    diagnostics::{Diagnostic, DiagnosticLog},
    error::{ConfigError, PipelineError, StageError},
    stages::Stage,
};

/// Callbacks invoked around every stage of a run.
pub trait StageObserver {
    fn stage_started(&mut self, _index: usize, _name: &str, _input: &Dataset) {}

    fn stage_finished(&mut self, _index: usize, _name: &str, _output: &Dataset, _elapsed: Duration) {
    }

    fn stage_aborted(&mut self, _index: usize, _name: &str, _error: &StageError) {}

    fn state_changed(&mut self, _state: &RunState) {}
}

/// Logs stage boundaries and timings through the `log` facade.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl StageObserver for LoggingObserver {
    fn stage_started(&mut self, index: usize, name: &str, input: &Dataset) {
        debug!(
            "Stage {index} ('{name}') starting on {} row(s) x {} column(s)",
            input.row_count(),
            input.column_count()
        );
    }

    fn stage_finished(&mut self, index: usize, name: &str, output: &Dataset, elapsed: Duration) {
        info!(
            "Stage {index} ('{name}') finished in {:.3} ms -> {} row(s) x {} column(s)",
            elapsed.as_secs_f64() * 1000.0,
            output.row_count(),
            output.column_count()
        );
    }

    fn stage_aborted(&mut self, index: usize, name: &str, error: &StageError) {
        error!("Stage {index} ('{name}') aborted: {error}");
    }

    fn state_changed(&mut self, state: &RunState) {
        debug!("Pipeline state: {state:?}");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub index: usize,
    pub name: String,
    pub elapsed: Duration,
    pub rows_in: usize,
    pub rows_out: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub dataset: Dataset,
    pub diagnostics: Vec<Diagnostic>,
    pub timings: Vec<StageTiming>,
}

/// Position of a run in its linear state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Applied { index: usize },
    Done,
    Aborted { index: usize, name: String },
}

#[derive(Debug)]
struct NamedStage {
    name: String,
    stage: Box<dyn Stage>,
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<(Option<String>, Box<dyn Stage>)>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push((None, Box::new(stage)));
        self
    }

    pub fn named_stage<S: Stage + 'static>(mut self, name: &str, stage: S) -> Self {
        self.stages.push((Some(name.to_string()), Box::new(stage)));
        self
    }

    pub fn boxed_stage(mut self, name: Option<String>, stage: Box<dyn Stage>) -> Self {
        self.stages.push((name, stage));
        self
    }

    /// Validates stage names and column references against `schema`.
    pub fn build(self, schema: &[String]) -> Result<Pipeline, ConfigError> {
        let names = assign_names(&self.stages)?;
        let mut planned = schema.to_vec();
        let mut stages = Vec::with_capacity(self.stages.len());
        for (index, ((_, stage), name)) in self.stages.into_iter().zip(names).enumerate() {
            if let Some(missing) = stage
                .required_columns()
                .into_iter()
                .find(|column| !planned.iter().any(|c| c.as_str() == *column))
            {
                return Err(ConfigError::UnknownColumn(missing.to_string()).in_stage(index, &name));
            }
            planned = stage.output_schema(&planned);
            stages.push(NamedStage { name, stage });
        }
        debug!(
            "Built pipeline with {} stage(s); planned output columns: [{}]",
            stages.len(),
            planned.join(", ")
        );
        Ok(Pipeline {
            input_schema: schema.to_vec(),
            output_schema: planned,
            stages,
        })
    }
}

/// Explicit names must be unique. An unnamed stage takes its kind name, or
/// `kind#index` when the kind repeats or the kind name is already taken by
/// an explicit name.
fn assign_names(stages: &[(Option<String>, Box<dyn Stage>)]) -> Result<Vec<String>, ConfigError> {
    let mut explicit = HashSet::new();
    for name in stages.iter().filter_map(|(name, _)| name.as_deref()) {
        if !explicit.insert(name) {
            return Err(ConfigError::DuplicateStageName(name.to_string()));
        }
    }
    let mut kind_counts = HashMap::new();
    for (_, stage) in stages.iter().filter(|(name, _)| name.is_none()) {
        *kind_counts.entry(stage.kind()).or_insert(0usize) += 1;
    }
    let mut generated = Vec::with_capacity(stages.len());
    for (index, (name, stage)) in stages.iter().enumerate() {
        let name = match name {
            Some(name) => name.clone(),
            None => {
                let kind = stage.kind().as_str();
                if kind_counts[&stage.kind()] > 1 || explicit.contains(kind) {
                    let indexed = format!("{kind}#{index}");
                    if explicit.contains(indexed.as_str()) {
                        return Err(ConfigError::DuplicateStageName(indexed));
                    }
                    indexed
                } else {
                    kind.to_string()
                }
            }
        };
        generated.push(name);
    }
    Ok(generated)
}

#[derive(Debug)]
pub struct Pipeline {
    input_schema: Vec<String>,
    output_schema: Vec<String>,
    stages: Vec<NamedStage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn from_config(config: &PipelineConfig, schema: &[String]) -> Result<Self, ConfigError> {
        let mut builder = PipelineBuilder::new();
        for (index, descriptor) in config.stages.iter().enumerate() {
            let stage = descriptor.build().map_err(|err| {
                let name = descriptor
                    .name
                    .clone()
                    .unwrap_or_else(|| descriptor.stage.kind().to_string());
                err.in_stage(index, &name)
            })?;
            builder = builder.boxed_stage(descriptor.name.clone(), stage);
        }
        builder.build(schema)
    }

    pub fn input_schema(&self) -> &[String] {
        &self.input_schema
    }

    /// Columns guaranteed to survive every stage.
    pub fn planned_output_schema(&self) -> &[String] {
        &self.output_schema
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, dataset: Dataset) -> Result<PipelineOutcome, PipelineError> {
        self.run_with_observer(dataset, &mut LoggingObserver)
    }

    pub fn run_with_observer(
        &self,
        dataset: Dataset,
        observer: &mut dyn StageObserver,
    ) -> Result<PipelineOutcome, PipelineError> {
        if dataset.schema() != self.input_schema.as_slice() {
            return Err(PipelineError::SchemaMismatch {
                expected: self.input_schema.clone(),
                found: dataset.schema().to_vec(),
            });
        }

        observer.state_changed(&RunState::Pending);
        let mut diagnostics = DiagnosticLog::new();
        let mut timings = Vec::with_capacity(self.stages.len());
        let mut current = dataset;

        for (index, named) in self.stages.iter().enumerate() {
            observer.stage_started(index, &named.name, &current);
            diagnostics.enter(&named.name);
            let started = Instant::now();
            let result = named.stage.apply(&current, &mut diagnostics);
            let elapsed = started.elapsed();
            diagnostics.leave();

            match result {
                Ok(next) => {
                    observer.stage_finished(index, &named.name, &next, elapsed);
                    timings.push(StageTiming {
                        index,
                        name: named.name.clone(),
                        elapsed,
                        rows_in: current.row_count(),
                        rows_out: next.row_count(),
                    });
                    current = next;
                    observer.state_changed(&RunState::Applied { index });
                }
                Err(source) => {
                    observer.stage_aborted(index, &named.name, &source);
                    observer.state_changed(&RunState::Aborted {
                        index,
                        name: named.name.clone(),
                    });
                    return Err(PipelineError::StageAborted {
                        index,
                        name: named.name.clone(),
                        source,
                    });
                }
            }
        }

        observer.state_changed(&RunState::Done);
        Ok(PipelineOutcome {
            dataset: current,
            diagnostics: diagnostics.into_entries(),
            timings,
        })
    }
}
