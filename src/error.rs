//! Error taxonomy for dataset construction, pipeline configuration, and
//! stage execution.
//!
//! Value-level problems never show up here: a value that cannot be coerced
//! becomes [`TypedValue::Missing`](crate::data::TypedValue::Missing) and is
//! handled as data by later stages. Only structural and configuration
//! problems are escalated.

use thiserror::Error;

/// Problems detected while assembling a [`Dataset`](crate::dataset::Dataset).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Column '{0}' appears more than once in the schema")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} value(s) but the schema declares {expected}")]
    RecordWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} does not supply a value for column '{column}'")]
    MissingField { row: usize, column: String },

    #[error("Row {row} carries column '{column}' which is not part of the schema")]
    UnknownField { row: usize, column: String },
}

/// Invalid stage parameters or column references, reported before any row
/// is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Column '{0}' not found in dataset schema")]
    UnknownColumn(String),

    #[error("Threshold {0} is outside the range [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("Range minimum {min} exceeds maximum {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("Range bounds must be finite numbers (got [{min}, {max}])")]
    NonFiniteBound { min: f64, max: f64 },

    #[error("Stage requires at least one column")]
    EmptyColumnList,

    #[error("Column '{0}' is listed more than once")]
    RepeatedColumn(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Fallback value '{value}' cannot be represented as {target}")]
    UnusableFallback { value: String, target: String },

    #[error("Slice end {end} precedes start {start}")]
    InvertedSlice { start: usize, end: usize },

    #[error("Slice takes either `tail` or `start`/`end`, not both")]
    ConflictingSlice,

    #[error("Stage name '{0}' is used more than once")]
    DuplicateStageName(String),

    #[error("Stage {index} ('{name}'): {source}")]
    Stage {
        index: usize,
        name: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Failed to read pipeline configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse pipeline configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub(crate) fn in_stage(self, index: usize, name: &str) -> Self {
        ConfigError::Stage {
            index,
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// An internal invariant broke while a stage was running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    #[error("Column '{0}' disappeared from the dataset during execution")]
    ColumnVanished(String),

    #[error("Dataset schema is corrupted: {0}")]
    CorruptedSchema(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Terminal failure of a pipeline run. No partial dataset accompanies it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dataset schema [{}] does not match the schema the pipeline was built for [{}]", found.join(", "), expected.join(", "))]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Stage {index} ('{name}') aborted: {source}")]
    StageAborted {
        index: usize,
        name: String,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    /// Index and name of the failing stage, when the failure is attributable to one.
    pub fn failed_stage(&self) -> Option<(usize, &str)> {
        match self {
            PipelineError::StageAborted { index, name, .. } => Some((*index, name.as_str())),
            PipelineError::SchemaMismatch { .. } => None,
        }
    }
}
