use log::info;

use crate::{
    dataset::Dataset,
    diagnostics::{Decision, DiagnosticLog, Measurement, column_stats},
    error::{ConfigError, StageError},
    stages::{Stage, StageKind, locate},
};

/// Removes `column` when its null fraction is strictly greater than
/// `threshold`. A column exactly at the threshold is kept.
pub fn drop_if_sparse(
    dataset: &Dataset,
    column: &str,
    threshold: f64,
    diagnostics: &mut DiagnosticLog,
) -> Result<Dataset, ConfigError> {
    validate_threshold(threshold)?;
    let index = dataset
        .column_index(column)
        .ok_or_else(|| ConfigError::UnknownColumn(column.to_string()))?;
    Ok(drop_at(
        dataset,
        index,
        threshold,
        diagnostics,
        StageKind::ConditionalDrop,
    ))
}

fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange(threshold))
    }
}

fn drop_at(
    dataset: &Dataset,
    index: usize,
    threshold: f64,
    diagnostics: &mut DiagnosticLog,
    kind: StageKind,
) -> Dataset {
    let stats = column_stats(dataset, index);
    let measurement = Measurement::NullFraction {
        measured: stats.null_fraction,
        threshold,
    };
    if stats.null_fraction > threshold {
        info!("Dropping sparse column '{}'", stats.column);
        diagnostics.record(kind.as_str(), &stats.column, measurement, Decision::DropColumn);
        dataset.without_column(index)
    } else {
        diagnostics.record(
            kind.as_str(),
            &stats.column,
            measurement,
            Decision::RetainColumn,
        );
        dataset.clone()
    }
}

#[derive(Debug, Clone)]
pub struct ConditionalDropStage {
    column: String,
    threshold: f64,
}

impl ConditionalDropStage {
    pub fn new(column: &str, threshold: f64) -> Result<Self, ConfigError> {
        validate_threshold(threshold)?;
        Ok(Self {
            column: column.to_string(),
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Stage for ConditionalDropStage {
    fn kind(&self) -> StageKind {
        StageKind::ConditionalDrop
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    fn output_schema(&self, input: &[String]) -> Vec<String> {
        input
            .iter()
            .filter(|column| **column != self.column)
            .cloned()
            .collect()
    }

    fn apply(
        &self,
        input: &Dataset,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<Dataset, StageError> {
        let index = locate(input, &self.column)?;
        Ok(drop_at(
            input,
            index,
            self.threshold,
            diagnostics,
            self.kind(),
        ))
    }
}
