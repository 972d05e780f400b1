//! Column diagnostics and the diagnostic side channel.
//!
//! [`diagnose`] and [`summarize`] are read-only views over a dataset.
//! Stages report what they measured and decided through a
//! [`DiagnosticLog`], which the pipeline hands back alongside the cleaned
//! dataset.

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::{data::TypedValue, dataset::Dataset, error::ConfigError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub row_count: usize,
    pub null_count: usize,
    pub null_fraction: f64,
    pub distinct_count: usize,
    pub duplicate_mask: Vec<bool>,
}

impl ColumnStats {
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_mask.iter().filter(|flag| **flag).count()
    }
}

pub fn diagnose(dataset: &Dataset, column: &str) -> Result<ColumnStats, ConfigError> {
    let index = dataset
        .column_index(column)
        .ok_or_else(|| ConfigError::UnknownColumn(column.to_string()))?;
    Ok(column_stats(dataset, index))
}

pub(crate) fn column_stats(dataset: &Dataset, index: usize) -> ColumnStats {
    let row_count = dataset.row_count();
    let mut occurrences: HashMap<&TypedValue, usize> = HashMap::new();
    let mut null_count = 0usize;
    for value in dataset.column_values(index) {
        if value.is_missing() {
            null_count += 1;
        } else {
            *occurrences.entry(value).or_insert(0) += 1;
        }
    }
    let duplicate_mask = dataset
        .column_values(index)
        .map(|value| !value.is_missing() && occurrences.get(value).copied().unwrap_or(0) > 1)
        .collect();
    let null_fraction = if row_count == 0 {
        0.0
    } else {
        null_count as f64 / row_count as f64
    };
    ColumnStats {
        column: dataset.schema()[index].clone(),
        row_count,
        null_count,
        null_fraction,
        distinct_count: occurrences.len(),
        duplicate_mask,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: Option<f64>,
}

/// Summary statistics over the Integer and Float values of a column.
/// Returns `None` when the column holds no numeric values.
pub fn summarize(dataset: &Dataset, column: &str) -> Result<Option<NumericSummary>, ConfigError> {
    let index = dataset
        .column_index(column)
        .ok_or_else(|| ConfigError::UnknownColumn(column.to_string()))?;
    let mut values = dataset
        .column_values(index)
        .filter_map(TypedValue::as_f64)
        .collect::<Vec<_>>();
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    let std_dev = (count >= 2).then(|| {
        let variance = values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (count as f64 - 1.0);
        variance.max(0.0).sqrt()
    });

    Ok(Some(NumericSummary {
        column: column.to_string(),
        count,
        min: values[0],
        max: values[count - 1],
        mean,
        median,
        std_dev,
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "statistic", rename_all = "snake_case")]
pub enum Measurement {
    NullFraction { measured: f64, threshold: f64 },
    CoercionFailures { count: usize },
    FilledValues { count: usize },
    RowsRemoved { count: usize },
    ColumnsRemoved { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    DropColumn,
    RetainColumn,
    Transformed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: String,
    pub column: String,
    pub measurement: Measurement,
    pub decision: Decision,
}

/// Collects diagnostics emitted while stages run.
///
/// The executor scopes the log to the running stage so entries carry the
/// stage's configured name; outside a pipeline the stage kind is used.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
    scope: Option<String>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&mut self, stage: &str) {
        self.scope = Some(stage.to_string());
    }

    pub(crate) fn leave(&mut self) {
        self.scope = None;
    }

    pub fn record(
        &mut self,
        default_stage: &str,
        column: &str,
        measurement: Measurement,
        decision: Decision,
    ) {
        let stage = self
            .scope
            .clone()
            .unwrap_or_else(|| default_stage.to_string());
        info!(
            "[{stage}] column '{column}': {} -> {decision:?}",
            describe_measurement(&measurement)
        );
        self.entries.push(Diagnostic {
            stage,
            column: column.to_string(),
            measurement,
            decision,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

fn describe_measurement(measurement: &Measurement) -> String {
    match measurement {
        Measurement::NullFraction {
            measured,
            threshold,
        } => format!(
            "null fraction {:.2}% (threshold {:.2}%)",
            measured * 100.0,
            threshold * 100.0
        ),
        Measurement::CoercionFailures { count } => format!("{count} value(s) failed coercion"),
        Measurement::FilledValues { count } => format!("{count} value(s) filled"),
        Measurement::RowsRemoved { count } => format!("{count} row(s) removed"),
        Measurement::ColumnsRemoved { count } => format!("{count} column(s) removed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawScalar;

    fn single_column(values: Vec<RawScalar>) -> Dataset {
        Dataset::from_raw_rows(
            vec!["v".to_string()],
            values.into_iter().map(|value| vec![value]),
        )
        .unwrap()
    }

    #[test]
    fn diagnose_counts_nulls_and_distinct_values() {
        let dataset = single_column(vec![
            RawScalar::Null,
            RawScalar::Null,
            RawScalar::Null,
            RawScalar::Integer(5),
        ]);
        let stats = diagnose(&dataset, "v").unwrap();
        assert_eq!(stats.null_fraction, 0.75);
        assert_eq!(stats.distinct_count, 1);
        assert_eq!(stats.duplicate_mask, vec![false; 4]);
    }

    #[test]
    fn diagnose_marks_every_member_of_a_duplicate_group() {
        let dataset = single_column(vec!["a@x".into(), "b@x".into(), "a@x".into()]);
        let stats = diagnose(&dataset, "v").unwrap();
        assert_eq!(stats.duplicate_mask, vec![true, false, true]);
        assert_eq!(stats.distinct_count, 2);
        assert_eq!(stats.duplicate_count(), 2);
    }

    #[test]
    fn diagnose_on_empty_dataset_reports_zero_fraction() {
        let dataset = Dataset::empty(vec!["v".to_string()]).unwrap();
        let stats = diagnose(&dataset, "v").unwrap();
        assert_eq!(stats.null_fraction, 0.0);
        assert!(stats.duplicate_mask.is_empty());
    }

    #[test]
    fn diagnose_rejects_unknown_column() {
        let dataset = single_column(vec![RawScalar::Null]);
        assert!(matches!(
            diagnose(&dataset, "w"),
            Err(ConfigError::UnknownColumn(name)) if name == "w"
        ));
    }

    #[test]
    fn summarize_ignores_non_numeric_values() {
        let dataset = single_column(vec![
            RawScalar::Integer(10),
            "abc".into(),
            RawScalar::Float(20.0),
            RawScalar::Null,
            RawScalar::Integer(30),
        ]);
        let summary = summarize(&dataset, "v").unwrap().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.median, 20.0);
        assert_eq!(summary.std_dev, Some(10.0));
    }

    #[test]
    fn log_uses_scope_when_present() {
        let mut log = DiagnosticLog::new();
        log.record("dedup", "email", Measurement::RowsRemoved { count: 1 }, Decision::Transformed);
        log.enter("unique_emails");
        log.record("dedup", "email", Measurement::RowsRemoved { count: 0 }, Decision::Unchanged);
        log.leave();
        let stages = log.entries().iter().map(|d| d.stage.as_str()).collect::<Vec<_>>();
        assert_eq!(stages, vec!["dedup", "unique_emails"]);
    }
}
