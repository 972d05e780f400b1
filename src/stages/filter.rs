use regex::{Regex, RegexBuilder};

use crate::{
    dataset::Dataset,
    diagnostics::{Decision, DiagnosticLog, Measurement},
    error::{ConfigError, StageError},
    stages::{Stage, StageKind, locate},
};

/// Keeps rows whose numeric value lies in an inclusive range. Missing and
/// non-numeric values never match.
#[derive(Debug, Clone)]
pub struct RangeFilterStage {
    column: String,
    min: f64,
    max: f64,
}

impl RangeFilterStage {
    pub fn new(column: &str, min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::NonFiniteBound { min, max });
        }
        if min > max {
            return Err(ConfigError::InvertedRange { min, max });
        }
        Ok(Self {
            column: column.to_string(),
            min,
            max,
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Stage for RangeFilterStage {
    fn kind(&self) -> StageKind {
        StageKind::RangeFilter
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    fn apply(
        &self,
        input: &Dataset,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<Dataset, StageError> {
        let index = locate(input, &self.column)?;
        let output = input.retain_rows(|_, row| {
            row.get(index)
                .and_then(|value| value.as_f64())
                .is_some_and(|v| v >= self.min && v <= self.max)
        });
        record_removed(
            diagnostics,
            self.kind(),
            &self.column,
            input.row_count() - output.row_count(),
        );
        Ok(output)
    }
}

/// Keeps rows whose value, rendered as text, matches a regular expression.
#[derive(Debug, Clone)]
pub struct PatternFilterStage {
    column: String,
    pattern: Regex,
}

impl PatternFilterStage {
    pub fn new(column: &str, pattern: &str, case_insensitive: bool) -> Result<Self, ConfigError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            column: column.to_string(),
            pattern,
        })
    }
}

impl Stage for PatternFilterStage {
    fn kind(&self) -> StageKind {
        StageKind::PatternFilter
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    fn apply(
        &self,
        input: &Dataset,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<Dataset, StageError> {
        let index = locate(input, &self.column)?;
        let output = input.retain_rows(|_, row| {
            row.get(index)
                .filter(|value| !value.is_missing())
                .is_some_and(|value| self.pattern.is_match(&value.as_display()))
        });
        record_removed(
            diagnostics,
            self.kind(),
            &self.column,
            input.row_count() - output.row_count(),
        );
        Ok(output)
    }
}

pub(super) fn record_removed(
    diagnostics: &mut DiagnosticLog,
    kind: StageKind,
    column: &str,
    removed: usize,
) {
    let decision = if removed > 0 {
        Decision::Transformed
    } else {
        Decision::Unchanged
    };
    diagnostics.record(
        kind.as_str(),
        column,
        Measurement::RowsRemoved { count: removed },
        decision,
    );
}
