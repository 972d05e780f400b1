use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    dataset::Dataset,
    diagnostics::DiagnosticLog,
    error::StageError,
    stages::{Stage, StageKind, filter::record_removed, locate},
};

/// How rows without a key value are treated during deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Every missing-key row is kept.
    #[default]
    Keep,
    /// Missing keys count as one value; only the first such row is kept.
    Collapse,
}

/// Keeps the first row for each distinct key value, in original order.
#[derive(Debug, Clone)]
pub struct DedupStage {
    column: String,
    missing_keys: MissingKeyPolicy,
}

impl DedupStage {
    pub fn new(column: &str, missing_keys: MissingKeyPolicy) -> Self {
        Self {
            column: column.to_string(),
            missing_keys,
        }
    }

    pub fn by(column: &str) -> Self {
        Self::new(column, MissingKeyPolicy::default())
    }
}

impl Stage for DedupStage {
    fn kind(&self) -> StageKind {
        StageKind::Dedup
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
        let mut seen = HashSet::new();
        let mut seen_missing = false;
        let output = input.retain_rows(|_, row| match row.get(index) {
            Some(value) if value.is_missing() => match self.missing_keys {
                MissingKeyPolicy::Keep => true,
                MissingKeyPolicy::Collapse => !std::mem::replace(&mut seen_missing, true),
            },
            Some(value) => seen.insert(value.clone()),
            None => true,
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
