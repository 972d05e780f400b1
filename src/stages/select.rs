use std::collections::HashSet;

use crate::{
    dataset::Dataset,
    diagnostics::{Decision, DiagnosticLog, Measurement},
    error::{ConfigError, StageError},
    stages::{Stage, StageKind, locate},
};

/// Projects the dataset onto an ordered list of columns.
#[derive(Debug, Clone)]
pub struct SelectStage {
    columns: Vec<String>,
}

impl SelectStage {
    pub fn new(columns: Vec<String>) -> Result<Self, ConfigError> {
        if columns.is_empty() {
            return Err(ConfigError::EmptyColumnList);
        }
        let mut seen = HashSet::new();
        if let Some(repeated) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ConfigError::RepeatedColumn(repeated.clone()));
        }
        Ok(Self { columns })
    }
}

impl Stage for SelectStage {
    fn kind(&self) -> StageKind {
        StageKind::Select
    }

    fn required_columns(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    fn output_schema(&self, _input: &[String]) -> Vec<String> {
        self.columns.clone()
    }

    fn apply(
        &self,
        input: &Dataset,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<Dataset, StageError> {
        let indices = self
            .columns
            .iter()
            .map(|column| locate(input, column))
            .collect::<Result<Vec<_>, _>>()?;
        let output = input.project(&indices)?;
        let removed = input.column_count() - output.column_count();
        diagnostics.record(
            self.kind().as_str(),
            &self.columns.join(","),
            Measurement::ColumnsRemoved { count: removed },
            if removed > 0 {
                Decision::Transformed
            } else {
                Decision::Unchanged
            },
        );
        Ok(output)
    }
}
