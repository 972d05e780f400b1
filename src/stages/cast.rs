use std::collections::HashSet;

use crate::{
    data::{CoercionOptions, TypeTag, recast},
    dataset::{Dataset, Record},
    diagnostics::{Decision, DiagnosticLog, Measurement},
    error::{ConfigError, StageError},
    stages::{Stage, StageKind, locate},
};

/// Coerces one or more columns to a target type. Values that cannot be
/// represented become `Missing`.
#[derive(Debug, Clone)]
pub struct CastStage {
    columns: Vec<(String, TypeTag)>,
    options: CoercionOptions,
}

impl CastStage {
    pub fn new(
        columns: Vec<(String, TypeTag)>,
        options: CoercionOptions,
    ) -> Result<Self, ConfigError> {
        if columns.is_empty() {
            return Err(ConfigError::EmptyColumnList);
        }
        let mut seen = HashSet::new();
        for (column, _) in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ConfigError::RepeatedColumn(column.clone()));
            }
        }
        Ok(Self { columns, options })
    }

    pub fn single(column: &str, target: TypeTag) -> Result<Self, ConfigError> {
        Self::new(
            vec![(column.to_string(), target)],
            CoercionOptions::default(),
        )
    }

    pub fn columns(&self) -> &[(String, TypeTag)] {
        &self.columns
    }
}

impl Stage for CastStage {
    fn kind(&self) -> StageKind {
        StageKind::Cast
    }

    fn required_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|(c, _)| c.as_str()).collect()
    }

    fn apply(
        &self,
        input: &Dataset,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<Dataset, StageError> {
        let targets = self
            .columns
            .iter()
            .map(|(column, tag)| Ok((locate(input, column)?, *tag)))
            .collect::<Result<Vec<_>, StageError>>()?;

        let mut failures = vec![0usize; targets.len()];
        let rows = input
            .rows()
            .iter()
            .map(|row| {
                let mut values = row.values().to_vec();
                for (slot, (index, tag)) in targets.iter().enumerate() {
                    let Some(current) = values.get_mut(*index) else {
                        continue;
                    };
                    let coerced = recast(current, *tag, &self.options);
                    if coerced.is_missing() && !current.is_missing() {
                        failures[slot] += 1;
                    }
                    *current = coerced;
                }
                Record::new(values)
            })
            .collect();
        let output = Dataset::new(input.schema().to_vec(), rows)?;

        for ((column, tag), count) in self.columns.iter().zip(failures) {
            log::debug!("Cast '{column}' to {tag}");
            diagnostics.record(
                self.kind().as_str(),
                column,
                Measurement::CoercionFailures { count },
                Decision::Transformed,
            );
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawScalar, TypedValue};

    #[test]
    fn cast_leaves_other_columns_untouched() {
        let dataset = Dataset::from_raw_rows(
            vec!["age".into(), "name".into()],
            vec![
                vec!["28".into(), "Alice".into()],
                vec!["?".into(), "Dave".into()],
            ],
        )
        .unwrap();
        let stage = CastStage::single("age", TypeTag::Integer).unwrap();
        let mut log = DiagnosticLog::new();
        let cast = stage.apply(&dataset, &mut log).unwrap();

        assert_eq!(cast.value(0, "age"), Some(&TypedValue::Integer(28)));
        assert_eq!(cast.value(1, "age"), Some(&TypedValue::Missing));
        assert_eq!(cast.value(1, "name"), Some(&TypedValue::Text("Dave".into())));
        assert_eq!(
            log.entries()[0].measurement,
            Measurement::CoercionFailures { count: 1 }
        );
        assert_eq!(dataset.value(1, "age"), Some(&TypedValue::Text("?".into())));
    }

    #[test]
    fn already_missing_values_are_not_counted_as_failures() {
        let dataset =
            Dataset::from_raw_rows(vec!["h".into()], vec![vec![RawScalar::Null]]).unwrap();
        let mut log = DiagnosticLog::new();
        CastStage::single("h", TypeTag::Float)
            .unwrap()
            .apply(&dataset, &mut log)
            .unwrap();
        assert_eq!(
            log.entries()[0].measurement,
            Measurement::CoercionFailures { count: 0 }
        );
    }

    #[test]
    fn constructor_rejects_repeated_columns() {
        let err = CastStage::new(
            vec![("a".into(), TypeTag::Integer), ("a".into(), TypeTag::Float)],
            CoercionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::RepeatedColumn(c) if c == "a"));
        assert!(matches!(
            CastStage::new(Vec::new(), CoercionOptions::default()),
            Err(ConfigError::EmptyColumnList)
        ));
    }
}
