use crate::{
    data::{CoercionOptions, RawScalar, TypeTag, TypedValue, coerce},
    dataset::Dataset,
    diagnostics::{Decision, DiagnosticLog, Measurement},
    error::{ConfigError, StageError},
    stages::{Stage, StageKind, locate},
};

/// Replaces `Missing` entries and blank text in one column with a fallback.
#[derive(Debug, Clone)]
pub struct DefaultFillStage {
    column: String,
    fallback: TypedValue,
}

impl DefaultFillStage {
    pub fn new(column: &str, fallback: TypedValue) -> Result<Self, ConfigError> {
        if fallback.is_missing() {
            return Err(ConfigError::UnusableFallback {
                value: "null".to_string(),
                target: "a fill value".to_string(),
            });
        }
        Ok(Self {
            column: column.to_string(),
            fallback,
        })
    }

    /// Builds the fallback from a raw scalar, coercing it to `target` when
    /// one is given.
    pub fn from_raw(
        column: &str,
        raw: RawScalar,
        target: Option<TypeTag>,
        options: &CoercionOptions,
    ) -> Result<Self, ConfigError> {
        let fallback = match target {
            Some(tag) => {
                let coerced = coerce(&raw, tag, options);
                if coerced.is_missing() {
                    return Err(ConfigError::UnusableFallback {
                        value: raw.to_string(),
                        target: tag.to_string(),
                    });
                }
                coerced
            }
            None => TypedValue::from_raw(raw),
        };
        Self::new(column, fallback)
    }

    pub fn fallback(&self) -> &TypedValue {
        &self.fallback
    }
}

impl Stage for DefaultFillStage {
    fn kind(&self) -> StageKind {
        StageKind::DefaultFill
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
        let mut filled = 0usize;
        let values = input
            .column_values(index)
            .map(|value| {
                if value.is_blank() {
                    filled += 1;
                    self.fallback.clone()
                } else {
                    value.clone()
                }
            })
            .collect::<Vec<_>>();
        let output = input.with_column_values(index, values)?;
        let decision = if filled > 0 {
            Decision::Transformed
        } else {
            Decision::Unchanged
        };
        diagnostics.record(
            self.kind().as_str(),
            &self.column,
            Measurement::FilledValues { count: filled },
            decision,
        );
        Ok(output)
    }
}
