//! Declarative pipeline configuration.
//!
//! A configuration file lists stage descriptors in execution order:
//!
//! ```yaml
//! stages:
//!   - kind: cast
//!     columns:
//!       - { column: age, type: integer }
//!       - { column: signup_date, type: timestamp }
//!   - kind: conditional_drop
//!     column: height_cm
//!     threshold: 0.30
//!   - kind: range_filter
//!     name: adults
//!     column: age
//!     min: 20
//!     max: 40
//! ```
//!
//! YAML (`.yaml`/`.yml`) and JSON (`.json`) files are accepted.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    data::{BooleanVocabulary, CoercionOptions, RawScalar, TypeTag, default_timestamp_formats},
    error::ConfigError,
    stages::{
        CastStage, ConditionalDropStage, DedupStage, DefaultFillStage, MissingKeyPolicy,
        PatternFilterStage, RangeFilterStage, SelectStage, SliceStage, Stage, StageKind,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub stage: StageDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastColumn {
    pub column: String,
    #[serde(rename = "type")]
    pub target: TypeTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageDescriptor {
    #[serde(alias = "CastStage")]
    Cast {
        columns: Vec<CastColumn>,
        #[serde(default)]
        booleans: BooleanVocabulary,
        #[serde(default = "default_timestamp_formats")]
        timestamp_formats: Vec<String>,
    },
    #[serde(alias = "DefaultFillStage")]
    DefaultFill {
        column: String,
        value: RawScalar,
        #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
        as_type: Option<TypeTag>,
    },
    #[serde(alias = "RangeFilterStage")]
    RangeFilter { column: String, min: f64, max: f64 },
    #[serde(alias = "DedupStage")]
    Dedup {
        column: String,
        #[serde(default)]
        missing_keys: MissingKeyPolicy,
    },
    #[serde(alias = "ConditionalDropStage")]
    ConditionalDrop { column: String, threshold: f64 },
    #[serde(alias = "SelectStage")]
    Select { columns: Vec<String> },
    #[serde(alias = "PatternFilterStage")]
    PatternFilter {
        column: String,
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    #[serde(alias = "SliceStage")]
    Slice {
        #[serde(default)]
        start: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tail: Option<usize>,
    },
}

impl StageDescriptor {
    pub fn kind(&self) -> StageKind {
        match self {
            StageDescriptor::Cast { .. } => StageKind::Cast,
            StageDescriptor::DefaultFill { .. } => StageKind::DefaultFill,
            StageDescriptor::RangeFilter { .. } => StageKind::RangeFilter,
            StageDescriptor::Dedup { .. } => StageKind::Dedup,
            StageDescriptor::ConditionalDrop { .. } => StageKind::ConditionalDrop,
            StageDescriptor::Select { .. } => StageKind::Select,
            StageDescriptor::PatternFilter { .. } => StageKind::PatternFilter,
            StageDescriptor::Slice { .. } => StageKind::Slice,
        }
    }

    pub fn build(&self) -> Result<Box<dyn Stage>, ConfigError> {
        let stage: Box<dyn Stage> = match self {
            StageDescriptor::Cast {
                columns,
                booleans,
                timestamp_formats,
            } => Box::new(CastStage::new(
                columns
                    .iter()
                    .map(|c| (c.column.clone(), c.target))
                    .collect(),
                CoercionOptions {
                    booleans: booleans.clone(),
                    timestamp_formats: timestamp_formats.clone(),
                },
            )?),
            StageDescriptor::DefaultFill {
                column,
                value,
                as_type,
            } => Box::new(DefaultFillStage::from_raw(
                column,
                value.clone(),
                *as_type,
                &CoercionOptions::default(),
            )?),
            StageDescriptor::RangeFilter { column, min, max } => {
                Box::new(RangeFilterStage::new(column, *min, *max)?)
            }
            StageDescriptor::Dedup {
                column,
                missing_keys,
            } => Box::new(DedupStage::new(column, *missing_keys)),
            StageDescriptor::ConditionalDrop { column, threshold } => {
                Box::new(ConditionalDropStage::new(column, *threshold)?)
            }
            StageDescriptor::Select { columns } => Box::new(SelectStage::new(columns.clone())?),
            StageDescriptor::PatternFilter {
                column,
                pattern,
                case_insensitive,
            } => Box::new(PatternFilterStage::new(column, pattern, *case_insensitive)?),
            StageDescriptor::Slice { start, end, tail } => match tail {
                Some(_) if *start != 0 || end.is_some() => {
                    return Err(ConfigError::ConflictingSlice);
                }
                Some(rows) => Box::new(SliceStage::tail(*rows)),
                None => Box::new(SliceStage::range(*start, *end)?),
            },
        };
        Ok(stage)
    }
}

impl StageSpec {
    pub fn build(&self) -> Result<Box<dyn Stage>, ConfigError> {
        self.stage.build()
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
stages:
  - kind: cast
    columns:
      - { column: age, type: integer }
      - { column: active, type: bool }
    booleans:
      "y": true
      "n": false
  - kind: ConditionalDropStage
    column: height_cm
    threshold: 0.3
  - kind: default_fill
    column: city
    value: Unknown
  - kind: dedup
    name: unique_emails
    column: email
    missing_keys: collapse
  - kind: range_filter
    column: age
    min: 20
    max: 40
"#;

    #[test]
    fn parses_yaml_descriptors_in_order() {
        let config = PipelineConfig::from_yaml_str(SAMPLE).unwrap();
        let kinds = config
            .stages
            .iter()
            .map(|s| s.stage.kind())
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                StageKind::Cast,
                StageKind::ConditionalDrop,
                StageKind::DefaultFill,
                StageKind::Dedup,
                StageKind::RangeFilter
            ]
        );
        assert_eq!(config.stages[3].name.as_deref(), Some("unique_emails"));
        match &config.stages[0].stage {
            StageDescriptor::Cast {
                booleans,
                timestamp_formats,
                ..
            } => {
                assert_eq!(booleans.lookup("Y"), Some(true));
                assert_eq!(timestamp_formats.len(), 6);
            }
            other => panic!("expected cast descriptor, got {other:?}"),
        }
        match &config.stages[4].stage {
            StageDescriptor::RangeFilter { min, max, .. } => {
                assert_eq!((*min, *max), (20.0, 40.0));
            }
            other => panic!("expected range descriptor, got {other:?}"),
        }
    }

    #[test]
    fn descriptors_build_their_stages() {
        let config = PipelineConfig::from_yaml_str(SAMPLE).unwrap();
        for spec in &config.stages {
            let stage = spec.build().unwrap();
            assert_eq!(stage.kind(), spec.stage.kind());
        }
    }

    #[test]
    fn json_and_yaml_agree() {
        let json = r#"{"stages":[{"kind":"select","columns":["id","name"]}]}"#;
        let from_json = PipelineConfig::from_json_str(json).unwrap();
        let from_yaml =
            PipelineConfig::from_yaml_str("stages:\n  - kind: select\n    columns: [id, name]\n")
                .unwrap();
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn slice_descriptor_takes_range_or_tail() {
        let config = PipelineConfig::from_yaml_str(
            "stages:\n  - kind: slice\n    start: 1\n    end: 4\n  - kind: slice\n    tail: 2\n",
        )
        .unwrap();
        assert!(config.stages.iter().all(|s| s.stage.kind() == StageKind::Slice));
        assert!(config.stages.iter().all(|s| s.build().is_ok()));

        let conflicting =
            PipelineConfig::from_yaml_str("stages:\n  - kind: slice\n    start: 1\n    tail: 2\n")
                .unwrap();
        assert!(matches!(
            conflicting.stages[0].build(),
            Err(ConfigError::ConflictingSlice)
        ));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let err = PipelineConfig::from_yaml_str("stages:\n  - kind: explode\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
