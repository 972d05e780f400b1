//! Pipeline stages.
//!
//! Every stage is a pure `Dataset -> Dataset` transformation. Parameters are
//! validated when the stage is constructed, column references when the
//! owning pipeline is built, so [`Stage::apply`] only fails if the dataset
//! itself is structurally broken.

mod cast;
mod dedup;
mod fill;
mod filter;
mod select;
mod slice;
mod sparse;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{dataset::Dataset, diagnostics::DiagnosticLog, error::StageError};

pub use cast::CastStage;
pub use dedup::{DedupStage, MissingKeyPolicy};
pub use fill::DefaultFillStage;
pub use filter::{PatternFilterStage, RangeFilterStage};
pub use select::SelectStage;
pub use slice::{RowWindow, SliceStage};
pub use sparse::{ConditionalDropStage, drop_if_sparse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Cast,
    DefaultFill,
    RangeFilter,
    Dedup,
    ConditionalDrop,
    Select,
    PatternFilter,
    Slice,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Cast => "cast",
            StageKind::DefaultFill => "default_fill",
            StageKind::RangeFilter => "range_filter",
            StageKind::Dedup => "dedup",
            StageKind::ConditionalDrop => "conditional_drop",
            StageKind::Select => "select",
            StageKind::PatternFilter => "pattern_filter",
            StageKind::Slice => "slice",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Stage: fmt::Debug + Send + Sync {
    fn kind(&self) -> StageKind;

    /// Columns that must be present in the input schema.
    fn required_columns(&self) -> Vec<&str>;

    /// Schema this stage guarantees to produce from `input`. Used at build
    /// time; stages that may remove a column report it as removed.
    fn output_schema(&self, input: &[String]) -> Vec<String> {
        input.to_vec()
    }

    fn apply(&self, input: &Dataset, diagnostics: &mut DiagnosticLog)
    -> Result<Dataset, StageError>;
}

pub(crate) fn locate(dataset: &Dataset, column: &str) -> Result<usize, StageError> {
    dataset
        .column_index(column)
        .ok_or_else(|| StageError::ColumnVanished(column.to_string()))
}
