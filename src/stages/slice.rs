use crate::{
    dataset::Dataset,
    diagnostics::DiagnosticLog,
    error::{ConfigError, StageError},
    stages::{Stage, StageKind, filter::record_removed},
};

/// Which rows a [`SliceStage`] keeps, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWindow {
    /// Rows `start..end`; an open end runs to the last row.
    Range { start: usize, end: Option<usize> },
    /// The last `n` rows.
    Tail(usize),
}

/// Keeps a positional window of rows. Diagnostics are reported against the
/// `*` column since every column is affected.
#[derive(Debug, Clone)]
pub struct SliceStage {
    window: RowWindow,
}

impl SliceStage {
    pub fn range(start: usize, end: Option<usize>) -> Result<Self, ConfigError> {
        if let Some(end) = end {
            if end < start {
                return Err(ConfigError::InvertedSlice { start, end });
            }
        }
        Ok(Self {
            window: RowWindow::Range { start, end },
        })
    }

    pub fn head(rows: usize) -> Self {
        Self {
            window: RowWindow::Range {
                start: 0,
                end: Some(rows),
            },
        }
    }

    pub fn tail(rows: usize) -> Self {
        Self {
            window: RowWindow::Tail(rows),
        }
    }

    pub fn window(&self) -> RowWindow {
        self.window
    }

    fn bounds(&self, row_count: usize) -> (usize, usize) {
        match self.window {
            RowWindow::Range { start, end } => {
                let end = end.unwrap_or(row_count).min(row_count);
                (start.min(end), end)
            }
            RowWindow::Tail(rows) => (row_count.saturating_sub(rows), row_count),
        }
    }
}

impl Stage for SliceStage {
    fn kind(&self) -> StageKind {
        StageKind::Slice
    }

    fn required_columns(&self) -> Vec<&str> {
        Vec::new()
    }

    fn apply(
        &self,
        input: &Dataset,
        diagnostics: &mut DiagnosticLog,
    ) -> Result<Dataset, StageError> {
        let (start, end) = self.bounds(input.row_count());
        let output = input.retain_rows(|idx, _| (start..end).contains(&idx));
        record_removed(
            diagnostics,
            self.kind(),
            "*",
            input.row_count() - output.row_count(),
        );
        Ok(output)
    }
}
