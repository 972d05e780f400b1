//! In-memory table shared by every pipeline stage.
//!
//! A [`Dataset`] owns an ordered, duplicate-free schema and a list of
//! [`Record`]s whose values line up positionally with that schema. The
//! helpers below never mutate `self`; each returns a new dataset so a stage
//! can hand its input back untouched if it decides not to act.

use std::collections::{HashMap, HashSet};

use crate::{
    data::{RawScalar, TypedValue},
    error::DatasetError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<TypedValue>,
}

impl Record {
    pub fn new(values: Vec<TypedValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&TypedValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<TypedValue> {
        self.values
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    schema: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Vec<String>, rows: Vec<Record>) -> Result<Self, DatasetError> {
        ensure_unique(&schema)?;
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(DatasetError::RecordWidth {
                    row: row_idx,
                    expected: schema.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn empty(schema: Vec<String>) -> Result<Self, DatasetError> {
        Self::new(schema, Vec::new())
    }

    /// Builds a dataset from positional raw rows.
    pub fn from_raw_rows<I>(schema: Vec<String>, rows: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = Vec<RawScalar>>,
    {
        let records = rows
            .into_iter()
            .map(|row| Record::new(row.into_iter().map(TypedValue::from_raw).collect()))
            .collect();
        Self::new(schema, records)
    }

    /// Builds a dataset from per-record mappings of column name to raw
    /// scalar. Every mapping must cover exactly the schema's columns.
    pub fn from_raw_records<I>(schema: Vec<String>, records: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = HashMap<String, RawScalar>>,
    {
        ensure_unique(&schema)?;
        let mut rows = Vec::new();
        for (row_idx, mut record) in records.into_iter().enumerate() {
            let mut values = Vec::with_capacity(schema.len());
            for column in &schema {
                let raw = record.remove(column).ok_or_else(|| DatasetError::MissingField {
                    row: row_idx,
                    column: column.clone(),
                })?;
                values.push(TypedValue::from_raw(raw));
            }
            if let Some(extra) = record.into_keys().min() {
                return Err(DatasetError::UnknownField {
                    row: row_idx,
                    column: extra,
                });
            }
            rows.push(Record::new(values));
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of the column at `index`, in row order.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &TypedValue> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    pub fn column(&self, name: &str) -> Option<Vec<&TypedValue>> {
        self.column_index(name)
            .map(|idx| self.column_values(idx).collect())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&TypedValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|record| record.get(idx))
    }

    /// Replaces the column at `index` with `values`, which must have one
    /// entry per row.
    pub fn with_column_values(
        &self,
        index: usize,
        values: Vec<TypedValue>,
    ) -> Result<Self, DatasetError> {
        if values.len() != self.rows.len() {
            return Err(DatasetError::RecordWidth {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, replacement)| {
                let mut cells = row.values.clone();
                if let Some(slot) = cells.get_mut(index) {
                    *slot = replacement;
                }
                Record::new(cells)
            })
            .collect();
        Self::new(self.schema.clone(), rows)
    }

    pub fn without_column(&self, index: usize) -> Self {
        let schema = self
            .schema
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != index)
            .map(|(_, name)| name.clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                Record::new(
                    row.values
                        .iter()
                        .enumerate()
                        .filter(|(idx, _)| *idx != index)
                        .map(|(_, value)| value.clone())
                        .collect(),
                )
            })
            .collect();
        Self { schema, rows }
    }

    /// Projects onto the given column positions, in the order supplied.
    pub fn project(&self, indices: &[usize]) -> Result<Self, DatasetError> {
        let schema = indices
            .iter()
            .filter_map(|idx| self.schema.get(*idx).cloned())
            .collect::<Vec<_>>();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                Record::new(
                    indices
                        .iter()
                        .filter_map(|idx| row.get(*idx).cloned())
                        .collect(),
                )
            })
            .collect();
        Self::new(schema, rows)
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub fn retain_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize, &Record) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(idx, row)| keep(*idx, row))
            .map(|(_, row)| row.clone())
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }
}

fn ensure_unique(schema: &[String]) -> Result<(), DatasetError> {
    let mut seen = HashSet::with_capacity(schema.len());
    for column in schema {
        if !seen.insert(column.as_str()) {
            return Err(DatasetError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}
