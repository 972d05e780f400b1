use std::fmt::Write as _;

use itertools::Itertools;

use crate::dataset::Dataset;

/// Renders rows as a left-aligned, two-space separated table with a dashed
/// rule under the header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    for line in std::iter::once(headers.to_vec())
        .chain(std::iter::once(rule))
        .chain(rows.iter().cloned())
    {
        let cells = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", flatten(cell), width = *width))
            .join("  ");
        let _ = writeln!(output, "{}", cells.trim_end());
    }
    output
}

pub fn render_dataset(dataset: &Dataset) -> String {
    let rows = dataset
        .rows()
        .iter()
        .map(|row| row.values().iter().map(|v| v.as_display()).collect())
        .collect::<Vec<Vec<String>>>();
    render_table(dataset.schema(), &rows)
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn flatten(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
