use anyhow::{Context, Result, anyhow};
use log::info;
use serde::Serialize;

use crate::{
    cli::InspectArgs,
    data::{CoercionOptions, TypeTag},
    dataset::Dataset,
    diagnostics::{self, DiagnosticLog, NumericSummary},
    io_utils::{self, LoadOptions},
    stages::{CastStage, Stage},
    table,
};

#[derive(Debug, Serialize)]
struct ColumnReport {
    column: String,
    rows: usize,
    nulls: usize,
    null_fraction: f64,
    distinct: usize,
    duplicates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    numeric: Option<NumericSummary>,
}

pub fn execute(args: &InspectArgs) -> Result<()> {
    let options = LoadOptions::resolve(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        &args.null_tokens,
    )?;
    info!(
        "Inspecting '{}' with delimiter '{}'",
        args.input.display(),
        crate::printable_delimiter(options.delimiter)
    );
    let mut dataset = io_utils::read_dataset(&args.input, &options)?;
    if !args.casts.is_empty() {
        check_cast_columns(&dataset, &args.casts)?;
        let stage = CastStage::new(args.casts.clone(), CoercionOptions::default())?;
        dataset = stage
            .apply(&dataset, &mut DiagnosticLog::new())
            .context("Casting columns before inspection")?;
    }

    let columns = selected_columns(&dataset, &args.columns)?;
    let reports = columns
        .iter()
        .map(|column| column_report(&dataset, column))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Inspected {} column(s) over {} row(s)",
        reports.len(),
        dataset.row_count()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports);
    }
    Ok(())
}

fn selected_columns(dataset: &Dataset, requested: &[String]) -> Result<Vec<String>> {
    let requested = requested
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();
    if requested.is_empty() {
        return Ok(dataset.schema().to_vec());
    }
    requested
        .into_iter()
        .map(|column| {
            if dataset.has_column(column) {
                Ok(column.to_string())
            } else {
                Err(anyhow!("Column '{column}' not found in input"))
            }
        })
        .collect()
}

fn check_cast_columns(dataset: &Dataset, casts: &[(String, TypeTag)]) -> Result<()> {
    match casts.iter().find(|(column, _)| !dataset.has_column(column)) {
        Some((column, _)) => Err(anyhow!("Cast column '{column}' not found in input")),
        None => Ok(()),
    }
}

fn column_report(dataset: &Dataset, column: &str) -> Result<ColumnReport> {
    let stats = diagnostics::diagnose(dataset, column)?;
    let numeric = diagnostics::summarize(dataset, column)?;
    Ok(ColumnReport {
        column: stats.column.clone(),
        rows: stats.row_count,
        nulls: stats.null_count,
        null_fraction: stats.null_fraction,
        distinct: stats.distinct_count,
        duplicates: stats.duplicate_count(),
        numeric,
    })
}

fn print_reports(reports: &[ColumnReport]) {
    let headers = [
        "column",
        "rows",
        "nulls",
        "null_fraction",
        "distinct",
        "duplicates",
        "count",
        "min",
        "max",
        "mean",
        "median",
        "std_dev",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect::<Vec<_>>();
    let rows = reports
        .iter()
        .map(|report| {
            let mut row = vec![
                report.column.clone(),
                report.rows.to_string(),
                report.nulls.to_string(),
                format!("{:.4}", report.null_fraction),
                report.distinct.to_string(),
                report.duplicates.to_string(),
            ];
            match &report.numeric {
                Some(summary) => row.extend([
                    summary.count.to_string(),
                    format_number(summary.min),
                    format_number(summary.max),
                    format_number(summary.mean),
                    format_number(summary.median),
                    summary.std_dev.map(format_number).unwrap_or_default(),
                ]),
                None => row.extend(std::iter::repeat_n(String::new(), 6)),
            }
            row
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawScalar, TypedValue};

    fn sample() -> Dataset {
        Dataset::from_raw_rows(
            vec!["id".into(), "age".into()],
            vec![
                vec![RawScalar::Integer(1), RawScalar::Integer(30)],
                vec![RawScalar::Integer(2), RawScalar::Null],
                vec![RawScalar::Integer(3), RawScalar::Integer(30)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn report_combines_stats_and_summary() {
        let report = column_report(&sample(), "age").unwrap();
        assert_eq!(report.nulls, 1);
        assert_eq!(report.distinct, 1);
        assert_eq!(report.duplicates, 2);
        let numeric = report.numeric.unwrap();
        assert_eq!(numeric.count, 2);
        assert_eq!(numeric.mean, 30.0);
    }

    #[test]
    fn unknown_requested_column_is_rejected() {
        let dataset = sample();
        assert!(selected_columns(&dataset, &["nope".to_string()]).is_err());
        assert_eq!(
            selected_columns(&dataset, &[]).unwrap(),
            vec!["id".to_string(), "age".to_string()]
        );
        assert_eq!(
            dataset.value(0, "id"),
            Some(&TypedValue::Integer(1))
        );
    }

    #[test]
    fn cast_of_unknown_column_is_rejected() {
        let dataset = sample();
        let err = check_cast_columns(&dataset, &[("agee".to_string(), TypeTag::Integer)])
            .unwrap_err();
        assert!(err.to_string().contains("agee"));
        assert!(check_cast_columns(&dataset, &[("age".to_string(), TypeTag::Float)]).is_ok());
    }

    #[test]
    fn whole_numbers_print_without_decimals() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(2.5), "2.5000");
    }
}
