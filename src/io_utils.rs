//! CSV loading and writing around the in-memory [`Dataset`].
//!
//! - **Delimiter resolution**: extension-based detection (`.tsv` → tab,
//!   otherwise comma) unless a delimiter is given explicitly.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Null tokens**: fields matching a configured token load as null; every
//!   other field loads as text and is typed later by a cast stage.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{data::RawScalar, dataset::Dataset};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const DEFAULT_NULL_TOKENS: &[&str] = &["", "NA", "N/A", "null", "NaN"];

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub null_tokens: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    /// Builds options from CLI-style inputs; an empty token list keeps the defaults.
    pub fn resolve(
        path: &Path,
        delimiter: Option<u8>,
        encoding: Option<&str>,
        null_tokens: &[String],
    ) -> Result<Self> {
        let mut options = Self {
            delimiter: resolve_input_delimiter(path, delimiter),
            encoding: resolve_encoding(encoding)?,
            ..Self::default()
        };
        if !null_tokens.is_empty() {
            options.null_tokens = null_tokens.to_vec();
        }
        Ok(options)
    }

    fn to_raw(&self, field: String) -> RawScalar {
        if self.null_tokens.iter().any(|token| token == field.trim()) {
            RawScalar::Null
        } else {
            RawScalar::Text(field)
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Loads a headed CSV file into a dataset of untyped values.
pub fn read_dataset(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    read_dataset_from(open_input(path)?, options)
        .with_context(|| format!("Loading dataset from {path:?}"))
}

pub fn read_dataset_from<R: Read>(reader: R, options: &LoadOptions) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader);
    let headers = decode_record(reader.byte_headers()?, options.encoding)?;

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let fields = decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        rows.push(
            fields
                .into_iter()
                .map(|field| options.to_raw(field))
                .collect::<Vec<_>>(),
        );
    }
    debug!(
        "Loaded {} row(s) across {} column(s)",
        rows.len(),
        headers.len()
    );
    Ok(Dataset::from_raw_rows(headers, rows)?)
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    })
}

/// Writes the dataset as CSV. Missing values are written as empty fields.
pub fn write_dataset<W: Write>(writer: W, dataset: &Dataset, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(writer);
    writer
        .write_record(dataset.schema())
        .context("Writing output headers")?;
    for (idx, row) in dataset.rows().iter().enumerate() {
        writer
            .write_record(row.values().iter().map(|value| value.as_display()))
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}
