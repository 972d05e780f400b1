use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::TypeTag;

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean and normalize CSV data with typed pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a cleaning pipeline over a CSV file
    Clean(CleanArgs),
    /// Report null fractions, distinct counts, duplicates and numeric summaries per column
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input CSV file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Pipeline definition (.yaml, .yml or .json)
    #[arg(short = 'p', long = "pipeline")]
    pub pipeline: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Write stage diagnostics as JSON to this path
    #[arg(long = "diagnostics")]
    pub diagnostics: Option<PathBuf>,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Field values treated as null on load (repeatable; replaces the defaults)
    #[arg(long = "null-token", action = clap::ArgAction::Append)]
    pub null_tokens: Vec<String>,
    /// Render output as an aligned table to stdout
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Input CSV file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Columns to inspect (defaults to all)
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Coerce columns before inspecting, as `column:type` (e.g. `age:integer`)
    #[arg(long = "cast", value_parser = parse_cast, action = clap::ArgAction::Append)]
    pub casts: Vec<(String, TypeTag)>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Field values treated as null on load (repeatable; replaces the defaults)
    #[arg(long = "null-token", action = clap::ArgAction::Append)]
    pub null_tokens: Vec<String>,
    /// Emit JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_cast(value: &str) -> Result<(String, TypeTag), String> {
    let (column, ty) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("Expected `column:type`, got '{value}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Missing column name in '{value}'"));
    }
    Ok((column.to_string(), ty.parse::<TypeTag>()?))
}
