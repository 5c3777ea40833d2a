use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use ari_bulk_loader::{FilterValue, Record};
use serde::Serialize;

use crate::cli::OutputFormat;

/// Parse `key=value`, guessing the value type: bool, integer, float, text.
pub fn parse_filter(raw: &str) -> Result<(String, FilterValue)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("filter must look like key=value: {raw}");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("filter key is empty: {raw}");
    }
    Ok((key.to_string(), parse_filter_value(value.trim())))
}

pub fn parse_filters(raw: &[String]) -> Result<Vec<(String, FilterValue)>> {
    raw.iter().map(|filter| parse_filter(filter)).collect()
}

fn parse_filter_value(value: &str) -> FilterValue {
    let typed = if let Ok(flag) = value.parse::<bool>() {
        FilterValue::Bool(flag)
    } else if let Ok(number) = value.parse::<i64>() {
        FilterValue::Integer(number)
    } else if let Some(number) = value.parse::<f64>().ok().filter(|number| number.is_finite()) {
        FilterValue::Float(number)
    } else {
        return FilterValue::Text(value.to_string());
    };
    // Only keep the typed value when it is sent back exactly as written
    // (`0042`, `1e5` and `2.50` stay text).
    if typed.to_query_value() == value {
        typed
    } else {
        FilterValue::Text(value.to_string())
    }
}

/// Write `rows` to `out`, or to stdout when `out` is `None`.
pub fn write_rows(rows: &[Record], out: Option<&Path>, format: OutputFormat) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_rows_to(&mut writer, rows, format)?;
            writer
                .flush()
                .with_context(|| format!("failed to write {}", path.display()))
        },
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_rows_to(&mut writer, rows, format)?;
            writer.flush().context("failed to write rows to stdout")
        },
    }
}

fn write_rows_to(writer: &mut impl Write, rows: &[Record], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, rows)?;
            writeln!(writer)?;
        },
        OutputFormat::Ndjson => {
            for row in rows {
                serde_json::to_writer(&mut *writer, row)?;
                writeln!(writer)?;
            }
        },
    }
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
