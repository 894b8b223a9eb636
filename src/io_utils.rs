//! I/O utilities for CSV reading, writing, and encoding resolution.
//!
//! All file I/O in csv-geolink flows through this module:
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//!   The normalized scratch file is always written as UTF-8.
//! - **Reader/writer construction**: buffered handles with the recipe's
//!   dialect delimiter. Readers are flexible because preamble lines before
//!   the header need not share the data rows' field count.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_csv_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    let reader =
        BufReader::new(File::open(path).with_context(|| format!("Opening input file {path:?}"))?);
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_reader(reader))
}

pub fn open_csv_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<BufWriter<File>>> {
    let writer = BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    );
    let mut builder = csv::WriterBuilder::new();
    builder.delimiter(delimiter).double_quote(true);
    Ok(builder.from_writer(writer))
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
