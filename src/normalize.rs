//! Streaming row mutation: rewrite the source CSV into a normalized CSV with
//! the geometry identifier injected as the leading column.
//!
//! [`RowMutator`] is a state machine over the line index with three named
//! states. `Preamble` lines are discarded, the `Header` line is validated and
//! rewritten exactly once, and every `Data` line resolves its match value
//! against the mapping before being emitted. Structural conflicts (a missing
//! match column, a pre-existing identifier column) are detected on the header,
//! before any data row is processed.
//!
//! [`normalize`] drives one full pass over the source in strictly increasing
//! line order and writes the result to a scratch location. The output is
//! deterministic for a given source and mapping; re-running produces
//! byte-identical output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;

use crate::{
    config::CsvDialect, error::LoadError, io_utils, mapper::GidMapping, matcher::MatchMethod,
};

/// Name of the injected identifier column.
pub const GID_COLUMN: &str = "gid";

#[derive(Debug)]
enum MutatorState {
    /// Lines before the header; discarded.
    Preamble { remaining: usize },
    /// The header line itself; entered exactly once.
    Header,
    /// Every line after the header, with the match column index captured
    /// from the header.
    Data { match_index: usize },
}

pub struct RowMutator<'a> {
    mapping: &'a GidMapping,
    method: MatchMethod,
    csv_column: String,
    state: MutatorState,
    line: usize,
}

impl<'a> RowMutator<'a> {
    pub fn new(
        mapping: &'a GidMapping,
        method: MatchMethod,
        csv_column: &str,
        skip: usize,
    ) -> Self {
        let state = if skip == 0 {
            MutatorState::Header
        } else {
            MutatorState::Preamble { remaining: skip }
        };
        RowMutator {
            mapping,
            method,
            csv_column: csv_column.to_string(),
            state,
            line: 0,
        }
    }

    /// Applies the current state to one input record.
    ///
    /// Returns `None` for discarded preamble lines, otherwise the output row:
    /// always one field wider than the input.
    pub fn mutate(&mut self, record: &[String]) -> Result<Option<Vec<String>>, LoadError> {
        self.line += 1;
        match self.state {
            MutatorState::Preamble { remaining } => {
                self.state = if remaining > 1 {
                    MutatorState::Preamble {
                        remaining: remaining - 1,
                    }
                } else {
                    MutatorState::Header
                };
                Ok(None)
            }
            MutatorState::Header => {
                if record.iter().any(|column| column == GID_COLUMN) {
                    return Err(LoadError::ColumnCollision {
                        column: GID_COLUMN.to_string(),
                    });
                }
                let match_index = record
                    .iter()
                    .position(|column| *column == self.csv_column)
                    .ok_or_else(|| LoadError::ColumnNotFound {
                        column: self.csv_column.clone(),
                    })?;
                self.state = MutatorState::Data { match_index };
                Ok(Some(prepend(GID_COLUMN.to_string(), record)))
            }
            MutatorState::Data { match_index } => {
                let raw = record.get(match_index).map(String::as_str).unwrap_or("");
                let canonical = self.method.canonicalize(raw);
                let gid = self.mapping.gid_for(&canonical).ok_or_else(|| {
                    LoadError::UnmatchedRow {
                        line: self.line,
                        value: canonical.clone(),
                    }
                })?;
                Ok(Some(prepend(gid.to_string(), record)))
            }
        }
    }

    /// True once the header line has been seen and validated.
    pub fn header_seen(&self) -> bool {
        matches!(self.state, MutatorState::Data { .. })
    }
}

fn prepend(value: String, record: &[String]) -> Vec<String> {
    let mut row = Vec::with_capacity(record.len() + 1);
    row.push(value);
    row.extend(record.iter().cloned());
    row
}

/// Runs one full normalization pass over `source`, writing the mutated rows
/// to `<scratch_dir>/<stem>.norm.csv` with the same dialect.
///
/// Both file handles are scoped to this call. The writer is only flushed on
/// the success path, so a partially written file is never handed onward; on
/// failure the scratch file is left behind for diagnosis.
pub fn normalize(
    source: &Path,
    dialect: CsvDialect,
    encoding: &'static Encoding,
    mutator: &mut RowMutator<'_>,
    scratch_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(scratch_dir)
        .with_context(|| format!("Creating scratch directory {scratch_dir:?}"))?;
    let normalized = scratch_path(scratch_dir, source);
    let mut reader = io_utils::open_csv_reader(source, dialect.delimiter())?;
    let mut writer = io_utils::open_csv_writer(&normalized, dialect.delimiter())?;

    let mut emitted = 0usize;
    for (idx, result) in reader.byte_records().enumerate() {
        let record = result.with_context(|| format!("Reading line {} of {source:?}", idx + 1))?;
        let fields = io_utils::decode_record(&record, encoding)?;
        if let Some(row) = mutator.mutate(&fields)? {
            writer
                .write_record(row.iter())
                .context("Writing normalized row")?;
            emitted += 1;
        }
    }

    if !mutator.header_seen() {
        return Err(LoadError::Config(format!(
            "source file {source:?} has no header row past the skip boundary"
        ))
        .into());
    }

    writer.flush().context("Flushing normalized output")?;
    info!(
        "Normalized {} data row(s) from {:?} to {:?}",
        emitted.saturating_sub(1),
        source,
        normalized
    );
    Ok(normalized)
}

fn scratch_path(scratch_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("source");
    scratch_dir.join(format!("{stem}.norm.csv"))
}
