//! Library-level tests for the normalization pass: row counts, injected
//! column width, determinism, and the structural failure modes detected
//! before any row reaches the loader.

mod common;

use std::fs;

use csv_geolink::config::CsvDialect;
use csv_geolink::error::LoadError;
use csv_geolink::io_utils;
use csv_geolink::mapper::GidMapping;
use csv_geolink::matcher::MatchMethod;
use csv_geolink::normalize::{RowMutator, normalize};

use common::TestWorkspace;

fn mapping() -> GidMapping {
    GidMapping::build(
        vec![(100, "Alice".to_string()), (101, "Bob".to_string())],
        MatchMethod::Str,
    )
    .expect("build mapping")
}

fn run_normalize(
    ws: &TestWorkspace,
    source_name: &str,
    contents: &str,
    skip: usize,
) -> anyhow::Result<std::path::PathBuf> {
    let source = ws.write(source_name, contents);
    let scratch = ws.path().join("scratch");
    fs::create_dir_all(&scratch).expect("create scratch dir");
    let mapping = mapping();
    let mut mutator = RowMutator::new(&mapping, MatchMethod::Str, "name", skip);
    let encoding = io_utils::resolve_encoding(None).expect("utf-8");
    normalize(&source, CsvDialect::Excel, encoding, &mut mutator, &scratch)
}

#[test]
fn end_to_end_normalization_matches_expected_bytes() {
    let ws = TestWorkspace::new();
    let normalized = run_normalize(
        &ws,
        "population.csv",
        "preamble_ignored\nname,value\nAlice,10\nBob,20\n",
        1,
    )
    .expect("normalize");

    let bytes = fs::read_to_string(&normalized).expect("read normalized");
    assert_eq!(bytes, "gid,name,value\n100,Alice,10\n101,Bob,20\n");
}

#[test]
fn output_line_count_is_input_minus_skip() {
    let ws = TestWorkspace::new();
    let normalized = run_normalize(
        &ws,
        "population.csv",
        "junk one\njunk two\nname,value\nAlice,10\nBob,20\nAlice,30\n",
        2,
    )
    .expect("normalize");

    let bytes = fs::read_to_string(&normalized).expect("read normalized");
    let lines: Vec<&str> = bytes.lines().collect();
    // 6 input lines minus skip = 4 output lines (header + 3 data rows).
    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert_eq!(line.split(',').count(), 3);
    }
}

#[test]
fn renormalizing_is_byte_identical() {
    let ws = TestWorkspace::new();
    let contents = "preamble\nname,value\nAlice,10\nBob,20\n";
    let first = run_normalize(&ws, "population.csv", contents, 1).expect("first pass");
    let first_bytes = fs::read(&first).expect("read first pass");
    let second = run_normalize(&ws, "population.csv", contents, 1).expect("second pass");
    assert_eq!(first, second);
    assert_eq!(first_bytes, fs::read(&second).expect("read second pass"));
}

#[test]
fn gid_column_in_header_fails_with_collision() {
    let ws = TestWorkspace::new();
    let err = run_normalize(
        &ws,
        "population.csv",
        "gid,name,value\n1,Alice,10\n",
        0,
    )
    .expect_err("collision");
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::ColumnCollision { column }) => assert_eq!(column, "gid"),
        other => panic!("expected ColumnCollision, got {other:?}"),
    }
}

#[test]
fn missing_match_column_fails() {
    let ws = TestWorkspace::new();
    let err = run_normalize(
        &ws,
        "population.csv",
        "suburb,value\nAlice,10\n",
        0,
    )
    .expect_err("missing column");
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::ColumnNotFound { column }) => assert_eq!(column, "name"),
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
}

#[test]
fn unmatched_data_row_fails() {
    let ws = TestWorkspace::new();
    let err = run_normalize(
        &ws,
        "population.csv",
        "name,value\nAlice,10\nCarol,30\n",
        0,
    )
    .expect_err("unmatched row");
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::UnmatchedRow { line, value }) => {
            assert_eq!(*line, 3);
            assert_eq!(value, "Carol");
        }
        other => panic!("expected UnmatchedRow, got {other:?}"),
    }
}

#[test]
fn file_shorter_than_skip_fails_with_config_error() {
    let ws = TestWorkspace::new();
    let err = run_normalize(&ws, "population.csv", "only preamble\n", 3)
        .expect_err("all-preamble file");
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::Config(_))
    ));
}

#[test]
fn empty_file_fails_with_config_error() {
    let ws = TestWorkspace::new();
    let err = run_normalize(&ws, "population.csv", "", 0).expect_err("empty file");
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::Config(_))
    ));
}

#[test]
fn alternate_dialects_round_trip_their_delimiter() {
    let ws = TestWorkspace::new();
    let source = ws.write("population.psv", "name|value\nAlice|10\n");
    let scratch = ws.path().join("scratch");
    fs::create_dir_all(&scratch).expect("create scratch dir");
    let mapping = mapping();
    let mut mutator = RowMutator::new(&mapping, MatchMethod::Str, "name", 0);
    let encoding = io_utils::resolve_encoding(None).expect("utf-8");
    let normalized = normalize(&source, CsvDialect::Pipe, encoding, &mut mutator, &scratch)
        .expect("normalize pipe dialect");
    let bytes = fs::read_to_string(&normalized).expect("read normalized");
    assert_eq!(bytes, "gid|name|value\n100|Alice|10\n");
}
