#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Creates a geometry table the way the upstream spatial loader would:
/// the data table under its qualified name, plus a `geometry_sources`
/// registration naming the identifier column.
pub fn seed_geometry(
    database: &Path,
    schema: &str,
    table: &str,
    gid_column: &str,
    match_column: &str,
    rows: &[(i64, &str)],
) {
    let conn = Connection::open(database).expect("open geometry database");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS geometry_sources (
             schema_name  TEXT NOT NULL,
             table_name   TEXT NOT NULL,
             gid_column   TEXT NOT NULL,
             PRIMARY KEY (schema_name, table_name)
         );",
    )
    .expect("ensure geometry_sources");
    conn.execute(
        "INSERT OR REPLACE INTO geometry_sources (schema_name, table_name, gid_column)
         VALUES (?1, ?2, ?3)",
        params![schema, table, gid_column],
    )
    .expect("register geometry source");

    let qualified = format!("\"{schema}.{table}\"");
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {qualified};
         CREATE TABLE {qualified} (\"{gid_column}\" INTEGER PRIMARY KEY, \"{match_column}\" TEXT);"
    ))
    .expect("create geometry table");
    for (gid, value) in rows {
        conn.execute(
            &format!("INSERT INTO {qualified} VALUES (?1, ?2)"),
            params![gid, value],
        )
        .expect("insert geometry row");
    }
}

/// Renders a recipe YAML pointing at workspace-local paths.
pub fn recipe_yaml(source: &Path, database: &Path, scratch_dir: &Path, skip: usize) -> String {
    format!(
        r#"name: population
family: census
description: Population counts by suburb
date_published: 2021-06-30
target_schema: census_2021
file: {source}
database: {database}
scratch_dir: {scratch}
csv:
  dialect: excel
  skip: {skip}
linkage:
  shape_schema: geo_2021
  shape_table: suburbs
  shape_column: name
  csv_column: name
  match: str
"#,
        source = source.display(),
        database = database.display(),
        scratch = scratch_dir.display(),
    )
}

/// Counts the tables named `name` in the database (0 or 1).
pub fn table_count(database: &Path, name: &str) -> i64 {
    let conn = Connection::open(database).expect("open database");
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get(0),
    )
    .expect("query sqlite_master")
}
