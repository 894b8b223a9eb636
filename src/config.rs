//! Recipe model: the YAML configuration describing one load run.
//!
//! A recipe names the dataset, the source CSV and its dialect, the target
//! schema, and the linkage back to a previously loaded geometry table. It is
//! read once and immutable for the run. Dialect and match method are closed
//! enums, so unknown names are rejected while the recipe is parsed.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::LoadError, matcher::MatchMethod};

/// CSV dialect of the source file: delimiter and quoting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CsvDialect {
    Excel,
    ExcelTab,
    Semicolon,
    Pipe,
}

impl CsvDialect {
    pub fn delimiter(&self) -> u8 {
        match self {
            CsvDialect::Excel => b',',
            CsvDialect::ExcelTab => b'\t',
            CsvDialect::Semicolon => b';',
            CsvDialect::Pipe => b'|',
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvOptions {
    pub dialect: CsvDialect,
    /// Leading lines to discard before the header row.
    #[serde(default)]
    pub skip: usize,
    /// Encoding label of the source file (defaults to utf-8).
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Linkage {
    pub shape_schema: String,
    pub shape_table: String,
    /// Match column in the geometry table.
    pub shape_column: String,
    /// Match column in the source CSV.
    pub csv_column: String,
    #[serde(rename = "match")]
    pub match_method: MatchMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub family: String,
    pub description: String,
    /// Publication date, `YYYY-MM-DD`. Parsed when metadata is written.
    pub date_published: String,
    pub target_schema: String,
    /// Source CSV path; relative paths resolve against the recipe's directory.
    pub file: PathBuf,
    /// Geometry/bookkeeping database; defaults to `<target_schema>.db` beside
    /// the recipe.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Directory for the transient normalized CSV; defaults to the system
    /// temp directory.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    pub csv: CsvOptions,
    pub linkage: Linkage,
}

impl Recipe {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading recipe file {path:?}"))?;
        let recipe: Recipe = serde_yaml::from_str(&raw)
            .map_err(|err| LoadError::Config(err.to_string()))
            .with_context(|| format!("Parsing recipe file {path:?}"))?;
        recipe.validate()?;
        Ok(recipe)
    }

    fn validate(&self) -> Result<(), LoadError> {
        let required = [
            ("name", &self.name),
            ("family", &self.family),
            ("target_schema", &self.target_schema),
            ("linkage.shape_schema", &self.linkage.shape_schema),
            ("linkage.shape_table", &self.linkage.shape_table),
            ("linkage.shape_column", &self.linkage.shape_column),
            ("linkage.csv_column", &self.linkage.csv_column),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(LoadError::Config(format!("'{key}' must not be empty")));
            }
        }
        if self.file.as_os_str().is_empty() {
            return Err(LoadError::Config("'file' must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolves the source CSV path against the recipe's directory.
    pub fn source_path(&self, recipe_path: &Path) -> PathBuf {
        resolve_relative(&self.file, recipe_path)
    }

    pub fn database_path(&self, recipe_path: &Path) -> PathBuf {
        match &self.database {
            Some(path) => resolve_relative(path, recipe_path),
            None => recipe_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(format!("{}.db", self.target_schema)),
        }
    }

    pub fn scratch_dir(&self, recipe_path: &Path) -> PathBuf {
        match &self.scratch_dir {
            Some(path) => resolve_relative(path, recipe_path),
            None => std::env::temp_dir(),
        }
    }
}

fn resolve_relative(path: &Path, recipe_path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        recipe_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(path)
    }
}
