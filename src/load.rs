//! Load orchestration: the top-level sequence from recipe to committed load.
//!
//! The mapping is built before anything touches the CSV or the target schema,
//! and every database write happens inside one scoped transaction. Any
//! failure aborts the remaining steps, surfaces the error unmodified, and
//! rolls the transaction back; the target schema keeps no partial rows.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;

use crate::{
    config::Recipe,
    error::LoadError,
    io_utils,
    loader::GeoDatabase,
    mapper::GidMapping,
    normalize::{self, GID_COLUMN, RowMutator},
};

#[derive(Debug)]
pub struct LoadSummary {
    pub target_schema: String,
    pub target_table: String,
    pub rows_loaded: usize,
    pub normalized_path: PathBuf,
    pub linked_to: String,
}

pub fn execute(recipe_path: &Path) -> Result<LoadSummary> {
    let recipe = Recipe::load(recipe_path)?;
    let encoding = io_utils::resolve_encoding(recipe.csv.encoding.as_deref())?;
    let source = recipe.source_path(recipe_path);
    let database = recipe.database_path(recipe_path);
    info!(
        "Loading '{}' from {:?} into schema '{}'",
        recipe.name, source, recipe.target_schema
    );

    let mut db = GeoDatabase::open(&database)?;

    let linkage = &recipe.linkage;
    let shape_gid_column =
        db.geometry_gid_column(&linkage.shape_schema, &linkage.shape_table)?;
    let pairs = db.geometry_pairs(
        &linkage.shape_schema,
        &linkage.shape_table,
        &shape_gid_column,
        &linkage.shape_column,
    )?;
    let mapping = GidMapping::build(pairs, linkage.match_method)?;
    info!(
        "Mapped {} geometry value(s) from {}.{} using method '{}'",
        mapping.len(),
        linkage.shape_schema,
        linkage.shape_table,
        linkage.match_method
    );

    let ctx = db.begin_load(&recipe.target_schema)?;
    ctx.add_dependency(&linkage.shape_schema)?;

    let published = NaiveDate::parse_from_str(&recipe.date_published, "%Y-%m-%d")
        .map_err(|_| LoadError::InvalidDate {
            value: recipe.date_published.clone(),
        })?;
    ctx.set_metadata(&recipe.name, &recipe.family, &recipe.description, published)?;

    let mut mutator = RowMutator::new(
        &mapping,
        linkage.match_method,
        &linkage.csv_column,
        recipe.csv.skip,
    );
    let normalized = normalize::normalize(
        &source,
        recipe.csv.dialect,
        encoding,
        &mut mutator,
        &recipe.scratch_dir(recipe_path),
    )?;

    let rows_loaded = ctx
        .load_table(&recipe.name, &normalized, recipe.csv.dialect)
        .with_context(|| format!("Bulk-loading {normalized:?}"))?;
    ctx.add_geolinkage(
        &recipe.name,
        GID_COLUMN,
        &linkage.shape_schema,
        &linkage.shape_table,
        &shape_gid_column,
    )?;
    ctx.commit()?;

    let linked_to = format!("{}.{}", linkage.shape_schema, linkage.shape_table);
    info!(
        "Loaded {} row(s) into {}.{} linked to {}",
        rows_loaded, recipe.target_schema, recipe.name, linked_to
    );
    Ok(LoadSummary {
        target_schema: recipe.target_schema,
        target_table: recipe.name,
        rows_loaded,
        normalized_path: normalized,
        linked_to,
    })
}
