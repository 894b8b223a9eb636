//! Database collaborator: geometry source access and the scoped bulk loader.
//!
//! [`GeoDatabase`] wraps the SQLite store shared with the upstream spatial
//! loader. SQLite has no schema namespaces, so schema-qualified tables are
//! stored under quoted `"schema.table"` names; the bookkeeping tables
//! (`dataset_metadata`, `schema_dependencies`, `geolinkage`,
//! `geometry_sources`) live at the top level and are created on open if the
//! upstream loader has not already done so.
//!
//! [`LoadContext`] is the scoped load transaction: every write between
//! `begin_load` and `commit` happens inside one `rusqlite` transaction, and
//! dropping the context without committing rolls everything back.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::{Connection, Transaction, params, types::ValueRef};

use crate::{config::CsvDialect, error::LoadError, io_utils};

pub struct GeoDatabase {
    conn: Connection,
}

impl GeoDatabase {
    pub fn open(path: &Path) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("Opening database {path:?}"))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS dataset_metadata (
                schema_name     TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                family          TEXT NOT NULL,
                description     TEXT NOT NULL,
                date_published  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS schema_dependencies (
                schema_name  TEXT NOT NULL,
                depends_on   TEXT NOT NULL,
                PRIMARY KEY (schema_name, depends_on)
            );
            CREATE TABLE IF NOT EXISTS geolinkage (
                schema_name     TEXT NOT NULL,
                table_name      TEXT NOT NULL,
                gid_column      TEXT NOT NULL,
                geo_schema      TEXT NOT NULL,
                geo_table       TEXT NOT NULL,
                geo_gid_column  TEXT NOT NULL,
                PRIMARY KEY (schema_name, table_name)
            );
            CREATE TABLE IF NOT EXISTS geometry_sources (
                schema_name  TEXT NOT NULL,
                table_name   TEXT NOT NULL,
                gid_column   TEXT NOT NULL,
                PRIMARY KEY (schema_name, table_name)
            );
            "#,
        )
        .context("Ensuring bookkeeping tables")?;
        Ok(GeoDatabase { conn })
    }

    /// Identifier-column name of a geometry table, as registered by the
    /// upstream spatial loader. Defaults to `gid` for unregistered tables.
    pub fn geometry_gid_column(&self, schema: &str, table: &str) -> Result<String, LoadError> {
        let mut stmt = self.conn.prepare(
            "SELECT gid_column FROM geometry_sources WHERE schema_name = ?1 AND table_name = ?2",
        )?;
        let mut rows = stmt.query(params![schema, table])?;
        if let Some(row) = rows.next()? {
            Ok(row.get(0)?)
        } else {
            debug!("No geometry_sources entry for {schema}.{table}; assuming 'gid'");
            Ok("gid".to_string())
        }
    }

    /// Streams `(identifier, raw match value)` pairs from a geometry table.
    /// Scalar match values are coerced to their text form.
    pub fn geometry_pairs(
        &self,
        schema: &str,
        table: &str,
        gid_column: &str,
        match_column: &str,
    ) -> Result<Vec<(i64, String)>> {
        let sql = format!(
            "SELECT {}, {} FROM {}",
            quote_ident(gid_column),
            quote_ident(match_column),
            quote_qualified(schema, table)
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Querying geometry source {schema}.{table}"))?;
        let pairs = stmt
            .query_map([], |row| {
                let gid: i64 = row.get(0)?;
                let raw = match row.get_ref(1)? {
                    ValueRef::Null => String::new(),
                    ValueRef::Integer(value) => value.to_string(),
                    ValueRef::Real(value) => value.to_string(),
                    ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    ValueRef::Blob(_) => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            1,
                            match_column.to_string(),
                            rusqlite::types::Type::Blob,
                        ));
                    }
                };
                Ok((gid, raw))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Reading geometry rows from {schema}.{table}"))?;
        Ok(pairs)
    }

    /// Opens the scoped load transaction for `target_schema`.
    pub fn begin_load(&mut self, target_schema: &str) -> Result<LoadContext<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Beginning load transaction")?;
        Ok(LoadContext {
            tx,
            schema: target_schema.to_string(),
        })
    }
}

pub struct LoadContext<'conn> {
    tx: Transaction<'conn>,
    schema: String,
}

impl LoadContext<'_> {
    /// Declares that the target schema depends on `depends_on`, an ordering
    /// constraint for downstream consumers.
    pub fn add_dependency(&self, depends_on: &str) -> Result<(), LoadError> {
        self.tx.execute(
            "INSERT OR REPLACE INTO schema_dependencies (schema_name, depends_on) VALUES (?1, ?2)",
            params![self.schema, depends_on],
        )?;
        Ok(())
    }

    pub fn set_metadata(
        &self,
        name: &str,
        family: &str,
        description: &str,
        date_published: NaiveDate,
    ) -> Result<(), LoadError> {
        self.tx.execute(
            "INSERT OR REPLACE INTO dataset_metadata
                 (schema_name, name, family, description, date_published)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.schema,
                name,
                family,
                description,
                date_published.format("%Y-%m-%d").to_string()
            ],
        )?;
        Ok(())
    }

    /// Bulk-loads a normalized CSV into `<schema>.<table>`.
    ///
    /// The leading column becomes an INTEGER PRIMARY KEY and every remaining
    /// column is TEXT. An existing table of the same name is replaced within
    /// the transaction. Returns the number of data rows inserted.
    pub fn load_table(&self, table: &str, normalized: &Path, dialect: CsvDialect) -> Result<usize> {
        let mut reader = io_utils::open_csv_reader(normalized, dialect.delimiter())?;
        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record.context("Reading normalized header")?,
            None => bail!("Normalized file {normalized:?} is empty"),
        };

        let qualified = quote_qualified(&self.schema, table);
        let mut columns = Vec::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            let kind = if idx == 0 { "INTEGER PRIMARY KEY" } else { "TEXT" };
            columns.push(format!("{} {}", quote_ident(name), kind));
        }
        self.tx
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {qualified};\nCREATE TABLE {qualified} ({});",
                columns.join(", ")
            ))
            .with_context(|| format!("Creating target table {}.{}", self.schema, table))?;

        let placeholders = (1..=header.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut insert = self
            .tx
            .prepare(&format!("INSERT INTO {qualified} VALUES ({placeholders})"))?;

        let mut inserted = 0usize;
        for (idx, result) in records.enumerate() {
            let record = result
                .with_context(|| format!("Reading normalized row {}", idx + 2))?;
            insert
                .execute(rusqlite::params_from_iter(record.iter()))
                .with_context(|| format!("Inserting row {} into {}.{}", idx + 2, self.schema, table))?;
            inserted += 1;
        }
        info!(
            "Bulk-loaded {} row(s) into {}.{}",
            inserted, self.schema, table
        );
        Ok(inserted)
    }

    /// Registers the geo-linkage binding `table.<gid_column>` to the geometry
    /// table's identifier column.
    pub fn add_geolinkage(
        &self,
        table: &str,
        gid_column: &str,
        geo_schema: &str,
        geo_table: &str,
        geo_gid_column: &str,
    ) -> Result<(), LoadError> {
        self.tx.execute(
            "INSERT OR REPLACE INTO geolinkage
                 (schema_name, table_name, gid_column, geo_schema, geo_table, geo_gid_column)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![self.schema, table, gid_column, geo_schema, geo_table, geo_gid_column],
        )?;
        Ok(())
    }

    /// Commits the scoped transaction. Dropping the context without calling
    /// this rolls back every write since `begin_load`.
    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Committing load transaction")
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_qualified(schema: &str, table: &str) -> String {
    quote_ident(&format!("{schema}.{table}"))
}
