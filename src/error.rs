//! Error taxonomy for a load run.
//!
//! Every variant is fatal to the current run: errors propagate unmodified to
//! the top-level caller, the scoped load transaction rolls back, and the
//! target schema keeps no partial rows.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Missing or malformed recipe content, including a source file with no
    /// header row past the skip boundary.
    #[error("invalid recipe: {0}")]
    Config(String),

    /// `date_published` did not parse as `YYYY-MM-DD`.
    #[error("publication date '{value}' is not a valid YYYY-MM-DD date")]
    InvalidDate { value: String },

    /// Two geometry rows canonicalized to the same match value.
    #[error("duplicate match value '{value}' in geometry source")]
    DuplicateMappingKey { value: String },

    /// The injected identifier column already exists in the source header.
    #[error("column '{column}' already exists in the source header")]
    ColumnCollision { column: String },

    /// The configured match column is absent from the source header.
    #[error("match column '{column}' not found in the source header")]
    ColumnNotFound { column: String },

    /// A data row's match value has no geometry entry. Never skipped or
    /// defaulted; a row that cannot resolve aborts the run.
    #[error("line {line}: match value '{value}' has no geometry entry")]
    UnmatchedRow { line: usize, value: String },

    /// Failure surfaced by the bulk-load or linkage-registration collaborator.
    #[error(transparent)]
    Loader(#[from] rusqlite::Error),
}
