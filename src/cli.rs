use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load CSV datasets into a geometry-linked relational schema",
    long_about = None
)]
pub struct Cli {
    /// Path to the recipe (configuration) file
    pub recipe: PathBuf,
}
