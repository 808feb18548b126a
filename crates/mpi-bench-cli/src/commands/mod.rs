//! Command modules

mod cluster;
mod results;
mod run;

pub use cluster::ClusterCommands;
pub use results::ResultsCommands;
pub use run::RunArgs;

use anyhow::{Context, Result};
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
