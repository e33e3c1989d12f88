//! Command-line front end for the skymaf slicing and metric engine
//!
//! Loads a YAML run configuration and a JSON observation table, runs every
//! bundle, and writes one JSON artifact per plot plus a `summary.yaml`.

pub mod config;
pub mod logging;
pub mod render;
pub mod table_io;

pub use config::{Overrides, load_run_config};
pub use logging::init_logging;
pub use render::{FilePersister, JsonRenderer, RunSummary};
pub use table_io::{load_table, table_from_json};
