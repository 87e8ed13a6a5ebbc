//! JSON run configuration for the `sobel_stream` binary.

pub mod run;

pub use run::{load_config, OutputConfig, RunConfig, SourceConfig};
