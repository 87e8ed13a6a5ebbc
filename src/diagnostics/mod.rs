//! Serializable diagnostics shared by the pipeline runner and the benchmark
//! tool.

pub mod timing;

pub use timing::{StageTiming, TimingBreakdown};
