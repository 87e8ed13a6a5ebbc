//! Two-worker frame pipeline: frame acquisition, per-half luminance and
//! gradient stages, recombination, presentation and statistics.

pub mod coordinator;
pub mod counters;
pub mod error;
pub mod role;
pub mod sink;
pub mod source;
pub mod stats;

pub use coordinator::{ExitReason, PipelineOptions, RunSummary, SobelPipeline, StopHandle};
pub use counters::{CounterSample, PerfCounters, WallClockCounters};
pub use error::PipelineError;
pub use role::{Role, RoleElection};
pub use sink::{CollectSink, FrameSink, NullSink, PngSequenceSink};
pub use source::{FrameSource, ImageFileSource, SyntheticPattern, SyntheticSource, VecSource};
pub use stats::{format_general, FrameSample, PerfModel, PipelineStats, StatsReport};
