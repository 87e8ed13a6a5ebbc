#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod edges;
pub mod image;
pub mod luma;
pub mod pipeline;

// Lane primitives the kernels are written against.
pub mod lanes;

// --- High-level re-exports -------------------------------------------------

// Pipeline entry points and results.
pub use crate::pipeline::{
    ExitReason, FrameSink, FrameSource, PipelineError, PipelineOptions, RunSummary, SobelPipeline,
    StatsReport, StopHandle,
};

// Kernel selectors.
pub use crate::edges::{BorderFill, GradientKernel, GradientMethod};
pub use crate::lanes::LaneKind;
pub use crate::luma::LumaMethod;

// Image containers.
pub use crate::image::{Frame, Plane};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use sobel_stream::prelude::*;
///
/// # fn main() -> Result<(), PipelineError> {
/// let options = PipelineOptions::new(640, 480).with_max_frames(30);
/// let mut source = SyntheticSource::new(640, 480, SyntheticPattern::Checkerboard);
/// let summary = SobelPipeline::new(options).run(&mut source, &mut NullSink)?;
/// println!("{}", summary.report.to_csv());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::pipeline::{NullSink, SyntheticPattern, SyntheticSource};
    pub use crate::{
        Frame, GradientMethod, LaneKind, LumaMethod, PipelineError, PipelineOptions, Plane,
        SobelPipeline,
    };
}
