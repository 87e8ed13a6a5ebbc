use thiserror::Error;

/// Failures that abort a pipeline run.
///
/// Clean source exhaustion is not an error: [`super::FrameSource::next_frame`]
/// reports it as `Ok(None)` and the run ends normally.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame source failed: {0}")]
    Source(String),
    #[error("frame size {actual:?} does not match configured {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("frame sink failed: {0}")]
    Sink(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
