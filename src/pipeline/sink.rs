//! Consumers of the assembled edge-magnitude plane.
use super::PipelineError;
use crate::image::io::save_plane_png;
use crate::image::Plane;
use std::path::PathBuf;

/// Receiver of one finished plane per frame. Must not block indefinitely.
pub trait FrameSink: Send {
    fn present(&mut self, plane: &Plane) -> Result<(), PipelineError>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn present(&mut self, plane: &Plane) -> Result<(), PipelineError> {
        (**self).present(plane)
    }
}

/// Discards every plane.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _plane: &Plane) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Keeps every presented plane in memory.
#[derive(Clone, Debug, Default)]
pub struct CollectSink {
    pub planes: Vec<Plane>,
}

impl FrameSink for CollectSink {
    fn present(&mut self, plane: &Plane) -> Result<(), PipelineError> {
        self.planes.push(plane.clone());
        Ok(())
    }
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
#[derive(Clone, Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    next_index: u64,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_index: 0,
        }
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for PngSequenceSink {
    fn present(&mut self, plane: &Plane) -> Result<(), PipelineError> {
        let path = self.frame_path(self.next_index);
        save_plane_png(plane, &path).map_err(PipelineError::Sink)?;
        self.next_index += 1;
        Ok(())
    }
}
