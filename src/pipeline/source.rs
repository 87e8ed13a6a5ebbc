//! Frame producers consumed by the controller in the acquire stage.
use super::PipelineError;
use crate::image::io::load_rgb_frame;
use crate::image::Frame;
use log::debug;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Producer of RGB frames.
///
/// `Ok(None)` signals clean end of stream; `Err` is an acquisition failure.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        (**self).next_frame()
    }
}

/// Test pattern rendered by [`SyntheticSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    #[default]
    Checkerboard,
    Bars,
    Gradient,
}

/// Deterministic generator; the pattern drifts one pixel per frame.
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    width: usize,
    height: usize,
    pattern: SyntheticPattern,
    cell: usize,
    limit: Option<u64>,
    produced: u64,
}

impl SyntheticSource {
    pub fn new(width: usize, height: usize, pattern: SyntheticPattern) -> Self {
        Self {
            width,
            height,
            pattern,
            cell: 16,
            limit: None,
            produced: 0,
        }
    }

    /// Stop after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn with_cell_size(mut self, cell: usize) -> Self {
        self.cell = cell.max(1);
        self
    }

    /// Render frame number `index`.
    pub fn render(&self, index: u64) -> Frame {
        let shift = index as usize;
        let cell = self.cell;
        let (w, h) = (self.width.max(1), self.height.max(1));
        match self.pattern {
            SyntheticPattern::Checkerboard => Frame::from_fn(self.width, self.height, |x, y| {
                let on = ((x + shift) / cell + y / cell) % 2 == 0;
                if on {
                    [230, 220, 200]
                } else {
                    [20, 30, 40]
                }
            }),
            SyntheticPattern::Bars => Frame::from_fn(self.width, self.height, |x, _| {
                match ((x + shift) / cell) % 3 {
                    0 => [255, 0, 0],
                    1 => [0, 255, 0],
                    _ => [0, 0, 255],
                }
            }),
            SyntheticPattern::Gradient => Frame::from_fn(self.width, self.height, |x, y| {
                let gx = ((x + shift) % w * 255 / w) as u8;
                let gy = (y * 255 / h) as u8;
                [gx, gy, gx / 2 + gy / 2]
            }),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        let frame = self.render(self.produced);
        self.produced += 1;
        Ok(Some(frame))
    }
}

/// Decodes a fixed list of image files in order.
#[derive(Clone, Debug)]
pub struct ImageFileSource {
    paths: VecDeque<PathBuf>,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

impl ImageFileSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// All images directly inside `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, String> {
        let entries = fs::read_dir(dir)
            .map_err(|e| format!("Failed to read directory {}: {e}", dir.display()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| format!("Failed to list {}: {e}", dir.display()))?
                .path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(Self::new(paths))
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        debug!("ImageFileSource::next_frame loading {}", path.display());
        load_rgb_frame(&path).map(Some).map_err(PipelineError::Source)
    }
}

/// In-memory frame queue.
#[derive(Clone, Debug, Default)]
pub struct VecSource {
    frames: VecDeque<Frame>,
}

impl VecSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        Ok(self.frames.pop_front())
    }
}
