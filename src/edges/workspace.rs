//! Scratch buffers reused by the gradient kernels across frames.
use crate::image::Plane;

/// Per-worker scratch planes for the two-pass kernel.
///
/// Buffers grow on demand and keep their allocation between frames; the
/// fused and scalar kernels never touch them.
#[derive(Debug, Default)]
pub struct SobelWorkspace {
    gx: Plane,
    gy: Plane,
}

impl SobelWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace pre-sized for `w × h` inputs.
    pub fn with_size(w: usize, h: usize) -> Self {
        let mut ws = Self::new();
        ws.ensure(w, h);
        ws
    }

    /// Resize both planes to `w × h`, reusing the existing allocation.
    pub fn ensure(&mut self, w: usize, h: usize) {
        if self.gx.width() != w || self.gx.height() != h {
            self.gx.resize(w, h);
            self.gy.resize(w, h);
        }
    }

    /// Mutable access to the `(gx, gy)` scratch pair sized for `w × h`.
    pub fn scratch(&mut self, w: usize, h: usize) -> (&mut Plane, &mut Plane) {
        self.ensure(w, h);
        (&mut self.gx, &mut self.gy)
    }

    /// Bytes currently held by the scratch planes.
    pub fn footprint(&self) -> usize {
        self.gx.data().len() + self.gy.data().len()
    }
}
