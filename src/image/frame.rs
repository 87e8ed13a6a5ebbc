//! Interleaved RGB8 frames and their row-range views.
use super::traits::ImageView;
use std::ops::Range;

/// Interleaved channel count of a [`Frame`] (R, G, B).
pub const CHANNELS: usize = 3;

/// One of the two row ranges a frame is split into for the two workers.
///
/// The top half holds rows `[0, h / 2)` and the bottom half `[h / 2, h)`, so
/// for odd heights the bottom half carries the extra row. Together they cover
/// every row exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Half {
    Top,
    Bottom,
}

impl Half {
    pub const BOTH: [Half; 2] = [Half::Top, Half::Bottom];

    /// Row range of this half within an image of `height` rows.
    #[inline]
    pub fn rows(self, height: usize) -> Range<usize> {
        let split = height / 2;
        match self {
            Half::Top => 0..split,
            Half::Bottom => split..height,
        }
    }

    #[inline]
    pub fn height(self, height: usize) -> usize {
        let r = self.rows(height);
        r.end - r.start
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Half::Top => 0,
            Half::Bottom => 1,
        }
    }
}

/// Owned interleaved RGB8 frame with packed rows (`stride == width * 3`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    w: usize,
    h: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Black frame of `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h * CHANNELS],
        }
    }

    /// Wrap interleaved RGB bytes.
    ///
    /// # Panics
    /// Panics if `data.len() != w * h * 3`.
    pub fn from_vec(w: usize, h: usize, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            w * h * CHANNELS,
            "frame data length ({}) must equal width * height * {CHANNELS} ({})",
            data.len(),
            w * h * CHANNELS
        );
        Self { w, h, data }
    }

    /// Build a frame by evaluating `f(x, y) -> [r, g, b]` for every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(w * h * CHANNELS);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.w
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.h
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.w + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn view(&self) -> FrameView<'_> {
        self.rows_view(0..self.h)
    }

    /// Borrow rows `rows` without copying; the view keeps the frame's stride.
    pub fn rows_view(&self, rows: Range<usize>) -> FrameView<'_> {
        assert!(
            rows.start <= rows.end && rows.end <= self.h,
            "row range {:?} out of bounds for height {}",
            rows,
            self.h
        );
        let stride = self.w * CHANNELS;
        FrameView {
            w: self.w,
            h: rows.end - rows.start,
            stride,
            data: &self.data[rows.start * stride..rows.end * stride],
        }
    }

    pub fn half(&self, half: Half) -> FrameView<'_> {
        self.rows_view(half.rows(self.h))
    }
}

/// Borrowed interleaved RGB8 image; `row(y)` yields `w * 3` bytes.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub w: usize,
    pub h: usize,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub data: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(w: usize, h: usize, stride: usize, data: &'a [u8]) -> Self {
        let row_bytes = w * CHANNELS;
        assert!(
            stride >= row_bytes,
            "stride ({stride}) must be >= width * {CHANNELS} ({row_bytes})"
        );
        assert!(
            h == 0 || data.len() >= (h - 1) * stride + row_bytes,
            "frame view of {w}x{h} (stride {stride}) needs more than {} bytes",
            data.len()
        );
        Self { w, h, stride, data }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = y * self.stride + x * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

impl<'a> ImageView for FrameView<'a> {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w * CHANNELS]
    }
    #[inline]
    fn is_contiguous(&self) -> bool {
        self.stride == self.w * CHANNELS
    }
    #[inline]
    fn as_slice(&self) -> Option<&[u8]> {
        self.is_contiguous()
            .then(|| &self.data[..self.w * self.h * CHANNELS])
    }
}
