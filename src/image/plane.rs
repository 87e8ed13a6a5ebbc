//! Single-channel 8-bit planes (luminance, gradient scratch, edge magnitude).
//!
//! [`Plane`] owns a packed row-major buffer (`stride == width`). Borrowed
//! [`PlaneView`] and [`PlaneViewMut`] describe a row range of a parent buffer
//! and keep the parent's stride.
use super::traits::{ImageView, ImageViewMut};
use std::ops::Range;

/// Owned single-channel 8-bit image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plane {
    w: usize,
    h: usize,
    data: Vec<u8>,
}

impl Plane {
    /// Zero-initialised plane of `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self::filled(w, h, 0)
    }

    pub fn filled(w: usize, h: usize, value: u8) -> Self {
        Self {
            w,
            h,
            data: vec![value; w * h],
        }
    }

    /// Wrap an existing buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != w * h`.
    pub fn from_vec(w: usize, h: usize, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            w * h,
            "plane data length ({}) must equal width * height ({})",
            data.len(),
            w * h
        );
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
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.w + x] = v;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Change the dimensions, reusing the allocation. Contents are unspecified
    /// afterwards (callers overwrite or seed them).
    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.data.resize(w * h, 0);
    }

    /// Copy `src` into this plane, adopting its dimensions.
    pub fn copy_from(&mut self, src: &PlaneView<'_>) {
        self.resize(src.w, src.h);
        for (y, row) in src.rows().enumerate() {
            self.row_mut(y).copy_from_slice(row);
        }
    }

    pub fn view(&self) -> PlaneView<'_> {
        PlaneView {
            w: self.w,
            h: self.h,
            stride: self.w,
            data: &self.data,
        }
    }

    pub fn view_mut(&mut self) -> PlaneViewMut<'_> {
        PlaneViewMut {
            w: self.w,
            h: self.h,
            stride: self.w,
            data: &mut self.data,
        }
    }

    /// Borrow the rows in `rows` as a view sharing this plane's stride.
    pub fn rows_view(&self, rows: Range<usize>) -> PlaneView<'_> {
        assert!(
            rows.start <= rows.end && rows.end <= self.h,
            "row range {:?} out of bounds for height {}",
            rows,
            self.h
        );
        PlaneView {
            w: self.w,
            h: rows.end - rows.start,
            stride: self.w,
            data: &self.data[rows.start * self.w..rows.end * self.w],
        }
    }

    /// Stack `top` above `bottom` into this plane, reusing the allocation.
    ///
    /// # Panics
    /// Panics if the two views differ in width.
    pub fn vconcat_from(&mut self, top: &PlaneView<'_>, bottom: &PlaneView<'_>) {
        assert_eq!(
            top.w, bottom.w,
            "cannot stack planes of width {} and {}",
            top.w, bottom.w
        );
        self.resize(top.w, top.h + bottom.h);
        for (y, row) in top.rows().chain(bottom.rows()).enumerate() {
            self.row_mut(y).copy_from_slice(row);
        }
    }

    pub fn vconcat(top: &PlaneView<'_>, bottom: &PlaneView<'_>) -> Self {
        let mut out = Self::default();
        out.vconcat_from(top, bottom);
        out
    }
}

impl ImageView for Plane {
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
        self.w
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
    #[inline]
    fn is_contiguous(&self) -> bool {
        true
    }
    #[inline]
    fn as_slice(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

impl ImageViewMut for Plane {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.w;
        &mut self.data[start..start + self.w]
    }
    #[inline]
    fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.data)
    }
}

/// Borrowed single-channel 8-bit image.
#[derive(Clone, Copy, Debug)]
pub struct PlaneView<'a> {
    pub w: usize,
    pub h: usize,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub data: &'a [u8],
}

impl<'a> PlaneView<'a> {
    pub fn new(w: usize, h: usize, stride: usize, data: &'a [u8]) -> Self {
        assert!(stride >= w, "stride ({stride}) must be >= width ({w})");
        assert!(
            h == 0 || data.len() >= (h - 1) * stride + w,
            "plane view of {w}x{h} (stride {stride}) needs more than {} bytes",
            data.len()
        );
        Self { w, h, stride, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    pub fn to_plane(&self) -> Plane {
        let mut out = Plane::default();
        out.copy_from(self);
        out
    }
}

impl<'a> ImageView for PlaneView<'a> {
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
        &self.data[start..start + self.w]
    }
    #[inline]
    fn is_contiguous(&self) -> bool {
        self.stride == self.w
    }
    #[inline]
    fn as_slice(&self) -> Option<&[u8]> {
        self.is_contiguous().then(|| &self.data[..self.w * self.h])
    }
}

/// Mutable borrowed single-channel 8-bit image.
#[derive(Debug)]
pub struct PlaneViewMut<'a> {
    w: usize,
    h: usize,
    stride: usize,
    data: &'a mut [u8],
}

impl<'a> PlaneViewMut<'a> {
    pub fn new(w: usize, h: usize, stride: usize, data: &'a mut [u8]) -> Self {
        assert!(stride >= w, "stride ({stride}) must be >= width ({w})");
        assert!(
            h == 0 || data.len() >= (h - 1) * stride + w,
            "plane view of {w}x{h} (stride {stride}) needs more than {} bytes",
            data.len()
        );
        Self { w, h, stride, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.stride + x] = v;
    }

    /// Overwrite every pixel with the matching pixel of `src`.
    pub fn copy_from(&mut self, src: &PlaneView<'_>) {
        assert_eq!(
            (self.w, self.h),
            (src.w, src.h),
            "copy between planes of different size"
        );
        for y in 0..self.h {
            self.row_mut(y).copy_from_slice(src.row(y));
        }
    }

    pub fn fill(&mut self, value: u8) {
        for y in 0..self.h {
            self.row_mut(y).fill(value);
        }
    }
}

impl<'a> ImageView for PlaneViewMut<'a> {
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
        &self.data[start..start + self.w]
    }
    #[inline]
    fn is_contiguous(&self) -> bool {
        self.stride == self.w
    }
    #[inline]
    fn as_slice(&self) -> Option<&[u8]> {
        self.is_contiguous().then(|| &self.data[..self.w * self.h])
    }
}

impl<'a> ImageViewMut for PlaneViewMut<'a> {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        &mut self.data[start..start + self.w]
    }
    #[inline]
    fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if self.stride == self.w {
            Some(&mut self.data[..self.w * self.h])
        } else {
            None
        }
    }
}
