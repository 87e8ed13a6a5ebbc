//! RGB → luminance conversion.
//!
//! Every realisation maps an interleaved R,G,B sample to
//! `round(0.299 R + 0.587 G + 0.114 B)` clamped to `[0, 255]`:
//!
//! - [`LumaMethod::Scalar`] evaluates the weighted sum in `f64`; it is the
//!   reference the vectorised paths are checked against.
//! - [`LumaMethod::Float`] evaluates the sum on 4 × `f32` lanes.
//! - [`LumaMethod::Fixed`] uses 8-bit fixed-point weights on 8 × `u16` lanes:
//!   `(77 R + 150 G + 29 B + 128) >> 8`. The weights sum to 256 and the single
//!   rounded shift keeps every sample within one level of the reference.
//!
//! Batches that do not fill a whole vector fall back to the scalar form of the
//! same method, so no pixel is ever skipped.
use crate::image::{FrameView, ImageView, ImageViewMut, PlaneViewMut, CHANNELS};
use crate::lanes::{
    F32Lanes, LaneBackend, LaneKind, PackedLanes, ScalarLanes, U16Lanes, LANES_16, LANES_F32,
};
use serde::{Deserialize, Serialize};

/// ITU-R BT.601 luma weights in R, G, B order.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];
/// Fixed-point weights scaled by 256, R, G, B order.
pub const LUMA_FIXED_WEIGHTS: [u16; 3] = [77, 150, 29];
pub const LUMA_FIXED_SHIFT: u32 = 8;
const LUMA_FIXED_ROUND: u16 = 1 << (LUMA_FIXED_SHIFT - 1);

/// Evaluation strategy for the luminance stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LumaMethod {
    Scalar,
    Float,
    #[default]
    Fixed,
}

impl LumaMethod {
    pub const ALL: [LumaMethod; 3] = [LumaMethod::Scalar, LumaMethod::Float, LumaMethod::Fixed];

    pub fn name(self) -> &'static str {
        match self {
            LumaMethod::Scalar => "scalar",
            LumaMethod::Float => "float",
            LumaMethod::Fixed => "fixed",
        }
    }
}

/// Reference luminance of one pixel.
#[inline]
pub fn luma_reference(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    y.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn luma_float(r: u8, g: u8, b: u8) -> u8 {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    let y = f32::from(r) * wr + f32::from(g) * wg + f32::from(b) * wb;
    y.round().clamp(0.0, 255.0) as u8
}

#[inline]
pub fn luma_fixed(r: u8, g: u8, b: u8) -> u8 {
    let [wr, wg, wb] = LUMA_FIXED_WEIGHTS;
    let y = u32::from(r) * u32::from(wr)
        + u32::from(g) * u32::from(wg)
        + u32::from(b) * u32::from(wb)
        + u32::from(LUMA_FIXED_ROUND);
    (y >> LUMA_FIXED_SHIFT).min(255) as u8
}

fn check_lengths(src: &[u8], dst: &[u8]) {
    assert_eq!(
        src.len(),
        dst.len() * CHANNELS,
        "RGB input of {} bytes does not match {} luminance samples",
        src.len(),
        dst.len()
    );
}

/// Split `N` interleaved pixels into per-channel arrays.
#[inline]
fn deinterleave<const N: usize>(px: &[u8]) -> ([u8; N], [u8; N], [u8; N]) {
    let mut r = [0u8; N];
    let mut g = [0u8; N];
    let mut b = [0u8; N];
    for (i, c) in px[..N * CHANNELS].chunks_exact(CHANNELS).enumerate() {
        r[i] = c[0];
        g[i] = c[1];
        b[i] = c[2];
    }
    (r, g, b)
}

fn convert_pixels(src: &[u8], dst: &mut [u8], f: impl Fn(u8, u8, u8) -> u8) {
    for (out, px) in dst.iter_mut().zip(src.chunks_exact(CHANNELS)) {
        *out = f(px[0], px[1], px[2]);
    }
}

/// Reference conversion, one pixel at a time.
pub fn rgb_to_luma_scalar(src: &[u8], dst: &mut [u8]) {
    check_lengths(src, dst);
    convert_pixels(src, dst, luma_reference);
}

/// Float-weighted conversion on [`LANES_F32`]-pixel batches.
pub fn rgb_to_luma_float<B: LaneBackend>(src: &[u8], dst: &mut [u8]) {
    check_lengths(src, dst);
    let [wr, wg, wb] = LUMA_WEIGHTS;
    let (wr, wg, wb) = (B::F32::splat(wr), B::F32::splat(wg), B::F32::splat(wb));

    let batched = dst.len() - dst.len() % LANES_F32;
    let (dst_head, dst_tail) = dst.split_at_mut(batched);
    let (src_head, src_tail) = src.split_at(batched * CHANNELS);

    for (out, px) in dst_head
        .chunks_exact_mut(LANES_F32)
        .zip(src_head.chunks_exact(LANES_F32 * CHANNELS))
    {
        let (r, g, b) = deinterleave::<LANES_F32>(px);
        let y = B::F32::from_u8(r) * wr + B::F32::from_u8(g) * wg + B::F32::from_u8(b) * wb;
        y.round_narrow_u8(out);
    }
    convert_pixels(src_tail, dst_tail, luma_float);
}

/// Fixed-point conversion on [`LANES_16`]-pixel batches of `u16` lanes.
pub fn rgb_to_luma_fixed<B: LaneBackend>(src: &[u8], dst: &mut [u8]) {
    check_lengths(src, dst);
    let [wr, wg, wb] = LUMA_FIXED_WEIGHTS;
    let round = B::U16::splat(LUMA_FIXED_ROUND);

    let batched = dst.len() - dst.len() % LANES_16;
    let (dst_head, dst_tail) = dst.split_at_mut(batched);
    let (src_head, src_tail) = src.split_at(batched * CHANNELS);

    for (out, px) in dst_head
        .chunks_exact_mut(LANES_16)
        .zip(src_head.chunks_exact(LANES_16 * CHANNELS))
    {
        let (r, g, b) = deinterleave::<LANES_16>(px);
        // Max sum is 255 * 256 + 128, which still fits in u16.
        let y = B::U16::from_u8(r).mul_const(wr)
            + B::U16::from_u8(g).mul_const(wg)
            + B::U16::from_u8(b).mul_const(wb)
            + round;
        y.shr(LUMA_FIXED_SHIFT).narrow_u8(out);
    }
    convert_pixels(src_tail, dst_tail, luma_fixed);
}

fn convert_slice<B: LaneBackend>(method: LumaMethod, src: &[u8], dst: &mut [u8]) {
    match method {
        LumaMethod::Scalar => rgb_to_luma_scalar(src, dst),
        LumaMethod::Float => rgb_to_luma_float::<B>(src, dst),
        LumaMethod::Fixed => rgb_to_luma_fixed::<B>(src, dst),
    }
}

/// Convert `src` into `dst` with the selected method and lane backend.
///
/// Packed inputs are converted as one run; strided views are converted row by
/// row with each row's tail handled by the scalar fallback.
///
/// # Panics
/// Panics if the two images differ in size.
pub fn convert_frame(
    method: LumaMethod,
    lanes: LaneKind,
    src: &FrameView<'_>,
    dst: &mut PlaneViewMut<'_>,
) {
    match lanes {
        LaneKind::Scalar => convert_frame_with::<ScalarLanes>(method, src, dst),
        LaneKind::Wide => convert_frame_with::<PackedLanes>(method, src, dst),
    }
}

pub fn convert_frame_with<B: LaneBackend>(
    method: LumaMethod,
    src: &FrameView<'_>,
    dst: &mut PlaneViewMut<'_>,
) {
    assert_eq!(
        (src.width(), src.height()),
        (dst.width(), dst.height()),
        "luminance output must match the frame size"
    );
    if let (Some(s), true) = (src.as_slice(), dst.is_contiguous()) {
        if let Some(d) = dst.as_mut_slice() {
            convert_slice::<B>(method, s, d);
            return;
        }
    }
    for y in 0..src.height() {
        convert_slice::<B>(method, src.row(y), dst.row_mut(y));
    }
}
