//! 3×3 Sobel edge magnitude with a clamped L1 combination.
//!
//! For every interior pixel `(i, j)`, `1 <= i <= rows-2`, `1 <= j <= cols-2`:
//!
//! ```text
//! Gx = | L(i-1,j-1) - L(i+1,j-1) + 2 L(i-1,j) - 2 L(i+1,j) + L(i-1,j+1) - L(i+1,j+1) |
//! Gy = | L(i-1,j-1) - L(i-1,j+1) + 2 L(i,j-1) - 2 L(i,j+1) + L(i+1,j-1) - L(i+1,j+1) |
//! out = min(255, min(255, Gx) + min(255, Gy))
//! ```
//!
//! Border pixels (row 0, row `rows-1`, column 0, column `cols-1`) are never
//! written: they keep whatever the output buffer held before the call. The
//! pipeline seeds that buffer (see [`BorderFill`]).
//!
//! Three realisations share the contract and produce identical bytes:
//! [`ScalarSobel`] (per-pixel oracle), [`TwoPassSobel`] (Gx pass, Gy pass,
//! combine pass over scratch planes) and [`FusedSobel`] (Gx and Gy for the
//! same 8-pixel tile in one sweep).
use super::workspace::SobelWorkspace;
use crate::image::{ImageView, ImageViewMut, PlaneView, PlaneViewMut};
use crate::lanes::{I16Lanes, LaneBackend, LaneKind, PackedLanes, ScalarLanes, LANES_16};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

const CLAMP: i16 = 255;

/// Gradient realisation selected at configuration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientMethod {
    Scalar,
    TwoPass,
    #[default]
    Fused,
}

impl GradientMethod {
    pub const ALL: [GradientMethod; 3] = [
        GradientMethod::Scalar,
        GradientMethod::TwoPass,
        GradientMethod::Fused,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GradientMethod::Scalar => "scalar",
            GradientMethod::TwoPass => "two_pass",
            GradientMethod::Fused => "fused",
        }
    }

    /// Instantiate the kernel on the requested lane backend. The scalar
    /// oracle ignores `lanes`.
    pub fn kernel(self, lanes: LaneKind) -> Box<dyn GradientKernel> {
        match (self, lanes) {
            (GradientMethod::Scalar, _) => Box::new(ScalarSobel),
            (GradientMethod::TwoPass, LaneKind::Scalar) => {
                Box::new(TwoPassSobel::<ScalarLanes>::new())
            }
            (GradientMethod::TwoPass, LaneKind::Wide) => {
                Box::new(TwoPassSobel::<PackedLanes>::new())
            }
            (GradientMethod::Fused, LaneKind::Scalar) => Box::new(FusedSobel::<ScalarLanes>::new()),
            (GradientMethod::Fused, LaneKind::Wide) => Box::new(FusedSobel::<PackedLanes>::new()),
        }
    }
}

/// How the output border is seeded before a gradient kernel runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderFill {
    /// Copy of the luminance input (classic behaviour).
    #[default]
    Luma,
    Zero,
}

impl BorderFill {
    /// Prepare `dst` so that untouched border pixels hold the chosen value.
    pub fn seed(self, luma: &PlaneView<'_>, dst: &mut PlaneViewMut<'_>) {
        match self {
            BorderFill::Luma => dst.copy_from(luma),
            BorderFill::Zero => dst.fill(0),
        }
    }
}

/// A Sobel magnitude realisation.
///
/// Implementations write only the interior `[1, rows-2] × [1, cols-2]` of
/// `dst`; images smaller than 3×3 have no interior and are left untouched.
pub trait GradientKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Panics
    /// Panics if `src` and `dst` differ in size.
    fn apply(&self, src: &PlaneView<'_>, dst: &mut PlaneViewMut<'_>, ws: &mut SobelWorkspace);
}

#[inline]
fn check_sizes(src: &PlaneView<'_>, dst: &PlaneViewMut<'_>) -> bool {
    assert_eq!(
        (src.width(), src.height()),
        (dst.width(), dst.height()),
        "gradient output must match the luminance size"
    );
    src.w >= 3 && src.h >= 3
}

#[inline]
fn clamp_magnitude(v: i32) -> i32 {
    v.abs().min(i32::from(CLAMP))
}

#[inline]
fn gx_at(up: &[u8], down: &[u8], j: usize) -> i32 {
    let (u, d) = (|k: usize| i32::from(up[k]), |k: usize| i32::from(down[k]));
    clamp_magnitude(u(j - 1) - d(j - 1) + 2 * u(j) - 2 * d(j) + u(j + 1) - d(j + 1))
}

#[inline]
fn gy_at(up: &[u8], mid: &[u8], down: &[u8], j: usize) -> i32 {
    let v = i32::from(up[j - 1]) - i32::from(up[j + 1]) + 2 * i32::from(mid[j - 1])
        - 2 * i32::from(mid[j + 1])
        + i32::from(down[j - 1])
        - i32::from(down[j + 1]);
    clamp_magnitude(v)
}

#[inline]
fn combine(gx: i32, gy: i32) -> u8 {
    (gx + gy).min(i32::from(CLAMP)) as u8
}

/// Per-pixel reference implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarSobel;

impl GradientKernel for ScalarSobel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn apply(&self, src: &PlaneView<'_>, dst: &mut PlaneViewMut<'_>, _ws: &mut SobelWorkspace) {
        if !check_sizes(src, dst) {
            return;
        }
        for y in 1..src.h - 1 {
            let (up, mid, down) = (src.row(y - 1), src.row(y), src.row(y + 1));
            let out = dst.row_mut(y);
            for x in 1..src.w - 1 {
                out[x] = combine(gx_at(up, down, x), gy_at(up, mid, down, x));
            }
        }
    }
}

/// Clamped |Gx| for the 8 pixels starting at column `j`.
#[inline]
fn gx_lanes<V: I16Lanes>(up: &[u8], down: &[u8], j: usize) -> V {
    let diff = |k: usize| V::load_u8(&up[k..]).saturating_sub(V::load_u8(&down[k..]));
    (diff(j - 1) + diff(j).mul_const(2) + diff(j + 1))
        .abs()
        .min_const(CLAMP)
}

/// Clamped |Gy| for the 8 pixels starting at column `j`.
#[inline]
fn gy_lanes<V: I16Lanes>(up: &[u8], mid: &[u8], down: &[u8], j: usize) -> V {
    let diff = |row: &[u8]| V::load_u8(&row[j - 1..]).saturating_sub(V::load_u8(&row[j + 1..]));
    (diff(up) + diff(mid).mul_const(2) + diff(down))
        .abs()
        .min_const(CLAMP)
}

/// Number of leading interior columns (starting at 1) covered by whole
/// vectors; a vector at `j` reads columns `j-1 ..= j+8`.
#[inline]
fn vector_span(cols: usize) -> usize {
    let interior = cols - 2;
    if cols < LANES_16 + 2 {
        0
    } else {
        interior - interior % LANES_16
    }
}

/// Vectorised Gx pass, Gy pass and combine pass over scratch planes.
pub struct TwoPassSobel<B: LaneBackend> {
    _lanes: PhantomData<B>,
}

impl<B: LaneBackend> TwoPassSobel<B> {
    pub fn new() -> Self {
        Self {
            _lanes: PhantomData,
        }
    }

    fn gx_pass(src: &PlaneView<'_>, gx: &mut PlaneViewMut<'_>, span: usize) {
        for y in 1..src.h - 1 {
            let (up, down) = (src.row(y - 1), src.row(y + 1));
            let out = gx.row_mut(y);
            for j in (1..1 + span).step_by(LANES_16) {
                gx_lanes::<B::I16>(up, down, j).narrow_u8(&mut out[j..]);
            }
            for j in 1 + span..src.w - 1 {
                out[j] = gx_at(up, down, j) as u8;
            }
        }
    }

    fn gy_pass(src: &PlaneView<'_>, gy: &mut PlaneViewMut<'_>, span: usize) {
        for y in 1..src.h - 1 {
            let (up, mid, down) = (src.row(y - 1), src.row(y), src.row(y + 1));
            let out = gy.row_mut(y);
            for j in (1..1 + span).step_by(LANES_16) {
                gy_lanes::<B::I16>(up, mid, down, j).narrow_u8(&mut out[j..]);
            }
            for j in 1 + span..src.w - 1 {
                out[j] = gy_at(up, mid, down, j) as u8;
            }
        }
    }

    fn combine_pass(
        gx: &PlaneView<'_>,
        gy: &PlaneView<'_>,
        dst: &mut PlaneViewMut<'_>,
        span: usize,
    ) {
        for y in 1..gx.h - 1 {
            let (rx, ry) = (gx.row(y), gy.row(y));
            let out = dst.row_mut(y);
            for j in (1..1 + span).step_by(LANES_16) {
                B::I16::load_u8(&rx[j..])
                    .saturating_add(B::I16::load_u8(&ry[j..]))
                    .min_const(CLAMP)
                    .narrow_u8(&mut out[j..]);
            }
            for j in 1 + span..gx.w - 1 {
                out[j] = combine(i32::from(rx[j]), i32::from(ry[j]));
            }
        }
    }
}

impl<B: LaneBackend> Default for TwoPassSobel<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: LaneBackend> GradientKernel for TwoPassSobel<B> {
    fn name(&self) -> &'static str {
        "two_pass"
    }

    fn apply(&self, src: &PlaneView<'_>, dst: &mut PlaneViewMut<'_>, ws: &mut SobelWorkspace) {
        if !check_sizes(src, dst) {
            return;
        }
        let span = vector_span(src.w);
        let (gx, gy) = ws.scratch(src.w, src.h);
        Self::gx_pass(src, &mut gx.view_mut(), span);
        Self::gy_pass(src, &mut gy.view_mut(), span);
        Self::combine_pass(&gx.view(), &gy.view(), dst, span);
    }
}

/// Vectorised single sweep: each 8-pixel tile loads its neighbours once and
/// produces Gx, Gy and the combined magnitude before moving on.
pub struct FusedSobel<B: LaneBackend> {
    _lanes: PhantomData<B>,
}

impl<B: LaneBackend> FusedSobel<B> {
    pub fn new() -> Self {
        Self {
            _lanes: PhantomData,
        }
    }
}

impl<B: LaneBackend> Default for FusedSobel<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: LaneBackend> GradientKernel for FusedSobel<B> {
    fn name(&self) -> &'static str {
        "fused"
    }

    fn apply(&self, src: &PlaneView<'_>, dst: &mut PlaneViewMut<'_>, _ws: &mut SobelWorkspace) {
        if !check_sizes(src, dst) {
            return;
        }
        let span = vector_span(src.w);
        for y in 1..src.h - 1 {
            let (up, mid, down) = (src.row(y - 1), src.row(y), src.row(y + 1));
            let out = dst.row_mut(y);
            for j in (1..1 + span).step_by(LANES_16) {
                let load = |row: &[u8], k: usize| B::I16::load_u8(&row[k..]);
                let (tl, t, tr) = (load(up, j - 1), load(up, j), load(up, j + 1));
                let (ml, mr) = (load(mid, j - 1), load(mid, j + 1));
                let (bl, b, br) = (load(down, j - 1), load(down, j), load(down, j + 1));

                let gx = (tl.saturating_sub(bl) + t.saturating_sub(b).mul_const(2)
                    + tr.saturating_sub(br))
                .abs()
                .min_const(CLAMP);
                let gy = (tl.saturating_sub(tr) + ml.saturating_sub(mr).mul_const(2)
                    + bl.saturating_sub(br))
                .abs()
                .min_const(CLAMP);
                gx.saturating_add(gy)
                    .min_const(CLAMP)
                    .narrow_u8(&mut out[j..]);
            }
            for j in 1 + span..src.w - 1 {
                out[j] = combine(gx_at(up, down, j), gy_at(up, mid, down, j));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Plane;

    fn all_kernels() -> Vec<(String, Box<dyn GradientKernel>)> {
        let mut out = Vec::new();
        for method in GradientMethod::ALL {
            for lanes in LaneKind::ALL {
                out.push((format!("{}/{}", method.name(), lanes.name()), method.kernel(lanes)));
            }
        }
        out
    }

    fn run(kernel: &dyn GradientKernel, src: &Plane, seed: u8) -> Plane {
        let mut dst = Plane::filled(src.width(), src.height(), seed);
        let mut ws = SobelWorkspace::new();
        kernel.apply(&src.view(), &mut dst.view_mut(), &mut ws);
        dst
    }

    #[test]
    fn uniform_plane_has_no_edges() {
        let src = Plane::filled(5, 5, 100);
        for (name, kernel) in all_kernels() {
            let out = run(kernel.as_ref(), &src, 100);
            for y in 1..4 {
                for x in 1..4 {
                    assert_eq!(out.get(x, y), 0, "{name}: edge at ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn vertical_step_saturates_next_to_the_step() {
        let src = Plane::from_vec(
            5,
            5,
            (0..25).map(|i| if i % 5 < 2 { 0 } else { 255 }).collect(),
        );
        let view = src.view();
        for y in 1..4 {
            let up = view.row(y - 1);
            let mid = view.row(y);
            let down = view.row(y + 1);
            // The row-difference term vanishes on a vertical step while the
            // column-difference term sees the full 0→255 jump.
            assert_eq!(gx_at(up, down, 1), 0);
            assert_eq!(gy_at(up, mid, down, 1), 255);
        }
        for (name, kernel) in all_kernels() {
            let out = run(kernel.as_ref(), &src, 7);
            for y in 1..4 {
                assert_eq!(out.get(1, y), 255, "{name}: column 1 row {y}");
                assert_eq!(out.get(2, y), 255, "{name}: column 2 row {y}");
                assert_eq!(out.get(3, y), 0, "{name}: column 3 row {y}");
            }
        }
    }

    #[test]
    fn borders_keep_seed_value() {
        let src = Plane::from_vec(19, 7, (0..19 * 7).map(|i| (i * 37 % 256) as u8).collect());
        for (name, kernel) in all_kernels() {
            let out = run(kernel.as_ref(), &src, 0xAB);
            for x in 0..19 {
                assert_eq!(out.get(x, 0), 0xAB, "{name}: top border");
                assert_eq!(out.get(x, 6), 0xAB, "{name}: bottom border");
            }
            for y in 0..7 {
                assert_eq!(out.get(0, y), 0xAB, "{name}: left border");
                assert_eq!(out.get(18, y), 0xAB, "{name}: right border");
            }
        }
    }

    #[test]
    fn degenerate_sizes_are_left_untouched() {
        for (w, h) in [(0, 0), (2, 5), (5, 2), (1, 1)] {
            let src = Plane::filled(w, h, 9);
            for (name, kernel) in all_kernels() {
                let out = run(kernel.as_ref(), &src, 3);
                assert!(out.data().iter().all(|&v| v == 3), "{name} {w}x{h}");
            }
        }
    }

    #[test]
    fn vector_span_never_reads_past_the_row() {
        for cols in 3..40 {
            let span = vector_span(cols);
            assert_eq!(span % LANES_16, 0);
            if span > 0 {
                let last_start = span - LANES_16 + 1;
                assert!(last_start + LANES_16 < cols, "cols={cols} span={span}");
            }
            assert!(span <= cols - 2);
        }
    }

    #[test]
    fn border_fill_seeds_output() {
        let luma = Plane::filled(4, 4, 42);
        let mut out = Plane::filled(4, 4, 1);
        BorderFill::Luma.seed(&luma.view(), &mut out.view_mut());
        assert!(out.data().iter().all(|&v| v == 42));
        BorderFill::Zero.seed(&luma.view(), &mut out.view_mut());
        assert!(out.data().iter().all(|&v| v == 0));
    }
}
