//! Fixed-width lane arithmetic used by the luminance and gradient kernels.
//!
//! Kernels are written once against the traits below and instantiated with a
//! [`LaneBackend`]:
//!
//! - [`ScalarLanes`] stores lanes in plain arrays and evaluates every
//!   operation lane by lane. It is the reference the other backend must match
//!   bit for bit.
//! - [`PackedLanes`] maps the same operations onto the portable SIMD types of
//!   the `wide` crate (SSE/NEON/wasm128 with a scalar fallback of their own).
//!
//! Semantics shared by both backends:
//! - `add`/`sub`/`mul_const` wrap on overflow, `saturating_*` clamp to the
//!   lane type's range.
//! - `shr` is arithmetic for signed lanes and logical for unsigned ones.
//! - `abs` wraps (`i16::MIN.abs() == i16::MIN`).
//! - `narrow_u8` clamps each lane into `[0, 255]`.
pub mod packed;
pub mod scalar;

use serde::Deserialize;
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

pub use packed::PackedLanes;
pub use scalar::ScalarLanes;

/// Lane count of the 16-bit integer vectors.
pub const LANES_16: usize = 8;
/// Lane count of the 32-bit float vectors.
pub const LANES_F32: usize = 4;

/// Eight signed 16-bit lanes.
pub trait I16Lanes: Copy + Debug + Add<Output = Self> + Sub<Output = Self> {
    fn splat(v: i16) -> Self;
    fn from_array(v: [i16; LANES_16]) -> Self;
    fn to_array(self) -> [i16; LANES_16];

    /// Widen the first eight bytes of `src`.
    #[inline]
    fn load_u8(src: &[u8]) -> Self {
        let mut lanes = [0i16; LANES_16];
        for (lane, &b) in lanes.iter_mut().zip(&src[..LANES_16]) {
            *lane = i16::from(b);
        }
        Self::from_array(lanes)
    }

    fn mul_const(self, k: i16) -> Self;
    fn shr(self, bits: u32) -> Self;
    fn saturating_add(self, rhs: Self) -> Self;
    fn saturating_sub(self, rhs: Self) -> Self;
    fn abs(self) -> Self;
    fn min_const(self, k: i16) -> Self;

    /// Clamp every lane to `[0, 255]` and store into `dst[..8]`.
    #[inline]
    fn narrow_u8(self, dst: &mut [u8]) {
        for (out, v) in dst[..LANES_16].iter_mut().zip(self.to_array()) {
            *out = v.clamp(0, 255) as u8;
        }
    }
}

/// Eight unsigned 16-bit lanes.
pub trait U16Lanes: Copy + Debug + Add<Output = Self> {
    fn splat(v: u16) -> Self;
    fn from_array(v: [u16; LANES_16]) -> Self;
    fn to_array(self) -> [u16; LANES_16];

    #[inline]
    fn from_u8(bytes: [u8; LANES_16]) -> Self {
        Self::from_array(bytes.map(u16::from))
    }

    fn mul_const(self, k: u16) -> Self;
    fn shr(self, bits: u32) -> Self;
    fn saturating_add(self, rhs: Self) -> Self;
    fn min_const(self, k: u16) -> Self;

    #[inline]
    fn narrow_u8(self, dst: &mut [u8]) {
        for (out, v) in dst[..LANES_16].iter_mut().zip(self.to_array()) {
            *out = v.min(255) as u8;
        }
    }
}

/// Four 32-bit float lanes.
pub trait F32Lanes: Copy + Debug + Add<Output = Self> + Mul<Output = Self> {
    fn splat(v: f32) -> Self;
    fn from_array(v: [f32; LANES_F32]) -> Self;
    fn to_array(self) -> [f32; LANES_F32];

    #[inline]
    fn from_u8(bytes: [u8; LANES_F32]) -> Self {
        Self::from_array(bytes.map(f32::from))
    }

    /// Round half away from zero, clamp to `[0, 255]` and store into `dst[..4]`.
    #[inline]
    fn round_narrow_u8(self, dst: &mut [u8]) {
        for (out, v) in dst[..LANES_F32].iter_mut().zip(self.to_array()) {
            *out = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Bundle of lane types a kernel is instantiated with.
pub trait LaneBackend: Send + Sync + 'static {
    const NAME: &'static str;
    type I16: I16Lanes;
    type U16: U16Lanes;
    type F32: F32Lanes;
}

/// Runtime selector for the lane backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneKind {
    Scalar,
    #[default]
    #[serde(alias = "packed")]
    Wide,
}

impl LaneKind {
    pub const ALL: [LaneKind; 2] = [LaneKind::Scalar, LaneKind::Wide];

    pub fn name(self) -> &'static str {
        match self {
            LaneKind::Scalar => ScalarLanes::NAME,
            LaneKind::Wide => PackedLanes::NAME,
        }
    }
}
