//! Plain-array lane backend. Every operation is a per-lane loop over the
//! matching integer/float primitive, which makes it the bit-exact reference
//! for [`super::PackedLanes`].
use super::{F32Lanes, I16Lanes, LaneBackend, U16Lanes, LANES_16, LANES_F32};
use std::ops::{Add, Mul, Sub};

pub struct ScalarLanes;

impl LaneBackend for ScalarLanes {
    const NAME: &'static str = "scalar";
    type I16 = ScalarI16x8;
    type U16 = ScalarU16x8;
    type F32 = ScalarF32x4;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarI16x8([i16; LANES_16]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarU16x8([u16; LANES_16]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarF32x4([f32; LANES_F32]);

#[inline]
fn zip_with<T: Copy, const N: usize>(a: [T; N], b: [T; N], f: impl Fn(T, T) -> T) -> [T; N] {
    let mut out = a;
    for (o, r) in out.iter_mut().zip(b) {
        *o = f(*o, r);
    }
    out
}

impl Add for ScalarI16x8 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, i16::wrapping_add))
    }
}

impl Sub for ScalarI16x8 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, i16::wrapping_sub))
    }
}

impl I16Lanes for ScalarI16x8 {
    #[inline]
    fn splat(v: i16) -> Self {
        Self([v; LANES_16])
    }
    #[inline]
    fn from_array(v: [i16; LANES_16]) -> Self {
        Self(v)
    }
    #[inline]
    fn to_array(self) -> [i16; LANES_16] {
        self.0
    }
    #[inline]
    fn mul_const(self, k: i16) -> Self {
        Self(self.0.map(|v| v.wrapping_mul(k)))
    }
    #[inline]
    fn shr(self, bits: u32) -> Self {
        Self(self.0.map(|v| v >> bits.min(15)))
    }
    #[inline]
    fn saturating_add(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, i16::saturating_add))
    }
    #[inline]
    fn saturating_sub(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, i16::saturating_sub))
    }
    #[inline]
    fn abs(self) -> Self {
        Self(self.0.map(i16::wrapping_abs))
    }
    #[inline]
    fn min_const(self, k: i16) -> Self {
        Self(self.0.map(|v| v.min(k)))
    }
}

impl Add for ScalarU16x8 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, u16::wrapping_add))
    }
}

impl U16Lanes for ScalarU16x8 {
    #[inline]
    fn splat(v: u16) -> Self {
        Self([v; LANES_16])
    }
    #[inline]
    fn from_array(v: [u16; LANES_16]) -> Self {
        Self(v)
    }
    #[inline]
    fn to_array(self) -> [u16; LANES_16] {
        self.0
    }
    #[inline]
    fn mul_const(self, k: u16) -> Self {
        Self(self.0.map(|v| v.wrapping_mul(k)))
    }
    #[inline]
    fn shr(self, bits: u32) -> Self {
        Self(self.0.map(|v| v.checked_shr(bits).unwrap_or(0)))
    }
    #[inline]
    fn saturating_add(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, u16::saturating_add))
    }
    #[inline]
    fn min_const(self, k: u16) -> Self {
        Self(self.0.map(|v| v.min(k)))
    }
}

impl Add for ScalarF32x4 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, |a, b| a + b))
    }
}

impl Mul for ScalarF32x4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(zip_with(self.0, rhs.0, |a, b| a * b))
    }
}

impl F32Lanes for ScalarF32x4 {
    #[inline]
    fn splat(v: f32) -> Self {
        Self([v; LANES_F32])
    }
    #[inline]
    fn from_array(v: [f32; LANES_F32]) -> Self {
        Self(v)
    }
    #[inline]
    fn to_array(self) -> [f32; LANES_F32] {
        self.0
    }
}
