//! Lane backend on top of the portable SIMD types from `wide`.
//!
//! Each vector is a thin newtype so the trait methods never shadow the
//! inherent `wide` methods they delegate to.
use super::{F32Lanes, I16Lanes, LaneBackend, U16Lanes, LANES_16, LANES_F32};
use std::ops::{Add, Mul, Sub};
use wide::{f32x4, i16x8, u16x8};

pub struct PackedLanes;

impl LaneBackend for PackedLanes {
    const NAME: &'static str = "wide";
    type I16 = PackedI16x8;
    type U16 = PackedU16x8;
    type F32 = PackedF32x4;
}

#[derive(Clone, Copy, Debug)]
pub struct PackedI16x8(i16x8);

#[derive(Clone, Copy, Debug)]
pub struct PackedU16x8(u16x8);

#[derive(Clone, Copy, Debug)]
pub struct PackedF32x4(f32x4);

impl Add for PackedI16x8 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for PackedI16x8 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl I16Lanes for PackedI16x8 {
    #[inline]
    fn splat(v: i16) -> Self {
        Self(i16x8::splat(v))
    }
    #[inline]
    fn from_array(v: [i16; LANES_16]) -> Self {
        Self(i16x8::new(v))
    }
    #[inline]
    fn to_array(self) -> [i16; LANES_16] {
        self.0.to_array()
    }
    #[inline]
    fn mul_const(self, k: i16) -> Self {
        Self(self.0 * i16x8::splat(k))
    }
    #[inline]
    fn shr(self, bits: u32) -> Self {
        Self(self.0 >> bits.min(15))
    }
    #[inline]
    fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
    #[inline]
    fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
    #[inline]
    fn abs(self) -> Self {
        Self(self.0.abs())
    }
    #[inline]
    fn min_const(self, k: i16) -> Self {
        Self(self.0.min(i16x8::splat(k)))
    }
}

impl Add for PackedU16x8 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl U16Lanes for PackedU16x8 {
    #[inline]
    fn splat(v: u16) -> Self {
        Self(u16x8::splat(v))
    }
    #[inline]
    fn from_array(v: [u16; LANES_16]) -> Self {
        Self(u16x8::new(v))
    }
    #[inline]
    fn to_array(self) -> [u16; LANES_16] {
        self.0.to_array()
    }
    #[inline]
    fn mul_const(self, k: u16) -> Self {
        Self(self.0 * u16x8::splat(k))
    }
    #[inline]
    fn shr(self, bits: u32) -> Self {
        if bits >= 16 {
            return Self(u16x8::splat(0));
        }
        Self(self.0 >> bits)
    }
    #[inline]
    fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
    #[inline]
    fn min_const(self, k: u16) -> Self {
        Self(self.0.min(u16x8::splat(k)))
    }
}

impl Add for PackedF32x4 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul for PackedF32x4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl F32Lanes for PackedF32x4 {
    #[inline]
    fn splat(v: f32) -> Self {
        Self(f32x4::splat(v))
    }
    #[inline]
    fn from_array(v: [f32; LANES_F32]) -> Self {
        Self(f32x4::new(v))
    }
    #[inline]
    fn to_array(self) -> [f32; LANES_F32] {
        self.0.to_array()
    }
}
