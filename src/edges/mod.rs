//! Edge-magnitude computation on 8-bit luminance planes.
//!
//! - [`GradientKernel`]: the kernel interface shared by every realisation.
//! - [`ScalarSobel`]: per-pixel oracle used to validate the vector kernels.
//! - [`TwoPassSobel`] / [`FusedSobel`]: lane-generic kernels instantiated
//!   over [`crate::lanes::ScalarLanes`] or [`crate::lanes::PackedLanes`].
//! - [`SobelWorkspace`]: scratch planes kept alive across frames.
//!
//! Kernels only write interior pixels; how the border is seeded is decided by
//! [`BorderFill`].

pub mod sobel;
pub mod workspace;

pub use sobel::{
    BorderFill, FusedSobel, GradientKernel, GradientMethod, ScalarSobel, TwoPassSobel,
};
pub use workspace::SobelWorkspace;
