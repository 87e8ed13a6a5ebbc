//! Frame and plane containers shared by the kernels and the pipeline.
//!
//! - [`Frame`] owns an interleaved RGB8 buffer; [`FrameView`] borrows a row
//!   range of one (a frame half) without copying.
//! - [`Plane`] owns a single-channel 8-bit buffer used for luminance and
//!   gradient output; [`PlaneView`] / [`PlaneViewMut`] borrow row ranges.
//!
//! All views keep the parent's row stride, so a half is a plain sub-slice of
//! the parent buffer.
pub mod frame;
pub mod io;
pub mod plane;
pub mod traits;

pub use self::frame::{Frame, FrameView, Half, CHANNELS};
pub use self::plane::{Plane, PlaneView, PlaneViewMut};
pub use self::traits::{ImageView, ImageViewMut, Rows};
