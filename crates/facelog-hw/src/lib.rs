//! facelog-hw — Webcam capture over V4L2.
//!
//! Owns the capture device exclusively; the handle is released when the
//! [`Camera`] value is dropped, so release/reacquire cycles are just
//! drop + re-open.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, PixelFormat};
pub use frame::Frame;
