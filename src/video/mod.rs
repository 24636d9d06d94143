//! Camera frames and the live preview surface.

pub mod camera;
pub mod preview;
