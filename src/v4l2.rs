mod api;
pub use api::*;

pub mod vidioc;
