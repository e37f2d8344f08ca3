pub use crate::io::traits::{CaptureStream, Stream};
