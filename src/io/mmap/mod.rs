mod arena;
pub use arena::{Arena, MIN_BUFFERS};

mod buffer;
pub use buffer::{Buffer, Frame};

mod stream;
pub use stream::Stream;
