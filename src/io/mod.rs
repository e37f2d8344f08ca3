pub mod mmap;
pub mod traits;
