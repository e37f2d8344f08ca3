/// Memory used for buffer exchange, `enum v4l2_memory`
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    Mmap = 1,
}
