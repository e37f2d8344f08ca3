use std::ptr::NonNull;
use std::slice;

use crate::buffer::Metadata;

/// Mapped driver buffer, one slot of an [`Arena`](super::Arena)
///
/// The memory is shared with the driver and stays mapped for as long as the slot is alive.
#[derive(Debug)]
pub struct Buffer {
    index: u32,
    ptr: NonNull<u8>,
    length: usize,
}

impl Buffer {
    pub(crate) fn new(index: u32, ptr: NonNull<u8>, length: usize) -> Self {
        Buffer { index, ptr, length }
    }

    /// Index assigned by the driver
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Length of the mapping in bytes
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.length) }
    }
}

/// Frame checked out of a capture stream
///
/// The data aliases the mapped buffer of the driver; it is handed back at the next pull, which
/// the borrow on the stream enforces. Copy it out to keep it longer.
#[derive(Debug)]
pub struct Frame<'a> {
    index: u32,
    len: usize,
    data: &'a [u8],
    meta: Metadata,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(index: u32, len: usize, data: &'a [u8], meta: Metadata) -> Self {
        Frame {
            index,
            len,
            data,
            meta,
        }
    }

    /// Buffer index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Negotiated image size in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Image bytes, at most [`Frame::len`] of them
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }
}

impl AsRef<[u8]> for Frame<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}
