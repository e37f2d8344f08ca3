use std::{io, mem, sync::Arc};

use crate::buffer;
use crate::device::Handle;
use crate::error::{Error, Result};
use crate::io::mmap::Buffer;
use crate::memory::Memory;
use crate::v4l2;
use crate::v4l_sys::*;

/// Fewest buffers a capture stream can run with
pub const MIN_BUFFERS: u32 = 2;

/// Pool of driver buffers mapped into this process
///
/// Allocation either maps every granted buffer or none: a failure at any index drops the partly
/// built arena, which unmaps the slots mapped before it.
pub struct Arena {
    handle: Arc<Handle>,
    bufs: Vec<Buffer>,
}

// The mappings are owned exclusively by the arena.
unsafe impl Send for Arena {}

impl Arena {
    /// Requests `count` buffers from the driver and maps all of them
    ///
    /// The driver may grant fewer; anything below [`MIN_BUFFERS`] is an error.
    pub(crate) fn allocate(handle: Arc<Handle>, count: u32) -> Result<Self> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count,
            type_: buffer::Type::VideoCapture as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        };
        unsafe {
            handle
                .ioctl(v4l2::vidioc::VIDIOC_REQBUFS, &mut v4l2_reqbufs)
                .map_err(|e| match e.raw_os_error() {
                    Some(libc::EINVAL) => Error::MmapUnsupported,
                    _ => Error::RequestBuffers(e),
                })?;
        }

        let granted = v4l2_reqbufs.count;
        log::debug!("requested {} buffers, driver granted {}", count, granted);
        if granted < MIN_BUFFERS {
            return Err(Error::InsufficientBuffers(granted));
        }

        let mut arena = Arena {
            handle,
            bufs: Vec::with_capacity(granted as usize),
        };
        for index in 0..granted {
            let buf = arena
                .map(index)
                .map_err(|source| Error::MapBuffer { index, source })?;
            arena.bufs.push(buf);
        }

        Ok(arena)
    }

    fn map(&self, index: u32) -> io::Result<Buffer> {
        let mut v4l2_buf = v4l2_buffer {
            index,
            type_: buffer::Type::VideoCapture as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        };

        unsafe {
            self.handle.ioctl(v4l2::vidioc::VIDIOC_QUERYBUF, &mut v4l2_buf)?;

            let length = v4l2_buf.length as usize;
            let offset = v4l2_buf.m.offset as libc::off_t;
            let ptr = self.handle.mmap(length, offset)?;
            log::debug!("mapped buffer {} ({} bytes at offset {:#x})", index, length, offset);

            Ok(Buffer::new(index, ptr, length))
        }
    }

    /// Unmaps every buffer; later calls do nothing
    ///
    /// Unmap failures are logged, teardown always completes.
    pub fn release(&mut self) {
        for buf in self.bufs.drain(..) {
            if let Err(e) = unsafe { self.handle.munmap(buf.as_ptr(), buf.len()) } {
                log::warn!("failed to unmap buffer {}: {}", buf.index(), e);
            }
        }
    }

    pub fn get(&self, index: u32) -> Option<&Buffer> {
        self.bufs.get(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.bufs.iter()
    }

    pub fn len(&self) -> usize {
        self.bufs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bufs.is_empty()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.release();
    }
}
