use std::{io, mem, sync::Arc, time::Duration};

use crate::buffer::{self, Metadata};
use crate::device::Handle;
use crate::error::{BestEffort, Error, Result};
use crate::io::mmap::{Arena, Frame};
use crate::io::traits::{CaptureStream, Stream as StreamTrait};
use crate::memory::Memory;
use crate::v4l2;
use crate::v4l_sys::*;

/// Stream of mapped buffers
///
/// At most one buffer is checked out to the caller at a time. It goes back to the driver at the
/// start of the next pull, so the caller can read it for the whole interval between two pulls.
pub struct Stream {
    handle: Arc<Handle>,
    arena: Arena,
    image_size: u32,

    pending: Option<u32>,
    frames: u64,
    active: bool,
}

impl Stream {
    /// Returns a stream over an allocated arena
    ///
    /// # Arguments
    ///
    /// * `handle` - Device the arena was allocated on
    /// * `arena` - Mapped buffers
    /// * `image_size` - Negotiated image size reported for every frame
    pub(crate) fn new(handle: Arc<Handle>, arena: Arena, image_size: u32) -> Self {
        Stream {
            handle,
            arena,
            image_size,
            pending: None,
            frames: 0,
            active: false,
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.arena.len()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    fn buffer_desc(&self) -> v4l2_buffer {
        v4l2_buffer {
            type_: buffer::Type::VideoCapture as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        }
    }

    fn queue(&self, index: u32) -> io::Result<()> {
        let mut v4l2_buf = v4l2_buffer {
            index,
            ..self.buffer_desc()
        };
        unsafe { self.handle.ioctl(v4l2::vidioc::VIDIOC_QBUF, &mut v4l2_buf) }
    }

    fn dequeue(&self) -> io::Result<v4l2_buffer> {
        let mut v4l2_buf = self.buffer_desc();
        unsafe {
            self.handle.ioctl(v4l2::vidioc::VIDIOC_DQBUF, &mut v4l2_buf)?;
        }

        Ok(v4l2_buf)
    }

    fn switch(&self, request: v4l2::vidioc::_IOC_TYPE) -> io::Result<()> {
        let mut typ = buffer::Type::VideoCapture as std::os::raw::c_int;
        unsafe { self.handle.ioctl(request, &mut typ) }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // buffers may still be queued after a failed start
        self.stop();
    }
}

impl StreamTrait for Stream {
    fn start(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }

        for buf in self.arena.iter() {
            let index = buf.index();
            self.queue(index)
                .map_err(|source| Error::Queue { index, source })?;
        }
        self.pending = None;

        self.switch(v4l2::vidioc::VIDIOC_STREAMON)
            .map_err(Error::StreamOn)?;
        self.active = true;

        log::info!("streaming with {} buffers", self.arena.len());
        Ok(())
    }

    fn stop(&mut self) -> BestEffort {
        let was_active = mem::replace(&mut self.active, false);
        self.pending = None;

        if self.handle.is_closed() {
            return BestEffort::Applied;
        }

        let res = BestEffort::attempt("stream off", self.switch(v4l2::vidioc::VIDIOC_STREAMOFF));
        if was_active {
            log::info!("streaming stopped after {} frames", self.frames);
        }
        res
    }
}

impl CaptureStream for Stream {
    fn pull_timeout(&mut self, timeout: Duration) -> Result<Frame<'_>> {
        match self.handle.wait_readable(timeout) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("no frame within {:?}", timeout);
                return Err(Error::Timeout);
            }
            Err(e) => return Err(Error::Wait(e)),
        }

        if let Some(index) = self.pending {
            self.queue(index)
                .map_err(|source| Error::Requeue { index, source })?;
            self.pending = None;
        }

        let v4l2_buf = self.dequeue().map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock => Error::NoDataYet,
            _ => Error::Dequeue(e),
        })?;

        let index = v4l2_buf.index;
        let buf = self.arena.get(index).ok_or(Error::UnknownBuffer(index))?;
        self.pending = Some(index);
        self.frames += 1;

        let len = self.image_size as usize;
        let data = buf.as_slice();
        let data = &data[..len.min(data.len())];
        let meta = Metadata {
            bytesused: v4l2_buf.bytesused,
            timestamp: v4l2_buf.timestamp.into(),
            sequence: v4l2_buf.sequence,
            frame: self.frames,
        };
        log::trace!("frame {} in buffer {}", self.frames, index);

        Ok(Frame::new(index, len, data, meta))
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }

    fn checked_out(&self) -> Option<u32> {
        self.pending
    }
}
