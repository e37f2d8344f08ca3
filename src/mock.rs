//! Scripted capture driver for unit tests
//!
//! Decodes every request the crate issues, owns the memory it hands out through `mmap` and keeps
//! a driver-side buffer queue, so the whole capture protocol runs in process.

use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::{io, ptr, time::Duration};

use crate::backend::Backend;
use crate::capability;
use crate::control::Control;
use crate::memory::Memory;
use crate::v4l2::vidioc::*;
use crate::v4l_sys::*;

const PAGE_SIZE: usize = 4096;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Node {
    CharDevice,
    Regular,
    Missing,
}

/// Outcome of one readiness wait
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Wait {
    Ready,
    Elapsed,
    Fail(i32),
}

#[derive(Debug, Clone)]
pub struct Ctrl {
    pub name: &'static str,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default: i32,
    pub value: i32,
}

impl Ctrl {
    fn new(name: &'static str, minimum: i32, maximum: i32, default: i32) -> Self {
        Ctrl {
            name,
            minimum,
            maximum,
            step: 1,
            default,
            value: default,
        }
    }
}

struct Slot {
    ptr: *mut u8,
    len: usize,
    mapped: bool,
}

pub struct State {
    pub node: Node,
    pub fail_open: Option<i32>,
    pub open_flags: Option<i32>,
    pub closed: usize,

    pub caps: capability::Flags,
    /// Resolution granted regardless of the request
    pub grant: Option<(u32, u32)>,
    pub reported_stride: Option<u32>,
    pub reported_size: Option<u32>,
    pub field: Option<u32>,
    pub fourcc: Option<u32>,
    pub crop: Option<(u32, u32)>,
    pub interval: Option<(u32, u32)>,
    pub capture_mode: Option<u32>,
    pub input: Option<i32>,

    pub max_buffers: u32,
    pub buffer_len: usize,
    pub requested_buffers: Option<u32>,
    pub fail_mmap_at: Option<(u32, i32)>,
    pub unmapped: usize,
    slots: Vec<Slot>,

    pub queue: VecDeque<u32>,
    pub streaming: bool,
    pub sequence: u32,
    /// DQBUF finds nothing even if buffers are queued
    pub hold_back: bool,
    /// Index DQBUF reports instead of the real one
    pub bogus_index: Option<u32>,

    pub script: VecDeque<Wait>,
    pub waits: Vec<Duration>,

    pub controls: HashMap<u32, Ctrl>,

    /// Number of requests to fail with EINTR before handling them
    pub interrupts: u32,
    failures: Vec<(_IOC_TYPE, Option<u32>, i32)>,
    pub requests: Vec<_IOC_TYPE>,
}

// The slots point to heap memory owned by this state.
unsafe impl Send for State {}

impl State {
    /// Fails every `request` with `errno`
    pub fn fail(&mut self, request: _IOC_TYPE, errno: i32) {
        self.failures.push((request, None, errno));
    }

    /// Fails `request` on buffer `index` with `errno`
    pub fn fail_at(&mut self, request: _IOC_TYPE, index: u32, errno: i32) {
        self.failures.push((request, Some(index), errno));
    }

    pub fn live_mappings(&self) -> usize {
        self.slots.iter().filter(|slot| slot.mapped).count()
    }

    fn check(&self, request: _IOC_TYPE, index: Option<u32>) -> io::Result<()> {
        let failure = self.failures.iter().find(|(req, at, _)| {
            *req == request && (at.is_none() || *at == index)
        });
        match failure {
            Some((_, _, errno)) => Err(io::Error::from_raw_os_error(*errno)),
            None => Ok(()),
        }
    }

    fn free_slots(&mut self) {
        for slot in self.slots.drain(..) {
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(slot.ptr, slot.len)));
            }
        }
    }

    unsafe fn handle(&mut self, request: _IOC_TYPE, argp: *mut std::os::raw::c_void) -> io::Result<()> {
        match request {
            VIDIOC_QUERYCAP => {
                self.check(request, None)?;
                let cap = &mut *(argp as *mut v4l2_capability);
                copy_str(&mut cap.driver, "mock");
                copy_str(&mut cap.card, "Mock Camera");
                copy_str(&mut cap.bus_info, "platform:mock");
                cap.version = (6 << 16) | (1 << 8);
                cap.capabilities = (self.caps | capability::Flags::DEVICE_CAPS).bits();
                cap.device_caps = self.caps.bits();
            }
            VIDIOC_CROPCAP => {
                self.check(request, None)?;
                let cropcap = &mut *(argp as *mut v4l2_cropcap);
                let rect = v4l2_rect {
                    left: 0,
                    top: 0,
                    width: 640,
                    height: 480,
                };
                cropcap.bounds = rect;
                cropcap.defrect = rect;
            }
            VIDIOC_S_CROP => {
                self.check(request, None)?;
                let crop = &*(argp as *const v4l2_crop);
                self.crop = Some((crop.c.width, crop.c.height));
            }
            VIDIOC_S_FMT => {
                self.check(request, None)?;
                let fmt = &mut *(argp as *mut v4l2_format);
                let mut pix = fmt.fmt.pix;
                let (width, height) = self.grant.unwrap_or((pix.width, pix.height));
                pix.width = width;
                pix.height = height;
                pix.bytesperline = self.reported_stride.unwrap_or(width * 2);
                pix.sizeimage = self
                    .reported_size
                    .unwrap_or(pix.bytesperline * height);
                self.field = Some(pix.field);
                self.fourcc = Some(pix.pixelformat);
                self.buffer_len = pix.sizeimage as usize;
                fmt.fmt.pix = pix;
            }
            VIDIOC_S_PARM => {
                self.check(request, None)?;
                let parm = &mut *(argp as *mut v4l2_streamparm);
                let mut capture = parm.parm.capture;
                self.capture_mode = Some(capture.capturemode);
                self.interval = Some((
                    capture.timeperframe.numerator,
                    capture.timeperframe.denominator,
                ));
                capture.capability = 0x1000;
                parm.parm.capture = capture;
            }
            VIDIOC_S_INPUT => {
                self.check(request, None)?;
                self.input = Some(*(argp as *const std::os::raw::c_int));
            }
            VIDIOC_REQBUFS => {
                self.check(request, None)?;
                let req = &mut *(argp as *mut v4l2_requestbuffers);
                if req.memory != Memory::Mmap as u32 {
                    return Err(io::Error::from_raw_os_error(libc::EINVAL));
                }
                if self.live_mappings() > 0 {
                    return Err(io::Error::from_raw_os_error(libc::EBUSY));
                }

                self.free_slots();
                self.queue.clear();
                self.streaming = false;
                self.requested_buffers = Some(req.count);

                let granted = req.count.min(self.max_buffers);
                for _ in 0..granted {
                    let mem = vec![0u8; self.buffer_len].into_boxed_slice();
                    let len = mem.len();
                    let ptr = Box::into_raw(mem) as *mut u8;
                    self.slots.push(Slot {
                        ptr,
                        len,
                        mapped: false,
                    });
                }
                req.count = granted;
            }
            VIDIOC_QUERYBUF => {
                let buf = &mut *(argp as *mut v4l2_buffer);
                self.check(request, Some(buf.index))?;
                let slot = self.slot(buf.index)?;
                buf.length = slot.len as u32;
                buf.m.offset = buf.index * PAGE_SIZE as u32;
            }
            VIDIOC_QBUF => {
                let buf = &mut *(argp as *mut v4l2_buffer);
                self.check(request, Some(buf.index))?;
                self.slot(buf.index)?;
                if self.queue.contains(&buf.index) {
                    return Err(io::Error::from_raw_os_error(libc::EINVAL));
                }
                self.queue.push_back(buf.index);
            }
            VIDIOC_DQBUF => {
                self.check(request, None)?;
                if !self.streaming {
                    return Err(io::Error::from_raw_os_error(libc::EINVAL));
                }
                if self.hold_back {
                    return Err(io::Error::from_raw_os_error(libc::EAGAIN));
                }
                let index = self
                    .queue
                    .pop_front()
                    .ok_or_else(|| io::Error::from_raw_os_error(libc::EAGAIN))?;

                let sequence = self.sequence;
                self.sequence += 1;
                let slot = self.slot(index)?;
                let len = slot.len;
                ptr::write_bytes(slot.ptr, (sequence + 1) as u8, len);

                let buf = &mut *(argp as *mut v4l2_buffer);
                buf.index = self.bogus_index.unwrap_or(index);
                buf.bytesused = len as u32;
                buf.sequence = sequence;
                buf.timestamp.tv_sec = sequence as _;
                buf.timestamp.tv_usec = 0;
            }
            VIDIOC_STREAMON => {
                self.check(request, None)?;
                if self.slots.is_empty() {
                    return Err(io::Error::from_raw_os_error(libc::EINVAL));
                }
                self.streaming = true;
            }
            VIDIOC_STREAMOFF => {
                self.check(request, None)?;
                self.streaming = false;
                self.queue.clear();
            }
            VIDIOC_QUERYCTRL => {
                self.check(request, None)?;
                let query = &mut *(argp as *mut v4l2_queryctrl);
                let ctrl = self.control(query.id)?;
                copy_str(&mut query.name, ctrl.name);
                query.type_ = 1;
                query.minimum = ctrl.minimum;
                query.maximum = ctrl.maximum;
                query.step = ctrl.step;
                query.default_value = ctrl.default;
                query.flags = 0x0020;
            }
            VIDIOC_G_CTRL => {
                self.check(request, None)?;
                let arg = &mut *(argp as *mut v4l2_control);
                arg.value = self.control(arg.id)?.value;
            }
            VIDIOC_S_CTRL => {
                self.check(request, None)?;
                let arg = &mut *(argp as *mut v4l2_control);
                let ctrl = self
                    .controls
                    .get_mut(&arg.id)
                    .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
                if arg.value < ctrl.minimum || arg.value > ctrl.maximum {
                    return Err(io::Error::from_raw_os_error(libc::ERANGE));
                }
                ctrl.value = arg.value;
            }
            _ => return Err(io::Error::from_raw_os_error(libc::ENOTTY)),
        }

        Ok(())
    }

    fn slot(&self, index: u32) -> io::Result<&Slot> {
        self.slots
            .get(index as usize)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
    }

    fn control(&self, id: u32) -> io::Result<&Ctrl> {
        self.controls
            .get(&id)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.free_slots();
    }
}

fn copy_str(dst: &mut [u8], src: &str) {
    let n = src.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
    dst[n] = 0;
}

pub struct MockDriver {
    state: Mutex<State>,
}

impl MockDriver {
    pub const FD: RawFd = 42;

    /// A 640x480 YUYV camera with four buffers and the three image controls
    pub fn new() -> Arc<Self> {
        let mut controls = HashMap::new();
        controls.insert(Control::Brightness.id(), Ctrl::new("Brightness", 0, 255, 128));
        controls.insert(Control::Contrast.id(), Ctrl::new("Contrast", 0, 127, 64));
        controls.insert(Control::Saturation.id(), Ctrl::new("Saturation", -50, 50, 0));

        let state = State {
            node: Node::CharDevice,
            fail_open: None,
            open_flags: None,
            closed: 0,
            caps: capability::Flags::VIDEO_CAPTURE
                | capability::Flags::READ_WRITE
                | capability::Flags::STREAMING,
            grant: None,
            reported_stride: None,
            reported_size: None,
            field: None,
            fourcc: None,
            crop: None,
            interval: None,
            capture_mode: None,
            input: None,
            max_buffers: 32,
            buffer_len: 640 * 2 * 480,
            requested_buffers: None,
            fail_mmap_at: None,
            unmapped: 0,
            slots: Vec::new(),
            queue: VecDeque::new(),
            streaming: false,
            sequence: 0,
            hold_back: false,
            bogus_index: None,
            script: VecDeque::new(),
            waits: Vec::new(),
            controls,
            interrupts: 0,
            failures: Vec::new(),
            requests: Vec::new(),
        };

        Arc::new(MockDriver {
            state: Mutex::new(state),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Requests handled so far, interrupted attempts excluded
    pub fn requests(&self) -> Vec<_IOC_TYPE> {
        self.state().requests.clone()
    }
}

impl Backend for MockDriver {
    fn is_char_device(&self, path: &Path) -> io::Result<bool> {
        match self.state().node {
            Node::CharDevice => Ok(true),
            Node::Regular => Ok(false),
            Node::Missing => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }

    fn open(&self, _path: &Path, flags: i32) -> io::Result<RawFd> {
        let mut state = self.state();
        if let Some(errno) = state.fail_open {
            return Err(io::Error::from_raw_os_error(errno));
        }
        state.open_flags = Some(flags);
        Ok(Self::FD)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        if fd != Self::FD {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        self.state().closed += 1;
        Ok(())
    }

    unsafe fn ioctl(
        &self,
        fd: RawFd,
        request: _IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> io::Result<()> {
        let mut state = self.state();
        if fd != Self::FD || state.closed > 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        if state.interrupts > 0 {
            state.interrupts -= 1;
            return Err(io::Error::from_raw_os_error(libc::EINTR));
        }

        state.requests.push(request);
        state.handle(request, argp)
    }

    unsafe fn mmap(
        &self,
        _fd: RawFd,
        length: usize,
        offset: libc::off_t,
    ) -> io::Result<*mut std::os::raw::c_void> {
        let mut state = self.state();
        let index = (offset as usize / PAGE_SIZE) as u32;
        if let Some((at, errno)) = state.fail_mmap_at {
            if at == index {
                return Err(io::Error::from_raw_os_error(errno));
            }
        }

        let slot = state
            .slots
            .get_mut(index as usize)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        if length > slot.len {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        slot.mapped = true;
        Ok(slot.ptr as *mut std::os::raw::c_void)
    }

    unsafe fn munmap(&self, start: *mut std::os::raw::c_void, _length: usize) -> io::Result<()> {
        let mut state = self.state();
        let slot = state
            .slots
            .iter_mut()
            .find(|slot| slot.mapped && slot.ptr as *mut std::os::raw::c_void == start)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        slot.mapped = false;
        state.unmapped += 1;
        Ok(())
    }

    fn wait_readable(&self, _fd: RawFd, timeout: Duration) -> io::Result<bool> {
        let mut state = self.state();
        state.waits.push(timeout);
        match state.script.pop_front().unwrap_or(Wait::Ready) {
            Wait::Ready => Ok(true),
            Wait::Elapsed => Ok(false),
            Wait::Fail(errno) => Err(io::Error::from_raw_os_error(errno)),
        }
    }
}
