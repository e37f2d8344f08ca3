use std::os::unix::io::RawFd;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::{io, time::Duration};

use crate::backend::{Backend, Kernel};
use crate::capability::{self, Capabilities};
use crate::config::CaptureParams;
use crate::control::{self, Control};
use crate::crop;
use crate::error::{BestEffort, Error, Result};
use crate::format::{self, Format};
use crate::io::mmap::{Arena, Frame, Stream};
use crate::io::traits::{CaptureStream, Stream as StreamTrait};
use crate::parameters::{self, Parameters};
use crate::v4l2;

/// Number of buffers requested from the driver
pub const BUFFER_COUNT: u32 = 4;

/// Capabilities a node must advertise to be used for streaming capture
pub const REQUIRED_CAPABILITIES: capability::Flags =
    capability::Flags::VIDEO_CAPTURE.union(capability::Flags::STREAMING);

/// Input selected after format negotiation, where the driver has one
const CAPTURE_INPUT: i32 = 1;

/// Open descriptor of a video device node
///
/// Every request issued through a handle is retried transparently when interrupted by a signal.
/// Closing is idempotent; requests on a closed handle fail with `EBADF`.
pub struct Handle {
    fd: AtomicI32,
    backend: Arc<dyn Backend>,
}

impl Handle {
    pub(crate) fn new(fd: RawFd, backend: Arc<dyn Backend>) -> Self {
        Handle {
            fd: AtomicI32::new(fd),
            backend,
        }
    }

    /// Returns the raw file descriptor, or -1 once closed
    pub fn fd(&self) -> RawFd {
        self.fd.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.fd() < 0
    }

    fn open_fd(&self) -> io::Result<RawFd> {
        match self.fd() {
            fd if fd < 0 => Err(io::Error::from_raw_os_error(libc::EBADF)),
            fd => Ok(fd),
        }
    }

    /// Issues a device control request
    ///
    /// # Safety
    ///
    /// `T` must be the argument type `request` was computed for.
    pub(crate) unsafe fn ioctl<T>(
        &self,
        request: v4l2::vidioc::_IOC_TYPE,
        arg: &mut T,
    ) -> io::Result<()> {
        let fd = self.open_fd()?;
        let argp = arg as *mut T as *mut std::os::raw::c_void;

        let res = v4l2::retry_interrupted(|| unsafe { self.backend.ioctl(fd, request, argp) });
        if let Err(e) = &res {
            log::trace!("{} failed: {}", v4l2::vidioc::name(request), e);
        }
        res
    }

    /// Maps a driver buffer into the address space of this process
    ///
    /// # Safety
    ///
    /// `length` and `offset` must be the values the driver reported for one of its buffers.
    pub(crate) unsafe fn mmap(&self, length: usize, offset: libc::off_t) -> io::Result<NonNull<u8>> {
        let fd = self.open_fd()?;
        let ptr = self.backend.mmap(fd, length, offset)?;
        NonNull::new(ptr as *mut u8).ok_or_else(|| io::Error::from_raw_os_error(libc::EFAULT))
    }

    /// # Safety
    ///
    /// The region must have been returned by [`Handle::mmap`] and must not be used afterwards.
    pub(crate) unsafe fn munmap(&self, ptr: NonNull<u8>, length: usize) -> io::Result<()> {
        self.backend.munmap(ptr.as_ptr() as *mut std::os::raw::c_void, length)
    }

    /// Waits for a filled buffer; `Ok(false)` when `timeout` elapsed first
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let fd = self.open_fd()?;
        self.backend.wait_readable(fd, timeout)
    }

    /// Releases the descriptor; later calls do nothing
    pub fn close(&self) -> io::Result<()> {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd < 0 {
            return Ok(());
        }

        self.backend.close(fd)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close device: {}", e);
        }
    }
}

fn select_input(handle: &Handle, index: i32) -> io::Result<()> {
    let mut input = index as std::os::raw::c_int;
    unsafe { handle.ioctl(v4l2::vidioc::VIDIOC_S_INPUT, &mut input) }
}

/// Memory-mapped capture session on a video4linux node
///
/// Opening a device negotiates the format and frame rate and maps the buffer pool. Frames are
/// pulled through [`CaptureStream`] after [`Stream::start`](crate::io::traits::Stream::start).
///
/// # Example
///
/// ```no_run
/// use v4lcap::prelude::*;
/// use v4lcap::{CaptureParams, Device};
///
/// let mut dev = Device::open(CaptureParams::default())?;
/// dev.start()?;
/// let frame = dev.pull()?;
/// println!("frame {} has {} bytes", frame.meta().frame, frame.len());
/// # Ok::<(), v4lcap::Error>(())
/// ```
pub struct Device {
    handle: Arc<Handle>,
    params: CaptureParams,
    caps: Capabilities,
    format: Format,
    parameters: Parameters,
    image_size: u32,
    stream: Option<Stream>,
}

impl Device {
    /// Opens the node named in `params` and prepares it for streaming
    pub fn open(params: CaptureParams) -> Result<Self> {
        Self::with_backend(params, Arc::new(Kernel))
    }

    /// Same as [`Device::open`], against an arbitrary backend
    pub fn with_backend(params: CaptureParams, backend: Arc<dyn Backend>) -> Result<Self> {
        params.validate()?;

        let path = params.path.clone();
        match backend.is_char_device(&path) {
            Ok(true) => {}
            Ok(false) => return Err(Error::NotCharDevice { path }),
            Err(source) => return Err(Error::Stat { path, source }),
        }

        let fd = backend
            .open(&path, libc::O_RDWR | libc::O_NONBLOCK)
            .map_err(|source| Error::Open {
                path: path.clone(),
                source,
            })?;
        let handle = Arc::new(Handle::new(fd, backend));

        let caps = capability::query(&handle).map_err(Error::QueryCaps)?;
        let missing = caps.missing(REQUIRED_CAPABILITIES);
        if !missing.is_empty() {
            return Err(Error::MissingCapability(missing));
        }
        log::debug!("{}: {} ({})", path.display(), caps.card, caps.driver);

        crop::reset_to_default(&handle);

        let granted = format::negotiate(&handle, &params)?;
        let image_size = granted.size;
        let format = granted.normalized();

        let parameters = parameters::apply(&handle, &Parameters::with_fps(params.fps))
            .map_err(Error::SetParams)?;
        log::debug!("frame interval {} [s]", parameters.interval);

        BestEffort::attempt("input selection", select_input(&handle, CAPTURE_INPUT));

        let arena = Arena::allocate(Arc::clone(&handle), BUFFER_COUNT)?;
        let stream = Stream::new(Arc::clone(&handle), arena, image_size);

        log::info!(
            "opened {}: {}x{} {}, {} buffers, {} bytes per image",
            path.display(),
            format.width,
            format.height,
            format.fourcc,
            stream.buffer_count(),
            image_size
        );

        Ok(Device {
            handle,
            params,
            caps,
            format,
            parameters,
            image_size,
            stream: Some(stream),
        })
    }

    /// Stops streaming, unmaps the buffer pool and closes the node
    ///
    /// Calling this more than once is harmless.
    pub fn close(&mut self) {
        drop(self.stream.take());

        if self.handle.is_closed() {
            return;
        }
        match self.handle.close() {
            Ok(()) => log::info!("closed {}", self.params.path.display()),
            Err(e) => log::warn!("failed to close {}: {}", self.params.path.display(), e),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn path(&self) -> &Path {
        &self.params.path
    }

    /// Parameters the session was opened with
    pub fn params(&self) -> &CaptureParams {
        &self.params
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Negotiated format, stride and size raised to their floors
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Capture parameters as applied by the driver
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Image size in bytes as reported by the driver
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Number of mapped buffers, zero once closed
    pub fn buffer_count(&self) -> usize {
        self.stream.as_ref().map_or(0, |stream| stream.buffer_count())
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().map_or(false, |stream| stream.is_active())
    }

    /// Returns the valid range of a control
    pub fn query_control(&self, ctrl: Control) -> io::Result<control::Description> {
        control::query(&self.handle, ctrl)
    }

    /// Returns the current value of a control
    pub fn control(&self, ctrl: Control) -> io::Result<i32> {
        control::get(&self.handle, ctrl)
    }

    /// Sets a control; the driver rejects values outside the range
    pub fn set_control(&self, ctrl: Control, value: i32) -> io::Result<()> {
        control::set(&self.handle, ctrl, value)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}

impl StreamTrait for Device {
    fn start(&mut self) -> Result<()> {
        self.stream.as_mut().ok_or(Error::Closed)?.start()
    }

    fn stop(&mut self) -> BestEffort {
        match self.stream.as_mut() {
            Some(stream) => stream.stop(),
            None => BestEffort::Applied,
        }
    }
}

impl CaptureStream for Device {
    fn pull_timeout(&mut self, timeout: Duration) -> Result<Frame<'_>> {
        self.stream.as_mut().ok_or(Error::Closed)?.pull_timeout(timeout)
    }

    fn frame_count(&self) -> u64 {
        self.stream.as_ref().map_or(0, |stream| stream.frame_count())
    }

    fn checked_out(&self) -> Option<u32> {
        self.stream.as_ref().and_then(|stream| stream.checked_out())
    }
}
