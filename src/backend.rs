use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::{fs, io, ptr, time::Duration};

use crate::poll;
use crate::v4l2;

/// Kernel-facing primitives a capture session runs against
///
/// Every device interaction of this crate goes through one of these methods. [`Kernel`] is the
/// real thing; tests substitute a scripted driver.
pub trait Backend: Send + Sync {
    /// Whether `path` names a character special file
    fn is_char_device(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(path)?.file_type().is_char_device())
    }

    /// Opens the node and returns its raw descriptor
    fn open(&self, path: &Path, flags: i32) -> io::Result<RawFd>;

    /// Releases a descriptor returned by [`Backend::open`]
    fn close(&self, fd: RawFd) -> io::Result<()>;

    /// Issues a single device control request
    ///
    /// # Safety
    ///
    /// `argp` must point to the argument type `request` was computed for.
    unsafe fn ioctl(
        &self,
        fd: RawFd,
        request: v4l2::vidioc::_IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> io::Result<()>;

    /// Maps `length` bytes of driver memory at `offset` for shared read/write access
    ///
    /// # Safety
    ///
    /// The returned region is only valid until it is passed to [`Backend::munmap`].
    unsafe fn mmap(
        &self,
        fd: RawFd,
        length: usize,
        offset: libc::off_t,
    ) -> io::Result<*mut std::os::raw::c_void>;

    /// Unmaps a region returned by [`Backend::mmap`]
    ///
    /// # Safety
    ///
    /// `start` and `length` must describe a live mapping; it must not be accessed afterwards.
    unsafe fn munmap(&self, start: *mut std::os::raw::c_void, length: usize) -> io::Result<()>;

    /// Blocks until `fd` is readable; `Ok(false)` when `timeout` elapsed first
    fn wait_readable(&self, fd: RawFd, timeout: Duration) -> io::Result<bool>;
}

/// The host kernel, reached through plain system calls
#[derive(Debug, Default, Clone, Copy)]
pub struct Kernel;

impl Backend for Kernel {
    fn open(&self, path: &Path, flags: i32) -> io::Result<RawFd> {
        v4l2::open(path, flags)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        v4l2::close(fd)
    }

    unsafe fn ioctl(
        &self,
        fd: RawFd,
        request: v4l2::vidioc::_IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> io::Result<()> {
        v4l2::ioctl(fd, request, argp)
    }

    unsafe fn mmap(
        &self,
        fd: RawFd,
        length: usize,
        offset: libc::off_t,
    ) -> io::Result<*mut std::os::raw::c_void> {
        v4l2::mmap(
            ptr::null_mut(),
            length,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            offset,
        )
    }

    unsafe fn munmap(&self, start: *mut std::os::raw::c_void, length: usize) -> io::Result<()> {
        v4l2::munmap(start, length)
    }

    fn wait_readable(&self, fd: RawFd, timeout: Duration) -> io::Result<bool> {
        poll::wait_readable(fd, timeout)
    }
}
