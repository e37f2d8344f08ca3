use std::os::unix::io::RawFd;
use std::{io, time};

/// Converts `timeout` to the millisecond argument of `poll(2)`, saturating at `c_int::MAX`
///
/// A non-zero timeout below one millisecond is rounded up so it still blocks.
pub fn timeout_millis(timeout: time::Duration) -> libc::c_int {
    let millis = timeout.as_millis();
    if millis == 0 && !timeout.is_zero() {
        return 1;
    }

    millis.min(libc::c_int::MAX as u128) as libc::c_int
}

/// Blocks until `fd` is readable or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. A wait interrupted by a signal is reported as an error and
/// not restarted.
pub fn wait_readable(fd: RawFd, timeout: time::Duration) -> io::Result<bool> {
    if fd < 0 {
        return Err(io::Error::from_raw_os_error(libc::EBADF));
    }

    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    match unsafe { libc::poll(&mut pollfd, 1, timeout_millis(timeout)) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ if pollfd.revents & libc::POLLNVAL != 0 => Err(io::Error::from_raw_os_error(libc::EBADF)),
        _ => Ok(true),
    }
}
