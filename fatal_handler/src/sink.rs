//! Unbuffered file-descriptor sink for the crash path

use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, RawFd};

/// `Write` adapter that issues one `write(2)` per call on a raw descriptor.
///
/// No buffering, no allocation and no locking, unlike `std::io::Stderr`,
/// which takes a reentrant mutex that the crashing thread may already hold.
/// `write(2)` is async-signal-safe, so the sink can be used from a signal
/// handler.
///
/// The sink does not own the descriptor and never closes it.
#[derive(Debug, Clone, Copy)]
pub struct FdSink {
    fd: RawFd,
}

impl FdSink {
    /// Wrap an already open descriptor.
    pub const fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    /// Standard error.
    pub const fn stderr() -> Self {
        Self::new(libc::STDERR_FILENO)
    }

    /// Standard output.
    pub const fn stdout() -> Self {
        Self::new(libc::STDOUT_FILENO)
    }

    /// Sink writing to `file`. The file must stay open while the sink is used.
    pub fn borrowing(file: &impl AsRawFd) -> Self {
        Self::new(file.as_raw_fd())
    }
}

impl Write for FdSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            // SAFETY: `buf` is valid for `buf.len()` bytes.
            let n = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
