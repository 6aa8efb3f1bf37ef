//! Issuing control operations against chip and request file descriptors.

use std::os::fd::{AsRawFd, BorrowedFd};

use log::{debug, trace};
use nix::errno::Errno;

use crate::{
    codec::{LayoutError, Record},
    errors::{Error, Result},
    uapi::Command,
};

#[cfg(test)]
pub(crate) mod mock;

/// The raw `ioctl(2)` primitive
///
/// [`Kernel`] is the real system call. Other implementations stand in for
/// the kernel, e.g. to exercise request handling without GPIO hardware.
pub trait Ioctl {
    /// Perform `request` on `fd` with `buf` as its in/out argument.
    ///
    /// # Safety
    ///
    /// `buf` must be exactly as long as the argument size encoded in
    /// `request`, since the kernel reads and writes that many bytes.
    unsafe fn ioctl(
        &self,
        fd: BorrowedFd<'_>,
        request: u32,
        buf: &mut [u8],
    ) -> nix::Result<libc::c_int>;
}

/// `ioctl(2)` on the running kernel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Kernel;

impl Ioctl for Kernel {
    unsafe fn ioctl(
        &self,
        fd: BorrowedFd<'_>,
        request: u32,
        buf: &mut [u8],
    ) -> nix::Result<libc::c_int> {
        // SAFETY: upheld by the caller
        let res = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, buf.as_mut_ptr()) };
        Errno::result(res)
    }
}

/// Issue `command` on `fd` with an already encoded argument.
///
/// The buffer is updated in place with whatever the kernel writes back. A
/// negative return is surfaced as [`Error::CommandRejected`]; nothing is
/// retried.
pub fn issue_raw<K: Ioctl + ?Sized>(
    kernel: &K,
    fd: BorrowedFd<'_>,
    command: Command,
    buf: &mut [u8],
) -> Result<()> {
    if buf.len() != command.arg_size() {
        return Err(LayoutError {
            record: command.name(),
            expected: command.arg_size(),
            actual: buf.len(),
        }
        .into());
    }

    trace!("{command} on fd {}", fd.as_raw_fd());

    // SAFETY: the buffer length matches the size encoded in the request code
    let res = unsafe { kernel.ioctl(fd, command.code(), buf) };
    match res {
        Ok(ret) if ret >= 0 => Ok(()),
        Ok(_) => Err(rejected(command, fd, Errno::UnknownErrno)),
        Err(errno) => Err(rejected(command, fd, errno)),
    }
}

/// Encode `record`, issue `command` with it and decode what the kernel wrote back.
pub fn issue<K: Ioctl + ?Sized, R: Record>(
    kernel: &K,
    fd: BorrowedFd<'_>,
    command: Command,
    record: &R,
) -> Result<R> {
    let mut buf = record.encode()?;
    issue_raw(kernel, fd, command, &mut buf)?;
    Ok(R::decode(&buf)?)
}

fn rejected(command: Command, fd: BorrowedFd<'_>, errno: Errno) -> Error {
    debug!("{command} on fd {} rejected: {errno}", fd.as_raw_fd());
    Error::CommandRejected {
        command,
        source: errno,
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, fs::File, os::fd::AsFd};

    use super::*;
    use crate::uapi::HandleData;

    /// Echoes a fixed return value and records what it was handed
    struct Scripted {
        ret: nix::Result<libc::c_int>,
        seen: RefCell<Vec<(u32, usize)>>,
    }

    impl Ioctl for Scripted {
        unsafe fn ioctl(
            &self,
            _fd: BorrowedFd<'_>,
            request: u32,
            buf: &mut [u8],
        ) -> nix::Result<libc::c_int> {
            self.seen.borrow_mut().push((request, buf.len()));
            buf[0] = 1;
            self.ret
        }
    }

    fn scripted(ret: nix::Result<libc::c_int>) -> Scripted {
        Scripted {
            ret,
            seen: RefCell::new(Vec::new()),
        }
    }

    fn devnull() -> File {
        File::open("/dev/null").unwrap()
    }

    #[test]
    fn updates_buffer_in_place() {
        let k = scripted(Ok(0));
        let f = devnull();
        let data = issue(&k, f.as_fd(), Command::GetLineValues, &HandleData::zeroed()).unwrap();
        assert_eq!(data.values[0], 1);
        assert_eq!(
            *k.seen.borrow(),
            vec![(Command::GetLineValues.code(), 64)]
        );
    }

    #[test]
    fn errno_is_rejection() {
        let k = scripted(Err(Errno::EBUSY));
        let f = devnull();
        let err = issue(&k, f.as_fd(), Command::SetLineValues, &HandleData::zeroed()).unwrap_err();
        assert!(matches!(
            err,
            Error::CommandRejected {
                command: Command::SetLineValues,
                source: Errno::EBUSY
            }
        ));
        assert_eq!(err.errno(), Some(Errno::EBUSY));
    }

    #[test]
    fn negative_return_is_rejection() {
        let k = scripted(Ok(-3));
        let f = devnull();
        let mut buf = [0; 64];
        let err = issue_raw(&k, f.as_fd(), Command::GetLineValues, &mut buf).unwrap_err();
        assert!(matches!(err, Error::CommandRejected { .. }));
    }

    #[test]
    fn wrong_buffer_size_never_reaches_kernel() {
        let k = scripted(Ok(0));
        let f = devnull();
        let mut buf = [0; 63];
        let err = issue_raw(&k, f.as_fd(), Command::GetLineValues, &mut buf).unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
        assert!(k.seen.borrow().is_empty());
    }

    #[test]
    fn real_kernel_rejects_non_gpio_fd() {
        let f = devnull();
        let mut buf = [0; 64];
        let err = issue_raw(&Kernel, f.as_fd(), Command::GetLineValues, &mut buf).unwrap_err();
        assert!(matches!(err, Error::CommandRejected { .. }));
    }
}
