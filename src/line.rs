use std::{
    fs::File,
    os::fd::{BorrowedFd, IntoRawFd},
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    poll::{PollFd, PollFlags, PollTimeout},
};

use crate::errors::Result;

#[cfg(feature = "async-tokio")]
mod async_event;
mod decoder;
mod event;
mod handle;
mod info;
mod option_builder;
pub mod options;
pub mod set;
pub mod values;

#[cfg(feature = "async-tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
pub use async_event::AsyncLineEventHandle;
pub use decoder::EventStreamDecoder;
pub use event::{EventKind, LineEvent, LineEventHandle};
pub use handle::LineHandle;
pub use info::{LineChange, LineInfo, LineInfoChanged};
pub use set::{AsLineSet, LineSet};
pub use values::{AsValues, LineValue, LineValues};

#[cfg(test)]
pub(crate) use decoder::test::frame;

/// Close `file`, reporting what `close(2)` says instead of ignoring it
pub(crate) fn close_file(file: File) -> Result<()> {
    nix::unistd::close(file.into_raw_fd()).map_err(|e| std::io::Error::from(e).into())
}

/// Block until `fd` is readable or `timeout` passes; `None` waits forever.
pub(crate) fn wait_for_readable(fd: BorrowedFd<'_>, timeout: Option<Duration>) -> Result<bool> {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        // poll(2) takes milliseconds in a c_int, so long waits are sliced
        let slice = match deadline {
            None => PollTimeout::NONE,
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                PollTimeout::from(u16::try_from(left.as_millis()).unwrap_or(u16::MAX))
            }
        };

        match nix::poll::poll(&mut [PollFd::new(fd, PollFlags::POLLIN)], slice) {
            Ok(0) => {
                if deadline.map_or(false, |d| Instant::now() >= d) {
                    return Ok(false);
                }
            }
            Ok(_) => return Ok(true),
            Err(Errno::EINTR) => {}
            Err(e) => return Err(std::io::Error::from(e).into()),
        }
    }
}
