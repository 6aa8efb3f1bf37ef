//! Wrapper for asynchronous programming using Tokio.

use std::{
    fs::File,
    io::{ErrorKind, Read},
    os::fd::{AsFd, AsRawFd},
    pin::Pin,
    task::{Context, Poll},
};

use futures::{ready, Stream};
use log::{debug, trace, warn};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use tokio::io::unix::AsyncFd;

use crate::{
    errors::{Error, Misuse, Result},
    ioctl::{issue, Ioctl, Kernel},
    uapi::{Command, HandleData},
};

use super::{
    decoder::EventStreamDecoder,
    event::{LineEventHandle, READ_CHUNK},
    LineEvent, LineValue,
};

/// Wrapper around a [`LineEventHandle`] which implements a
/// [`futures::stream::Stream`] for edge events.
///
/// Events already decoded by the blocking handle carry over. Dropping the
/// stream closes the event fd.
///
/// # Example
///
/// The following example waits for state changes on an input line.
///
/// ```no_run
/// use futures::stream::StreamExt;
/// use gpio_cdev_v1::{line::options::EdgeDetect, Chip, LineOptions};
///
/// async fn print_events(line: u32) -> Result<(), gpio_cdev_v1::Error> {
///     let chip = Chip::open("/dev/gpiochip0")?;
///     let handle = chip.request_events(line, LineOptions::INPUT, EdgeDetect::Both, "gpioevents")?;
///     let mut events = handle.into_async()?;
///
///     while let Some(event) = events.next().await {
///         let event = event?;
///         println!("GPIO Event: {:?}", event);
///     }
///     Ok(())
/// }
/// ```
pub struct AsyncLineEventHandle<K: Ioctl = Kernel> {
    asyncfd: AsyncFd<File>,
    kernel: K,
    offset: u32,
    decoder: EventStreamDecoder,
    finished: bool,
}

impl<K: Ioctl> AsyncLineEventHandle<K> {
    pub(crate) fn new(handle: LineEventHandle<K>) -> Result<Self> {
        let LineEventHandle {
            file,
            kernel,
            offset,
            decoder,
            finished,
            ..
        } = handle;
        let file = file.ok_or(Misuse::Released("line event handle"))?;

        // The file descriptor needs to be configured for non-blocking I/O for
        // the readiness events tokio relies on.
        let flags = fcntl(file.as_raw_fd(), FcntlArg::F_GETFL).map_err(std::io::Error::from)?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(file.as_raw_fd(), FcntlArg::F_SETFL(flags)).map_err(std::io::Error::from)?;

        debug!("event handle for line {offset} switched to async");
        Ok(Self {
            asyncfd: AsyncFd::new(file)?,
            kernel,
            offset,
            decoder,
            finished,
        })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Current value of the line
    pub fn get_value(&self) -> Result<LineValue> {
        let data = issue(
            &self.kernel,
            self.asyncfd.get_ref().as_fd(),
            Command::GetLineValues,
            &HandleData::zeroed(),
        )?;
        Ok(data.values[0].into())
    }
}

impl<K: Ioctl + Unpin> Stream for AsyncLineEventHandle<K> {
    type Item = Result<LineEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let mut buf = [0; READ_CHUNK];

        loop {
            if let Some(event) = this.decoder.next_event() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            let mut guard = match ready!(this.asyncfd.poll_read_ready(cx)) {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("event stream for line {} failed: {e}", this.offset);
                    this.finished = true;
                    return Poll::Ready(Some(Err(Error::Stream(e))));
                }
            };

            match guard.try_io(|inner| {
                let mut file = inner.get_ref();
                file.read(&mut buf)
            }) {
                Ok(Ok(0)) => {
                    debug!("event stream for line {} closed", this.offset);
                    this.finished = true;
                }
                Ok(Ok(n)) => {
                    let ready = this.decoder.feed(&buf[..n]);
                    trace!("line {}: read {n} bytes, {ready} events", this.offset);
                }
                Ok(Err(e)) if e.kind() == ErrorKind::Interrupted => {}
                Ok(Err(e)) => {
                    warn!("event stream for line {} failed: {e}", this.offset);
                    this.finished = true;
                    return Poll::Ready(Some(Err(Error::Stream(e))));
                }
                // spurious readiness, poll again
                Err(_would_block) => {}
            }
        }
    }
}

impl<K: Ioctl> std::fmt::Debug for AsyncLineEventHandle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLineEventHandle")
            .field("fd", &self.asyncfd.get_ref())
            .field("offset", &self.offset)
            .field("pending", &self.decoder.pending())
            .finish()
    }
}
