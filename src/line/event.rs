use std::{
    fs::File,
    io::{ErrorKind, Read},
    os::fd::{AsFd, BorrowedFd},
    time::Duration,
};

use bstr::BStr;
use log::{debug, trace, warn};

use crate::{
    codec::{EncodingError, FieldReader, FieldWriter, Layout, Record},
    errors::{Error, Misuse, Result},
    fixed_str::FixedStr,
    ioctl::{issue, Ioctl, Kernel},
    uapi::{
        layout, Command, EventRequest, EventRequestFlags, HandleData, HandleFlags,
        GPIOEVENT_EVENT_FALLING_EDGE, GPIOEVENT_EVENT_RISING_EDGE, GPIO_MAX_NAME_SIZE,
    },
};

use super::{close_file, decoder::EventStreamDecoder, wait_for_readable, LineValue};

/// Bytes asked for per `read(2)` on an event fd
pub(crate) const READ_CHUNK: usize = layout::EVENT_FRAME_SIZE * 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Rising,
    Falling,
}

/// An edge event read from an event fd (`struct gpioevent_data`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineEvent {
    timestamp: u64,
    id: u32,
}

impl LineEvent {
    pub(crate) const fn new(timestamp: u64, id: u32) -> Self {
        Self { timestamp, id }
    }

    /// Best estimate of time of event occurrence, in nanoseconds.
    ///
    /// On kernels before 5.7 this is `CLOCK_REALTIME`, later ones use
    /// `CLOCK_MONOTONIC`.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Raw edge id as sent by the kernel
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Which edge this was, `None` for an id the kernel never sends
    pub fn kind(&self) -> Option<EventKind> {
        match self.id {
            GPIOEVENT_EVENT_RISING_EDGE => Some(EventKind::Rising),
            GPIOEVENT_EVENT_FALLING_EDGE => Some(EventKind::Falling),
            _ => None,
        }
    }
}

impl Record for LineEvent {
    const LAYOUT: &'static Layout = &layout::EVENT_DATA;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> std::result::Result<(), EncodingError> {
        w.u64("timestamp", self.timestamp)?;
        w.u32("id", self.id)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            timestamp: r.u64("timestamp"),
            id: r.u32("id"),
        }
    }
}

/// A claim on one line for edge events
///
/// Events are pulled with [`read_event`](Self::read_event) or by iterating
/// the handle. The sequence ends when the kernel closes the stream, after
/// the first read error, or once the handle is released.
pub struct LineEventHandle<K: Ioctl = Kernel> {
    pub(super) file: Option<File>,
    pub(super) kernel: K,
    pub(super) offset: u32,
    pub(super) handle_flags: HandleFlags,
    pub(super) event_flags: EventRequestFlags,
    pub(super) consumer: FixedStr<GPIO_MAX_NAME_SIZE>,
    pub(super) decoder: EventStreamDecoder,
    pub(super) finished: bool,
}

impl<K: Ioctl> LineEventHandle<K> {
    pub(crate) fn new(file: File, kernel: K, granted: &EventRequest) -> Self {
        Self {
            file: Some(file),
            kernel,
            offset: granted.lineoffset,
            handle_flags: granted.handleflags,
            event_flags: granted.eventflags,
            consumer: granted.consumer_label,
            decoder: EventStreamDecoder::new(),
            finished: false,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn handle_flags(&self) -> HandleFlags {
        self.handle_flags
    }

    pub fn event_flags(&self) -> EventRequestFlags {
        self.event_flags
    }

    pub fn consumer(&self) -> &BStr {
        self.consumer.as_bstr()
    }

    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or(Error::CallerMisuse(Misuse::Released("line event handle")))
    }

    /// The event fd, e.g. to add it to an external poll set
    pub fn as_fd(&self) -> Result<BorrowedFd<'_>> {
        Ok(self.file()?.as_fd())
    }

    /// Current value of the line
    pub fn get_value(&self) -> Result<LineValue> {
        let file = self.file()?;
        let data = issue(
            &self.kernel,
            file.as_fd(),
            Command::GetLineValues,
            &HandleData::zeroed(),
        )?;
        Ok(data.values[0].into())
    }

    /// Wait until an event can be taken without blocking
    ///
    /// Returns `false` if `timeout` passed first. Events already decoded
    /// but not yet taken count as ready.
    pub fn wait_for_event(&self, timeout: Option<Duration>) -> Result<bool> {
        if self.decoder.pending() > 0 {
            return Ok(true);
        }
        wait_for_readable(self.file()?.as_fd(), timeout)
    }

    /// Block until the next event is decoded
    ///
    /// `Ok(None)` means the stream has ended. A read error ends the stream
    /// as well and is returned exactly once.
    pub fn read_event(&mut self) -> Result<Option<LineEvent>> {
        self.file()?;
        let mut buf = [0; READ_CHUNK];

        loop {
            if let Some(event) = self.decoder.next_event() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }

            let mut file = self.file()?;
            match file.read(&mut buf) {
                Ok(0) => {
                    debug!("event stream for line {} closed", self.offset);
                    self.finished = true;
                }
                Ok(n) => {
                    let ready = self.decoder.feed(&buf[..n]);
                    trace!("line {}: read {n} bytes, {ready} events", self.offset);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("event stream for line {} failed: {e}", self.offset);
                    self.finished = true;
                    return Err(Error::Stream(e));
                }
            }
        }
    }

    /// Close the event fd
    ///
    /// Undelivered events are dropped and the event sequence ends.
    pub fn release(&mut self) -> Result<()> {
        let file = self
            .file
            .take()
            .ok_or(Misuse::Released("line event handle"))?;
        self.decoder = EventStreamDecoder::new();
        debug!("releasing event handle for line {}", self.offset);
        close_file(file)
    }

    /// Switch to reading events through tokio
    #[cfg(feature = "async-tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
    pub fn into_async(self) -> Result<super::AsyncLineEventHandle<K>> {
        super::AsyncLineEventHandle::new(self)
    }
}

impl<K: Ioctl> Iterator for LineEventHandle<K> {
    type Item = Result<LineEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_released() {
            return None;
        }
        self.read_event().transpose()
    }
}

impl<K: Ioctl> std::fmt::Debug for LineEventHandle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineEventHandle")
            .field("file", &self.file)
            .field("offset", &self.offset)
            .field("handle_flags", &self.handle_flags)
            .field("event_flags", &self.event_flags)
            .field("consumer", &self.consumer)
            .field("pending", &self.decoder.pending())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_layout() {
        let event = LineEvent::new(0x0102_0304_0506_0708, GPIOEVENT_EVENT_FALLING_EDGE);
        let buf = event.encode().unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[0..8], &0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(&buf[8..12], &2u32.to_ne_bytes());
        assert_eq!(LineEvent::decode(&buf).unwrap(), event);
    }

    #[test]
    fn kinds() {
        assert_eq!(LineEvent::new(0, 1).kind(), Some(EventKind::Rising));
        assert_eq!(LineEvent::new(0, 2).kind(), Some(EventKind::Falling));
        assert_eq!(LineEvent::new(0, 3).kind(), None);
    }

    mod property_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn event_round_trip(timestamp in any::<u64>(), id in any::<u32>()) {
                let event = LineEvent::new(timestamp, id);
                let buf = event.encode().unwrap();
                prop_assert_eq!(buf.len(), 12);
                prop_assert_eq!(LineEvent::decode(&buf).unwrap(), event);
            }
        }
    }
}
