//! A simulated GPIO chip for exercising requests without hardware.
//!
//! Handle fds are real descriptors on `/dev/null`; event fds and the chip
//! fd are one end of a `UnixStream` pair, with the simulated kernel holding
//! the other end to push event frames and line info changes.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fs::File,
    io::Write,
    os::{
        fd::{AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd},
        unix::net::UnixStream,
    },
    path::Path,
    rc::Rc,
};

use nix::errno::Errno;

use super::Ioctl;
use crate::{
    chip::{Chip, ChipInfo},
    codec::Record,
    fixed_str::FixedStr,
    line::{LineChange, LineInfo, LineInfoChanged},
    uapi::{
        Command, EventRequest, HandleConfig, HandleData, HandleFlags, HandleRequest, LineFlags,
    },
};

#[derive(Debug, Default)]
struct Line {
    name: String,
    consumer: String,
    flags: LineFlags,
    value: u8,
}

#[derive(Debug, Default)]
struct State {
    lines: Vec<Line>,
    handles: HashMap<RawFd, Vec<u32>>,
    event_fds: HashMap<RawFd, u32>,
    event_writers: HashMap<u32, UnixStream>,
    watched: HashSet<u32>,
    chip_writer: Option<UnixStream>,
    timestamp: u64,
    calls: Vec<Command>,
}

/// Simulated kernel side of one GPIO chip
#[derive(Debug, Clone)]
pub(crate) struct MockChip(Rc<RefCell<State>>);

impl MockChip {
    pub(crate) fn new(lines: u32) -> Self {
        let lines = (0..lines)
            .map(|i| Line {
                name: format!("line{i}"),
                ..Line::default()
            })
            .collect();
        Self(Rc::new(RefCell::new(State {
            lines,
            ..State::default()
        })))
    }

    /// Open a chip backed by this simulation
    pub(crate) fn open(&self) -> Chip<MockChip> {
        let (ours, theirs) = UnixStream::pair().unwrap();
        self.0.borrow_mut().chip_writer = Some(theirs);
        let file = File::from(OwnedFd::from(ours));
        Chip::from_file(Path::new("/dev/gpiochip-mock"), file, self.clone()).unwrap()
    }

    /// Every command issued so far, in order
    pub(crate) fn calls(&self) -> Vec<Command> {
        self.0.borrow().calls.clone()
    }

    pub(crate) fn value(&self, offset: u32) -> u8 {
        self.0.borrow().lines[offset as usize].value
    }

    /// Change the level seen on a line, as external hardware would
    pub(crate) fn drive(&self, offset: u32, value: u8) {
        self.0.borrow_mut().lines[offset as usize].value = value;
    }

    /// Write raw bytes to the event fd of `offset`
    pub(crate) fn emit(&self, offset: u32, bytes: &[u8]) {
        let mut s = self.0.borrow_mut();
        let writer = s.event_writers.get_mut(&offset).unwrap();
        writer.write_all(bytes).unwrap();
    }

    /// End the event stream of `offset`
    pub(crate) fn close_events(&self, offset: u32) {
        self.0.borrow_mut().event_writers.remove(&offset);
    }
}

fn decode<R: Record>(buf: &[u8]) -> nix::Result<R> {
    R::decode(buf).map_err(|_| Errno::EFAULT)
}

fn encode<R: Record>(record: &R, buf: &mut [u8]) -> nix::Result<()> {
    record.encode_into(buf).map_err(|_| Errno::EFAULT)
}

impl State {
    fn line(&self, offset: u32) -> nix::Result<&Line> {
        self.lines.get(offset as usize).ok_or(Errno::EINVAL)
    }

    fn info(&self, offset: u32) -> nix::Result<LineInfo> {
        let line = self.line(offset)?;
        Ok(LineInfo::new(
            offset,
            line.flags,
            FixedStr::new(&line.name).map_err(|_| Errno::EINVAL)?,
            FixedStr::new(&line.consumer).map_err(|_| Errno::EINVAL)?,
        ))
    }

    fn notify(&mut self, offset: u32, change: LineChange) -> nix::Result<()> {
        if !self.watched.contains(&offset) {
            return Ok(());
        }
        self.timestamp += 1;
        let record = LineInfoChanged::new(self.info(offset)?, self.timestamp, change);
        let bytes = record.encode().map_err(|_| Errno::EFAULT)?;
        if let Some(w) = self.chip_writer.as_mut() {
            w.write_all(&bytes).map_err(|_| Errno::EIO)?;
        }
        Ok(())
    }

    fn check_flags(flags: HandleFlags) -> nix::Result<()> {
        if flags.contains(HandleFlags::INPUT | HandleFlags::OUTPUT) {
            return Err(Errno::EINVAL);
        }
        if flags.intersects(HandleFlags::OPEN_DRAIN | HandleFlags::OPEN_SOURCE)
            && !flags.contains(HandleFlags::OUTPUT)
        {
            return Err(Errno::EINVAL);
        }
        Ok(())
    }

    fn apply(&mut self, offset: u32, flags: HandleFlags, default: u8) {
        let line = &mut self.lines[offset as usize];
        let mut info = LineFlags::KERNEL
            | LineFlags::from_bits_retain(
                (flags - (HandleFlags::INPUT | HandleFlags::OUTPUT)).bits(),
            );
        if flags.contains(HandleFlags::OUTPUT) {
            info |= LineFlags::IS_OUT;
            line.value = default;
        }
        line.flags = info;
    }

    fn claim(&mut self, offsets: &[u32], flags: HandleFlags, consumer: &str) -> nix::Result<()> {
        Self::check_flags(flags)?;
        for offset in offsets {
            if self.line(*offset)?.flags.contains(LineFlags::KERNEL) {
                return Err(Errno::EBUSY);
            }
        }
        for offset in offsets {
            self.lines[*offset as usize].consumer = consumer.to_owned();
        }
        Ok(())
    }

    fn handle_lines(&self, fd: RawFd) -> nix::Result<Vec<u32>> {
        if let Some(lines) = self.handles.get(&fd) {
            Ok(lines.clone())
        } else if let Some(offset) = self.event_fds.get(&fd) {
            Ok(vec![*offset])
        } else {
            Err(Errno::ENOTTY)
        }
    }

    fn dispatch(&mut self, fd: RawFd, command: Command, buf: &mut [u8]) -> nix::Result<()> {
        match command {
            Command::GetChipInfo => {
                let info = ChipInfo::new(
                    FixedStr::new("gpiochip-mock").map_err(|_| Errno::EINVAL)?,
                    FixedStr::new("mock-gpio").map_err(|_| Errno::EINVAL)?,
                    self.lines.len() as u32,
                );
                encode(&info, buf)
            }
            Command::GetLineInfo | Command::WatchLineInfo => {
                let offset = decode::<LineInfo>(buf)?.line_offset();
                let info = self.info(offset)?;
                if command == Command::WatchLineInfo && !self.watched.insert(offset) {
                    return Err(Errno::EBUSY);
                }
                encode(&info, buf)
            }
            Command::UnwatchLineInfo => {
                let offset = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
                if self.watched.remove(&offset) {
                    Ok(())
                } else {
                    Err(Errno::EBUSY)
                }
            }
            Command::GetLineHandle => {
                let mut req: HandleRequest = decode(buf)?;
                let offsets = req.offsets().to_vec();
                let consumer = req.consumer_label.to_str().map_err(|_| Errno::EINVAL)?;
                self.claim(&offsets, req.flags, consumer)?;
                for (i, offset) in offsets.iter().enumerate() {
                    self.apply(*offset, req.flags, req.default_values[i]);
                    self.notify(*offset, LineChange::Requested)?;
                }

                let fd = File::open("/dev/null").map_err(|_| Errno::EMFILE)?.into_raw_fd();
                self.event_fds.remove(&fd);
                self.handles.insert(fd, offsets);
                req.fd = fd;
                encode(&req, buf)
            }
            Command::GetLineEvent => {
                let mut req: EventRequest = decode(buf)?;
                if req.handleflags.contains(HandleFlags::OUTPUT) {
                    return Err(Errno::EINVAL);
                }
                let consumer = req.consumer_label.to_str().map_err(|_| Errno::EINVAL)?;
                self.claim(&[req.lineoffset], req.handleflags, consumer)?;
                self.apply(req.lineoffset, req.handleflags, 0);
                self.notify(req.lineoffset, LineChange::Requested)?;

                let (ours, theirs) = UnixStream::pair().map_err(|_| Errno::EMFILE)?;
                let fd = ours.into_raw_fd();
                self.handles.remove(&fd);
                self.event_fds.insert(fd, req.lineoffset);
                self.event_writers.insert(req.lineoffset, theirs);
                req.fd = fd;
                encode(&req, buf)
            }
            Command::GetLineValues => {
                let mut data = HandleData::zeroed();
                for (i, offset) in self.handle_lines(fd)?.iter().enumerate() {
                    data.values[i] = self.lines[*offset as usize].value;
                }
                encode(&data, buf)
            }
            Command::SetLineValues => {
                let offsets = self.handles.get(&fd).cloned().ok_or(Errno::ENOTTY)?;
                let data: HandleData = decode(buf)?;
                for offset in &offsets {
                    if !self.lines[*offset as usize].flags.contains(LineFlags::IS_OUT) {
                        return Err(Errno::EPERM);
                    }
                }
                for (i, offset) in offsets.iter().enumerate() {
                    self.lines[*offset as usize].value = (data.values[i] != 0) as u8;
                }
                Ok(())
            }
            Command::SetConfig => {
                let offsets = self.handles.get(&fd).cloned().ok_or(Errno::ENOTTY)?;
                let config: HandleConfig = decode(buf)?;
                Self::check_flags(config.flags)?;
                for (i, offset) in offsets.iter().enumerate() {
                    self.apply(*offset, config.flags, config.default_values[i]);
                    self.notify(*offset, LineChange::Config)?;
                }
                Ok(())
            }
        }
    }
}

impl Ioctl for MockChip {
    unsafe fn ioctl(
        &self,
        fd: BorrowedFd<'_>,
        request: u32,
        buf: &mut [u8],
    ) -> nix::Result<libc::c_int> {
        let command = Command::from_code(request).ok_or(Errno::ENOTTY)?;
        let mut state = self.0.borrow_mut();
        state.calls.push(command);
        state.dispatch(fd.as_raw_fd(), command, buf)?;
        Ok(0)
    }
}
