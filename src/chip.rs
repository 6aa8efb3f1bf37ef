use std::{
    fs::{File, OpenOptions},
    io::Read,
    os::fd::{AsFd, BorrowedFd, FromRawFd},
    path::{Path, PathBuf},
    time::Duration,
};

use bstr::BStr;
use log::debug;

use crate::{
    codec::{EncodingError, FieldReader, FieldWriter, Layout, Record},
    errors::{Error, Misuse, Result},
    fixed_str::FixedStr,
    ioctl::{issue, issue_raw, Ioctl, Kernel},
    line::{
        close_file, options::AsLineOptions, wait_for_readable, AsLineSet, AsValues,
        LineEventHandle, LineHandle, LineInfo, LineInfoChanged,
    },
    uapi::{
        layout, Command, EventRequest, EventRequestFlags, HandleRequest, GPIO_MAX_NAME_SIZE,
    },
};

/// Information about a GPIO chip (`struct gpiochip_info`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChipInfo {
    name: FixedStr<GPIO_MAX_NAME_SIZE>,
    label: FixedStr<GPIO_MAX_NAME_SIZE>,
    lines: u32,
}

impl ChipInfo {
    pub(crate) const fn new(
        name: FixedStr<GPIO_MAX_NAME_SIZE>,
        label: FixedStr<GPIO_MAX_NAME_SIZE>,
        lines: u32,
    ) -> Self {
        Self { name, label, lines }
    }

    /// The name of the device driving this GPIO chip in the kernel
    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }

    /// A functional name for this GPIO chip, such as a product number.  Might
    /// be an empty string.
    ///
    /// As an example, the SoC GPIO chip on a Raspberry Pi is "pinctrl-bcm2835"
    pub fn label(&self) -> &BStr {
        self.label.as_bstr()
    }

    /// The number of lines/pins indexable through this chip
    ///
    /// Not all of these may be usable depending on how the hardware is
    /// configured/muxed.
    pub const fn num_lines(&self) -> u32 {
        self.lines
    }
}

impl Record for ChipInfo {
    const LAYOUT: &'static Layout = &layout::CHIP_INFO;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> std::result::Result<(), EncodingError> {
        w.str("name", self.name.as_bytes())?;
        w.str("label", self.label.as_bytes())?;
        w.u32("lines", self.lines)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            name: r.str("name"),
            label: r.str("label"),
            lines: r.u32("lines"),
        }
    }
}

/// A GPIO Chip maps to the actual device driver instance in hardware that
/// one interacts with to interact with individual GPIOs.  Often these chips
/// map to IP chunks on an SoC but could also be enumerated within the kernel
/// via something like a PCI or USB bus.
///
/// It is best not to assume that a device will always be enumerated in the
/// same order (especially if it is connected via a bus).  A udev rule that
/// matches attributes of the device and sets up a symlink gives a stable
/// path to open.
///
/// Handles claimed through a chip own their own file descriptors and stay
/// usable after the chip is released or dropped.
pub struct Chip<K: Ioctl = Kernel> {
    path: PathBuf,
    file: Option<File>,
    kernel: K,
}

impl Chip {
    /// Open the GPIO Chip at the provided path (e.g. `/dev/gpiochip<N>`)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Kernel)
    }
}

impl<K: Ioctl + Clone> Chip<K> {
    /// Open a chip, issuing its control operations through `kernel`
    ///
    /// The device is opened read/write and must answer a chip info query;
    /// anything else is reported as [`Error::Open`].
    pub fn open_with(path: impl AsRef<Path>, kernel: K) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.into(),
                source,
            })?;
        Self::from_file(path, file, kernel)
    }

    pub(crate) fn from_file(path: &Path, file: File, kernel: K) -> Result<Self> {
        let chip = Self {
            path: path.into(),
            file: Some(file),
            kernel,
        };

        match chip.info() {
            Ok(info) => {
                debug!(
                    "opened {} ({}, {} lines)",
                    path.display(),
                    info.name(),
                    info.num_lines()
                );
                Ok(chip)
            }
            Err(Error::CommandRejected { source, .. }) => Err(Error::Open {
                path: path.into(),
                source: source.into(),
            }),
            Err(e) => Err(e),
        }
    }

    /// The path this chip was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or(Error::CallerMisuse(Misuse::Released("chip")))
    }

    pub fn as_fd(&self) -> Result<BorrowedFd<'_>> {
        Ok(self.file()?.as_fd())
    }

    /// Get the fixed information about this chip
    pub fn info(&self) -> Result<ChipInfo> {
        let file = self.file()?;
        issue(
            &self.kernel,
            file.as_fd(),
            Command::GetChipInfo,
            &ChipInfo::default(),
        )
    }

    /// Get the information of a line at a given offset.
    pub fn line_info(&self, offset: u32) -> Result<LineInfo> {
        let file = self.file()?;
        issue(
            &self.kernel,
            file.as_fd(),
            Command::GetLineInfo,
            &LineInfo::new_get(offset),
        )
    }

    /// Information on every line of the chip, in offset order
    pub fn line_infos(&self) -> Result<impl Iterator<Item = Result<LineInfo>> + '_> {
        let lines = self.info()?.num_lines();
        Ok((0..lines).map(move |offset| self.line_info(offset)))
    }

    /// Claim lines for reading and driving their values
    ///
    /// All lines share `options`. `defaults` are the initial values of
    /// outputs: a single value applies to every line, a sequence is matched
    /// to `offsets` by position.
    ///
    /// The actual physical line corresponding to a given offset
    /// is completely dependent on how the driver/hardware for
    /// the chip works as well as the associated board layout.
    ///
    /// For a device like the NXP i.mx6 SoC GPIO controller there
    /// are several banks of GPIOs with each bank containing 32
    /// GPIOs.  For this hardware and driver something like
    /// `GPIO2_5` would map to offset 37.
    pub fn request_lines(
        &self,
        offsets: impl AsLineSet,
        options: impl AsLineOptions,
        defaults: impl AsValues,
        consumer: &str,
    ) -> Result<LineHandle<K>> {
        let file = self.file()?;
        let offsets = offsets.as_line_set()?;
        let defaults = defaults.values(&offsets)?;
        let request = HandleRequest::new(
            &offsets,
            options.handle_flags(),
            &defaults.values[..offsets.len()],
            consumer,
        )?;

        let granted = issue(&self.kernel, file.as_fd(), Command::GetLineHandle, &request)?;
        let fd = granted.claimed_fd()?;
        debug!(
            "claimed lines {offsets} of {} as {:?} on fd {fd}",
            self.path.display(),
            granted.flags
        );

        // SAFETY: the kernel just handed us this fd and nothing else owns it
        let file = unsafe { File::from_raw_fd(fd) };
        Ok(LineHandle::new(file, self.kernel.clone(), offsets, &granted))
    }

    /// Claim a single line, see [`request_lines`](Self::request_lines)
    pub fn request_line(
        &self,
        offset: u32,
        options: impl AsLineOptions,
        default: impl AsValues,
        consumer: &str,
    ) -> Result<LineHandle<K>> {
        self.request_lines(offset, options, default, consumer)
    }

    /// Claim one line for edge events
    pub fn request_events(
        &self,
        offset: u32,
        options: impl AsLineOptions,
        edges: impl Into<EventRequestFlags>,
        consumer: &str,
    ) -> Result<LineEventHandle<K>> {
        let file = self.file()?;
        let request = EventRequest::new(offset, options.handle_flags(), edges.into(), consumer)?;

        let granted = issue(&self.kernel, file.as_fd(), Command::GetLineEvent, &request)?;
        let fd = granted.claimed_fd()?;
        debug!(
            "claimed line {offset} of {} for {:?} events on fd {fd}",
            self.path.display(),
            granted.eventflags
        );

        // SAFETY: the kernel just handed us this fd and nothing else owns it
        let file = unsafe { File::from_raw_fd(fd) };
        Ok(LineEventHandle::new(file, self.kernel.clone(), &granted))
    }

    /// Start reporting changes to the line at `offset`, returning its current info
    ///
    /// Changes are read with [`read_line_info_change`](Self::read_line_info_change).
    /// Requires a 5.7 or newer kernel.
    pub fn watch_line_info(&self, offset: u32) -> Result<LineInfo> {
        let file = self.file()?;
        issue(
            &self.kernel,
            file.as_fd(),
            Command::WatchLineInfo,
            &LineInfo::new_get(offset),
        )
    }

    pub fn unwatch_line_info(&self, offset: u32) -> Result<()> {
        let file = self.file()?;
        let mut buf = offset.to_ne_bytes();
        issue_raw(&self.kernel, file.as_fd(), Command::UnwatchLineInfo, &mut buf)
    }

    /// Block until a change to a watched line is reported
    pub fn read_line_info_change(&self) -> Result<LineInfoChanged> {
        let mut file = self.file()?;
        let mut buf = [0; layout::LINE_INFO_CHANGED.size];
        file.read_exact(&mut buf).map_err(Error::Stream)?;
        Ok(LineInfoChanged::decode(&buf)?)
    }

    /// Wait until a line info change can be read without blocking
    pub fn wait_for_line_info_change(&self, timeout: Option<Duration>) -> Result<bool> {
        wait_for_readable(self.file()?.as_fd(), timeout)
    }

    /// Close the chip fd. Claimed handles are not affected.
    pub fn release(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Misuse::Released("chip"))?;
        debug!("releasing {}", self.path.display());
        close_file(file)
    }
}

impl<K: Ioctl> std::fmt::Debug for Chip<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chip")
            .field("path", &self.path)
            .field("file", &self.file)
            .finish()
    }
}
