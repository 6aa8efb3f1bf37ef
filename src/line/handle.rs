use std::{
    fs::File,
    os::fd::{AsFd, BorrowedFd},
};

use bstr::BStr;
use log::debug;

use crate::{
    codec::EncodingError,
    errors::{Error, Misuse, Result},
    fixed_str::FixedStr,
    ioctl::{issue, Ioctl, Kernel},
    uapi::{Command, HandleConfig, HandleData, HandleFlags, HandleRequest, GPIO_MAX_NAME_SIZE},
};

use super::{close_file, options::AsLineOptions, AsValues, LineSet, LineValue, LineValues};

/// A claim on one or more lines for reading and driving their values
///
/// All lines of a handle share the same flags. The handle keeps working
/// after the [`Chip`](crate::Chip) it came from is released.
pub struct LineHandle<K: Ioctl = Kernel> {
    file: Option<File>,
    kernel: K,
    offsets: LineSet,
    flags: HandleFlags,
    consumer: FixedStr<GPIO_MAX_NAME_SIZE>,
}

impl<K: Ioctl> LineHandle<K> {
    pub(crate) fn new(file: File, kernel: K, offsets: LineSet, granted: &HandleRequest) -> Self {
        Self {
            file: Some(file),
            kernel,
            offsets,
            flags: granted.flags,
            consumer: granted.consumer_label,
        }
    }

    /// Offsets of the claimed lines, in request order
    pub fn offsets(&self) -> &LineSet {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Flags of the most recent successful request or reconfiguration
    pub fn flags(&self) -> HandleFlags {
        self.flags
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
            .ok_or(Error::CallerMisuse(Misuse::Released("line handle")))
    }

    pub fn as_fd(&self) -> Result<BorrowedFd<'_>> {
        Ok(self.file()?.as_fd())
    }

    fn read(&self) -> Result<HandleData> {
        let file = self.file()?;
        issue(
            &self.kernel,
            file.as_fd(),
            Command::GetLineValues,
            &HandleData::zeroed(),
        )
    }

    /// Read the values of all claimed lines
    pub fn get_values(&self) -> Result<LineValues<'_>> {
        Ok(LineValues::new(&self.offsets, self.read()?))
    }

    /// Read the value of one claimed line
    pub fn get_value(&self, offset: u32) -> Result<LineValue> {
        self.file()?;
        let idx = self.index_of(offset)?;
        Ok(self.read()?.values[idx].into())
    }

    /// Drive the claimed lines
    ///
    /// A single value is applied to every line, a sequence is matched to
    /// the lines in request order. Only meaningful for outputs; the kernel
    /// rejects it for inputs.
    pub fn set_values(&self, values: impl AsValues) -> Result<()> {
        let file = self.file()?;
        let data = values.values(&self.offsets)?;
        issue(&self.kernel, file.as_fd(), Command::SetLineValues, &data)?;
        Ok(())
    }

    /// Drive one claimed line and leave the others at their current value
    ///
    /// The kernel only sets all lines of a handle at once, so this reads the
    /// current values first.
    pub fn set_value(&self, offset: u32, value: impl Into<LineValue>) -> Result<()> {
        let file = self.file()?;
        let idx = self.index_of(offset)?;
        let value: LineValue = value.into();
        let mut data = self.read()?;
        data.values[idx] = value.into();
        issue(&self.kernel, file.as_fd(), Command::SetLineValues, &data)?;
        Ok(())
    }

    /// Change the flags and default values of the claimed lines in place
    ///
    /// Requires a 5.5 or newer kernel.
    pub fn reconfigure(&mut self, options: impl AsLineOptions, defaults: impl AsValues) -> Result<()> {
        let file = self.file()?;
        let flags = options.handle_flags();
        let config = HandleConfig {
            flags,
            default_values: defaults.values(&self.offsets)?.values,
        };
        issue(&self.kernel, file.as_fd(), Command::SetConfig, &config)?;
        debug!("reconfigured lines {} to {flags:?}", self.offsets);
        self.flags = flags;
        Ok(())
    }

    /// Close the handle fd, giving the lines back to the kernel
    pub fn release(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Misuse::Released("line handle"))?;
        debug!("releasing lines {}", self.offsets);
        close_file(file)
    }

    fn index_of(&self, offset: u32) -> Result<usize> {
        self.offsets
            .find_idx(offset)
            .ok_or_else(|| EncodingError::UnknownOffset(offset).into())
    }
}

impl<K: Ioctl> std::fmt::Debug for LineHandle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineHandle")
            .field("file", &self.file)
            .field("offsets", &self.offsets)
            .field("flags", &self.flags)
            .field("consumer", &self.consumer)
            .finish()
    }
}
