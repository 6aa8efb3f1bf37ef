// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::os::fd::RawFd;

use bitflags::bitflags;

use crate::{
    codec::{EncodingError, FieldReader, FieldWriter, Layout, Record},
    errors::Misuse,
    fixed_str::FixedStr,
};

use super::{layout, GPIOHANDLES_MAX, GPIO_MAX_NAME_SIZE};

bitflags! {
    /// Informational Flags
    ///
    /// Maps to kernel [`GPIOLINE_FLAG_*`] flags.
    ///
    /// [`GPIOLINE_FLAG_*`]: https://github.com/torvalds/linux/blob/v5.19/include/uapi/linux/gpio.h
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineFlags: u32 {
        const KERNEL = (1 << 0);
        const IS_OUT = (1 << 1);
        const ACTIVE_LOW = (1 << 2);
        const OPEN_DRAIN = (1 << 3);
        const OPEN_SOURCE = (1 << 4);
        const BIAS_PULL_UP = (1 << 5);
        const BIAS_PULL_DOWN = (1 << 6);
        const BIAS_DISABLE = (1 << 7);
    }
}

bitflags! {
    /// Line Request Flags
    ///
    /// Maps to kernel [`GPIOHANDLE_REQUEST_*`] flags.
    ///
    /// [`GPIOHANDLE_REQUEST_*`]: https://github.com/torvalds/linux/blob/v5.19/include/uapi/linux/gpio.h#L58
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HandleFlags: u32 {
        const INPUT = (1 << 0);
        const OUTPUT = (1 << 1);
        const ACTIVE_LOW = (1 << 2);
        const OPEN_DRAIN = (1 << 3);
        const OPEN_SOURCE = (1 << 4);
        const BIAS_PULL_UP = (1 << 5);
        const BIAS_PULL_DOWN = (1 << 6);
        const BIAS_DISABLE = (1 << 7);
    }
}

bitflags! {
    /// Event request flags
    ///
    /// Maps to kernel [`GPIOEVENT_REQUEST_*`] flags.
    ///
    /// [`GPIOEVENT_REQUEST_*`]: https://github.com/torvalds/linux/blob/v5.19/include/uapi/linux/gpio.h
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventRequestFlags: u32 {
        const RISING_EDGE = (1 << 0);
        const FALLING_EDGE = (1 << 1);
        const BOTH_EDGES = Self::RISING_EDGE.bits() | Self::FALLING_EDGE.bits();
    }
}

/// `GPIOEVENT_EVENT_RISING_EDGE`
pub const GPIOEVENT_EVENT_RISING_EDGE: u32 = 0x01;
/// `GPIOEVENT_EVENT_FALLING_EDGE`
pub const GPIOEVENT_EVENT_FALLING_EDGE: u32 = 0x02;

/// `GPIOLINE_CHANGED_REQUESTED`
pub const GPIOLINE_CHANGED_REQUESTED: u32 = 1;
/// `GPIOLINE_CHANGED_RELEASED`
pub const GPIOLINE_CHANGED_RELEASED: u32 = 2;
/// `GPIOLINE_CHANGED_CONFIG`
pub const GPIOLINE_CHANGED_CONFIG: u32 = 3;

/// Information about a GPIO handle request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleRequest {
    /// an array of desired lines, specified by offset index for the associated GPIO device
    pub lineoffsets: [u32; GPIOHANDLES_MAX],
    /// desired flags for the desired GPIO lines.
    ///
    /// Note that even if multiple lines are requested, the same flags
    /// must be applicable to all of them, if you want lines with individual
    /// flags set, request them one by one. It is possible to select
    /// a batch of input or output lines, but they must all have the same
    /// characteristics, i.e. all inputs or all outputs, all active low etc
    pub flags: HandleFlags,
    /// if [`HandleFlags::OUTPUT`] is set for a requested
    /// line, this specifies the default output value, should be 0 (low) or
    /// 1 (high), anything else than 0 or 1 will be interpreted as 1 (high)
    pub default_values: [u8; GPIOHANDLES_MAX],
    /// a desired consumer label for the selected GPIO line(s)
    /// such as "my-bitbanged-relay"
    pub consumer_label: FixedStr<GPIO_MAX_NAME_SIZE>,
    /// number of lines requested in this request, i.e. the number of
    /// valid fields in the above arrays, set to 1 to request a single line
    pub lines: u32,
    /// if successful this field will contain a valid anonymous file handle
    /// after a `GPIO_GET_LINEHANDLE_IOCTL` operation, zero or negative value
    /// means error.
    pub fd: libc::c_int,
}

impl HandleRequest {
    pub fn new(
        offsets: &[u32],
        flags: HandleFlags,
        default_values: &[u8],
        consumer: &str,
    ) -> Result<Self, EncodingError> {
        let lines = checked_lines(layout::HANDLE_REQUEST.name, "lineoffsets", offsets.len())?;
        if default_values.len() > offsets.len() {
            return Err(EncodingError::TooManyValues {
                lines: offsets.len(),
                values: default_values.len(),
            });
        }

        let mut lineoffsets = [0; GPIOHANDLES_MAX];
        lineoffsets[..offsets.len()].copy_from_slice(offsets);
        let mut defaults = [0; GPIOHANDLES_MAX];
        defaults[..default_values.len()].copy_from_slice(default_values);

        Ok(Self {
            lineoffsets,
            flags,
            default_values: defaults,
            consumer_label: FixedStr::new(consumer)?,
            lines,
            fd: 0,
        })
    }

    /// The meaningful prefix of `lineoffsets`
    pub fn offsets(&self) -> &[u32] {
        let n = (self.lines as usize).min(GPIOHANDLES_MAX);
        &self.lineoffsets[..n]
    }

    /// The fd the kernel filled in, if the request has been granted
    pub fn claimed_fd(&self) -> Result<RawFd, Misuse> {
        claimed(self.fd)
    }
}

impl Record for HandleRequest {
    const LAYOUT: &'static Layout = &layout::HANDLE_REQUEST;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
        w.u32_array("lineoffsets", &self.lineoffsets)?;
        w.u32("flags", self.flags.bits())?;
        w.u8_array("default_values", &self.default_values)?;
        w.str("consumer_label", self.consumer_label.as_bytes())?;
        w.u32_max("lines", self.lines, GPIOHANDLES_MAX as u32)?;
        w.i32("fd", self.fd)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            lineoffsets: r.u32_array("lineoffsets"),
            flags: HandleFlags::from_bits_retain(r.u32("flags")),
            default_values: r.u8_array("default_values"),
            consumer_label: r.str("consumer_label"),
            lines: r.u32("lines"),
            fd: r.i32("fd"),
        }
    }
}

/// Configuration for a GPIO handle request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleConfig {
    /// updated flags for the requested GPIO lines
    pub flags: HandleFlags,
    /// if [`HandleFlags::OUTPUT`] is set in flags,
    /// this specifies the default output value, should be 0 (low) or
    /// 1 (high), anything else than 0 or 1 will be interpreted as 1 (high)
    pub default_values: [u8; GPIOHANDLES_MAX],
}

impl Record for HandleConfig {
    const LAYOUT: &'static Layout = &layout::HANDLE_CONFIG;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
        w.u32("flags", self.flags.bits())?;
        w.u8_array("default_values", &self.default_values)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            flags: HandleFlags::from_bits_retain(r.u32("flags")),
            default_values: r.u8_array("default_values"),
        }
    }
}

/// Information of values on a GPIO handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleData {
    /// When getting the state of lines this contains the current
    /// state of a line
    ///
    /// When setting the state of lines these should contain
    /// the desired target state
    pub values: [u8; GPIOHANDLES_MAX],
}

impl HandleData {
    pub const fn zeroed() -> Self {
        Self {
            values: [0; GPIOHANDLES_MAX],
        }
    }
}

impl Record for HandleData {
    const LAYOUT: &'static Layout = &layout::HANDLE_DATA;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
        w.u8_array("values", &self.values)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            values: r.u8_array("values"),
        }
    }
}

/// Information about a GPIO event request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    /// the desired line to subscribe to events from, specified by
    /// offset index for the associated GPIO device
    pub lineoffset: u32,
    /// desired handle flags for the desired GPIO line
    pub handleflags: HandleFlags,
    /// desired flags for the desired GPIO event line
    pub eventflags: EventRequestFlags,
    /// a desired consumer label for the selected GPIO line(s) such as "my-listener"
    pub consumer_label: FixedStr<GPIO_MAX_NAME_SIZE>,
    /// if successful this field will contain a valid anonymous file handle
    /// after a `GPIO_GET_LINEEVENT_IOCTL` operation, zero or negative value
    /// means error
    pub fd: libc::c_int,
}

impl EventRequest {
    pub fn new(
        offset: u32,
        handleflags: HandleFlags,
        eventflags: EventRequestFlags,
        consumer: &str,
    ) -> Result<Self, EncodingError> {
        Ok(Self {
            lineoffset: offset,
            handleflags,
            eventflags,
            consumer_label: FixedStr::new(consumer)?,
            fd: 0,
        })
    }

    /// The fd the kernel filled in, if the request has been granted
    pub fn claimed_fd(&self) -> Result<RawFd, Misuse> {
        claimed(self.fd)
    }
}

impl Record for EventRequest {
    const LAYOUT: &'static Layout = &layout::EVENT_REQUEST;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
        w.u32("lineoffset", self.lineoffset)?;
        w.u32("handleflags", self.handleflags.bits())?;
        w.u32("eventflags", self.eventflags.bits())?;
        w.str("consumer_label", self.consumer_label.as_bytes())?;
        w.i32("fd", self.fd)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            lineoffset: r.u32("lineoffset"),
            handleflags: HandleFlags::from_bits_retain(r.u32("handleflags")),
            eventflags: EventRequestFlags::from_bits_retain(r.u32("eventflags")),
            consumer_label: r.str("consumer_label"),
            fd: r.i32("fd"),
        }
    }
}

pub(crate) fn checked_lines(
    record: &'static str,
    field: &'static str,
    n: usize,
) -> Result<u32, EncodingError> {
    if n > GPIOHANDLES_MAX {
        return Err(EncodingError::ArrayOverflow {
            record,
            field,
            capacity: GPIOHANDLES_MAX,
            required: n,
        });
    }
    Ok(n as u32)
}

fn claimed(fd: libc::c_int) -> Result<RawFd, Misuse> {
    if fd > 0 {
        Ok(fd)
    } else {
        Err(Misuse::Unclaimed)
    }
}
