use bstr::BStr;

use crate::{
    codec::{EncodingError, FieldReader, FieldWriter, Layout, Record},
    fixed_str::FixedStr,
    uapi::{self, layout, LineFlags, GPIO_MAX_NAME_SIZE},
};

use super::options::{Bias, Direction};

const FLAG_NAMES: [(LineFlags, &str); 8] = [
    (LineFlags::KERNEL, "kernel"),
    (LineFlags::IS_OUT, "output"),
    (LineFlags::ACTIVE_LOW, "active_low"),
    (LineFlags::OPEN_DRAIN, "open_drain"),
    (LineFlags::OPEN_SOURCE, "open_source"),
    (LineFlags::BIAS_PULL_UP, "pull_up"),
    (LineFlags::BIAS_PULL_DOWN, "pull_down"),
    (LineFlags::BIAS_DISABLE, "bias_disable"),
];

/// Information about a certain GPIO line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInfo {
    offset: u32,
    flags: LineFlags,
    name: FixedStr<GPIO_MAX_NAME_SIZE>,
    consumer: FixedStr<GPIO_MAX_NAME_SIZE>,
}

impl LineInfo {
    pub(crate) const fn new_get(offset: u32) -> Self {
        Self {
            offset,
            flags: LineFlags::empty(),
            name: FixedStr::empty(),
            consumer: FixedStr::empty(),
        }
    }

    pub(crate) const fn new(
        offset: u32,
        flags: LineFlags,
        name: FixedStr<GPIO_MAX_NAME_SIZE>,
        consumer: FixedStr<GPIO_MAX_NAME_SIZE>,
    ) -> Self {
        Self {
            offset,
            flags,
            name,
            consumer,
        }
    }

    /// The name of this GPIO line, such as the output pin of the line on the
    /// chip, a rail or a pin header name on a board, as specified by the gpio
    /// chip.
    pub fn name(&self) -> Option<&BStr> {
        if self.name.is_empty() {
            None
        } else {
            Some(self.name.as_bstr())
        }
    }

    /// A functional name for the consumer of this GPIO line as set by
    /// whatever is using it. Empty if there is no current user, but may
    /// also be empty if the consumer doesn't set this up.
    pub fn consumer(&self) -> Option<&BStr> {
        if self.consumer.is_empty() {
            None
        } else {
            Some(self.consumer.as_bstr())
        }
    }

    pub fn line_offset(&self) -> u32 {
        self.offset
    }

    pub fn flags(&self) -> LineFlags {
        self.flags
    }

    /// Get the direction of this GPIO if configured
    ///
    /// Lines are considered to be inputs if not explicitly
    /// marked as outputs in the line info flags by the kernel.
    pub fn direction(&self) -> Direction {
        if self.flags.contains(LineFlags::IS_OUT) {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    /// True if the any flags for the device are set (input or output)
    pub fn is_used(&self) -> bool {
        !self.flags.is_empty()
    }

    /// True if this line is being used by something else in the kernel
    ///
    /// If another driver or subsystem in the kernel is using the line
    /// then it cannot be used via the cdev interface.
    pub fn is_kernel(&self) -> bool {
        self.flags.contains(LineFlags::KERNEL)
    }

    /// True if this line is marked as active low in the kernel
    pub fn is_active_low(&self) -> bool {
        self.flags.contains(LineFlags::ACTIVE_LOW)
    }

    /// True if this line is marked as open drain in the kernel
    pub fn is_open_drain(&self) -> bool {
        self.flags.contains(LineFlags::OPEN_DRAIN)
    }

    /// True if this line is marked as open source in the kernel
    pub fn is_open_source(&self) -> bool {
        self.flags.contains(LineFlags::OPEN_SOURCE)
    }

    /// Bias reported by the kernel. Kernels before 5.5 never report one.
    pub fn bias(&self) -> Bias {
        if self.flags.contains(LineFlags::BIAS_PULL_UP) {
            Bias::PullUp
        } else if self.flags.contains(LineFlags::BIAS_PULL_DOWN) {
            Bias::PullDown
        } else if self.flags.contains(LineFlags::BIAS_DISABLE) {
            Bias::Disabled
        } else {
            Bias::AsIs
        }
    }

    /// Readable names of the set flags, in bit order
    pub fn flag_names(&self) -> impl Iterator<Item = &'static str> {
        let flags = self.flags;
        FLAG_NAMES
            .into_iter()
            .filter(move |(f, _)| flags.contains(*f))
            .map(|(_, name)| name)
    }
}

impl Record for LineInfo {
    const LAYOUT: &'static Layout = &layout::LINE_INFO;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
        w.u32("line_offset", self.offset)?;
        w.u32("flags", self.flags.bits())?;
        w.str("name", self.name.as_bytes())?;
        w.str("consumer", self.consumer.as_bytes())
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            offset: r.u32("line_offset"),
            flags: LineFlags::from_bits_retain(r.u32("flags")),
            name: r.str("name"),
            consumer: r.str("consumer"),
        }
    }
}

/// What happened to a watched line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Requested,
    Released,
    Config,
    Unknown(u32),
}

impl From<u32> for LineChange {
    fn from(id: u32) -> Self {
        match id {
            uapi::GPIOLINE_CHANGED_REQUESTED => LineChange::Requested,
            uapi::GPIOLINE_CHANGED_RELEASED => LineChange::Released,
            uapi::GPIOLINE_CHANGED_CONFIG => LineChange::Config,
            other => LineChange::Unknown(other),
        }
    }
}

impl From<LineChange> for u32 {
    fn from(change: LineChange) -> Self {
        match change {
            LineChange::Requested => uapi::GPIOLINE_CHANGED_REQUESTED,
            LineChange::Released => uapi::GPIOLINE_CHANGED_RELEASED,
            LineChange::Config => uapi::GPIOLINE_CHANGED_CONFIG,
            LineChange::Unknown(id) => id,
        }
    }
}

/// Status change of a watched line, read from the chip fd
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfoChanged {
    info: LineInfo,
    timestamp: u64,
    event_type: u32,
}

impl LineInfoChanged {
    pub(crate) fn new(info: LineInfo, timestamp: u64, change: LineChange) -> Self {
        Self {
            info,
            timestamp,
            event_type: change.into(),
        }
    }

    /// Line information after the change
    pub fn info(&self) -> &LineInfo {
        &self.info
    }

    /// Estimate of the time of the change, in nanoseconds
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn change(&self) -> LineChange {
        self.event_type.into()
    }
}

impl Record for LineInfoChanged {
    const LAYOUT: &'static Layout = &layout::LINE_INFO_CHANGED;

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> Result<(), EncodingError> {
        w.record("info", &self.info)?;
        w.u64("timestamp", self.timestamp)?;
        w.u32("event_type", self.event_type)
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Self {
            info: r.record("info"),
            timestamp: r.u64("timestamp"),
            event_type: r.u32("event_type"),
        }
    }
}
