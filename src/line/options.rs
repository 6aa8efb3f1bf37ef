use crate::uapi::{EventRequestFlags, HandleFlags};

pub mod builder {
    pub use super::super::option_builder::*;
}

/// Anything that can be turned into the flags of a handle request
///
/// Raw [`HandleFlags`] are passed through untouched, so combinations the
/// kernel refuses (such as input and output together) are left for the
/// kernel to reject.
pub trait AsLineOptions {
    fn handle_flags(self) -> HandleFlags;
}

impl AsLineOptions for HandleFlags {
    #[inline(always)]
    fn handle_flags(self) -> HandleFlags {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOptions {
    Input { bias: Bias, active: Active },
    DrivenOutput { active: Active },
    OpenOutput { drive: Drive, bias: Bias, active: Active },
}

impl LineOptions {
    /// Plain input, active high, bias left as is
    pub const INPUT: Self = LineOptions::Input {
        bias: Bias::AsIs,
        active: Active::High,
    };

    /// Push-pull output, active high
    pub const OUTPUT: Self = LineOptions::DrivenOutput {
        active: Active::High,
    };

    pub const fn build() -> builder::LineOptionBuilder<()> {
        builder::LineOptionBuilder::new()
    }

    pub const fn handle_flags(self) -> HandleFlags {
        match self {
            LineOptions::Input { bias, active } => Self::build()
                .input()
                .with_bias(bias)
                .with_active(active)
                .handle_flags(),
            LineOptions::DrivenOutput { active } => {
                Self::build().output().with_active(active).handle_flags()
            }
            LineOptions::OpenOutput {
                drive,
                bias,
                active,
            } => Self::build()
                .output()
                .with_drive_open(drive)
                .with_bias(bias)
                .with_active(active)
                .handle_flags(),
        }
    }
}

impl AsLineOptions for LineOptions {
    #[inline(always)]
    fn handle_flags(self) -> HandleFlags {
        Self::handle_flags(self)
    }
}

impl Default for LineOptions {
    fn default() -> Self {
        Self::INPUT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Active {
    #[default]
    High,
    Low,
}

/// Which edges of an input line generate events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgeDetect {
    Rising,
    Falling,
    #[default]
    Both,
}

impl From<EdgeDetect> for EventRequestFlags {
    fn from(edge: EdgeDetect) -> Self {
        match edge {
            EdgeDetect::Rising => EventRequestFlags::RISING_EDGE,
            EdgeDetect::Falling => EventRequestFlags::FALLING_EDGE,
            EdgeDetect::Both => EventRequestFlags::BOTH_EDGES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    OpenDrain,
    OpenSource,
}

/// Bias requested for a line
///
/// `AsIs` sets no bias flag and leaves the line as the kernel has it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bias {
    #[default]
    AsIs,
    Disabled,
    PullUp,
    PullDown,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(LineOptions::INPUT.handle_flags(), HandleFlags::INPUT);
        assert_eq!(LineOptions::OUTPUT.handle_flags(), HandleFlags::OUTPUT);
        assert_eq!(LineOptions::default(), LineOptions::INPUT);
    }

    #[test]
    fn open_output() {
        let opts = LineOptions::OpenOutput {
            drive: Drive::OpenDrain,
            bias: Bias::PullUp,
            active: Active::Low,
        };
        assert_eq!(
            AsLineOptions::handle_flags(opts),
            HandleFlags::OUTPUT
                | HandleFlags::OPEN_DRAIN
                | HandleFlags::BIAS_PULL_UP
                | HandleFlags::ACTIVE_LOW
        );
    }

    #[test]
    fn raw_flags_pass_through() {
        let raw = HandleFlags::INPUT | HandleFlags::OUTPUT;
        assert_eq!(raw.handle_flags(), raw);
    }

    #[test]
    fn edges() {
        assert_eq!(
            EventRequestFlags::from(EdgeDetect::default()),
            EventRequestFlags::RISING_EDGE | EventRequestFlags::FALLING_EDGE
        );
        assert_eq!(
            EventRequestFlags::from(EdgeDetect::Falling).bits(),
            crate::uapi::GPIOEVENT_EVENT_FALLING_EDGE
        );
    }
}
