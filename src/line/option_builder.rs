use std::marker::PhantomData;

use crate::uapi::HandleFlags;

use super::options::*;

pub struct HasInput;
pub struct HasOpenOutput;

pub struct HasDrivenOutput;

/// Typestate builder for [`HandleFlags`]
///
/// Only settings that make sense for the chosen direction are offered, so
/// an input can't be given a drive mode and a push-pull output can't be
/// given a bias.
pub struct LineOptionBuilder<Dir> {
    pub(super) d: PhantomData<Dir>,
    pub(super) active: Active,
    pub(super) bias: Bias,
    pub(super) drive: Option<Drive>,
}

impl<D> LineOptionBuilder<D> {
    pub(super) const fn conv<O>(self) -> LineOptionBuilder<O> {
        let Self {
            d: _,
            active,
            bias,
            drive,
        } = self;
        LineOptionBuilder {
            d: PhantomData,
            active,
            bias,
            drive,
        }
    }

    const fn common_flags(&self, direction: HandleFlags) -> HandleFlags {
        let flags = match self.active {
            Active::Low => direction.union(HandleFlags::ACTIVE_LOW),
            Active::High => direction,
        };

        match self.bias {
            Bias::PullDown => flags.union(HandleFlags::BIAS_PULL_DOWN),
            Bias::PullUp => flags.union(HandleFlags::BIAS_PULL_UP),
            Bias::Disabled => flags.union(HandleFlags::BIAS_DISABLE),
            Bias::AsIs => flags,
        }
    }
}

impl LineOptionBuilder<()> {
    pub const fn new() -> Self {
        Self {
            d: PhantomData,
            active: Active::High,
            bias: Bias::AsIs,
            drive: None,
        }
    }

    pub const fn input(self) -> LineOptionBuilder<HasInput> {
        self.conv()
    }

    pub const fn output(self) -> LineOptionBuilder<HasDrivenOutput> {
        self.conv()
    }
}

impl LineOptionBuilder<HasInput> {
    pub const fn with_active(self, active: Active) -> Self {
        Self { active, ..self }
    }

    pub const fn with_bias(self, bias: Bias) -> Self {
        Self { bias, ..self }
    }

    pub const fn handle_flags(self) -> HandleFlags {
        self.common_flags(HandleFlags::INPUT)
    }
}

impl LineOptionBuilder<HasOpenOutput> {
    pub const fn with_active(self, active: Active) -> Self {
        Self { active, ..self }
    }

    pub const fn with_drive(self, drive: Drive) -> Self {
        Self {
            drive: Some(drive),
            ..self
        }
    }

    pub const fn with_bias(self, bias: Bias) -> Self {
        Self { bias, ..self }
    }

    pub const fn handle_flags(self) -> HandleFlags {
        let flags = self.common_flags(HandleFlags::OUTPUT);

        match self.drive {
            Some(Drive::OpenDrain) => flags.union(HandleFlags::OPEN_DRAIN),
            Some(Drive::OpenSource) => flags.union(HandleFlags::OPEN_SOURCE),
            None => flags,
        }
    }
}

impl LineOptionBuilder<HasDrivenOutput> {
    pub const fn with_active(self, active: Active) -> Self {
        Self { active, ..self }
    }

    pub const fn with_drive_open(self, drive: Drive) -> LineOptionBuilder<HasOpenOutput> {
        Self {
            drive: Some(drive),
            ..self
        }
        .conv()
    }

    pub const fn handle_flags(self) -> HandleFlags {
        match self.active {
            Active::Low => HandleFlags::OUTPUT.union(HandleFlags::ACTIVE_LOW),
            Active::High => HandleFlags::OUTPUT,
        }
    }
}

impl Default for LineOptionBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl AsLineOptions for LineOptionBuilder<HasInput> {
    #[inline(always)]
    fn handle_flags(self) -> HandleFlags {
        Self::handle_flags(self)
    }
}

impl AsLineOptions for LineOptionBuilder<HasDrivenOutput> {
    #[inline(always)]
    fn handle_flags(self) -> HandleFlags {
        Self::handle_flags(self)
    }
}

impl AsLineOptions for LineOptionBuilder<HasOpenOutput> {
    #[inline(always)]
    fn handle_flags(self) -> HandleFlags {
        Self::handle_flags(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn build_input() {
        const FLAGS: HandleFlags = LineOptionBuilder::new()
            .input()
            .with_active(Active::Low)
            .with_bias(Bias::PullUp)
            .handle_flags();

        let expected = HandleFlags::INPUT | HandleFlags::ACTIVE_LOW | HandleFlags::BIAS_PULL_UP;

        assert_eq!(FLAGS, expected);
    }

    #[test]
    pub fn build_open_collector_output() {
        const FLAGS: HandleFlags = LineOptionBuilder::new()
            .output()
            .with_drive_open(Drive::OpenSource)
            .with_active(Active::Low)
            .with_bias(Bias::Disabled)
            .handle_flags();

        let expected = HandleFlags::OUTPUT
            | HandleFlags::ACTIVE_LOW
            | HandleFlags::OPEN_SOURCE
            | HandleFlags::BIAS_DISABLE;

        assert_eq!(FLAGS, expected);
    }

    #[test]
    pub fn build_driven_output() {
        const FLAGS: HandleFlags = LineOptionBuilder::new()
            .output()
            .with_active(Active::Low)
            .handle_flags();

        assert_eq!(FLAGS, HandleFlags::OUTPUT | HandleFlags::ACTIVE_LOW);
    }
}
