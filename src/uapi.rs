//! Kernel ABI for the v1 GPIO character device.
//!
//! See [`linux/gpio.h`] for the C definitions mirrored here.
//!
//! [`linux/gpio.h`]: https://github.com/torvalds/linux/blob/v6.1/include/uapi/linux/gpio.h

use nix::{request_code_read, request_code_readwrite};

pub mod layout;
pub mod v1;

pub use v1::*;

pub const GPIO_MAX_NAME_SIZE: usize = 32;
pub const GPIOHANDLES_MAX: usize = 64;
pub const GPIO_IOC_MAGIC: u8 = 0xB4;

pub const GPIO_GET_CHIPINFO_IOCTL: u32 =
    request_code_read!(GPIO_IOC_MAGIC, 0x01, layout::CHIP_INFO.size) as u32;
pub const GPIO_GET_LINEINFO_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x02, layout::LINE_INFO.size) as u32;
pub const GPIO_GET_LINEHANDLE_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x03, layout::HANDLE_REQUEST.size) as u32;
pub const GPIO_GET_LINEEVENT_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x04, layout::EVENT_REQUEST.size) as u32;
pub const GPIOHANDLE_GET_LINE_VALUES_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x08, layout::HANDLE_DATA.size) as u32;
pub const GPIOHANDLE_SET_LINE_VALUES_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x09, layout::HANDLE_DATA.size) as u32;
pub const GPIOHANDLE_SET_CONFIG_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x0A, layout::HANDLE_CONFIG.size) as u32;
pub const GPIO_GET_LINEINFO_WATCH_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x0B, layout::LINE_INFO.size) as u32;
pub const GPIO_GET_LINEINFO_UNWATCH_IOCTL: u32 =
    request_code_readwrite!(GPIO_IOC_MAGIC, 0x0C, core::mem::size_of::<u32>()) as u32;

/// The control operations understood by a GPIO chip or one of its request fds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetChipInfo,
    GetLineInfo,
    GetLineHandle,
    GetLineEvent,
    GetLineValues,
    SetLineValues,
    SetConfig,
    WatchLineInfo,
    UnwatchLineInfo,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::GetChipInfo,
        Command::GetLineInfo,
        Command::GetLineHandle,
        Command::GetLineEvent,
        Command::GetLineValues,
        Command::SetLineValues,
        Command::SetConfig,
        Command::WatchLineInfo,
        Command::UnwatchLineInfo,
    ];

    /// The ioctl request number
    pub const fn code(self) -> u32 {
        match self {
            Command::GetChipInfo => GPIO_GET_CHIPINFO_IOCTL,
            Command::GetLineInfo => GPIO_GET_LINEINFO_IOCTL,
            Command::GetLineHandle => GPIO_GET_LINEHANDLE_IOCTL,
            Command::GetLineEvent => GPIO_GET_LINEEVENT_IOCTL,
            Command::GetLineValues => GPIOHANDLE_GET_LINE_VALUES_IOCTL,
            Command::SetLineValues => GPIOHANDLE_SET_LINE_VALUES_IOCTL,
            Command::SetConfig => GPIOHANDLE_SET_CONFIG_IOCTL,
            Command::WatchLineInfo => GPIO_GET_LINEINFO_WATCH_IOCTL,
            Command::UnwatchLineInfo => GPIO_GET_LINEINFO_UNWATCH_IOCTL,
        }
    }

    /// Size of the argument buffer the kernel reads and writes
    pub const fn arg_size(self) -> usize {
        match self {
            Command::GetChipInfo => layout::CHIP_INFO.size,
            Command::GetLineInfo | Command::WatchLineInfo => layout::LINE_INFO.size,
            Command::GetLineHandle => layout::HANDLE_REQUEST.size,
            Command::GetLineEvent => layout::EVENT_REQUEST.size,
            Command::GetLineValues | Command::SetLineValues => layout::HANDLE_DATA.size,
            Command::SetConfig => layout::HANDLE_CONFIG.size,
            Command::UnwatchLineInfo => core::mem::size_of::<u32>(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::GetChipInfo => "GPIO_GET_CHIPINFO_IOCTL",
            Command::GetLineInfo => "GPIO_GET_LINEINFO_IOCTL",
            Command::GetLineHandle => "GPIO_GET_LINEHANDLE_IOCTL",
            Command::GetLineEvent => "GPIO_GET_LINEEVENT_IOCTL",
            Command::GetLineValues => "GPIOHANDLE_GET_LINE_VALUES_IOCTL",
            Command::SetLineValues => "GPIOHANDLE_SET_LINE_VALUES_IOCTL",
            Command::SetConfig => "GPIOHANDLE_SET_CONFIG_IOCTL",
            Command::WatchLineInfo => "GPIO_GET_LINEINFO_WATCH_IOCTL",
            Command::UnwatchLineInfo => "GPIO_GET_LINEINFO_UNWATCH_IOCTL",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Request numbers as printed by the kernel on x86 and ARM boards
    #[test]
    #[cfg(any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64",
        target_arch = "riscv64"
    ))]
    fn request_codes_match_kernel() {
        assert_eq!(GPIO_GET_CHIPINFO_IOCTL, 0x8044_B401);
        assert_eq!(GPIO_GET_LINEINFO_IOCTL, 0xC048_B402);
        assert_eq!(GPIO_GET_LINEHANDLE_IOCTL, 0xC16C_B403);
        assert_eq!(GPIO_GET_LINEEVENT_IOCTL, 0xC030_B404);
        assert_eq!(GPIOHANDLE_GET_LINE_VALUES_IOCTL, 0xC040_B408);
        assert_eq!(GPIOHANDLE_SET_LINE_VALUES_IOCTL, 0xC040_B409);
        assert_eq!(GPIOHANDLE_SET_CONFIG_IOCTL, 0xC054_B40A);
        assert_eq!(GPIO_GET_LINEINFO_WATCH_IOCTL, 0xC048_B40B);
        assert_eq!(GPIO_GET_LINEINFO_UNWATCH_IOCTL, 0xC004_B40C);
    }

    #[test]
    fn codes_are_unique() {
        for c in Command::ALL {
            assert_eq!(Command::from_code(c.code()), Some(c));
        }
    }

    // _IOC_SIZE occupies bits 16..29 wherever the size field is 14 bits wide
    #[test]
    #[cfg(not(any(
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "powerpc",
        target_arch = "powerpc64",
        target_arch = "sparc64"
    )))]
    fn arg_size_is_encoded_in_code() {
        for c in Command::ALL {
            assert_eq!(((c.code() >> 16) & 0x3FFF) as usize, c.arg_size(), "{c}");
        }
    }
}
