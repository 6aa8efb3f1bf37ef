// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `gpio-cdev-v1` crate provides access to GPIO lines through the v1
//! [GPIO character device ABI](https://www.kernel.org/doc/Documentation/ABI/testing/gpio-cdev)
//! (`/dev/gpiochipN`), stabilized with Linux v4.8.
//!
//! A [`Chip`] describes itself and its lines and hands out claims on them:
//! a [`LineHandle`] for reading and driving a group of lines, or a
//! [`LineEventHandle`] for timestamped edge events on one input line. Every
//! claim is its own file descriptor; releasing it (or dropping it) gives
//! the lines back to the kernel.
//!
//! Kernel records are encoded to and decoded from explicit byte layouts,
//! see [`uapi::layout`] and [`codec`].
//!
//! # Examples
//!
//! Mirror an input line onto an output line:
//!
//! ```no_run
//! use gpio_cdev_v1::{line::options::EdgeDetect, Chip, EventKind, LineOptions, LineValue};
//!
//! fn mirror_gpio(inputline: u32, outputline: u32) -> Result<(), gpio_cdev_v1::Error> {
//!     let chip = Chip::open("/dev/gpiochip0")?;
//!     let output = chip.request_line(outputline, LineOptions::OUTPUT, 0u8, "mirror-gpio")?;
//!     let input = chip.request_events(inputline, LineOptions::INPUT, EdgeDetect::Both, "mirror-gpio")?;
//!     for event in input {
//!         let event = event?;
//!         println!("{:?}", event);
//!         match event.kind() {
//!             Some(EventKind::Rising) => output.set_values(LineValue::Active)?,
//!             Some(EventKind::Falling) => output.set_values(LineValue::Inactive)?,
//!             None => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//!
//! # fn main() -> Result<(), gpio_cdev_v1::Error> {
//! #     mirror_gpio(0, 1)
//! # }
//! ```
//!
//! Read several lines at once:
//!
//! ```no_run
//! use gpio_cdev_v1::{Chip, LineOptions};
//!
//! # fn main() -> Result<(), gpio_cdev_v1::Error> {
//! let chip = Chip::open("/dev/gpiochip0")?;
//! // The handle must be kept alive, dropping it releases the lines
//! let handle = chip.request_lines([4u32, 17, 27], LineOptions::INPUT, (), "read-input")?;
//! for (offset, value) in handle.get_values()?.iter() {
//!     println!("line {offset}: {value:?}");
//! }
//! # Ok(()) }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
mod errors;
pub mod fixed_str;
pub mod ioctl;
pub mod uapi;

pub mod chip;
pub mod line;

pub use chip::{Chip, ChipInfo};
pub use errors::{Error, Misuse, Result};
pub use ioctl::{Ioctl, Kernel};
pub use line::{
    options::LineOptions, EventKind, EventStreamDecoder, LineChange, LineEvent, LineEventHandle,
    LineHandle, LineInfo, LineInfoChanged, LineValue,
};
#[cfg(feature = "async-tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
pub use line::AsyncLineEventHandle;
pub use uapi::{EventRequestFlags, HandleFlags, LineFlags};
