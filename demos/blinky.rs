// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;
use std::thread::sleep;
use std::time::{Duration, Instant};

use gpio_cdev_v1::{Chip, LineOptions, LineValue};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip device (e.g. /dev/gpiochip0)
    chip: PathBuf,
    /// The offset of the GPIO line for the provided chip
    line: u32,
    /// Period in milliseconds
    period_ms: u64,
    /// Duration over which to blink in milliseconds
    duration_ms: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::from_args();
    let chip = Chip::open(&args.chip)?;

    // start lit, so the first half period is visible
    let handle = chip.request_line(args.line, LineOptions::OUTPUT, LineValue::Active, "blinky")?;

    let period = Duration::from_millis(args.period_ms);
    let duration = Duration::from_millis(args.duration_ms);
    let start_time = Instant::now();
    while start_time.elapsed() < duration {
        sleep(period);
        handle.set_values(LineValue::Inactive)?;
        sleep(period);
        handle.set_values(LineValue::Active)?;
    }

    Ok(())
}
