// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Print edge events on one line, like linux/tools/gpio/gpio-event-mon.c

use std::path::PathBuf;
use std::time::Duration;

use gpio_cdev_v1::{line::options::EdgeDetect, Chip, LineOptions};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip device (e.g. /dev/gpiochip0)
    chip: PathBuf,
    /// The offset of the GPIO line for the provided chip
    line: u32,
    /// Stop after this many events
    #[structopt(short = "n", long)]
    count: Option<usize>,
    /// Give up when no event arrives within this many milliseconds
    #[structopt(short, long)]
    timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::from_args();
    let chip = Chip::open(&args.chip)?;
    let mut events = chip.request_events(args.line, LineOptions::INPUT, EdgeDetect::Both, "gpioevents")?;
    println!("Monitoring line {} on {}", args.line, args.chip.display());

    let timeout = args.timeout_ms.map(Duration::from_millis);
    let mut seen = 0;
    while args.count.map_or(true, |n| seen < n) {
        if !events.wait_for_event(timeout)? {
            println!("No event within the timeout");
            break;
        }
        match events.read_event()? {
            Some(event) => {
                println!("{:?}: {:?}", event, event.kind());
                seen += 1;
            }
            None => break,
        }
    }
    Ok(())
}
