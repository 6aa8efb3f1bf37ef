// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use futures::stream::StreamExt;
use gpio_cdev_v1::{line::options::EdgeDetect, Chip, LineOptions};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip device (e.g. /dev/gpiochip0)
    chip: PathBuf,
    /// The offsets of the GPIO lines to watch
    lines: Vec<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::from_args();
    let chip = Chip::open(&args.chip)?;

    let mut streams = Vec::new();
    for &line in &args.lines {
        let handle = chip.request_events(line, LineOptions::INPUT, EdgeDetect::Both, "gpioevents")?;
        streams.push(handle.into_async()?.map(move |event| (line, event)));
    }

    let mut events = futures::stream::select_all(streams);
    while let Some((line, event)) = events.next().await {
        let event = event?;
        println!("line {line}: {:?} at {}", event.kind(), event.timestamp());
    }
    Ok(())
}
