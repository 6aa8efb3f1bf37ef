// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! List the lines of one or more GPIO chips, like linux/tools/gpio/lsgpio.c

use std::path::{Path, PathBuf};

use anyhow::Context;
use gpio_cdev_v1::Chip;
use itertools::Itertools;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip devices to list (e.g. /dev/gpiochip0)
    #[structopt(default_value = "/dev/gpiochip0")]
    chips: Vec<PathBuf>,
}

fn list(path: &Path) -> anyhow::Result<()> {
    let chip = Chip::open(path)?;
    let info = chip.info()?;
    println!(
        "GPIO chip: \"{}\", \"{}\", {} GPIO Lines",
        info.name(),
        info.label(),
        info.num_lines()
    );

    for line in chip.line_infos()? {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("\terror: {e}");
                continue;
            }
        };
        let flags = line.flag_names().join(" ");
        let usage = if flags.is_empty() {
            String::new()
        } else {
            format!("[{flags}]")
        };

        println!(
            "\tline {offset:>3}: {name:?} {consumer:?} {usage}",
            offset = line.line_offset(),
            name = line.name().map_or_else(|| "unnamed".into(), |n| n.to_string()),
            consumer = line.consumer().map_or_else(|| "unused".into(), |c| c.to_string()),
        );
    }
    println!();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::from_args();
    for path in &args.chips {
        list(path).with_context(|| format!("listing {}", path.display()))?;
    }
    Ok(())
}
