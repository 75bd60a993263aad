// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_time::Instant;
use log::{LevelFilter, Metadata, Record};

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let ms = Instant::now().as_millis();
            rtt_target::rprintln!("{:>6}.{:03} {:<5} {}",
                ms / 1000, ms % 1000, record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: Logger = Logger;

pub fn init_logging() {
    rtt_target::rtt_init_print!(NoBlockSkip, 4096);
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Debug);
}
