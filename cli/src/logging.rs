//! stderr logger for the host tool

use std::io::Write;

use anyhow::{anyhow, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};

pub const LOG_ENV: &str = "M65FDISK_LOG";

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        let _ = writeln!(std::io::stderr().lock(), "[{}] {}", tag, record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Level from `-v`/`-q` counts; `M65FDISK_LOG` wins when set.
pub fn level_from(verbose: u8, quiet: bool) -> Result<LevelFilter> {
    match std::env::var(LOG_ENV) {
        Ok(raw) => raw
            .parse::<LevelFilter>()
            .map_err(|_| anyhow!("{LOG_ENV} must be one of off|error|warn|info|debug|trace")),
        Err(std::env::VarError::NotPresent) => Ok(if quiet {
            LevelFilter::Warn
        } else {
            match verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }),
        Err(err) => Err(anyhow!("{LOG_ENV} invalid: {err}")),
    }
}

pub fn init(level: LevelFilter) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|err| anyhow!("logger already installed: {err}"))?;
    log::set_max_level(level);
    Ok(())
}
