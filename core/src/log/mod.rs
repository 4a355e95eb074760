//! Process-wide logging setup built on `log` + `log4rs`.
//!
//! The engine never configures `log4rs` through its YAML/file config path;
//! everything is built programmatically from [`EngineConfig`](https://docs.rs/aggregator-types)
//! so a single `--log-level`/config file knob governs both the console and
//! (optional) rolling file appender.

mod appender;
mod consts;

use appender::AppenderSpec;
use log::LevelFilter;
use log4rs::config::{Config, Root};
use std::str::FromStr;

/// Initializes a console-only logger at the given level. Intended for tests
/// and short-lived tools; `aggregator-server` uses [`init_logger`] instead so
/// it can also attach a rolling file appender.
pub fn init_console_logger(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let mut console = AppenderSpec::console("console", None);
    let config = Config::builder()
        .appender(console.appender())
        .build(Root::builder().appender("console").build(level))
        .expect("static logger config must build");
    let _ = log4rs::init_config(config);
}

/// Initializes console logging and, if `log_dir` is `Some`, a rolling file
/// appender writing `file_name` under it. Returns an error only if the
/// log4rs config itself is rejected (e.g. an unwritable log directory) —
/// this is a startup-fatal condition (spec §7 kind 5).
pub fn init_logger(level: &str, log_dir: Option<&str>, file_name: &str) -> Result<(), log4rs::config::Errors> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let mut console = AppenderSpec::console("console", None);

    let mut builder = Config::builder().appender(console.appender());
    let mut root = Root::builder().appender("console");

    if let Some(log_dir) = log_dir {
        let mut file = AppenderSpec::roller("file", None, log_dir, file_name);
        builder = builder.appender(file.appender());
        root = root.appender("file");
    }

    let config = builder.build(root.build(level))?;
    let _ = log4rs::init_config(config);
    Ok(())
}
