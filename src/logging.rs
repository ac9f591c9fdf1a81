//! Tracing initialization.
//! Builds a subscriber with EnvFilter and either compact or JSON formatting on stderr.
//!
//! Behavior:
//! - Log level is driven by LogLevel; `RUST_LOG`, when set, takes precedence.
//! - If a global subscriber is already installed (by the host application or an
//!   earlier call) it is left in place and an error is returned.
//!
//! The library itself only emits events; calling `init_tracing` is optional.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt as stdfmt;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogLevel};

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%d/%m/%y %H:%M:%S"))
    }
}

/// Map our verbosity onto a tracing level.
#[inline]
pub fn to_level_filter(lvl: &LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

fn env_filter_for(lvl: &LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(to_level_filter(lvl).into())
        .from_env_lossy()
}

/// Install a global subscriber for `lvl`.
pub fn init_tracing(lvl: &LogLevel, json: bool) -> Result<()> {
    let env_filter = env_filter_for(lvl);
    let installed = if json {
        let layer = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_level(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);
        registry().with(env_filter).with(layer).try_init()
    } else {
        let layer = tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_level(true)
            .with_target(true)
            .with_thread_ids(true)
            .compact()
            .with_writer(std::io::stderr);
        registry().with(env_filter).with(layer).try_init()
    };
    installed.context("a global tracing subscriber is already installed")
}

/// [`init_tracing`] with the level and format from `cfg`.
pub fn init_from_config(cfg: &Config) -> Result<()> {
    init_tracing(&cfg.log_level, cfg.json_logs)
}
