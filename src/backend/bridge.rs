//! Bridge from the `log` facade into `tracing`.
//!
//! Libraries that still log through `log` reach the live graph through
//! `tracing-log`'s `LogTracer`. The `log` logger can be set only once per
//! process, so reinstalling the bridge means re-applying its max level from
//! the freshly installed graph.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing_log::{AsLog, LogTracer};

#[derive(Debug)]
pub struct LegacyBridge {
    /// Whether this bridge owns the process-wide `log` logger.
    attached: bool,
    level: Mutex<LevelFilter>,
    installs: AtomicUsize,
}

impl LegacyBridge {
    /// A bridge that tracks its level without touching process globals.
    pub fn detached() -> Self {
        Self {
            attached: false,
            level: Mutex::new(LevelFilter::OFF),
            installs: AtomicUsize::new(0),
        }
    }

    /// Route the `log` facade into `tracing` for this process.
    pub fn attach() -> Result<Self, log::SetLoggerError> {
        LogTracer::init()?;
        log::set_max_level(log::LevelFilter::Off);
        Ok(Self {
            attached: true,
            ..Self::detached()
        })
    }

    /// Reinstall against a graph whose most verbose level is `level`.
    pub fn reinstall(&self, level: LevelFilter) {
        self.set_level(level);
        self.installs.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(level = %level, attached = self.attached, "Legacy log bridge reinstalled");
    }

    /// Stop forwarding records.
    pub fn silence(&self) {
        self.set_level(LevelFilter::OFF);
    }

    pub fn level(&self) -> LevelFilter {
        *self.level.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many times the bridge has been (re)installed.
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::Relaxed)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    fn set_level(&self, level: LevelFilter) {
        *self.level.lock().unwrap_or_else(PoisonError::into_inner) = level;
        if self.attached {
            log::set_max_level(level.as_log());
        }
    }
}
