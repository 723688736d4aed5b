//! WindowClock: wall-clock time → window identifier and log locations.
//!
//! The rotation job names its output from the time it rotates, so the
//! pipeline predicts file names instead of watching the filesystem:
//!
//! ```text
//! request log: <request_root>/201401060920.log
//! access log:  <detail_root>/2014_5m/20140106/2014010609/caccess_f5_20140106_0920.log
//! ```
//!
//! The access log's directory is derived from a clock shifted back by a fixed
//! skew, because that log is finalized a few seconds after the boundary and
//! its directory belongs to the hour that just ended. The file name still uses
//! the unshifted time.
//!
//! Nothing here performs I/O; callers pass the current instant in.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};

use crate::error::NotReady;
use crate::types::{LogLocation, Window, WindowId};

/// Rotation period of the source logs, in minutes.
pub const WINDOW_MINUTES: u32 = 5;

/// How far the access-log directory clock lags the request log.
pub const DEFAULT_DETAIL_SKEW: Duration = Duration::from_secs(20);

/// File-name prefix of the access log.
pub const DEFAULT_DETAIL_PREFIX: &str = "caccess_f5_";

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" for the orchestrator.
///
/// Production uses [`SystemClock`]; an event-driven trigger or a test can
/// supply any other instant.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, matching the rotation job's naming.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

// ---------------------------------------------------------------------------
// Window derivation
// ---------------------------------------------------------------------------

/// Render the window identifier for `now`, or explain why there is none.
pub fn window_id(now: NaiveDateTime) -> Result<WindowId, NotReady> {
    check_boundary(now)?;
    Ok(WindowId::new(now.format("%Y%m%d%H%M").to_string()))
}

fn check_boundary(now: NaiveDateTime) -> Result<(), NotReady> {
    let minute = now.minute();
    if minute % WINDOW_MINUTES == 0 {
        Ok(())
    } else {
        Err(NotReady::NotBoundary { minute })
    }
}

/// Derives [`Window`]s for the configured log roots.
#[derive(Debug, Clone)]
pub struct WindowClock {
    request_root: PathBuf,
    detail_root: PathBuf,
    skew: TimeDelta,
    detail_prefix: String,
}

impl WindowClock {
    pub fn new(request_root: impl Into<PathBuf>, detail_root: impl Into<PathBuf>) -> Self {
        Self {
            request_root: request_root.into(),
            detail_root: detail_root.into(),
            skew: skew_delta(DEFAULT_DETAIL_SKEW),
            detail_prefix: DEFAULT_DETAIL_PREFIX.to_string(),
        }
    }

    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew_delta(skew);
        self
    }

    pub fn with_detail_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.detail_prefix = prefix.into();
        self
    }

    /// Window id and request-log location for `now`.
    pub fn coarse_window(&self, now: NaiveDateTime) -> Result<(WindowId, LogLocation), NotReady> {
        let id = window_id(now)?;
        let location = LogLocation::new(&self.request_root, format!("{id}.log"));
        Ok((id, location))
    }

    /// Access-log location for `now`: directory from the skewed clock, file
    /// name from the unskewed one.
    pub fn detail_window(&self, now: NaiveDateTime) -> Result<LogLocation, NotReady> {
        check_boundary(now)?;
        let skewed = now.checked_sub_signed(self.skew).unwrap_or(now);
        let dir = self
            .detail_root
            .join(skewed.format("%Y_5m").to_string())
            .join(skewed.format("%Y%m%d").to_string())
            .join(skewed.format("%Y%m%d%H").to_string());
        let file_name = format!("{}{}.log", self.detail_prefix, now.format("%Y%m%d_%H%M"));
        Ok(LogLocation::new(dir, file_name))
    }

    /// Both locations for `now`.
    pub fn window(&self, now: NaiveDateTime) -> Result<Window, NotReady> {
        let (id, coarse) = self.coarse_window(now)?;
        let detail = self.detail_window(now)?;
        Ok(Window { id, coarse, detail })
    }
}

fn skew_delta(skew: Duration) -> TimeDelta {
    // A skew longer than a day would name a directory for the wrong date range.
    TimeDelta::seconds(skew.as_secs().min(86_400) as i64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
