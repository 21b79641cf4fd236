//! Sync coordinator: connection lifecycle to the remote store, the
//! standing auto-sync timer, and the reconcile pass scheduled after
//! local saves. All timers are cooperative deadlines driven by `tick`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::port::{RemoteConfig, SyncReport, SyncTransport};
use crate::sched::Debounce;

/// Quiet period after a successful save before a reconcile sync runs.
pub const RECONCILE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Where the connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    /// Initial state, and the state after an explicit disconnect.
    Disconnected,
    Checking,
    Connected,
    Failed,
    NoConfig,
}

/// Error type for sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote store is not connected")]
    NotConnected,
    #[error("no remote configuration stored")]
    NoConfig,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("schema check failed: {0}")]
    Schema(String),
    #[error("sync failed: {0}")]
    Remote(String),
}

/// Parse an auto-sync interval spec: `<N>m` or `<N>h`. Anything else —
/// `"0"`, empty, malformed — means disabled (zero).
pub fn parse_auto_sync_interval(spec: &str) -> Duration {
    let Some(caps) = Regex::new(r"^([0-9]+)([mh])$")
        .ok()
        .and_then(|re| re.captures(spec))
    else {
        return Duration::ZERO;
    };
    let Ok(n) = caps[1].parse::<u64>() else {
        return Duration::ZERO;
    };
    match &caps[2] {
        "m" => Duration::from_secs(n * 60),
        _ => Duration::from_secs(n * 3600),
    }
}

/// Render an interval for status output.
pub fn format_auto_sync_interval(interval: Duration) -> String {
    let minutes = interval.as_secs() / 60;
    if minutes == 0 {
        "disabled".to_string()
    } else if minutes % 60 == 0 {
        format!("every {} h", minutes / 60)
    } else {
        format!("every {} min", minutes)
    }
}

/// Snapshot of the coordinator's state for status queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub status: ConnectionStatus,
    pub is_syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub auto_sync: String,
}

pub struct SyncCoordinator<T: SyncTransport> {
    transport: T,
    status: ConnectionStatus,
    is_syncing: bool,
    last_sync: Option<DateTime<Utc>>,
    last_error: Option<String>,
    /// Zero = auto-sync disabled.
    auto_interval: Duration,
    /// Deadline of the standing interval timer; armed only while connected.
    next_auto: Option<Instant>,
    /// One-shot reconcile pass after a successful local save.
    reconcile: Debounce,
}

impl<T: SyncTransport> SyncCoordinator<T> {
    pub fn new(transport: T) -> Self {
        SyncCoordinator {
            transport,
            status: ConnectionStatus::Disconnected,
            is_syncing: false,
            last_sync: None,
            last_error: None,
            auto_interval: Duration::ZERO,
            next_auto: None,
            reconcile: Debounce::new(RECONCILE_DEBOUNCE),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn auto_interval(&self) -> Duration {
        self.auto_interval
    }

    pub fn snapshot(&self) -> SyncStatus {
        SyncStatus {
            status: self.status,
            is_syncing: self.is_syncing,
            last_sync: self.last_sync,
            error: self.last_error.clone(),
            auto_sync: format_auto_sync_interval(self.auto_interval),
        }
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Run the startup/reconnect sequence: probe, connect, check schema.
    /// `config` is the stored connection configuration, if any.
    pub fn connect(&mut self, config: Option<&RemoteConfig>, now: Instant) -> ConnectionStatus {
        self.status = ConnectionStatus::Checking;
        self.disarm();

        let Some(config) = config else {
            self.status = ConnectionStatus::NoConfig;
            return self.status;
        };

        match self.transport.test_connection(config) {
            Ok(true) => {}
            Ok(false) => {
                self.status = ConnectionStatus::Failed;
                return self.status;
            }
            Err(e) => {
                self.last_error = Some(SyncError::Connection(e.0).to_string());
                self.status = ConnectionStatus::Failed;
                return self.status;
            }
        }

        if let Err(e) = self.transport.connect(config) {
            self.last_error = Some(SyncError::Connection(e.0).to_string());
            self.status = ConnectionStatus::Failed;
            return self.status;
        }
        if let Err(e) = self.transport.ensure_schema() {
            self.last_error = Some(SyncError::Schema(e.0).to_string());
            self.status = ConnectionStatus::Failed;
            return self.status;
        }

        self.status = ConnectionStatus::Connected;
        self.last_error = None;
        self.arm(now);
        self.status
    }

    /// Explicit disconnect: timers cleared, session state reset. The
    /// stored configuration and auto-sync interval are kept.
    pub fn disconnect(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.is_syncing = false;
        self.last_error = None;
        self.disarm();
    }

    /// Apply an auto-sync interval spec. While connected the standing
    /// timer is torn down and re-armed immediately; while disconnected
    /// the interval is only stored, to be armed on the next connect.
    pub fn set_auto_sync(&mut self, spec: &str, now: Instant) {
        self.auto_interval = parse_auto_sync_interval(spec);
        if self.status == ConnectionStatus::Connected {
            self.disarm();
            self.arm(now);
        }
    }

    fn arm(&mut self, now: Instant) {
        if self.auto_interval > Duration::ZERO {
            self.next_auto = Some(now + self.auto_interval);
        }
    }

    fn disarm(&mut self) {
        self.next_auto = None;
        self.reconcile.cancel();
    }

    // -----------------------------------------------------------------------
    // Sync execution
    // -----------------------------------------------------------------------

    /// Run one sync pass. Only callable while connected; the transport is
    /// never touched otherwise. `is_syncing` is cleared on every exit
    /// path.
    pub fn start_sync(&mut self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        if self.status != ConnectionStatus::Connected {
            return Err(SyncError::NotConnected);
        }

        self.is_syncing = true;
        self.last_error = None;
        let result = self.transport.run_sync();
        self.is_syncing = false;

        match result {
            Ok(report) => {
                if report.success {
                    self.last_sync = Some(now);
                } else {
                    self.last_error = Some(report.message.clone());
                }
                Ok(report)
            }
            Err(e) => {
                let err = SyncError::Remote(e.0);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// A local save completed successfully: schedule a reconcile pass if
    /// auto-sync is enabled and the connection is usable.
    pub fn notify_saved(&mut self, now: Instant) {
        if self.status == ConnectionStatus::Connected
            && self.auto_interval > Duration::ZERO
            && !self.is_syncing
        {
            self.reconcile.trigger(now);
        }
    }

    /// Drive the timers. Returns true when an interval-driven sync pulled
    /// remote changes and the caller should reload local task data.
    pub fn tick(
        &mut self,
        now: Instant,
        now_utc: DateTime<Utc>,
        config: Option<&RemoteConfig>,
    ) -> bool {
        let mut reload = false;

        let interval_due = matches!(self.next_auto, Some(due) if now >= due);
        if interval_due {
            if self.status == ConnectionStatus::Connected {
                // Keep the interval ticking whether or not this firing runs.
                self.next_auto = Some(now + self.auto_interval);
                if !self.is_syncing {
                    reload = self.perform_auto_sync(config, now, now_utc);
                }
            } else {
                // Timer should not outlive the connection.
                self.next_auto = None;
            }
        }

        if self.reconcile.fire(now)
            && self.status == ConnectionStatus::Connected
            && !self.is_syncing
        {
            // Reconcile failures are recorded in last_error by start_sync.
            let _ = self.start_sync(now_utc);
        }

        reload
    }

    /// The interval firing re-establishes the connection first, so a
    /// remote that went away since the last pass downgrades the status
    /// instead of erroring through a dead handle.
    fn perform_auto_sync(
        &mut self,
        config: Option<&RemoteConfig>,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) -> bool {
        if self.connect(config, now) != ConnectionStatus::Connected {
            return false;
        }
        matches!(self.start_sync(now_utc), Ok(report) if report.success)
    }
}
