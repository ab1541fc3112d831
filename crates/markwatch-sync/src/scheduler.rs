//! Sync scheduler - turns timers and tree mutations into refresh requests
//!
//! The [`SyncScheduler`] owns two triggers:
//!
//! - a **periodic** trigger every `interval` minutes (`0` disables it)
//! - a **debounce** trigger that fires once a burst of tree mutation events
//!   has been quiet for the debounce delay (500ms by default)
//!
//! ## Flow
//!
//! ```text
//! tree provider ──→ SchedulerHandle ──→ mpsc ──→ SyncScheduler ──→ Refresher::refresh()
//! storage observer ─┘                               │
//!                                          periodic interval / debounce deadline
//! ```
//!
//! Each mutation event moves the single debounce deadline forward instead of
//! arming another timer, so only the last event of a burst counts. Setting
//! the interval always replaces the current periodic timer, and the first
//! periodic tick comes one full period after the change.
//!
//! Refreshes are spawned rather than awaited; overlapping triggers are
//! folded together by the engine's single-flight guard.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use markwatch_core::domain::StorageKey;
use markwatch_core::ports::{
    IStorageObserver, ITreeObserver, StorageChange, TreeEvent, LOCAL_AREA,
};

use crate::engine::Refresher;
use crate::storage::{decode_interval, StorageService};

/// Default quiet period after a tree mutation
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

// ============================================================================
// Commands and handle
// ============================================================================

/// Requests accepted by a running [`SyncScheduler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Replace the periodic trigger (`0` disables it)
    SetInterval(u32),
    /// A tree mutation happened; restart the debounce delay
    TreeChanged(TreeEvent),
    /// Refresh immediately, bypassing both triggers
    RefreshNow,
    /// Stop the scheduler loop
    Shutdown,
}

/// Cloneable sender side of a [`SyncScheduler`]
///
/// Also acts as the tree observer and the `syncInterval` storage observer,
/// so it can be handed straight to the provider and the structured store.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    fn send(&self, command: SchedulerCommand) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                debug!(command = ?e.0, "Scheduler is not running");
                false
            }
        }
    }

    /// Replaces the periodic trigger; returns false if the scheduler stopped
    pub fn set_interval(&self, minutes: u32) -> bool {
        self.send(SchedulerCommand::SetInterval(minutes))
    }

    /// Reports a tree mutation
    pub fn tree_changed(&self, event: TreeEvent) -> bool {
        self.send(SchedulerCommand::TreeChanged(event))
    }

    /// Requests an immediate refresh
    pub fn request_refresh(&self) -> bool {
        self.send(SchedulerCommand::RefreshNow)
    }

    /// Asks the scheduler loop to stop
    pub fn shutdown(&self) -> bool {
        self.send(SchedulerCommand::Shutdown)
    }
}

impl ITreeObserver for SchedulerHandle {
    fn on_tree_event(&self, event: TreeEvent) {
        self.tree_changed(event);
    }
}

impl IStorageObserver for SchedulerHandle {
    fn on_changed(&self, changes: &[StorageChange], area: &str) {
        if area != LOCAL_AREA {
            return;
        }
        let Some(change) = changes.iter().find(|c| c.key == StorageKey::SyncInterval) else {
            return;
        };
        match change.new_value.as_ref().and_then(decode_interval) {
            Some(minutes) => {
                info!(minutes, "Sync interval changed in storage");
                self.set_interval(minutes);
            }
            None => warn!(value = ?change.new_value, "Ignoring unreadable sync interval"),
        }
    }
}

// ============================================================================
// SyncScheduler
// ============================================================================

enum Wake {
    Command(Option<SchedulerCommand>),
    Periodic,
    Debounce,
}

/// Runs periodic and debounced refreshes against a [`Refresher`]
pub struct SyncScheduler {
    refresher: Arc<dyn Refresher>,
    commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    debounce: Duration,
    interval_minutes: u32,
    periodic: Option<Interval>,
    debounce_deadline: Option<Instant>,
}

impl SyncScheduler {
    /// Creates a new `SyncScheduler` with no periodic trigger
    ///
    /// # Arguments
    /// * `refresher` - Target of every trigger
    /// * `debounce` - Quiet period required after the last tree mutation
    ///
    /// # Returns
    /// The scheduler, to be driven by [`run`](Self::run), and a handle for
    /// sending it commands.
    pub fn new(refresher: Arc<dyn Refresher>, debounce: Duration) -> (Self, SchedulerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();

        info!(
            debounce_ms = debounce.as_millis() as u64,
            "Creating sync scheduler"
        );

        let scheduler = Self {
            refresher,
            commands,
            debounce,
            interval_minutes: 0,
            periodic: None,
            debounce_deadline: None,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Returns the active periodic interval in minutes (0 = disabled)
    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    fn apply_interval(&mut self, minutes: u32) {
        self.interval_minutes = minutes;
        self.periodic = if minutes == 0 {
            info!("Periodic sync disabled");
            None
        } else {
            let period = Duration::from_secs(u64::from(minutes) * 60);
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(minutes, "Periodic sync scheduled");
            Some(interval)
        };
    }

    fn trigger(&self, reason: &'static str) {
        debug!(reason, "Triggering refresh");
        let refresher = self.refresher.clone();
        tokio::spawn(async move {
            let outcome = refresher.refresh().await;
            debug!(reason, ?outcome, "Scheduled refresh finished");
        });
    }

    /// Main event loop
    ///
    /// Runs until [`SchedulerHandle::shutdown`] is called or every handle has
    /// been dropped. A pending debounce is discarded on shutdown.
    pub async fn run(mut self) {
        info!("Sync scheduler starting");

        loop {
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                _ = next_tick(&mut self.periodic) => Wake::Periodic,
                _ = deadline_reached(self.debounce_deadline) => Wake::Debounce,
            };

            match wake {
                Wake::Command(None) | Wake::Command(Some(SchedulerCommand::Shutdown)) => break,
                Wake::Command(Some(SchedulerCommand::SetInterval(minutes))) => {
                    self.apply_interval(minutes);
                }
                Wake::Command(Some(SchedulerCommand::TreeChanged(event))) => {
                    debug!(?event, "Tree changed, restarting debounce");
                    self.debounce_deadline = Some(Instant::now() + self.debounce);
                }
                Wake::Command(Some(SchedulerCommand::RefreshNow)) => self.trigger("manual"),
                Wake::Periodic => self.trigger("periodic"),
                Wake::Debounce => {
                    self.debounce_deadline = None;
                    self.trigger("debounce");
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}

async fn next_tick(periodic: &mut Option<Interval>) {
    match periodic {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Interval settings
// ============================================================================

/// Reads the stored `syncInterval` and registers the periodic trigger
///
/// Returns the interval that was applied.
pub async fn init_sync_settings(storage: &StorageService, scheduler: &SchedulerHandle) -> u32 {
    let minutes = storage.sync_interval().await;
    scheduler.set_interval(minutes);
    minutes
}

/// Persists a new interval and reconfigures the scheduler
///
/// The scheduler is reconfigured even if the write fails, so the running
/// process honours the request. Returns whether the write succeeded.
pub async fn update_sync_interval(
    storage: &StorageService,
    scheduler: &SchedulerHandle,
    minutes: u32,
) -> bool {
    let stored = storage
        .set_value(StorageKey::SyncInterval, serde_json::Value::from(minutes))
        .await;
    if !stored {
        warn!(minutes, "Failed to persist sync interval");
    }
    scheduler.set_interval(minutes);
    stored
}
