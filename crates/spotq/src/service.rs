//! SpotService: transport-agnostic command handling.
//!
//! This service owns:
//! - The spot pool (one mutex around spots + queue, held for a whole command)
//! - Health tracking
//! - Shutdown coordination
//! - Optional delivery of outcome lines to a chat channel
//!
//! Transports (HTTP, chat adapters) hand it `(requester, text)` pairs and relay the
//! returned lines.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinHandle;

use crate::allocation::{
    Outcome, PoolSnapshot, RequesterId, SpotPool, SpotStatus, format_duration,
};
use crate::announcer::{AnnounceError, Announcer};
use crate::command::{COMMAND_HELP, Command};
use crate::config::SpotConfig;
use crate::health::Health;
use crate::version::VersionInfo;

/// Snapshot of service health for transports to query.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub state: Health,
    pub total_spots: usize,
    pub available_spots: usize,
    pub down_spots: usize,
    pub queue_length: usize,
    pub version: VersionInfo,
}

impl HealthSnapshot {
    pub fn is_ready(&self) -> bool {
        self.state == Health::Ready
    }

    /// BUSY state: ready but nothing left to hand out.
    pub fn is_busy(&self) -> bool {
        self.state == Health::Ready && self.available_spots == 0
    }
}

/// Single consumer that posts outcome lines in the order commands ran.
struct Forwarder {
    tx: mpsc::UnboundedSender<Vec<String>>,
    task: JoinHandle<()>,
}

impl Forwarder {
    fn spawn(announcer: Arc<dyn Announcer>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<String>>();
        let task = tokio::spawn(async move {
            while let Some(lines) = rx.recv().await {
                announcer.deliver(&lines).await;
            }
            tracing::debug!("Outcome forwarder drained");
        });
        Self { tx, task }
    }
}

pub struct SpotService {
    pool: StdMutex<SpotPool>,
    config: SpotConfig,

    health: RwLock<Health>,

    announcer: Option<Arc<dyn Announcer>>,
    forwarder: StdMutex<Option<Forwarder>>,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    version: VersionInfo,
}

impl SpotService {
    pub fn new(config: SpotConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            pool: StdMutex::new(SpotPool::new(config.num_spots())),
            config,
            health: RwLock::new(Health::Starting),
            announcer: None,
            forwarder: StdMutex::new(None),
            shutdown_tx,
            shutdown_rx,
            version: VersionInfo::new(),
        }
    }

    /// Attach a chat announcer and start its forwarding task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>) -> Self {
        self.forwarder = StdMutex::new(Some(Forwarder::spawn(Arc::clone(&announcer))));
        self.announcer = Some(announcer);
        self
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    pub fn config(&self) -> &SpotConfig {
        &self.config
    }

    /// Lock the pool. Operations validate before mutating, so a poisoned lock
    /// still guards a consistent pool.
    fn lock_pool(&self) -> MutexGuard<'_, SpotPool> {
        match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Spot pool mutex poisoned - recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Run one command and render its outcome lines.
    pub fn execute(&self, requester: RequesterId, command: Command) -> Vec<String> {
        self.execute_at(requester, command, Utc::now())
    }

    /// Same as [`execute`](Self::execute) with an explicit clock reading.
    pub fn execute_at(
        &self,
        requester: RequesterId,
        command: Command,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut pool = self.lock_pool();
        self.apply(&mut pool, requester, command, now)
    }

    fn apply(
        &self,
        pool: &mut SpotPool,
        requester: RequesterId,
        command: Command,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        if command.is_read_only() {
            tracing::debug!(%requester, ?command, "Executing query");
        } else {
            tracing::info!(%requester, ?command, "Executing command");
        }

        let outcome: Outcome = match command {
            Command::Request => pool.request(requester, now),
            Command::Release => pool.release(requester, now),
            Command::Pass => pool.pass(requester, now),
            Command::Check => Ok(pool.sweep_overdue(self.config.overdue_threshold(), now)),
            Command::Line => return pool.list().lines(),
            Command::SpotDown(spot) => pool.mark_down(spot, &requester, now),
            Command::SpotUp(spot) => pool.mark_up(spot, now),
        };

        match outcome {
            Ok(events) => events.iter().map(ToString::to_string).collect(),
            Err(e) => {
                tracing::debug!(error = %e, "Command rejected");
                vec![e.to_string()]
            }
        }
    }

    /// Parse and run chat text. Unrecognized text returns `None` and touches nothing.
    ///
    /// Lines are also queued for the announcer, if one is configured. Queueing happens
    /// under the pool lock so the chat sees outcomes in the order they were applied.
    pub async fn dispatch(&self, requester: RequesterId, text: &str) -> Option<Vec<String>> {
        let command = Command::parse(text)?;

        let mut pool = self.lock_pool();
        let lines = self.apply(&mut pool, requester, command, Utc::now());
        if !lines.is_empty()
            && let Some(forwarder) = self.lock_forwarder().as_ref()
            && forwarder.tx.send(lines.clone()).is_err()
        {
            tracing::warn!("Outcome forwarder stopped, lines not posted to chat");
        }
        drop(pool);

        Some(lines)
    }

    fn lock_forwarder(&self) -> MutexGuard<'_, Option<Forwarder>> {
        self.forwarder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the forwarding channel and wait until every queued line was delivered.
    async fn drain_forwarder(&self) {
        let forwarder = self.lock_forwarder().take();
        let Some(Forwarder { tx, task }) = forwarder else {
            return;
        };
        drop(tx);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Outcome forwarder task failed");
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.lock_pool().snapshot()
    }

    pub async fn health(&self) -> HealthSnapshot {
        let state = *self.health.read().await;
        let pool = self.lock_pool();

        HealthSnapshot {
            state,
            total_spots: pool.num_spots(),
            available_spots: pool.count(SpotStatus::Available),
            down_spots: pool.count(SpotStatus::Down),
            queue_length: pool.queue().len(),
            version: self.version.clone(),
        }
    }

    pub async fn set_health(&self, health: Health) {
        *self.health.write().await = health;
    }

    /// Post the "online" message and mark the service ready.
    pub async fn announce_online(&self) -> Result<(), AnnounceError> {
        self.set_health(Health::Ready).await;
        let Some(announcer) = &self.announcer else {
            return Ok(());
        };
        announcer.announce(&self.online_message()).await
    }

    /// Flush pending outcome lines, then post the "offline" message. Failures are
    /// logged, not returned.
    pub async fn announce_offline(&self) {
        self.set_health(Health::ShuttingDown).await;
        self.drain_forwarder().await;
        if let Some(announcer) = &self.announcer
            && let Err(e) = announcer.announce(OFFLINE_MESSAGE).await
        {
            tracing::warn!(error = %e, "Could not send shutdown message");
        }
    }

    pub fn online_message(&self) -> String {
        format!(
            "🚗 Parking spot bot is now online with {} spots! Long-occupancy warnings after {}. {}",
            self.config.num_spots(),
            format_duration(self.config.overdue_threshold()),
            COMMAND_HELP
        )
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }
}

pub const OFFLINE_MESSAGE: &str = "🛑 Parking spot bot is now offline. See you next time!";
