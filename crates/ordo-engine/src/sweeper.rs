//! # Expiration Sweeper
//!
//! Background task that wakes on an interval and expires pending orders
//! whose reservation window has elapsed.
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                     ExpirationSweeper                        │
//!   │                                                              │
//!   │   every sweep_interval (default 5 min):                      │
//!   │     1. SELECT pending orders WHERE expires_at <= now         │
//!   │     2. per order: close as EXPIRED + release stock           │
//!   │        (one transaction each; one failure skips one order)   │
//!   │     3. publish an Expired event per success                  │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sweeper is a safety net, not the only enforcement: a pay attempt on
//! an overdue order expires it inline. A crashed or slow sweeper therefore
//! delays stock release but never allows paying a dead reservation.

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::error::{OrderError, OrderResult};
use crate::service::OrderService;

/// Periodically expires overdue orders.
pub struct ExpirationSweeper {
    service: OrderService,
    config: EngineConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running sweeper.
#[derive(Clone)]
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Triggers graceful shutdown. The sweeper finishes the sweep it is in
    /// the middle of, if any, before exiting.
    pub async fn shutdown(&self) -> OrderResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| OrderError::Db(ordo_db::DbError::Internal(
                "sweeper already stopped".to_string(),
            )))
    }
}

impl ExpirationSweeper {
    /// Creates a sweeper and its shutdown handle.
    pub fn new(service: OrderService, config: EngineConfig) -> (Self, SweeperHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let sweeper = ExpirationSweeper {
            service,
            config,
            shutdown_rx,
        };

        (sweeper, SweeperHandle { shutdown_tx })
    }

    /// Runs the sweep loop. Spawn this as a background task:
    ///
    /// ```rust,ignore
    /// let (sweeper, handle) = ExpirationSweeper::new(service, config);
    /// tokio::spawn(sweeper.run());
    /// // ... later ...
    /// handle.shutdown().await?;
    /// ```
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.sweep_interval_secs,
            "Expiration sweeper starting"
        );

        let mut interval = tokio::time::interval(self.config.sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; clear any backlog from downtime.
        interval.tick().await;
        self.sweep().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Expiration sweeper shutting down");
                    break;
                }
            }
        }
    }

    async fn sweep(&self) {
        match self.service.expire_due_orders().await {
            Ok(0) => debug!("Sweep found nothing to expire"),
            Ok(expired) => info!(expired, "Sweep expired overdue orders"),
            // Per-order failures are handled inside expire_due_orders; this
            // is the batch query itself failing. Next tick retries.
            Err(e) => error!(error = %e, "Sweep failed"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
