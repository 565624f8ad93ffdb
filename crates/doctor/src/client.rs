//! Self-healing handle to one engine process.
//!
//! Queries are serialized through a FIFO mutex. A failed or timed-out query
//! kills the process, spawns a fresh one and is retried once. A query whose
//! caller was dropped mid-search leaves the slot dirty; the next query stops
//! and drains the old search first, or restarts the process if that fails.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::evaluator::{EvaluationResult, Evaluator, SearchBudget};
use crate::stockfish::{EngineOptions, StockfishProcess};

/// Time allowed to stop and drain an abandoned search before restarting
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Default)]
struct Slot {
    process: Option<StockfishProcess>,
    /// A query started and never finished
    dirty: bool,
}

pub struct EngineClient {
    options: EngineOptions,
    slot: Mutex<Slot>,
}

impl EngineClient {
    /// Create a client that spawns its process on first use.
    pub fn lazy(options: EngineOptions) -> Self {
        Self {
            options,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Create a client and spawn the engine right away.
    pub async fn start(options: EngineOptions) -> Result<Self, EngineError> {
        let client = Self::lazy(options);
        {
            let mut slot = client.slot.lock().await;
            client.ensure_process(&mut slot).await?;
        }
        Ok(client)
    }

    /// Evaluate a position, restarting the engine and retrying once on failure.
    pub async fn evaluate(
        &self,
        fen: &str,
        budget: &SearchBudget,
    ) -> Result<EvaluationResult, EngineError> {
        let mut slot = self.slot.lock().await;
        match self.try_evaluate(&mut slot, fen, budget).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(error = %e, fen, "Engine query failed, restarting engine");
                restart(&mut slot);
                self.try_evaluate(&mut slot, fen, budget).await.map_err(|e| {
                    restart(&mut slot);
                    e
                })
            }
        }
    }

    /// Send `ucinewgame`, restarting the engine once on failure.
    pub async fn new_game(&self) -> Result<(), EngineError> {
        let mut slot = self.slot.lock().await;
        match self.try_new_game(&mut slot).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Engine reset failed, restarting engine");
                restart(&mut slot);
                self.try_new_game(&mut slot).await
            }
        }
    }

    /// Quit the engine process gracefully.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(mut process) = slot.process.take() {
            process.quit().await;
            info!(path = %self.options.path.display(), "Engine shut down");
        }
        slot.dirty = false;
    }

    async fn try_evaluate(
        &self,
        slot: &mut Slot,
        fen: &str,
        budget: &SearchBudget,
    ) -> Result<EvaluationResult, EngineError> {
        self.prepare(slot).await?;
        let Some(process) = slot.process.as_mut() else {
            return Err(not_running());
        };
        slot.dirty = true;
        let result = timeout(self.options.timeout, process.search(fen, budget))
            .await
            .map_err(|_| EngineError::Timeout(self.options.timeout))??;
        slot.dirty = false;
        Ok(result)
    }

    async fn try_new_game(&self, slot: &mut Slot) -> Result<(), EngineError> {
        self.prepare(slot).await?;
        let Some(process) = slot.process.as_mut() else {
            return Err(not_running());
        };
        slot.dirty = true;
        timeout(self.options.timeout, process.new_game())
            .await
            .map_err(|_| EngineError::Timeout(self.options.timeout))??;
        slot.dirty = false;
        Ok(())
    }

    /// Leave the slot with a live process and no search in flight.
    async fn prepare(&self, slot: &mut Slot) -> Result<(), EngineError> {
        if slot.dirty {
            let drained = match slot.process.as_mut() {
                Some(process) => matches!(timeout(DRAIN_GRACE, process.stop()).await, Ok(Ok(()))),
                None => false,
            };
            if !drained {
                debug!("Abandoned search did not drain, restarting engine");
                restart(slot);
            }
            slot.dirty = false;
        }
        self.ensure_process(slot).await
    }

    async fn ensure_process(&self, slot: &mut Slot) -> Result<(), EngineError> {
        if slot.process.is_none() {
            let process = timeout(self.options.timeout, StockfishProcess::spawn(&self.options))
                .await
                .map_err(|_| EngineError::Timeout(self.options.timeout))??;
            info!(path = %self.options.path.display(), "Engine started");
            slot.process = Some(process);
        }
        Ok(())
    }
}

fn not_running() -> EngineError {
    EngineError::Unavailable("engine is not running".into())
}

/// Drop the current process (killing it) so the next query spawns a new one.
fn restart(slot: &mut Slot) {
    slot.process = None;
    slot.dirty = false;
}

impl Evaluator for EngineClient {
    async fn evaluate(
        &self,
        fen: &str,
        budget: &SearchBudget,
    ) -> Result<EvaluationResult, EngineError> {
        EngineClient::evaluate(self, fen, budget).await
    }

    async fn new_game(&self) -> Result<(), EngineError> {
        EngineClient::new_game(self).await
    }
}
