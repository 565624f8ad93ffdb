//! Fixed-size pool of isolated engine clients.

use std::ops::Deref;
use std::sync::{Mutex, PoisonError};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{info, warn};

use crate::client::EngineClient;
use crate::error::EngineError;
use crate::evaluator::{EvaluationResult, Evaluator, SearchBudget};
use crate::stockfish::EngineOptions;

pub struct EnginePool {
    clients: Vec<EngineClient>,
    /// Indices into `clients` not currently checked out
    idle: Mutex<Vec<usize>>,
    permits: Semaphore,
}

impl EnginePool {
    /// Create `size` clients; each spawns its engine on first use.
    pub fn new(options: EngineOptions, size: usize) -> Self {
        let size = size.max(1);
        let clients = (0..size)
            .map(|_| EngineClient::lazy(options.clone()))
            .collect();
        Self {
            clients,
            idle: Mutex::new((0..size).rev().collect()),
            permits: Semaphore::new(size),
        }
    }

    pub fn size(&self) -> usize {
        self.clients.len()
    }

    /// Spawn every engine now. Failures are logged, not fatal: a client
    /// spawns again on its first query.
    pub async fn warm_up(&self) -> usize {
        let mut started = 0;
        for client in &self.clients {
            match client.new_game().await {
                Ok(()) => started += 1,
                Err(e) => warn!(error = %e, "Engine failed to start during warm-up"),
            }
        }
        info!(started, size = self.size(), "Engine pool warmed up");
        started
    }

    /// Wait for an idle client and take it exclusively.
    pub async fn checkout(&self) -> Result<PooledEngine<'_>, EngineError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EngineError::Unavailable("engine pool closed".into()))?;
        let index = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .ok_or_else(|| EngineError::Unavailable("engine pool exhausted".into()))?;
        Ok(PooledEngine {
            pool: self,
            index,
            _permit: permit,
        })
    }

    /// Stop handing out clients and quit every engine. In-flight queries
    /// finish first.
    pub async fn shutdown(&self) {
        self.permits.close();
        for client in &self.clients {
            client.shutdown().await;
        }
    }
}

/// A client checked out of the pool; returned on drop.
pub struct PooledEngine<'a> {
    pool: &'a EnginePool,
    index: usize,
    _permit: SemaphorePermit<'a>,
}

impl Deref for PooledEngine<'_> {
    type Target = EngineClient;

    fn deref(&self) -> &EngineClient {
        &self.pool.clients[self.index]
    }
}

impl Drop for PooledEngine<'_> {
    fn drop(&mut self) {
        self.pool
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.index);
    }
}

impl Evaluator for PooledEngine<'_> {
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
