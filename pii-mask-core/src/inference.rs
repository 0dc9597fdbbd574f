//! inference.rs - Bounded session pool in front of the NER engine.
//!
//! At most `sessions` calls run at once. Requests that find every session
//! busy wait in a queue of at most `max_queue_depth`; beyond that they are
//! rejected immediately with [`InferenceError::Overloaded`]. Each call is
//! bounded by a timeout. A failed call is retried once on a freshly created
//! handle and the second failure is returned to the caller.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Semaphore, TryAcquireError};
use tokio::time::Duration;

use crate::config::InferenceConfig;
use crate::engine::{NerEngine, NerEngineFactory};
use crate::errors::InferenceError;
use crate::tagging::TaggedToken;

pub struct InferencePool {
    factory: Arc<dyn NerEngineFactory>,
    idle: Mutex<Vec<Arc<dyn NerEngine>>>,
    permits: Arc<Semaphore>,
    waiting: AtomicUsize,
    max_queue_depth: usize,
    timeout: Duration,
}

impl std::fmt::Debug for InferencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePool")
            .field("available_sessions", &self.permits.available_permits())
            .field("waiting", &self.waiting.load(Ordering::Relaxed))
            .field("max_queue_depth", &self.max_queue_depth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Decrements the wait counter even if the waiting caller is cancelled.
struct QueueSlot<'a>(&'a AtomicUsize);

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl InferencePool {
    pub fn new(factory: Arc<dyn NerEngineFactory>, config: &InferenceConfig) -> Self {
        Self {
            factory,
            idle: Mutex::new(Vec::new()),
            permits: Arc::new(Semaphore::new(config.sessions.max(1))),
            waiting: AtomicUsize::new(0),
            max_queue_depth: config.max_queue_depth,
            timeout: config.timeout(),
        }
    }

    /// Requests currently waiting for a session.
    pub fn queue_depth(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    pub async fn infer(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        let _permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => {
                return Err(InferenceError::Unavailable("session pool closed".to_string()))
            }
            Err(TryAcquireError::NoPermits) => {
                let queued = self.waiting.fetch_add(1, Ordering::AcqRel);
                let _slot = QueueSlot(&self.waiting);
                if queued >= self.max_queue_depth {
                    warn!("Inference queue full ({} waiting); rejecting request.", queued);
                    return Err(InferenceError::Overloaded(queued));
                }
                Arc::clone(&self.permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| InferenceError::Unavailable("session pool closed".to_string()))?
            }
        };

        let engine = self.checkout()?;
        match self.call(&engine, text).await {
            Ok(tokens) => {
                self.checkin(engine);
                Ok(tokens)
            }
            Err(first) => {
                warn!("Inference on '{}' failed ({}); retrying with a fresh handle.", engine.name(), first);
                drop(engine);
                let fresh = self.factory.create()?;
                let tokens = self.call(&fresh, text).await?;
                self.checkin(fresh);
                Ok(tokens)
            }
        }
    }

    async fn call(&self, engine: &Arc<dyn NerEngine>, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        match tokio::time::timeout(self.timeout, engine.infer(text)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout(self.timeout)),
        }
    }

    fn checkout(&self) -> Result<Arc<dyn NerEngine>, InferenceError> {
        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        match idle {
            Some(engine) => Ok(engine),
            None => {
                debug!("Creating a new inference session.");
                self.factory.create()
            }
        }
    }

    fn checkin(&self, engine: Arc<dyn NerEngine>) {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).push(engine);
    }
}
