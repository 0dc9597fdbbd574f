//! Optional second cache tier behind the in-process cache.
//!
//! Backends store opaque bytes; values are `bincode` encodings of
//! [`MaskedResult`]. Every failure is reported as [`CacheUnavailableError`]
//! and the caller falls back to computing the result.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::errors::CacheUnavailableError;
use crate::result::MaskedResult;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheUnavailableError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheUnavailableError>;
}

pub fn encode_result(result: &MaskedResult) -> Result<Vec<u8>, CacheUnavailableError> {
    bincode::serde::encode_to_vec(result, bincode::config::standard())
        .map_err(|e| CacheUnavailableError(format!("failed to encode cached value: {}", e)))
}

pub fn decode_result(bytes: &[u8]) -> Result<MaskedResult, CacheUnavailableError> {
    bincode::serde::decode_from_slice::<MaskedResult, _>(bytes, bincode::config::standard())
        .map(|(result, _)| result)
        .map_err(|e| CacheUnavailableError(format!("failed to decode cached value: {}", e)))
}

/// Process-local backend, useful for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheUnavailableError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheUnavailableError("in-memory backend lock poisoned".to_string()))?;
        let now = Instant::now();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheUnavailableError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheUnavailableError("in-memory backend lock poisoned".to_string()))?;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}
