// pii-mask-core/src/engine.rs
//! Defines the contract for the external tokenizer and NER engine.
//!
//! The masking pipeline never talks to a concrete model. It sees an
//! [`NerEngine`] handle that turns text into BIO-tagged tokens, and an
//! [`NerEngineFactory`] that can produce a fresh handle when one fails. The
//! built-in dictionary tagger implements the same trait.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::InferenceError;
use crate::tagging::TaggedToken;

/// A handle to a tokenizer+NER engine session.
///
/// `infer` must be idempotent: the same text yields the same tokens. Token
/// offsets are chars of the text passed in.
#[async_trait]
pub trait NerEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn infer(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError>;
}

/// Creates engine handles, e.g. by loading a model session.
pub trait NerEngineFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn NerEngine>, InferenceError>;
}

impl<F> NerEngineFactory for F
where
    F: Fn() -> Result<Arc<dyn NerEngine>, InferenceError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn NerEngine>, InferenceError> {
        self()
    }
}

/// Factory that hands out clones of one shared handle.
pub struct SharedEngineFactory {
    engine: Arc<dyn NerEngine>,
}

impl SharedEngineFactory {
    pub fn new(engine: Arc<dyn NerEngine>) -> Self {
        Self { engine }
    }
}

impl NerEngineFactory for SharedEngineFactory {
    fn create(&self) -> Result<Arc<dyn NerEngine>, InferenceError> {
        Ok(Arc::clone(&self.engine))
    }
}
