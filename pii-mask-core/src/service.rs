// pii-mask-core/src/service.rs
//! The async masking service: validation, cache, pipeline and stats wired
//! together behind one cloneable handle.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, info, warn};
use std::sync::Arc;

use crate::cache::{CacheBackend, CacheKey, CacheStats, ResponseCache};
use crate::config::MaskingConfig;
use crate::engine::{NerEngineFactory, SharedEngineFactory};
use crate::engines::gazetteer_tagger::GazetteerEngine;
use crate::errors::MaskError;
use crate::inference::InferencePool;
use crate::patterns::PatternRegistry;
use crate::pipeline::MaskingPipeline;
use crate::request::{validate_text, MaskRequest, MaskResponse};
use crate::result::MaskedResult;
use crate::stats::{StatsEvent, StatsPublisher};

struct ServiceInner {
    config: MaskingConfig,
    pipeline: MaskingPipeline,
    inference: InferencePool,
    cache: Option<ResponseCache>,
    stats: StatsPublisher,
}

impl ServiceInner {
    async fn compute(&self, text: &str) -> Result<MaskedResult, MaskError> {
        let output = self.pipeline.run(text, &self.inference).await?;
        if self.stats.is_enabled() {
            let event = StatsEvent::new(
                output.result.entities.clone(),
                output.pattern_labels(),
                output.result.risk_score,
                output.metrics,
            );
            self.stats.publish(event);
        }
        Ok(output.result)
    }
}

/// Cloneable handle to a configured masking service.
#[derive(Clone)]
pub struct MaskingService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for MaskingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingService")
            .field("patterns", &self.inner.pipeline.registry().len())
            .field("cache", &self.inner.cache)
            .field("inference", &self.inner.inference)
            .finish()
    }
}

impl MaskingService {
    /// A service with the built-in gazetteer engine, the in-process cache
    /// (if enabled) and no stats channel.
    pub fn new(config: MaskingConfig) -> Result<Self, MaskError> {
        Self::builder(config).build()
    }

    pub fn builder(config: MaskingConfig) -> MaskingServiceBuilder {
        MaskingServiceBuilder {
            config,
            factory: None,
            backend: None,
            stats: StatsPublisher::disabled(),
        }
    }

    pub fn config(&self) -> &MaskingConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &PatternRegistry {
        self.inner.pipeline.registry()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.inner.cache.as_ref().map(ResponseCache::stats)
    }

    /// Validates, normalizes and masks `text`.
    pub async fn mask(&self, text: &str) -> Result<MaskedResult, MaskError> {
        let normalized = validate_text(text, &self.inner.config.limits)?;
        self.mask_normalized(normalized).await
    }

    /// Handles a raw request body and returns the wire response.
    pub async fn mask_request(&self, body: &[u8]) -> Result<MaskResponse, MaskError> {
        let request = MaskRequest::from_json(body)?;
        let normalized = request.validate(&self.inner.config.limits)?;
        let result = self.mask_normalized(normalized).await?;
        Ok(result.into())
    }

    async fn mask_normalized(&self, normalized: String) -> Result<MaskedResult, MaskError> {
        let Some(cache) = &self.inner.cache else {
            return self.inner.compute(&normalized).await;
        };

        let key = CacheKey::for_text(&normalized);
        let inner = Arc::clone(&self.inner);
        let (result, hit) = cache
            .get_or_compute(key, move || async move { inner.compute(&normalized).await })
            .await?;
        debug!("Request for {} served (cache hit: {}).", key, hit);
        Ok(result)
    }

    /// Stops background tasks and drops cached entries.
    pub fn shutdown(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.shutdown();
        }
    }
}

pub struct MaskingServiceBuilder {
    config: MaskingConfig,
    factory: Option<Arc<dyn NerEngineFactory>>,
    backend: Option<Arc<dyn CacheBackend>>,
    stats: StatsPublisher,
}

impl MaskingServiceBuilder {
    /// Replaces the built-in gazetteer engine.
    pub fn engine_factory(mut self, factory: Arc<dyn NerEngineFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn stats(mut self, publisher: StatsPublisher) -> Self {
        self.stats = publisher;
        self
    }

    /// Validates the configuration and compiles the pattern registry. Any
    /// failure here must stop the process from serving.
    pub fn build(self) -> Result<MaskingService, MaskError> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| MaskError::Config(format!("{:#}", e)))?;

        let registry = PatternRegistry::compile(config.patterns.clone())?;
        registry.ensure_mask_token_inert(&config.mask_token)?;
        info!("Compiled {} detection pattern(s).", registry.len());

        let pipeline = MaskingPipeline::new(Arc::new(registry), &config.mask_token, config.risk)?;

        let factory: Arc<dyn NerEngineFactory> = match self.factory {
            Some(factory) => factory,
            None => {
                let engine = GazetteerEngine::from_config(&config.gazetteer)
                    .map_err(|e| MaskError::Config(format!("{:#}", e)))?;
                debug!("Using the built-in gazetteer engine ({} entries).", engine.len());
                Arc::new(SharedEngineFactory::new(Arc::new(engine)))
            }
        };
        let inference = InferencePool::new(factory, &config.inference);

        let cache = if config.cache.enabled {
            let cache = match self.backend {
                Some(backend) => ResponseCache::with_backend(&config.cache, backend),
                None => ResponseCache::new(&config.cache),
            };
            match (config.cache.sweep_interval(), tokio::runtime::Handle::try_current()) {
                (Some(period), Ok(_)) => cache.start_sweeper(period),
                (Some(_), Err(_)) => warn!("No tokio runtime; cache sweeper not started."),
                (None, _) => {}
            }
            Some(cache)
        } else {
            debug!("Response cache disabled.");
            None
        };

        Ok(MaskingService {
            inner: Arc::new(ServiceInner {
                config,
                pipeline,
                inference,
                cache,
                stats: self.stats,
            }),
        })
    }
}

