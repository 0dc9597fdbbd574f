// pii-mask-core/tests/service_integration_tests.rs
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pii_mask_core::{
    CacheBackend, CacheUnavailableError, ErrorBody, GazetteerEngine, InMemoryBackend, InferenceError, MaskError,
    MaskRequest, MaskingConfig, MaskingService, NerEngine, NerEngineFactory, StatsPublisher, TaggedToken,
};

/// Delegates to the default gazetteer after a delay and counts calls.
struct CountingEngine {
    inner: GazetteerEngine,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl NerEngine for CountingEngine {
    fn name(&self) -> &str {
        "counting"
    }

    async fn infer(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.infer(text).await
    }
}

struct BrokenEngine;

#[async_trait]
impl NerEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    async fn infer(&self, _text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        Err(InferenceError::Failed("session crashed: /models/ja-ner.onnx".to_string()))
    }
}

struct UnreachableBackend;

#[async_trait]
impl CacheBackend for UnreachableBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheUnavailableError> {
        Err(CacheUnavailableError("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheUnavailableError> {
        Err(CacheUnavailableError("connection refused".to_string()))
    }
}

fn counting_factory(delay: Duration) -> (Arc<dyn NerEngineFactory>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory = move || -> Result<Arc<dyn NerEngine>, InferenceError> {
        let inner = GazetteerEngine::with_defaults()
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;
        Ok(Arc::new(CountingEngine {
            inner,
            calls: Arc::clone(&counter),
            delay,
        }))
    };
    let factory: Arc<dyn NerEngineFactory> = Arc::new(factory);
    (factory, calls)
}

fn config() -> MaskingConfig {
    MaskingConfig::load_default().unwrap()
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_identical_requests_run_inference_once() {
    let (factory, calls) = counting_factory(Duration::from_millis(50));
    let service = MaskingService::builder(config())
        .engine_factory(factory)
        .build()
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.mask("佐藤に資料投げました").await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.masked_text, "<MASK>に資料投げました");
        assert_eq!(result.risk_score, 0.6);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stats = service.cache_stats().unwrap();
    assert_eq!(stats.computations, 1);
    assert_eq!(stats.hits + stats.shared, 15);
}

#[test_log::test(tokio::test)]
async fn test_repeat_request_is_served_from_cache() {
    let (factory, calls) = counting_factory(Duration::ZERO);
    let service = MaskingService::builder(config())
        .engine_factory(factory)
        .build()
        .unwrap();

    let first = service.mask("田中と鈴木で確認済み").await.unwrap();
    let second = service.mask("田中と鈴木で確認済み").await.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.masked_text, second.masked_text);
    assert_eq!(first.entities, second.entities);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test_log::test(tokio::test)]
async fn test_inputs_that_normalize_alike_share_a_cache_entry() {
    let service = MaskingService::new(config()).unwrap();
    service.mask("佐藤です\r\nよろしく").await.unwrap();
    let again = service.mask("佐藤です\nよろしく").await.unwrap();
    assert!(again.cached);
}

#[test_log::test(tokio::test)]
async fn test_disabled_cache_always_computes() {
    let mut config = config();
    config.cache.enabled = false;
    let (factory, calls) = counting_factory(Duration::ZERO);
    let service = MaskingService::builder(config)
        .engine_factory(factory)
        .build()
        .unwrap();

    for _ in 0..3 {
        let result = service.mask("山田です。携帯は 090-1111-2222").await.unwrap();
        assert!(!result.cached);
        assert_eq!(result.risk_score, 0.7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(service.cache_stats().is_none());
}

#[test_log::test(tokio::test)]
async fn test_unreachable_backend_degrades_to_computation() {
    let service = MaskingService::builder(config())
        .cache_backend(Arc::new(UnreachableBackend))
        .build()
        .unwrap();

    let result = service.mask("至急 03-1234-5678 まで！").await.unwrap();
    assert_eq!(result.masked_text, "至急 <MASK> まで！");
    assert!(!result.cached);
    assert!(service.cache_stats().unwrap().backend_errors >= 1);

    assert!(service.mask("至急 03-1234-5678 まで！").await.unwrap().cached);
}

#[test_log::test(tokio::test)]
async fn test_backend_is_shared_between_service_instances() {
    let backend = Arc::new(InMemoryBackend::new());
    let first = MaskingService::builder(config())
        .cache_backend(Arc::clone(&backend) as Arc<dyn CacheBackend>)
        .build()
        .unwrap();
    let computed = first.mask("佐藤に資料投げました").await.unwrap();
    assert!(!computed.cached);
    assert_eq!(backend.len(), 1);

    let (factory, calls) = counting_factory(Duration::ZERO);
    let second = MaskingService::builder(config())
        .engine_factory(factory)
        .cache_backend(backend as Arc<dyn CacheBackend>)
        .build()
        .unwrap();
    let served = second.mask("佐藤に資料投げました").await.unwrap();
    assert!(served.cached);
    assert_eq!(served.masked_text, computed.masked_text);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test_log::test(tokio::test)]
async fn test_stats_are_published_for_computed_results_only() {
    let (publisher, mut rx) = StatsPublisher::channel(8);
    let service = MaskingService::builder(config())
        .stats(publisher)
        .build()
        .unwrap();

    service.mask("山田です。携帯は 090-1111-2222").await.unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.risk_score, 0.7);
    assert_eq!(event.pattern_matches.get("PHONE_NUMBER"), Some(&1));
    assert_eq!(event.entities.len(), 1);
    assert!(chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_ok());

    service.mask("山田です。携帯は 090-1111-2222").await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[test_log::test(tokio::test)]
async fn test_full_stats_channel_does_not_block_requests() {
    let (publisher, _rx) = StatsPublisher::channel(1);
    let service = MaskingService::builder(config())
        .stats(publisher)
        .build()
        .unwrap();
    for text in ["佐藤です", "鈴木です", "田中です"] {
        assert!(service.mask(text).await.is_ok());
    }
}

#[test_log::test(tokio::test)]
async fn test_request_bodies_map_to_status_codes() {
    let service = MaskingService::new(config()).unwrap();

    let response = service
        .mask_request(r#"{"text": "佐藤に資料投げました"}"#.as_bytes())
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["masked_text"], "<MASK>に資料投げました");
    assert_eq!(json["entities"][0]["text"], "佐藤");
    assert_eq!(json["entities"][0]["label"], "PERSON");
    assert_eq!(json["risk_score"], 0.6);
    assert_eq!(json["cached"], false);

    let cases: [(&[u8], u16); 4] = [
        (b"{\"text\": ", 422),
        (b"{\"text\": 42}", 422),
        (b"{}", 400),
        (b"{\"text\": null}", 400),
    ];
    for (body, status) in cases {
        let err = service.mask_request(body).await.unwrap_err();
        assert_eq!(err.status_code(), status, "body: {}", String::from_utf8_lossy(body));
    }

    let too_long = serde_json::to_vec(&MaskRequest::new("x".repeat(1025))).unwrap();
    let err = service.mask_request(&too_long).await.unwrap_err();
    assert_eq!(ErrorBody::for_error(&err).status, 400);
}

#[test_log::test(tokio::test)]
async fn test_engine_failures_are_internal_errors_without_details() {
    let factory = || -> Result<Arc<dyn NerEngine>, InferenceError> { Ok(Arc::new(BrokenEngine)) };
    let service = MaskingService::builder(config())
        .engine_factory(Arc::new(factory))
        .build()
        .unwrap();

    let err = service.mask("佐藤に資料投げました").await.unwrap_err();
    assert!(matches!(err, MaskError::Inference(InferenceError::Failed(_))));
    let body = ErrorBody::for_error(&err);
    assert_eq!(body.status, 500);
    assert_eq!(body.detail, "Internal server error");

    // Failures are not cached.
    assert!(service.mask("佐藤に資料投げました").await.is_err());
    assert_eq!(service.cache_stats().unwrap().computations, 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_saturated_pool_answers_503() {
    let mut config = config();
    config.inference.sessions = 1;
    config.inference.max_queue_depth = 0;
    config.inference.timeout_ms = 60_000;
    let (factory, _) = counting_factory(Duration::from_secs(1));
    let service = MaskingService::builder(config)
        .engine_factory(factory)
        .build()
        .unwrap();

    let busy = {
        let service = service.clone();
        tokio::spawn(async move { service.mask("佐藤です").await })
    };
    // Let the first request take the only session.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let err = service.mask("鈴木です").await.unwrap_err();
    assert_eq!(err, MaskError::Inference(InferenceError::Overloaded(0)));
    let body = ErrorBody::for_error(&err);
    assert_eq!(body.status, 503);
    assert_eq!(body.detail, "Service temporarily overloaded");

    assert!(busy.await.unwrap().is_ok());
}

#[test_log::test(tokio::test)]
async fn test_shutdown_drops_cached_entries() {
    let service = MaskingService::new(config()).unwrap();
    service.mask("佐藤です").await.unwrap();
    service.shutdown();
    assert!(!service.mask("佐藤です").await.unwrap().cached);
}
