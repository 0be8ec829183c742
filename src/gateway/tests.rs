use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::ManualClock;

/// Gateway returning canned scores and counting calls
#[derive(Default)]
struct CountingGateway {
    scores: HashMap<Pubkey, f64>,
    calls: AtomicUsize,
    fetched: Mutex<Vec<Pubkey>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingGateway {
    fn with_scores(scores: &[(Pubkey, f64)]) -> Self {
        Self {
            scores: scores.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskGateway for CountingGateway {
    async fn fetch_risk_metrics(&self, asset: &Pubkey) -> GuardResult<RiskMetrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(*asset);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.scores.get(asset) {
            Some(score) => Ok(RiskMetrics::with_score(*score)),
            None => Err(GuardError::Gateway(format!("no data for {}", asset))),
        }
    }
}

struct SlowGateway;

#[async_trait]
impl RiskGateway for SlowGateway {
    async fn fetch_risk_metrics(&self, _asset: &Pubkey) -> GuardResult<RiskMetrics> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RiskMetrics::with_score(0.0))
    }
}

fn client(gateway: Arc<dyn RiskGateway>) -> (RiskGatewayClient, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(RiskCache::with_clock(clock.clone()));
    (RiskGatewayClient::new(gateway, cache), clock)
}

#[tokio::test]
async fn test_assess_uses_cache_after_first_fetch() {
    let asset = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::with_scores(&[(asset, 0.3)]));
    let (client, _clock) = client(gateway.clone());

    assert_eq!(client.assess(&asset).await.unwrap(), RiskMetrics::with_score(0.3));
    assert_eq!(client.assess(&asset).await.unwrap(), RiskMetrics::with_score(0.3));
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_assess_refetches_after_ttl() {
    let asset = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::with_scores(&[(asset, 0.3)]));
    let (base, clock) = client(gateway.clone());
    let client = base.with_config(RiskGatewayConfig {
        cache_ttl_ms: 1000,
        ..RiskGatewayConfig::default()
    });

    client.assess(&asset).await.unwrap();
    clock.advance(Duration::from_millis(1001));
    client.assess(&asset).await.unwrap();
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn test_batch_only_fetches_misses() {
    let cached_a = Pubkey::new_unique();
    let cached_b = Pubkey::new_unique();
    let missing = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::with_scores(&[(missing, 0.9)]));
    let (client, _clock) = client(gateway.clone());

    client.cache().put(cached_a, RiskMetrics::with_score(0.1), Duration::from_secs(60));
    client.cache().put(cached_b, RiskMetrics::with_score(0.2), Duration::from_secs(60));

    let results = client.assess_batch(&[cached_a, missing, cached_b]).await.unwrap();

    assert_eq!(gateway.calls(), 1);
    assert_eq!(*gateway.fetched.lock().unwrap(), vec![missing]);
    assert_eq!(results.len(), 3);
    assert_eq!(results[&missing], RiskMetrics::with_score(0.9));
    assert_eq!(results[&cached_a], RiskMetrics::with_score(0.1));
}

#[tokio::test]
async fn test_batch_deduplicates() {
    let asset = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::with_scores(&[(asset, 0.5)]));
    let (client, _clock) = client(gateway.clone());

    let results = client.assess_batch(&[asset, asset, asset]).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_batch_respects_concurrency_limit() {
    let assets: Vec<Pubkey> = (0..8).map(|_| Pubkey::new_unique()).collect();
    let scores: Vec<(Pubkey, f64)> = assets.iter().map(|a| (*a, 0.1)).collect();
    let gateway = Arc::new(CountingGateway::with_scores(&scores));
    let (base, _clock) = client(gateway.clone());
    let client = base.with_config(RiskGatewayConfig {
        max_concurrency: 2,
        ..RiskGatewayConfig::default()
    });

    let results = client.assess_batch(&assets).await.unwrap();
    assert_eq!(results.len(), 8);
    assert_eq!(gateway.calls(), 8);
    assert!(gateway.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_failure_propagates_without_fallback() {
    let asset = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::default());
    let (client, _clock) = client(gateway);

    let err = client.assess(&asset).await.unwrap_err();
    assert!(err.is_gateway());
    assert!(err.to_string().contains(&asset.to_string()));
}

#[tokio::test]
async fn test_failure_with_fallback_is_neutral_and_not_cached() {
    let asset = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::default());
    let (base, _clock) = client(gateway.clone());
    let client = base.with_config(RiskGatewayConfig {
        fallback_on_error: true,
        ..RiskGatewayConfig::default()
    });

    assert!(client.assess(&asset).await.unwrap().is_neutral());
    assert!(client.assess(&asset).await.unwrap().is_neutral());
    assert_eq!(gateway.calls(), 2);
    assert_eq!(client.cache_stats().size, 0);
}

#[tokio::test]
async fn test_batch_failure_propagates() {
    let known = Pubkey::new_unique();
    let unknown = Pubkey::new_unique();
    let gateway = Arc::new(CountingGateway::with_scores(&[(known, 0.1)]));
    let (client, _clock) = client(gateway);

    assert!(client.assess_batch(&[known, unknown]).await.is_err());
}

#[tokio::test]
async fn test_fetch_timeout_is_a_gateway_failure() {
    let (base, _clock) = client(Arc::new(SlowGateway));
    let client = base.with_config(RiskGatewayConfig {
        fetch_timeout_ms: 20,
        ..RiskGatewayConfig::default()
    });

    let err = client.assess(&Pubkey::new_unique()).await.unwrap_err();
    assert!(err.is_gateway());
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_dropped_batch_leaves_cache_consistent() {
    let cached = Pubkey::new_unique();
    let missing = Pubkey::new_unique();
    let (slow, _clock) = client(Arc::new(SlowGateway));
    let ttl = Duration::from_millis(slow.config().cache_ttl_ms);
    slow.cache().put(cached, RiskMetrics::with_score(0.3), ttl);

    // The batch is dropped while the fetch for `missing` is still pending
    let outcome = tokio::time::timeout(Duration::from_millis(20), slow.assess_batch(&[cached, missing])).await;
    assert!(outcome.is_err());

    assert_eq!(slow.cache_stats().size, 1);
    assert!(slow.cache().get(&missing).is_none());
    assert_eq!(slow.assess(&cached).await.unwrap().risk_score, Some(0.3));

    let gateway = Arc::new(CountingGateway::with_scores(&[(missing, 0.6)]));
    let fast = RiskGatewayClient::new(gateway.clone(), slow.cache().clone());
    assert_eq!(fast.assess(&missing).await.unwrap().risk_score, Some(0.6));
    assert_eq!(gateway.calls(), 1);
    assert_eq!(fast.cache_stats().size, 2);
}

#[test]
fn test_http_gateway_url() {
    let gateway = HttpRiskGateway::new("https://risk.example/api/", None);
    let asset = Pubkey::new_unique();
    assert_eq!(gateway.url_for(&asset), format!("https://risk.example/api/risk/{}", asset));
}

#[test]
fn test_http_gateway_requires_endpoint() {
    assert!(HttpRiskGateway::from_config(&RiskGatewayConfig::default()).is_err());

    let config = RiskGatewayConfig {
        endpoint: Some("https://risk.example".to_string()),
        api_key: Some("secret".to_string()),
        ..RiskGatewayConfig::default()
    };
    let gateway = HttpRiskGateway::from_config(&config).unwrap();
    assert_eq!(gateway.url_for(&Pubkey::default()), format!("https://risk.example/risk/{}", Pubkey::default()));
}
