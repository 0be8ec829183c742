use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use solana_pubkey::Pubkey;

use crate::cache::RiskCache;
use crate::constants::token::{authority_types, TOKEN_PROGRAM_ID};
use crate::decoder::encode;
use crate::errors::GuardError;
use crate::gateway::RiskGateway;
use crate::models::RiskMetrics;

struct StaticGateway {
    scores: HashMap<Pubkey, f64>,
    calls: AtomicUsize,
}

#[async_trait]
impl RiskGateway for StaticGateway {
    async fn fetch_risk_metrics(&self, asset: &Pubkey) -> GuardResult<RiskMetrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores
            .get(asset)
            .map(|s| RiskMetrics::with_score(*s))
            .ok_or_else(|| GuardError::Gateway("unavailable".to_string()))
    }
}

fn engine_with_scores(scores: &[(Pubkey, f64)]) -> (PolicyEngine, Arc<StaticGateway>) {
    let gateway = Arc::new(StaticGateway {
        scores: scores.iter().copied().collect(),
        calls: AtomicUsize::new(0),
    });
    let client = RiskGatewayClient::new(gateway.clone(), Arc::new(RiskCache::new()));
    (PolicyEngine::default().with_risk_client(client), gateway)
}

fn mint_kill_tx() -> Transaction {
    Transaction::new("mint-kill").with_instruction(encode::set_authority(
        TOKEN_PROGRAM_ID,
        Pubkey::new_unique(),
        Pubkey::new_unique(),
        authority_types::MINT_TOKENS,
        None,
    ))
}

fn signer_mismatch_tx() -> Transaction {
    Transaction::new("mismatch").with_instruction(encode::set_authority(
        TOKEN_PROGRAM_ID,
        Pubkey::new_unique(),
        Pubkey::new_unique(),
        authority_types::ACCOUNT_OWNER,
        Some(Pubkey::new_unique()),
    ))
}

fn dangerous_close_tx() -> Transaction {
    let owner = Pubkey::new_unique();
    Transaction::new("close").with_instruction(encode::close_account(
        TOKEN_PROGRAM_ID,
        Pubkey::new_unique(),
        owner,
        owner,
    ))
}

fn config(tolerance: RiskTolerance) -> GuardConfig {
    GuardConfig {
        risk_tolerance: tolerance,
        ..GuardConfig::default()
    }
}

#[tokio::test]
async fn test_emergency_stop_short_circuits() {
    let asset = Pubkey::new_unique();
    let (engine, gateway) = engine_with_scores(&[(asset, 0.99)]);
    let tx = mint_kill_tx().with_assets([asset]).with_privacy(true, false);

    for mode in [OperationMode::Block, OperationMode::Warn] {
        let config = GuardConfig {
            emergency_stop: true,
            mode,
            ..GuardConfig::default()
        };
        let result = engine.evaluate(&tx, &config).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.blocked_by, vec![BlockCause::EmergencyStop]);
        assert!(result.warnings.is_empty());
    }
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_gateway_reports_unassessed_assets() {
    let engine = PolicyEngine::default();
    let tx = Transaction::new("no-gateway").with_assets([Pubkey::new_unique(), Pubkey::new_unique()]);

    let result = engine.evaluate(&tx, &config(RiskTolerance::Strict)).await.unwrap();
    assert!(result.is_valid);
    assert!(result.blocked_by.is_empty());
    assert_eq!(result.warning_ids(), vec![PatternId::RiskUnassessed]);
    assert!(result.warnings[0].message.contains("2 assets"));

    let clean = engine.evaluate(&Transaction::new("no-assets"), &config(RiskTolerance::Strict)).await.unwrap();
    assert!(clean.warnings.is_empty());
}

#[tokio::test]
async fn test_clean_transaction_is_valid() {
    let engine = PolicyEngine::default();
    let result = engine.evaluate(&Transaction::new("clean"), &GuardConfig::default()).await.unwrap();

    assert!(result.is_valid);
    assert!(result.warnings.is_empty());
    assert!(result.blocked_by.is_empty());
    assert_eq!(result.transaction_id, "clean");
}

#[tokio::test]
async fn test_signer_mismatch_under_each_tolerance() {
    let engine = PolicyEngine::default();
    let tx = signer_mismatch_tx();

    let permissive = engine.evaluate(&tx, &config(RiskTolerance::Permissive)).await.unwrap();
    assert!(permissive.is_valid);
    assert!(permissive.blocked_by.is_empty());
    assert_eq!(permissive.warnings.len(), 1);

    let moderate = engine.evaluate(&tx, &config(RiskTolerance::Moderate)).await.unwrap();
    assert!(moderate.is_valid);
    assert!(moderate.blocked_by.is_empty());

    let strict = engine.evaluate(&tx, &config(RiskTolerance::Strict)).await.unwrap();
    assert!(!strict.is_valid);
    assert_eq!(strict.blocked_by, vec![BlockCause::Pattern(PatternId::SignerMismatch)]);
    assert_eq!(strict.blocked_by[0].to_string(), "P-103");
}

#[tokio::test]
async fn test_mint_kill_blocks_under_every_tolerance() {
    let engine = PolicyEngine::default();
    let tx = mint_kill_tx();

    for tolerance in [RiskTolerance::Strict, RiskTolerance::Moderate, RiskTolerance::Permissive] {
        let result = engine.evaluate(&tx, &config(tolerance)).await.unwrap();
        assert!(!result.is_valid, "{:?}", tolerance);
        assert_eq!(result.blocked_by, vec![BlockCause::Pattern(PatternId::MintKill)]);
    }
}

#[tokio::test]
async fn test_dangerous_close_never_blocks() {
    let engine = PolicyEngine::default();
    let tx = dangerous_close_tx();

    let result = engine.evaluate(&tx, &config(RiskTolerance::Strict)).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(result.warning_ids(), vec![PatternId::DangerousClose]);
}

#[tokio::test]
async fn test_pattern_detection_can_be_disabled() {
    let engine = PolicyEngine::default();
    let config = GuardConfig {
        pattern_detection: false,
        ..GuardConfig::default()
    };

    let result = engine.evaluate(&mint_kill_tx(), &config).await.unwrap();
    assert!(result.is_valid);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_warn_mode_keeps_causes_but_stays_valid() {
    let engine = PolicyEngine::default();
    let tx = mint_kill_tx();

    let block = engine.evaluate(&tx, &GuardConfig::default()).await.unwrap();
    let warn = engine
        .evaluate(&tx, &GuardConfig { mode: OperationMode::Warn, ..GuardConfig::default() })
        .await
        .unwrap();

    assert!(!block.is_valid);
    assert!(warn.is_valid);
    assert_eq!(block.warnings, warn.warnings);
    assert_eq!(block.blocked_by, warn.blocked_by);
}

#[tokio::test]
async fn test_risky_asset_blocks_regardless_of_tolerance() {
    let risky = Pubkey::new_unique();
    let safe = Pubkey::new_unique();
    let (engine, _gateway) = engine_with_scores(&[(risky, 0.8), (safe, 0.2)]);
    let tx = Transaction::new("assets").with_assets([safe, risky]);

    for tolerance in [RiskTolerance::Strict, RiskTolerance::Moderate, RiskTolerance::Permissive] {
        let result = engine.evaluate(&tx, &config(tolerance)).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.blocked_by, vec![BlockCause::RiskThreshold(risky)]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].severity, Severity::Critical);
        assert_eq!(result.warnings[0].account, Some(risky));
    }
}

#[tokio::test]
async fn test_risk_at_threshold_does_not_block() {
    let asset = Pubkey::new_unique();
    let (engine, _gateway) = engine_with_scores(&[(asset, 0.7)]);
    let tx = Transaction::new("edge").with_assets([asset]);

    let result = engine.evaluate(&tx, &GuardConfig::default()).await.unwrap();
    assert!(result.is_valid);
}

#[tokio::test]
async fn test_risk_assessment_disabled_skips_gateway() {
    let asset = Pubkey::new_unique();
    let (engine, gateway) = engine_with_scores(&[(asset, 0.99)]);
    let mut config = GuardConfig::default();
    config.risk_gateway.enabled = false;

    let result = engine.evaluate(&Transaction::new("off").with_assets([asset]), &config).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_gateway_failure_propagates_or_falls_back() {
    let unknown = Pubkey::new_unique();
    let (engine, _gateway) = engine_with_scores(&[]);
    let tx = Transaction::new("unscored").with_assets([unknown]);

    let err = engine.evaluate(&tx, &GuardConfig::default()).await.unwrap_err();
    assert!(err.is_gateway());

    let mut config = GuardConfig::default();
    config.risk_gateway.fallback_on_error = true;
    let result = engine.evaluate(&tx, &config).await.unwrap();
    assert!(result.is_valid);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_custom_rules() {
    let engine = PolicyEngine::default();
    let config = GuardConfig {
        custom_rules: RuleSet::new()
            .with(FnRule::new("max-one-instruction", |tx: &Transaction| tx.instructions.len() <= 1))
            .with(FnRule::new("always-fails", |_: &Transaction| false).disabled())
            .with(FnRule::new("needs-assets", |tx: &Transaction| !tx.asset_addresses.is_empty())),
        ..GuardConfig::default()
    };

    let result = engine.evaluate(&Transaction::new("rules"), &config).await.unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.blocked_by, vec![BlockCause::Rule("needs-assets".to_string())]);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_slippage_is_opt_in() {
    let engine = PolicyEngine::default();
    let config = GuardConfig { max_slippage: 0.01, ..GuardConfig::default() };

    let unchecked = engine.evaluate(&Transaction::new("no-slippage"), &config).await.unwrap();
    assert!(unchecked.is_valid);

    let ok = engine.evaluate(&Transaction::new("ok").with_slippage(0.005), &config).await.unwrap();
    assert!(ok.is_valid);

    let bad = engine.evaluate(&Transaction::new("bad").with_slippage(0.05), &config).await.unwrap();
    assert!(!bad.is_valid);
    assert_eq!(bad.blocked_by, vec![BlockCause::Slippage]);
    assert_eq!(bad.warning_ids(), vec![PatternId::SlippageExceeded]);
}

#[test]
fn test_is_slippage_acceptable() {
    let config = GuardConfig { max_slippage: 0.02, ..GuardConfig::default() };
    assert!(is_slippage_acceptable(&config, 0.0));
    assert!(is_slippage_acceptable(&config, 0.02));
    assert!(!is_slippage_acceptable(&config, 0.021));
    assert!(!is_slippage_acceptable(&config, f64::NAN));
}

#[tokio::test]
async fn test_privacy_without_compression_warns_only() {
    let engine = PolicyEngine::default();
    let tx = Transaction::new("private").with_privacy(true, false);

    let result = engine.evaluate(&tx, &config(RiskTolerance::Strict)).await.unwrap();
    assert!(result.is_valid);
    assert_eq!(result.warning_ids(), vec![PatternId::PrivacyUncompressed]);
    assert_eq!(result.warnings[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_duplicate_patterns_block_once() {
    let engine = PolicyEngine::default();
    let kill = mint_kill_tx().instructions[0].clone();
    let tx = Transaction::new("double").with_instruction(kill.clone()).with_instruction(kill);

    let result = engine.evaluate(&tx, &GuardConfig::default()).await.unwrap();
    assert_eq!(result.warnings.len(), 2);
    assert_eq!(result.blocked_by, vec![BlockCause::Pattern(PatternId::MintKill)]);
}
