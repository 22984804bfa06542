mod common;

use common::*;
use ethers::types::{Address, I256, U256};
use models::{FundManagement, TradeRequest, TriangleTradeRequest};
use rust_decimal_macros::dec;
use strategies::{allowance_threshold, ArbitrageError, ArbitrageStrategy, PairArbitrage, PairOutcome};

/// A (1 位小数) / B 两个池子
fn ab_vault() -> MockVault {
    MockVault::new()
        .with_pool(pool(1, vec![token("A", 0x0a, 1), token("B", 0x0b, 18)]))
        .with_pool(pool(2, vec![token("B", 0x0b, 18), token("A", 0x0a, 1)]))
}

#[tokio::test]
async fn test_pair_trades_at_best_amount() {
    // minProfit 1 / minAmount 100 / milestone 50 按 1 位小数换算为 10 / 1000 / 500
    let vault = ab_vault()
        .with_flash_profit(1000, -50)
        .with_flash_profit(1500, 20)
        .with_flash_profit(2000, 5);
    let definition = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 2]);
    let h = harness(vault, pair_definitions(3, vec![definition.clone()]));
    let strategy = PairArbitrage::new(h.ctx.clone());

    let outcome = strategy.handle_pair(&definition, 3).await.unwrap();

    assert_eq!(
        *h.vault.probed_amounts.lock(),
        vec![U256::from(1000), U256::from(1500), U256::from(2000)]
    );

    let encoded = h.vault.flash_encoded.lock().clone();
    assert_eq!(encoded.len(), 1);
    assert_eq!(encoded[0].0.amount, U256::from(1500));
    assert_eq!(encoded[0].0.assets, [Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)]);
    assert_eq!(encoded[0].0.pool_ids, [pool_id(1), pool_id(2)]);
    assert_eq!(encoded[0].1, SIGNER);

    let submissions = h.vault.submissions.lock().clone();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, VAULT);

    match outcome {
        PairOutcome::Traded(record) => {
            assert_eq!(record.pair, "A-B");
            assert_eq!(record.strategy, "pair");
            assert_eq!(record.profit, I256::from(20));
            assert_eq!(record.profit_display, dec!(2));
            assert_eq!(record.token_symbol, "A");
        }
        other => panic!("expected a trade, got {other:?}"),
    }
    assert_eq!(h.sink.trades().len(), 1);
}

#[tokio::test]
async fn test_profit_equal_to_min_profit_trades() {
    let vault = ab_vault().with_flash_profit(1000, 10);
    let definition = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 2]);
    let h = harness(vault, pair_definitions(1, vec![definition.clone()]));

    let outcome = PairArbitrage::new(h.ctx.clone()).handle_pair(&definition, 1).await.unwrap();

    assert!(matches!(outcome, PairOutcome::Traded(_)));
    assert_eq!(h.vault.submissions.lock().len(), 1);
}

#[tokio::test]
async fn test_profit_one_unit_below_min_profit_skips() {
    let vault = ab_vault().with_flash_profit(1000, 9);
    let definition = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 2]);
    let h = harness(vault, pair_definitions(1, vec![definition.clone()]));

    let outcome = PairArbitrage::new(h.ctx.clone()).handle_pair(&definition, 1).await.unwrap();

    match outcome {
        PairOutcome::Skipped(result) => {
            assert!(result.is_profitable);
            assert_eq!(result.best_profit, I256::from(9));
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(h.vault.submissions.lock().is_empty());
    assert_eq!(h.sink.skipped().len(), 1);
}

#[tokio::test]
async fn test_all_probes_failing_skips_without_trade() {
    let definition = pair_definition("A-B", dec!(0), dec!(100), dec!(50), [1, 2]);
    let h = harness(ab_vault(), pair_definitions(3, vec![definition.clone()]));

    let outcome = PairArbitrage::new(h.ctx.clone()).handle_pair(&definition, 3).await.unwrap();

    match outcome {
        PairOutcome::Skipped(result) => {
            assert!(!result.is_profitable);
            assert_eq!(result.best_amount, U256::from(1000));
            assert_eq!(result.best_profit, I256::zero());
            assert_eq!(result.probes_failed, 3);
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(h.vault.flash_encoded.lock().is_empty());
}

#[tokio::test]
async fn test_missing_symbol_is_lookup_error() {
    let definition = pair_definition("A-C", dec!(1), dec!(100), dec!(50), [1, 2]);
    let h = harness(ab_vault(), pair_definitions(3, vec![definition.clone()]));

    let err = PairArbitrage::new(h.ctx.clone())
        .handle_pair(&definition, 3)
        .await
        .unwrap_err();

    match err {
        ArbitrageError::AssetNotFound { pool_id: id, symbol } => {
            assert_eq!(id, pool_id(1));
            assert_eq!(symbol, "C");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.vault.probed_amounts.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_pool_is_error() {
    let definition = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 9]);
    let h = harness(ab_vault(), pair_definitions(3, vec![definition.clone()]));

    let err = PairArbitrage::new(h.ctx.clone())
        .handle_pair(&definition, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, ArbitrageError::Dex(dex::DexError::PoolNotFound(id)) if id == pool_id(9)));
}

#[tokio::test]
async fn test_wrong_pool_count_is_invalid_definition() {
    let mut definition = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 2]);
    definition.pool_ids.push(pool_id(3));
    let h = harness(ab_vault(), pair_definitions(3, vec![definition.clone()]));

    let err = PairArbitrage::new(h.ctx.clone())
        .handle_pair(&definition, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, ArbitrageError::InvalidDefinition { .. }));
}

#[tokio::test]
async fn test_low_allowance_is_approved_before_search() {
    let a = Address::repeat_byte(0x0a);
    let vault = ab_vault()
        .with_allowance(a, allowance_threshold(1) - U256::one())
        .with_flash_profit(1000, 1);
    let definition = pair_definition("A-B", dec!(10), dec!(100), dec!(50), [1, 2]);
    let h = harness(vault, pair_definitions(1, vec![definition.clone()]));

    PairArbitrage::new(h.ctx.clone()).handle_pair(&definition, 1).await.unwrap();

    let approvals = h.vault.approvals.lock().clone();
    assert_eq!(approvals, vec![(a, VAULT, U256::MAX)]);
    assert_eq!(*h.vault.allowance_queries.lock(), vec![a, Address::repeat_byte(0x0b)]);
}

#[tokio::test]
async fn test_native_asset_skips_allowance() {
    let vault = MockVault::new()
        .with_pool(pool(1, vec![token("ETH", 0x00, 18), token("B", 0x0b, 18)]))
        .with_pool(pool(2, vec![token("B", 0x0b, 18), token("ETH", 0x00, 18)]));
    let definition = pair_definition("ETH-B", dec!(1), dec!(1), dec!(1), [1, 2]);
    let h = harness(vault, pair_definitions(1, vec![definition.clone()]));

    PairArbitrage::new(h.ctx.clone()).handle_pair(&definition, 1).await.unwrap();

    assert_eq!(*h.vault.allowance_queries.lock(), vec![Address::repeat_byte(0x0b)]);
    assert!(h.vault.approvals.lock().is_empty());
}

#[tokio::test]
async fn test_failed_submission_reports_without_record() {
    let vault = ab_vault().with_flash_profit(1000, 50);
    vault.fail_submissions();
    let definition = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 2]);
    let h = harness(vault, pair_definitions(1, vec![definition.clone()]));

    let outcome = PairArbitrage::new(h.ctx.clone()).handle_pair(&definition, 1).await.unwrap();

    assert!(matches!(outcome, PairOutcome::TradeFailed(ref message) if message.contains("reverted")));
    assert!(h.sink.trades().is_empty());
    assert!(h
        .sink
        .events
        .lock()
        .iter()
        .any(|event| matches!(event, SinkEvent::TradeFailed { label, .. } if label == "A-B")));
}

#[tokio::test]
async fn test_pair_strategy_rejects_triangle_request() {
    let h = harness(ab_vault(), pair_definitions(1, vec![]));
    let request = TradeRequest::Triangle(TriangleTradeRequest::cycle(
        [pool_id(1), pool_id(2), pool_id(3)],
        [Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3)],
        U256::from(10),
        FundManagement::wallet(SIGNER),
    ));

    let err = PairArbitrage::new(h.ctx.clone()).trade(&request).await.unwrap_err();

    assert!(matches!(
        err,
        ArbitrageError::UnsupportedRequest {
            strategy: "pair",
            request: "triangle"
        }
    ));
    assert!(h.vault.submissions.lock().is_empty());
}

#[tokio::test]
async fn test_list_pairs_reads_current_definitions() {
    let first = pair_definition("A-B", dec!(1), dec!(100), dec!(50), [1, 2]);
    let h = harness(ab_vault(), pair_definitions(4, vec![first]));
    let strategy = PairArbitrage::new(h.ctx.clone());

    let listed = strategy.list_pairs().await.unwrap();
    assert_eq!(listed.retry, 4);
    assert_eq!(listed.pairs[0].symbols, "A-B");

    h.definitions.replace(pair_definitions(2, vec![]));
    assert!(strategy.list_pairs().await.unwrap().is_empty());
}
