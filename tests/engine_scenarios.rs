//! End-to-end engine scenarios driven through the public `Engine` contract.

use tickmatch::{
    Engine, EngineConfig, MatchingEngine, OrderCmd, OrderStatus, Side, SnapshotLevel, TimeInForce,
    Trade,
};

fn engine() -> MatchingEngine {
    MatchingEngine::new()
}

// ============================================================================
// Seeded book scenarios
// ============================================================================

#[test]
fn test_seed_then_cross_limit() {
    let mut engine = engine();

    let r = engine.add_order(OrderCmd::limit(Side::Sell, 10100, 7));
    assert_eq!((r.status, r.order_id), (OrderStatus::Ok, 1000));
    assert!(r.trades.is_empty());

    let r = engine.add_order(OrderCmd::limit(Side::Sell, 10200, 5));
    assert_eq!((r.status, r.order_id), (OrderStatus::Ok, 1001));

    let r = engine.add_order(OrderCmd::limit(Side::Buy, 9500, 10));
    assert_eq!((r.status, r.order_id), (OrderStatus::Ok, 1002));

    // Crosses both ask levels; residual of 1 rests on the buy side, which
    // under GTC semantics reports Ok rather than a fill status.
    let r = engine.add_order(OrderCmd::limit(Side::Buy, 10200, 13));
    assert_eq!(r.order_id, 1003);
    assert_eq!(r.status, OrderStatus::Ok);
    assert_eq!(
        r.trades,
        vec![
            Trade {
                taker: 1003,
                maker: 1000,
                price: 10100,
                qty: 7,
                seq: 4
            },
            Trade {
                taker: 1003,
                maker: 1001,
                price: 10200,
                qty: 5,
                seq: 4
            },
        ]
    );
    assert_eq!(r.filled_qty, 12);
    assert_eq!(r.remaining_qty, 1);

    let snap = engine.snapshot(3);
    assert_eq!(
        snap.bids,
        vec![
            SnapshotLevel {
                price: 10200,
                qty: 1
            },
            SnapshotLevel {
                price: 9500,
                qty: 10
            },
        ]
    );
    assert!(snap.asks.is_empty());
}

#[test]
fn test_fok_limit_fail_leaves_book_untouched() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Sell, 10100, 2));

    let r = engine.add_order(OrderCmd::limit(Side::Buy, 10100, 5).with_tif(TimeInForce::Fok));

    assert_eq!(r.status, OrderStatus::FokFail);
    assert_eq!(r.filled_qty, 0);
    assert_eq!(r.remaining_qty, 5);
    assert!(r.trades.is_empty());

    let snap = engine.snapshot(1);
    assert_eq!(
        snap.asks,
        vec![SnapshotLevel {
            price: 10100,
            qty: 2
        }]
    );
    assert!(snap.bids.is_empty());
}

#[test]
fn test_ioc_partial_fill() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Sell, 10100, 2));
    engine.add_order(OrderCmd::limit(Side::Sell, 10200, 3));

    let r = engine.add_order(OrderCmd::limit(Side::Buy, 10150, 5).with_tif(TimeInForce::Ioc));

    assert_eq!(r.status, OrderStatus::Partial);
    assert_eq!(r.filled_qty, 2);
    assert_eq!(r.remaining_qty, 3);
    assert_eq!(r.trades.len(), 1);
    assert_eq!(r.trades[0].price, 10100);
    assert_eq!(r.trades[0].qty, 2);

    let snap = engine.snapshot(3);
    assert_eq!(
        snap.asks,
        vec![SnapshotLevel {
            price: 10200,
            qty: 3
        }]
    );
    assert!(snap.bids.is_empty(), "IOC residual must not rest");
}

#[test]
fn test_market_on_empty_opposite_side() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Buy, 9500, 10));

    let r = engine.add_order(OrderCmd::market(Side::Buy, 1));

    assert_eq!(r.status, OrderStatus::EmptyBook);
    assert_eq!(r.filled_qty, 0);
    assert_eq!(r.remaining_qty, 1);
    assert_eq!(engine.snapshot(1).bids[0].qty, 10);
}

#[test]
fn test_cancel_at_level_head() {
    let mut engine = engine();
    let r1 = engine.add_order(OrderCmd::limit(Side::Buy, 100, 10));
    let r2 = engine.add_order(OrderCmd::limit(Side::Buy, 100, 20));
    assert_eq!((r1.order_id, r2.order_id), (1000, 1001));

    assert!(engine.cancel_order(1000));

    let snap = engine.snapshot(5);
    assert_eq!(snap.bids, vec![SnapshotLevel { price: 100, qty: 20 }]);
}

// ============================================================================
// Status state machine
// ============================================================================

#[test]
fn test_status_table_limit() {
    // LIMIT/FOK, full fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5).with_tif(TimeInForce::Fok));
    assert_eq!(r.status, OrderStatus::Filled);

    // LIMIT/IOC, no fill
    let mut e = engine();
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5).with_tif(TimeInForce::Ioc));
    assert_eq!(r.status, OrderStatus::Ok);

    // LIMIT/IOC, full fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5).with_tif(TimeInForce::Ioc));
    assert_eq!(r.status, OrderStatus::Filled);

    // LIMIT/IOC, partial fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 3));
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5).with_tif(TimeInForce::Ioc));
    assert_eq!(r.status, OrderStatus::Partial);

    // LIMIT/GTC, no fill (rests)
    let mut e = engine();
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5));
    assert_eq!(r.status, OrderStatus::Ok);

    // LIMIT/GTC, full fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5));
    assert_eq!(r.status, OrderStatus::Filled);

    // LIMIT/GTC, partial fill with rested residual
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 3));
    let r = e.add_order(OrderCmd::limit(Side::Buy, 100, 5));
    assert_eq!(r.status, OrderStatus::Ok);
    assert_eq!(e.snapshot(1).bids[0].qty, 2);
}

#[test]
fn test_status_table_market() {
    // MARKET, empty opposite side
    let mut e = engine();
    let r = e.add_order(OrderCmd::market(Side::Buy, 5));
    assert_eq!(r.status, OrderStatus::EmptyBook);

    // MARKET/FOK, full fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::market(Side::Buy, 5).with_tif(TimeInForce::Fok));
    assert_eq!(r.status, OrderStatus::Filled);

    // MARKET/FOK, insufficient liquidity
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 4));
    let r = e.add_order(OrderCmd::market(Side::Buy, 5).with_tif(TimeInForce::Fok));
    assert_eq!(r.status, OrderStatus::FokFail);

    // MARKET/IOC, full fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::market(Side::Buy, 5));
    assert_eq!(r.status, OrderStatus::Filled);

    // MARKET/IOC, partial fill
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 3));
    let r = e.add_order(OrderCmd::market(Side::Buy, 5));
    assert_eq!(r.status, OrderStatus::Partial);
    assert_eq!(r.remaining_qty, 2);

    // MARKET/GTC under the default policy behaves as IOC
    let mut e = engine();
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::market(Side::Buy, 5).with_tif(TimeInForce::Gtc));
    assert_eq!(r.status, OrderStatus::Filled);

    // MARKET/GTC rejected when the policy disallows it
    let mut e = MatchingEngine::with_config(EngineConfig {
        market_gtc_as_ioc: false,
        market_max_levels: 0,
    });
    e.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    let r = e.add_order(OrderCmd::market(Side::Buy, 5).with_tif(TimeInForce::Gtc));
    assert_eq!(r.status, OrderStatus::Reject);
}

// ============================================================================
// Edges and properties
// ============================================================================

#[test]
fn test_fok_boundary_exact_capacity() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Sell, 10100, 2));
    engine.add_order(OrderCmd::limit(Side::Sell, 10200, 3));

    // Exactly fillable up to 10200
    let r = engine.add_order(OrderCmd::limit(Side::Buy, 10200, 5).with_tif(TimeInForce::Fok));
    assert_eq!(r.status, OrderStatus::Filled);
    assert_eq!(r.filled_qty, 5);
    assert!(engine.snapshot(5).asks.is_empty());
}

#[test]
fn test_fok_does_not_count_levels_beyond_limit_price() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Sell, 10100, 2));
    engine.add_order(OrderCmd::limit(Side::Sell, 10300, 10));

    // Plenty of liquidity overall, but not within the limit price.
    let r = engine.add_order(OrderCmd::limit(Side::Buy, 10200, 5).with_tif(TimeInForce::Fok));
    assert_eq!(r.status, OrderStatus::FokFail);
}

#[test]
fn test_market_max_levels_bounds_sweep() {
    let mut engine = MatchingEngine::with_config(EngineConfig {
        market_gtc_as_ioc: true,
        market_max_levels: 2,
    });
    engine.add_order(OrderCmd::limit(Side::Sell, 10100, 1));
    engine.add_order(OrderCmd::limit(Side::Sell, 10200, 1));
    engine.add_order(OrderCmd::limit(Side::Sell, 10300, 1));

    let r = engine.add_order(OrderCmd::market(Side::Buy, 3));

    assert_eq!(r.status, OrderStatus::Partial);
    assert_eq!(r.filled_qty, 2);
    assert_eq!(engine.snapshot(1).asks[0].price, 10300);
}

#[test]
fn test_cancel_exactly_once() {
    let mut engine = engine();
    let r = engine.add_order(OrderCmd::limit(Side::Buy, 100, 10));

    assert!(engine.cancel_order(r.order_id));
    assert!(!engine.cancel_order(r.order_id));
    assert!(!engine.cancel_order(424242), "unknown ids cancel to false");
}

#[test]
fn test_cancel_filled_order_returns_false() {
    let mut engine = engine();
    let maker = engine.add_order(OrderCmd::limit(Side::Sell, 100, 5));
    engine.add_order(OrderCmd::limit(Side::Buy, 100, 5));

    assert!(!engine.cancel_order(maker.order_id));
}

#[test]
fn test_trade_qty_accounts_for_command_qty() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Sell, 10000, 4));
    engine.add_order(OrderCmd::limit(Side::Sell, 10010, 4));

    let r = engine.add_order(OrderCmd::limit(Side::Buy, 10010, 10));
    let traded: i64 = r.trades.iter().map(|t| t.qty).sum();
    assert_eq!(traded, r.filled_qty);
    assert_eq!(r.filled_qty + r.remaining_qty, 10);
}

#[test]
fn test_snapshot_never_crossed() {
    let mut engine = engine();
    engine.add_order(OrderCmd::limit(Side::Buy, 9900, 5));
    engine.add_order(OrderCmd::limit(Side::Sell, 10100, 5));
    engine.add_order(OrderCmd::limit(Side::Buy, 10100, 3)); // consumes part of the ask
    engine.add_order(OrderCmd::limit(Side::Sell, 9900, 2)); // consumes part of the bid

    let snap = engine.snapshot(10);
    if let (Some(bid), Some(ask)) = (snap.bids.first(), snap.asks.first()) {
        assert!(bid.price < ask.price, "book crossed: {:?} {:?}", bid, ask);
    }
}

#[test]
fn test_caller_supplied_id_round_trips() {
    let mut engine = engine();
    let r = engine.add_order(OrderCmd::limit(Side::Buy, 100, 10).with_id(77));
    assert_eq!(r.order_id, 77);
    assert!(engine.cancel_order(77));
}

#[test]
fn test_snapshot_depth_contract() {
    let mut engine = engine();
    for i in 0..5 {
        engine.add_order(OrderCmd::limit(Side::Buy, 100 - i, 1));
        engine.add_order(OrderCmd::limit(Side::Sell, 200 + i, 1));
    }

    assert!(engine.snapshot(0).bids.is_empty());
    assert!(engine.snapshot(-1).asks.is_empty());
    assert_eq!(engine.snapshot(3).bids.len(), 3);
    assert_eq!(engine.snapshot(100).bids.len(), 5);
    assert_eq!(engine.snapshot(100).asks.len(), 5);
}
