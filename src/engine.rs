//! Engine - validation, id/seq assignment, TIF policy and metrics.
//!
//! Wraps the order book with the public [`Engine`] contract: commands come
//! in as [`OrderCmd`], results go out as [`AddResult`]. All failure modes
//! are status codes; nothing here panics on bad input or logs.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::command::{
    AddResult, Id, OrderCmd, OrderStatus, OrderType, Price, Qty, Seq, Side, Snapshot, TimeInForce,
};
use crate::order_book::OrderBook;

/// Engine configuration, fixed at construction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// MARKET + GTC: `true` -> treated as IOC (default), `false` -> REJECT
    pub market_gtc_as_ioc: bool,
    /// Max opposite-side levels a MARKET order may sweep; `0` = unlimited.
    /// Also bounds the FOK `available_market` pre-check.
    pub market_max_levels: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            market_gtc_as_ioc: true,
            market_max_levels: 0,
        }
    }
}

/// Rolling engine counters, best-of-side hints and add-latency reservoir.
///
/// Latency covers the book call only, in nanoseconds from the monotonic
/// clock. `add_min_ns` starts at `u64::MAX` until the first measured add.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Orders admitted to the book
    pub add_orders: u64,
    /// Successful cancellations
    pub cancel_orders: u64,
    /// Trades executed
    pub trades: u64,
    /// Total quantity traded
    pub traded_qty: u64,

    /// Best bid price, 0 when the bid side is empty
    pub best_bid_px: Price,
    /// Quantity at the best bid
    pub best_bid_qty: Qty,
    /// Best ask price, 0 when the ask side is empty
    pub best_ask_px: Price,
    /// Quantity at the best ask
    pub best_ask_qty: Qty,

    /// Fastest add seen
    pub add_min_ns: u64,
    /// Slowest add seen
    pub add_max_ns: u64,
    /// Sum over all measured adds
    pub add_total_ns: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            add_orders: 0,
            cancel_orders: 0,
            trades: 0,
            traded_qty: 0,
            best_bid_px: 0,
            best_bid_qty: 0,
            best_ask_px: 0,
            best_ask_qty: 0,
            add_min_ns: u64::MAX,
            add_max_ns: 0,
            add_total_ns: 0,
        }
    }
}

impl Metrics {
    /// Mean add latency across measured admissions, 0 before the first one.
    pub fn add_avg_ns(&self) -> u64 {
        if self.add_orders == 0 {
            0
        } else {
            self.add_total_ns / self.add_orders
        }
    }
}

/// The engine contract: everything external collaborators may call.
pub trait Engine {
    /// Validate, admit and match one order command.
    fn add_order(&mut self, cmd: OrderCmd) -> AddResult;
    /// Cancel a resting order; `true` only if one was actually removed.
    fn cancel_order(&mut self, id: Id) -> bool;
    /// Aggregated depth, `depth` levels per side.
    fn snapshot(&self, depth: i32) -> Snapshot;
    /// Current counters and latency stats.
    fn metrics(&self) -> Metrics;
}

/// Single-threaded matching engine owning the book.
pub struct MatchingEngine {
    config: EngineConfig,
    book: OrderBook,
    /// Next engine-allocated order id
    next_id: Id,
    /// Admission sequence counter
    seq: Seq,
    metrics: Metrics,
}

/// First engine-allocated order id.
const FIRST_ORDER_ID: Id = 1000;

impl MatchingEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            book: OrderBook::new(),
            next_id: FIRST_ORDER_ID,
            seq: 0,
            metrics: Metrics::default(),
        }
    }

    /// Create an engine whose book pre-allocates room for `orders` orders.
    pub fn with_capacity(config: EngineConfig, orders: u32) -> Self {
        Self {
            config,
            book: OrderBook::with_capacity(orders),
            next_id: FIRST_ORDER_ID,
            seq: 0,
            metrics: Metrics::default(),
        }
    }

    /// Number of orders currently resting.
    #[inline]
    pub fn open_orders(&self) -> usize {
        self.book.order_count()
    }

    /// Direct read access to the book (snapshots, capacity queries).
    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Pre-fault the book's node storage.
    pub fn warm_up(&mut self) {
        self.book.arena.warm_up();
    }

    /// Hash of the observable state, for determinism testing.
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        let snap = self.book.snapshot(i32::MAX);
        for level in snap.bids.iter().chain(snap.asks.iter()) {
            level.price.hash(&mut hasher);
            level.qty.hash(&mut hasher);
        }
        self.book.order_count().hash(&mut hasher);
        self.metrics.add_orders.hash(&mut hasher);
        self.metrics.trades.hash(&mut hasher);
        self.metrics.traded_qty.hash(&mut hasher);
        hasher.finish()
    }

    /// Refresh the best-of-side hints from a depth-1 snapshot.
    fn refresh_best_of_side(&mut self) {
        let snap = self.book.snapshot(1);
        match snap.bids.first() {
            Some(level) => {
                self.metrics.best_bid_px = level.price;
                self.metrics.best_bid_qty = level.qty;
            }
            None => {
                self.metrics.best_bid_px = 0;
                self.metrics.best_bid_qty = 0;
            }
        }
        match snap.asks.first() {
            Some(level) => {
                self.metrics.best_ask_px = level.price;
                self.metrics.best_ask_qty = level.qty;
            }
            None => {
                self.metrics.best_ask_px = 0;
                self.metrics.best_ask_qty = 0;
            }
        }
    }

    fn record_add(&mut self, trades_len: usize, filled_qty: Qty, elapsed_ns: u64) {
        self.metrics.add_orders += 1;
        self.metrics.trades += trades_len as u64;
        self.metrics.traded_qty += filled_qty as u64;
        self.metrics.add_min_ns = self.metrics.add_min_ns.min(elapsed_ns);
        self.metrics.add_max_ns = self.metrics.add_max_ns.max(elapsed_ns);
        self.metrics.add_total_ns += elapsed_ns;
        self.refresh_best_of_side();
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MatchingEngine {
    fn add_order(&mut self, cmd: OrderCmd) -> AddResult {
        if cmd.qty <= 0 {
            return AddResult::rejected(OrderStatus::BadInput, 0, cmd.qty);
        }
        if cmd.order_type == OrderType::Limit && cmd.price <= 0 {
            return AddResult::rejected(OrderStatus::BadInput, 0, cmd.qty);
        }

        // Caller-supplied ids override the allocator for this command only.
        let order_id = cmd.order_id.unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });

        self.seq += 1;
        let seq = self.seq;

        match cmd.order_type {
            OrderType::Limit => {
                if cmd.time_in_force == TimeInForce::Fok {
                    let available = match cmd.side {
                        Side::Buy => self.book.available_to_buy_up_to(cmd.price),
                        Side::Sell => self.book.available_to_sell_down_to(cmd.price),
                    };
                    if available < cmd.qty {
                        return AddResult::rejected(OrderStatus::FokFail, order_id, cmd.qty);
                    }
                }

                let start = Instant::now();
                let trades = self.book.add_limit(
                    order_id,
                    cmd.side,
                    cmd.price,
                    cmd.qty,
                    cmd.time_in_force,
                    seq,
                );
                let elapsed_ns = start.elapsed().as_nanos() as u64;

                let filled_qty: Qty = trades.iter().map(|t| t.qty).sum();
                let remaining_qty = cmd.qty - filled_qty;

                // GTC residuals rest and report Ok; only IOC reports Partial.
                let status = if filled_qty > 0 && remaining_qty == 0 {
                    OrderStatus::Filled
                } else if filled_qty > 0 && cmd.time_in_force == TimeInForce::Ioc {
                    OrderStatus::Partial
                } else {
                    OrderStatus::Ok
                };

                self.record_add(trades.len(), filled_qty, elapsed_ns);
                AddResult {
                    status,
                    order_id,
                    trades,
                    filled_qty,
                    remaining_qty,
                }
            }
            OrderType::Market => {
                if cmd.time_in_force == TimeInForce::Fok {
                    let available = self
                        .book
                        .available_market(cmd.side, self.config.market_max_levels);
                    if available < cmd.qty {
                        return AddResult::rejected(OrderStatus::FokFail, order_id, cmd.qty);
                    }
                }
                if cmd.time_in_force == TimeInForce::Gtc && !self.config.market_gtc_as_ioc {
                    return AddResult::rejected(OrderStatus::Reject, order_id, cmd.qty);
                }

                let start = Instant::now();
                let (trades, empty_book) = self.book.add_market(
                    order_id,
                    cmd.side,
                    cmd.qty,
                    self.config.market_max_levels,
                    seq,
                );
                let elapsed_ns = start.elapsed().as_nanos() as u64;

                let filled_qty: Qty = trades.iter().map(|t| t.qty).sum();
                let remaining_qty = cmd.qty - filled_qty;

                let status = if filled_qty == 0 && empty_book {
                    OrderStatus::EmptyBook
                } else if filled_qty > 0 && remaining_qty == 0 {
                    OrderStatus::Filled
                } else if filled_qty > 0 {
                    OrderStatus::Partial
                } else {
                    OrderStatus::Ok
                };

                self.record_add(trades.len(), filled_qty, elapsed_ns);
                AddResult {
                    status,
                    order_id,
                    trades,
                    filled_qty,
                    remaining_qty,
                }
            }
        }
    }

    fn cancel_order(&mut self, id: Id) -> bool {
        let removed = self.book.cancel(id);
        if removed {
            self.metrics.cancel_orders += 1;
            self.refresh_best_of_side();
        }
        removed
    }

    fn snapshot(&self, depth: i32) -> Snapshot {
        self.book.snapshot(depth)
    }

    fn metrics(&self) -> Metrics {
        self.metrics
    }
}
