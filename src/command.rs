//! Command and result types for the matching engine.
//!
//! Commands are inputs from the submitting thread.
//! Results, trades and snapshots are outputs back to the caller.

use serde::{Deserialize, Serialize};

/// Price in integer ticks. LIMIT orders require `price > 0`.
pub type Price = i64;
/// Order quantity. All commands require `qty > 0`.
pub type Qty = i64;
/// Order identifier, unique for the process lifetime.
pub type Id = u64;
/// Engine sequence number assigned on admission; total order over commands.
pub type Seq = u64;

/// Order side (buy = bid, sell = ask)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Buy = 0,
    /// Sell side (asks)
    Sell = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type determines how the price field is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Limit order - matches up to its price, may rest (default)
    #[default]
    Limit = 0,
    /// Market order - sweeps the opposite side, never rests
    Market = 1,
}

/// Time-in-force governs what happens to an unfilled residual
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good-Till-Cancelled - residual rests in the book (default)
    #[default]
    Gtc = 0,
    /// Immediate-Or-Cancel - residual is discarded
    Ioc = 1,
    /// Fill-Or-Kill - rejected unless fully fillable up front
    Fok = 2,
}

/// Final status of an add operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Accepted; nothing filled (resting, or IOC that found no liquidity)
    Ok = 0,
    /// Partially filled, residual discarded
    Partial = 1,
    /// Fully filled
    Filled = 2,
    /// Rejected by policy (MARKET + GTC when disallowed)
    Reject = 3,
    /// Fill-Or-Kill pre-check failed; book untouched
    FokFail = 4,
    /// Market order found no opposite liquidity at all
    EmptyBook = 5,
    /// Malformed command (non-positive qty, non-positive LIMIT price)
    BadInput = 6,
}

// ============================================================================
// Input Commands
// ============================================================================

/// Submission payload for a new order.
///
/// `order_id` is normally left unset and allocated by the engine; a
/// caller-supplied id overrides the allocator for that command and must be
/// unique across live orders. `timestamp` is caller telemetry only and is
/// never consulted by matching.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OrderCmd {
    /// Optional caller-assigned order id
    pub order_id: Option<Id>,
    /// Order side
    pub side: Side,
    /// Order type (Limit, Market)
    pub order_type: OrderType,
    /// Time-in-force (Gtc, Ioc, Fok)
    pub time_in_force: TimeInForce,
    /// Price in ticks; required positive for LIMIT, ignored for MARKET
    pub price: Price,
    /// Quantity; required positive
    pub qty: Qty,
    /// Caller timestamp, passed through untouched
    pub timestamp: u64,
}

impl OrderCmd {
    /// Create a limit order (most common case)
    #[inline]
    pub const fn limit(side: Side, price: Price, qty: Qty) -> Self {
        Self {
            order_id: None,
            side,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            price,
            qty,
            timestamp: 0,
        }
    }

    /// Create a market order
    #[inline]
    pub const fn market(side: Side, qty: Qty) -> Self {
        Self {
            order_id: None,
            side,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Ioc,
            price: 0,
            qty,
            timestamp: 0,
        }
    }

    /// Override the time-in-force
    #[inline]
    pub const fn with_tif(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Supply a caller-assigned order id
    #[inline]
    pub const fn with_id(mut self, id: Id) -> Self {
        self.order_id = Some(id);
        self
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// A trade execution. `price` is always the maker's level price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Aggressing order id
    pub taker: Id,
    /// Resting order id
    pub maker: Id,
    /// Execution price (the maker's level)
    pub price: Price,
    /// Executed quantity
    pub qty: Qty,
    /// Taker's admission sequence number
    pub seq: Seq,
}

/// One aggregated price level in a depth snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLevel {
    /// Price of the level
    pub price: Price,
    /// Total resting quantity at this price
    pub qty: Qty,
}

/// Depth snapshot: bids sorted descending, asks ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Bid levels, best (highest) first
    pub bids: Vec<SnapshotLevel>,
    /// Ask levels, best (lowest) first
    pub asks: Vec<SnapshotLevel>,
}

/// Result of an add operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResult {
    /// Final status per the engine's state machine
    pub status: OrderStatus,
    /// Id of the order (0 for BAD_INPUT)
    pub order_id: Id,
    /// Trades executed against the book, in execution order
    pub trades: Vec<Trade>,
    /// Quantity filled immediately
    pub filled_qty: Qty,
    /// Quantity not filled (rested or discarded, depending on TIF)
    pub remaining_qty: Qty,
}

impl AddResult {
    /// Build a no-trade result for a rejected command.
    #[inline]
    pub fn rejected(status: OrderStatus, order_id: Id, qty: Qty) -> Self {
        Self {
            status,
            order_id,
            trades: Vec::new(),
            filled_qty: 0,
            remaining_qty: qty,
        }
    }
}
