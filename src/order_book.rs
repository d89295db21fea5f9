//! Order Book - The central limit order book data structure.
//!
//! Two price-ordered maps of FIFO levels (bids descending, asks ascending)
//! plus an id -> locator index for O(1) cancellation. Matching itself lives
//! in the `matching` module; this file owns structure and lifecycle.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::arena::{Arena, ArenaIndex};
use crate::command::{Id, Price, Qty, Seq, Side, Snapshot, SnapshotLevel};
use crate::price_level::PriceLevel;

/// Stable handle to a resting order: enough to erase it without scanning.
///
/// `price` names the level bucket, `node` the order's arena slot inside the
/// level's intrusive FIFO. Neither is invalidated by fills at the head of
/// the level or by removals elsewhere in the queue.
#[derive(Clone, Copy, Debug)]
pub struct Locator {
    /// Side of the resting order
    pub side: Side,
    /// Price bucket the order rests in
    pub price: Price,
    /// Arena slot of the order node
    pub node: ArenaIndex,
}

/// The limit order book for a single instrument.
///
/// Best bid is the last key of `bids`; best ask the first key of `asks`.
/// Levels exist only while non-empty.
pub struct OrderBook {
    /// Node storage shared by both sides
    pub(crate) arena: Arena,
    /// Bid price levels, iterated in reverse for best-first order
    pub(crate) bids: BTreeMap<Price, PriceLevel>,
    /// Ask price levels
    pub(crate) asks: BTreeMap<Price, PriceLevel>,
    /// Order lookup: id -> Locator
    pub(crate) index: FxHashMap<Id, Locator>,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a book whose arena pre-allocates room for `orders` resting orders
    pub fn with_capacity(orders: u32) -> Self {
        Self {
            arena: Arena::with_capacity(orders),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: FxHashMap::with_capacity_and_hasher(orders as usize, Default::default()),
        }
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Get the best bid price (highest buy price)
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.last_key_value().map(|(&px, _)| px)
    }

    /// Get the best ask price (lowest sell price)
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first_key_value().map(|(&px, _)| px)
    }

    /// Get the best price on a given side
    #[inline]
    pub fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }

    /// Calculate spread (best_ask - best_bid)
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    // ========================================================================
    // Resting Orders
    // ========================================================================

    /// Rest an order on its own side, appending to the price's FIFO.
    ///
    /// Records a [`Locator`] so the order can be cancelled in O(1).
    pub(crate) fn insert_resting(&mut self, id: Id, side: Side, price: Price, qty: Qty, seq: Seq) {
        let idx = self.arena.alloc();
        let node = self.arena.get_mut(idx);
        node.id = id;
        node.price = price;
        node.qty = qty;
        node.seq = seq;

        let OrderBook {
            arena, bids, asks, ..
        } = self;
        let level = match side {
            Side::Buy => bids.entry(price).or_default(),
            Side::Sell => asks.entry(price).or_default(),
        };
        level.push_back(arena, idx);

        self.index.insert(
            id,
            Locator {
                side,
                price,
                node: idx,
            },
        );
    }

    /// Cancel a resting order by id.
    ///
    /// Uses the stored locator to erase the order from its level's FIFO
    /// without scanning; removes the level if it became empty.
    ///
    /// # Returns
    /// `true` if a resting order was removed, `false` if the id is unknown
    /// (including already-filled orders).
    pub fn cancel(&mut self, id: Id) -> bool {
        let Some(loc) = self.index.remove(&id) else {
            return false;
        };

        let OrderBook {
            arena, bids, asks, ..
        } = self;
        let book = match loc.side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        if let Some(level) = book.get_mut(&loc.price) {
            let now_empty = level.remove(arena, loc.node);
            if now_empty {
                book.remove(&loc.price);
            }
        }
        arena.free(loc.node);
        true
    }

    /// Look up the locator for a resting order.
    #[inline]
    pub fn get_order(&self, id: Id) -> Option<&Locator> {
        self.index.get(&id)
    }

    /// Check if an order is resting.
    #[inline]
    pub fn contains_order(&self, id: Id) -> bool {
        self.index.contains_key(&id)
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Aggregate the top `depth` levels per side, best first.
    ///
    /// `depth <= 0` yields empty sides; a depth larger than the book
    /// returns every level.
    pub fn snapshot(&self, depth: i32) -> Snapshot {
        let mut snap = Snapshot::default();
        if depth <= 0 {
            return snap;
        }
        let depth = depth as usize;
        snap.bids.reserve(depth.min(self.bids.len()));
        snap.asks.reserve(depth.min(self.asks.len()));

        for (&price, level) in self.bids.iter().rev().take(depth) {
            snap.bids.push(SnapshotLevel {
                price,
                qty: level.total_qty,
            });
        }
        for (&price, level) in self.asks.iter().take(depth) {
            snap.asks.push(SnapshotLevel {
                price,
                qty: level.total_qty,
            });
        }
        snap
    }

    // ========================================================================
    // Capacity queries (FOK pre-checks)
    // ========================================================================

    /// Total ask quantity at prices `<= px`, scanned best-first.
    pub fn available_to_buy_up_to(&self, px: Price) -> Qty {
        let mut total = 0;
        for (&ask_px, level) in &self.asks {
            if ask_px > px {
                break;
            }
            total += level.total_qty;
        }
        total
    }

    /// Total bid quantity at prices `>= px`, scanned best-first.
    pub fn available_to_sell_down_to(&self, px: Price) -> Qty {
        let mut total = 0;
        for (&bid_px, level) in self.bids.iter().rev() {
            if bid_px < px {
                break;
            }
            total += level.total_qty;
        }
        total
    }

    /// Total opposite-side quantity across the first `max_levels` levels.
    ///
    /// `max_levels == 0` means unlimited, matching the market sweep itself.
    pub fn available_market(&self, side: Side, max_levels: u16) -> Qty {
        let limit = if max_levels == 0 {
            usize::MAX
        } else {
            max_levels as usize
        };
        match side {
            Side::Buy => self
                .asks
                .values()
                .take(limit)
                .map(|level| level.total_qty)
                .sum(),
            Side::Sell => self
                .bids
                .values()
                .rev()
                .take(limit)
                .map(|level| level.total_qty)
                .sum(),
        }
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Number of resting orders in the book
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of bid levels
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask levels
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Check if the book is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Resting quantity and order count at a price level
    pub fn depth_at(&self, side: Side, price: Price) -> (Qty, u32) {
        let level = match side {
            Side::Buy => self.bids.get(&price),
            Side::Sell => self.asks.get(&price),
        };
        level.map(|l| (l.total_qty, l.count)).unwrap_or((0, 0))
    }

    /// Exhaustive structural check, for tests and debugging.
    ///
    /// Verifies: no empty levels, locators resolve to their orders, the
    /// index covers exactly the resting orders, per-level totals match the
    /// FIFO contents, positive quantities, and an uncrossed book.
    #[cfg(any(test, debug_assertions))]
    pub fn validate(&self) {
        use crate::arena::NULL_INDEX;

        let mut seen = 0usize;
        for (side, book) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for (&price, level) in book {
                assert!(!level.is_empty(), "empty level left in book at {price}");
                let mut qty_sum: Qty = 0;
                let mut count = 0u32;
                let mut cursor = level.head;
                while cursor != NULL_INDEX {
                    let node = self.arena.get(cursor);
                    assert!(node.qty > 0, "resting order {} has qty {}", node.id, node.qty);
                    assert_eq!(node.price, price);
                    let loc = self
                        .index
                        .get(&node.id)
                        .unwrap_or_else(|| panic!("order {} missing from index", node.id));
                    assert_eq!(loc.node, cursor);
                    assert_eq!(loc.price, price);
                    assert_eq!(loc.side, side);
                    qty_sum += node.qty;
                    count += 1;
                    seen += 1;
                    cursor = node.next;
                }
                assert_eq!(level.total_qty, qty_sum);
                assert_eq!(level.count, count);
            }
        }
        assert_eq!(seen, self.index.len(), "index holds non-resting orders");

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            assert!(bid < ask, "book is crossed at rest: {bid} >= {ask}");
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.index.len())
            .finish()
    }
}
