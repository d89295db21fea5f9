//! Matching - the cross/sweep algorithms over the order book.
//!
//! 1. CROSSING: consume the opposite side best-level-first while the price
//!    condition holds (limit) or unconditionally (market)
//! 2. RESTING: a GTC limit residual is appended to its own side
//!
//! Time-in-force *policy* (FOK pre-checks, MARKET+GTC handling) is the
//! engine's job; this module only executes fills and residuals.

use crate::command::{Id, Price, Qty, Seq, Side, TimeInForce, Trade};
use crate::order_book::OrderBook;

impl OrderBook {
    /// Add a limit order: cross against the opposite side, then rest the
    /// residual if `tif` is GTC (IOC/FOK residuals are discarded).
    ///
    /// Returns the trades in execution order.
    pub fn add_limit(
        &mut self,
        id: Id,
        side: Side,
        price: Price,
        qty: Qty,
        tif: TimeInForce,
        seq: Seq,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();
        if qty <= 0 {
            return trades; // caller validates; defensive
        }

        let mut remaining = qty;
        while remaining > 0 {
            let Some(level_px) = self.best_price(side.opposite()) else {
                break;
            };
            let crosses = match side {
                Side::Buy => level_px <= price,
                Side::Sell => level_px >= price,
            };
            if !crosses {
                break;
            }
            remaining = self.match_level(side.opposite(), level_px, id, remaining, seq, &mut trades);
        }

        if remaining > 0 && tif == TimeInForce::Gtc {
            self.insert_resting(id, side, price, remaining, seq);
        }

        trades
    }

    /// Add a market order: sweep the opposite side best-level-first until
    /// the quantity is exhausted, the book empties, or `max_levels` levels
    /// have been touched (`0` = unlimited). The residual is always discarded.
    ///
    /// Returns the trades and whether the opposite side is empty afterwards.
    pub fn add_market(
        &mut self,
        id: Id,
        side: Side,
        qty: Qty,
        max_levels: u16,
        seq: Seq,
    ) -> (Vec<Trade>, bool) {
        let mut trades = Vec::new();
        if qty > 0 {
            let mut remaining = qty;
            let mut touched: u32 = 0;
            while remaining > 0 {
                let Some(level_px) = self.best_price(side.opposite()) else {
                    break;
                };
                remaining =
                    self.match_level(side.opposite(), level_px, id, remaining, seq, &mut trades);
                touched += 1;
                if max_levels > 0 && touched >= max_levels as u32 {
                    break;
                }
            }
        }
        let empty_book = match side {
            Side::Buy => self.asks.is_empty(),
            Side::Sell => self.bids.is_empty(),
        };
        (trades, empty_book)
    }

    /// Fill against the makers at one price level, head (oldest) first.
    ///
    /// Depleted makers are unlinked, dropped from the index and freed; a
    /// partially filled maker keeps its queue position. The level itself is
    /// erased once empty so no empty level is ever left behind.
    ///
    /// Returns the taker quantity still unfilled.
    fn match_level(
        &mut self,
        maker_side: Side,
        level_px: Price,
        taker_id: Id,
        mut remaining: Qty,
        seq: Seq,
        trades: &mut Vec<Trade>,
    ) -> Qty {
        let OrderBook {
            arena,
            bids,
            asks,
            index,
        } = self;
        let book = match maker_side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        let Some(level) = book.get_mut(&level_px) else {
            return remaining;
        };

        while remaining > 0 && !level.is_empty() {
            let maker_idx = level.peek_head();
            let maker = arena.get(maker_idx);
            let maker_id = maker.id;
            let maker_qty = maker.qty;

            let trade_qty = remaining.min(maker_qty);
            trades.push(Trade {
                taker: taker_id,
                maker: maker_id,
                price: level_px,
                qty: trade_qty,
                seq,
            });
            remaining -= trade_qty;

            if trade_qty == maker_qty {
                // Maker fully filled - unlink, drop from index, free the slot
                level.pop_front(arena);
                index.remove(&maker_id);
                arena.free(maker_idx);
            } else {
                // Maker partially filled - stays at the head of the queue
                arena.get_mut(maker_idx).qty = maker_qty - trade_qty;
                level.subtract_qty(trade_qty);
            }
        }

        let level_empty = level.is_empty();
        if level_empty {
            book.remove(&level_px);
        }

        remaining
    }
}
