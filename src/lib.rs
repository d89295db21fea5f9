//! # Tickmatch
//!
//! A single-instrument limit order book matching engine with price-time
//! priority, O(1) cancellation and a wait-free SPSC submission path.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively on the hot path
//! - **O(1) Cancel**: every resting order carries a locator into its level
//! - **Arena Allocation**: 64-byte aligned order nodes, 32-bit indices
//! - **Status, not errors**: invalid input yields an [`OrderStatus`], never a panic
//!
//! ## Architecture
//!
//! ```text
//! [Caller Thread] --> [SpscRing<CmdEnvelope>] --> [Worker Thread]
//!                                                       |
//!                                                [MatchingEngine]
//!                                                       |
//!                                                  [OrderBook]
//! ```
//!
//! The synchronous [`MatchingEngine`] can also be driven directly on the
//! caller's thread; [`AsyncEngineShell`] adds the ring and worker on top.

pub mod arena;
pub mod command;
pub mod engine;
pub mod matching;
pub mod order_book;
pub mod price_level;
pub mod ring;
pub mod shell;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
pub use command::{
    AddResult, Id, OrderCmd, OrderStatus, OrderType, Price, Qty, Seq, Side, Snapshot,
    SnapshotLevel, TimeInForce, Trade,
};
pub use engine::{Engine, EngineConfig, MatchingEngine, Metrics};
pub use order_book::{Locator, OrderBook};
pub use price_level::PriceLevel;
pub use ring::{Consumer, Producer, SpscRing};
pub use shell::{
    reply_pair, AsyncEngineShell, CmdEnvelope, ReplyHandle, ReplySlot, ShellConfig, ShellMonitor,
};
