//! Core data types for the matching engine.
//!
//! All prices are integer ticks and all quantities are integer base units,
//! so there is no floating point anywhere in the book. Timestamps are
//! monotonic nanoseconds; only their ordering matters to the engine.

use serde::{Deserialize, Serialize};

/// Order direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order execution style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Rests on the book until filled, canceled, or evicted.
    Limit,
    /// Consumes available liquidity immediately; never rests.
    Market,
}

/// A request to trade the book's symbol.
///
/// `id`, `symbol`, `side`, `kind`, `price`, and `quantity` are caller
/// inputs. `remaining`, `ts_ns`, and `sequence` are assigned by the engine
/// when the order is accepted and should be left zeroed on submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price in ticks. Ignored for market orders.
    #[serde(default)]
    pub price: i64,
    pub quantity: i64,
    /// Unfilled quantity. Always `0 <= remaining <= quantity`.
    #[serde(default)]
    pub remaining: i64,
    /// Monotonic nanoseconds at acceptance.
    #[serde(default)]
    pub ts_ns: u64,
    /// Book-wide transition counter at acceptance.
    #[serde(default)]
    pub sequence: u64,
}

impl Order {
    /// Builds a limit order ready for submission.
    pub fn limit(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        price: i64,
        quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            kind: OrderKind::Limit,
            price,
            quantity,
            remaining: 0,
            ts_ns: 0,
            sequence: 0,
        }
    }

    /// Builds a market order ready for submission.
    pub fn market(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            kind: OrderKind::Market,
            price: 0,
            quantity,
            remaining: 0,
            ts_ns: 0,
            sequence: 0,
        }
    }
}

/// A completed match between a buy and a sell order.
///
/// `price` is always the resting order's price: the aggressor accepts the
/// book's posted price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub buy_order_id: String,
    pub sell_order_id: String,
    pub price: i64,
    pub quantity: i64,
    pub ts_ns: u64,
}

/// Top-of-book snapshot.
///
/// The contained orders are owned copies; mutating a view never affects
/// the live book and later book mutations are not visible through it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub best_bid: Option<Order>,
    pub best_ask: Option<Order>,
}

/// Book parameters.
#[derive(Clone, Debug)]
pub struct BookConfig {
    pub symbol: String,
    /// Minimum price increment. Limit prices must be positive multiples.
    pub tick_size: i64,
    /// Resting orders allowed per side; 0 disables trimming.
    pub max_depth: usize,
    /// Command queue length for the worker loop.
    pub request_buffer: usize,
    /// Trade stream buffer. The worker blocks when it fills, so size it
    /// for the expected burst or drain it promptly.
    pub trade_buffer: usize,
    /// Book-update stream buffer. Updates are dropped when it fills.
    pub update_buffer: usize,
}

impl BookConfig {
    pub fn new(symbol: impl Into<String>, tick_size: i64, max_depth: usize) -> Self {
        Self {
            symbol: symbol.into(),
            tick_size,
            max_depth,
            request_buffer: 64,
            trade_buffer: 16,
            update_buffer: 16,
        }
    }
}
