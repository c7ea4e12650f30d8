//! Single-symbol limit order book with price-time priority matching.
//!
//! The engine is a serializable state machine behind a single-consumer
//! command channel:
//!
//! - [`Book`] is the synchronous core: dual heaps with stable price-time
//!   ordering, an id index over a stable arena, matching with partial
//!   fills, cancel/amend with priority reassignment, and bounded depth
//!   with worst-priority eviction.
//! - [`OrderBook`] wraps a `Book` in a single-writer worker task and adds
//!   the two output streams: a lossless bounded trade stream and a lossy
//!   latest-wins top-of-book stream.
//!
//! Prices are integer ticks, quantities integer base units. Trades always
//! execute at the resting order's price.

mod actor;
mod arena;
mod book;
pub mod clock;
mod error;
mod queue;
pub mod types;

pub use actor::OrderBook;
pub use book::Book;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::BookError;
pub use types::{BookConfig, BookView, Order, OrderKind, Side, Trade};
