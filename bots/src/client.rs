//! Shared client for the bot swarm.
//!
//! Wraps the book handle with the bookkeeping every bot needs: a shared
//! submission throttle, id allocation, tick rounding, and an owned-order
//! set so the supervisor can attribute trades back to the swarm.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use orderbook::{BookError, BookView, Order, OrderBook};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{interval, Interval};

pub struct ThrottledClient {
    book: Arc<OrderBook>,
    symbol: String,
    tick_size: i64,
    throttle: Option<AsyncMutex<Interval>>,
    order_seq: AtomicU64,
    owned: Mutex<HashSet<String>>,
}

impl ThrottledClient {
    /// `throttle` spaces submissions across the whole swarm; `None`
    /// disables rate limiting.
    pub fn new(
        book: Arc<OrderBook>,
        symbol: impl Into<String>,
        tick_size: i64,
        throttle: Option<Duration>,
    ) -> Self {
        Self {
            book,
            symbol: symbol.into(),
            tick_size,
            throttle: throttle.map(|period| AsyncMutex::new(interval(period))),
            order_seq: AtomicU64::new(0),
            owned: Mutex::new(HashSet::new()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tick_size(&self) -> i64 {
        self.tick_size
    }

    /// Allocates a swarm-unique order id.
    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.order_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    pub fn owns(&self, id: &str) -> bool {
        self.owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Submits after waiting for the throttle. Fills in the symbol when
    /// empty and rounds the price down onto the tick grid.
    pub async fn submit(&self, mut order: Order) -> Result<(), BookError> {
        self.wait_throttle().await;
        if order.symbol.is_empty() {
            order.symbol = self.symbol.clone();
        }
        if order.price > 0 && self.tick_size > 0 && order.price % self.tick_size != 0 {
            order.price = (order.price / self.tick_size) * self.tick_size;
        }
        let id = order.id.clone();
        self.book.submit(order).await?;
        self.owned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        Ok(())
    }

    pub async fn cancel(&self, id: &str) -> Result<(), BookError> {
        self.book.cancel(id).await
    }

    pub async fn snapshot(&self) -> Result<BookView, BookError> {
        self.book.snapshot().await
    }

    async fn wait_throttle(&self) {
        if let Some(throttle) = &self.throttle {
            throttle.lock().await.tick().await;
        }
    }
}
