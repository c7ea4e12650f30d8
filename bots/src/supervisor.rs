//! Swarm supervisor with PnL tracking.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orderbook::{BookConfig, OrderBook, Trade};
use tokio::time::interval;
use tracing::info;

use crate::client::ThrottledClient;
use crate::traders::{RandomQuoteBot, SpreadCaptureBot};

/// Runs the default swarm (two bid bots, two ask bots, one spread-capture
/// bot) against a book and tracks the swarm's aggregate PnL from the
/// trade stream.
pub struct Supervisor {
    book: Arc<OrderBook>,
    client: Arc<ThrottledClient>,
}

impl Supervisor {
    pub fn new(book: Arc<OrderBook>, cfg: &BookConfig, throttle: Duration) -> Self {
        let client = Arc::new(ThrottledClient::new(
            book.clone(),
            &cfg.symbol,
            cfg.tick_size,
            Some(throttle),
        ));
        Self { book, client }
    }

    /// Runs the swarm for `duration`, then stops the book and returns the
    /// final `(position, cash)`.
    pub async fn run(&self, duration: Duration) -> (i64, i64) {
        let pnl = Arc::new(PnlTracker::default());

        let mut tasks = vec![
            tokio::spawn(RandomQuoteBot::bid().run(self.client.clone())),
            tokio::spawn(RandomQuoteBot::ask().run(self.client.clone())),
            tokio::spawn(RandomQuoteBot::bid().run(self.client.clone())),
            tokio::spawn(RandomQuoteBot::ask().run(self.client.clone())),
            tokio::spawn(SpreadCaptureBot::default().run(self.client.clone())),
        ];

        if let Some(mut trades) = self.book.trades() {
            let pnl = pnl.clone();
            let client = self.client.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(trade) = trades.recv().await {
                    pnl.record(&trade, &client);
                }
            }));
        }

        let mut log_tick = interval(Duration::from_secs(2));
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = log_tick.tick() => {
                    let (position, cash) = pnl.totals();
                    info!(position, cash, "swarm pnl");
                }
            }
        }

        for task in &tasks {
            task.abort();
        }
        self.book.stop().await;
        pnl.totals()
    }
}

/// Position and cash for orders the swarm owns. A swarm-internal trade
/// hits both legs and nets out.
#[derive(Default)]
struct PnlTracker {
    position: AtomicI64,
    cash: AtomicI64,
}

impl PnlTracker {
    fn record(&self, trade: &Trade, client: &ThrottledClient) {
        let notional = trade.price * trade.quantity;
        if client.owns(&trade.buy_order_id) {
            self.position.fetch_add(trade.quantity, Ordering::Relaxed);
            self.cash.fetch_sub(notional, Ordering::Relaxed);
        }
        if client.owns(&trade.sell_order_id) {
            self.position.fetch_sub(trade.quantity, Ordering::Relaxed);
            self.cash.fetch_add(notional, Ordering::Relaxed);
        }
    }

    fn totals(&self) -> (i64, i64) {
        (
            self.position.load(Ordering::Relaxed),
            self.cash.load(Ordering::Relaxed),
        )
    }
}
