//! Simulated trading agents.
//!
//! Each bot is a long-running async loop over a shared [`ThrottledClient`];
//! the supervisor aborts the tasks when the session ends. The random bots
//! keep a spread of short-lived liquidity on the book, the spread-capture
//! bot quotes both sides around the mid.

use std::sync::Arc;
use std::time::Duration;

use orderbook::{BookView, Order, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, sleep, Instant};

use crate::client::ThrottledClient;

/// Midpoint of the current top of book; falls back to whichever side
/// exists, 0 when the book is empty.
pub fn mid_price(view: &BookView) -> i64 {
    let bid = view.best_bid.as_ref().map(|o| o.price).unwrap_or(0);
    let ask = view.best_ask.as_ref().map(|o| o.price).unwrap_or(0);
    match (bid > 0, ask > 0) {
        (true, true) => (bid + ask) / 2,
        (true, false) => bid,
        (false, true) => ask,
        (false, false) => 0,
    }
}

/// Places short-lived limit orders a few ticks off the mid on one side.
pub struct RandomQuoteBot {
    pub side: Side,
    pub interval: Duration,
    pub lifetime: Duration,
    pub quantity: i64,
    pub range_ticks: i64,
}

impl RandomQuoteBot {
    pub fn bid() -> Self {
        Self {
            side: Side::Buy,
            interval: Duration::from_millis(200),
            lifetime: Duration::from_secs(2),
            quantity: 1,
            range_ticks: 5,
        }
    }

    pub fn ask() -> Self {
        Self {
            side: Side::Sell,
            ..Self::bid()
        }
    }

    pub async fn run(self, client: Arc<ThrottledClient>) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval(self.interval);
        loop {
            ticker.tick().await;
            self.place(&client, &mut rng).await;
        }
    }

    async fn place(&self, client: &Arc<ThrottledClient>, rng: &mut StdRng) {
        let Ok(view) = client.snapshot().await else {
            return;
        };
        let mid = mid_price(&view);
        if mid <= 0 {
            return;
        }

        let delta = rng.gen_range(0..=self.range_ticks) * client.tick_size();
        let mut price = match self.side {
            Side::Buy => mid - delta,
            Side::Sell => mid + delta,
        };
        if price <= 0 {
            price = client.tick_size();
        }

        let prefix = match self.side {
            Side::Buy => "bid",
            Side::Sell => "ask",
        };
        let id = client.next_id(prefix);
        let order = Order::limit(&id, client.symbol(), self.side, price, self.quantity);
        if client.submit(order).await.is_err() {
            return;
        }

        let lifetime = self.lifetime;
        let client = client.clone();
        tokio::spawn(async move {
            sleep(lifetime).await;
            let _ = client.cancel(&id).await;
        });
    }
}

/// Keeps a paired bid/ask around the mid and re-quotes when the mid
/// drifts past a threshold or the pair expires.
pub struct SpreadCaptureBot {
    pub interval: Duration,
    pub lifetime: Duration,
    pub threshold_ticks: i64,
    pub quantity: i64,
}

struct PairedQuotes {
    buy_id: String,
    sell_id: String,
    anchor_mid: i64,
    placed_at: Instant,
}

impl Default for SpreadCaptureBot {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            lifetime: Duration::from_secs(3),
            threshold_ticks: 3,
            quantity: 1,
        }
    }
}

impl SpreadCaptureBot {
    pub async fn run(self, client: Arc<ThrottledClient>) {
        let mut ticker = interval(self.interval);
        let mut pair: Option<PairedQuotes> = None;
        loop {
            ticker.tick().await;
            let Ok(view) = client.snapshot().await else {
                continue;
            };
            pair = self.refresh(&client, &view, pair).await;
        }
    }

    async fn refresh(
        &self,
        client: &Arc<ThrottledClient>,
        view: &BookView,
        mut pair: Option<PairedQuotes>,
    ) -> Option<PairedQuotes> {
        let (Some(bid), Some(ask)) = (&view.best_bid, &view.best_ask) else {
            return self.cancel_pair(client, pair).await;
        };
        let mid = (bid.price + ask.price) / 2;
        let threshold = self.threshold_ticks * client.tick_size();

        let stale = pair.as_ref().is_some_and(|quotes| {
            quotes.placed_at.elapsed() > self.lifetime
                || (mid - quotes.anchor_mid).abs() >= threshold
        });
        if stale {
            pair = self.cancel_pair(client, pair).await;
        }
        if pair.is_some() {
            return pair;
        }

        let mut buy_price = bid.price;
        if mid - client.tick_size() > 0 {
            buy_price = mid - client.tick_size();
        }
        let mut sell_price = ask.price;
        if sell_price <= buy_price {
            sell_price = buy_price + client.tick_size();
        }

        let buy_id = client.next_id("spread-bid");
        let sell_id = client.next_id("spread-ask");
        let buy = Order::limit(&buy_id, client.symbol(), Side::Buy, buy_price, self.quantity);
        let sell = Order::limit(
            &sell_id,
            client.symbol(),
            Side::Sell,
            sell_price,
            self.quantity,
        );

        if client.submit(buy).await.is_err() {
            return None;
        }
        if client.submit(sell).await.is_err() {
            let _ = client.cancel(&buy_id).await;
            return None;
        }

        Some(PairedQuotes {
            buy_id,
            sell_id,
            anchor_mid: mid,
            placed_at: Instant::now(),
        })
    }

    async fn cancel_pair(
        &self,
        client: &Arc<ThrottledClient>,
        pair: Option<PairedQuotes>,
    ) -> Option<PairedQuotes> {
        if let Some(quotes) = pair {
            let _ = client.cancel(&quotes.buy_id).await;
            let _ = client.cancel(&quotes.sell_id).await;
        }
        None
    }
}
