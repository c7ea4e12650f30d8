//! Wire types for the REST and WebSocket surface.

use orderbook::{BookView, Order, OrderKind, Side, Trade};
use serde::{Deserialize, Serialize};

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    #[serde(default)]
    pub price: i64,
    pub quantity: i64,
}

impl OrderRequest {
    pub fn into_order(self) -> Order {
        Order {
            id: self.id,
            symbol: self.symbol,
            side: self.side,
            kind: self.kind,
            price: self.price,
            quantity: self.quantity,
            remaining: 0,
            ts_ns: 0,
            sequence: 0,
        }
    }
}

/// Body of `PATCH /orders/:id`.
#[derive(Debug, Deserialize)]
pub struct AmendRequest {
    pub price: Option<i64>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub status: &'static str,
}

/// Public projection of a resting order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrder {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub price: i64,
    pub quantity: i64,
    pub remaining: i64,
    pub timestamp_ns: u64,
}

impl From<Order> for PublicOrder {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            symbol: order.symbol,
            side: order.side,
            kind: order.kind,
            price: order.price,
            quantity: order.quantity,
            remaining: order.remaining,
            timestamp_ns: order.ts_ns,
        }
    }
}

/// `GET /book` response and the payload of book stream messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_bid: Option<PublicOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ask: Option<PublicOrder>,
}

impl From<BookView> for SnapshotResponse {
    fn from(view: BookView) -> Self {
        Self {
            best_bid: view.best_bid.map(PublicOrder::from),
            best_ask: view.best_ask.map(PublicOrder::from),
        }
    }
}

/// Payload of trade stream messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMessage {
    pub symbol: String,
    pub buy_order_id: String,
    pub sell_order_id: String,
    pub price: i64,
    pub quantity: i64,
    pub timestamp_ns: u64,
}

impl From<Trade> for TradeMessage {
    fn from(trade: Trade) -> Self {
        Self {
            symbol: trade.symbol,
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            price: trade.price,
            quantity: trade.quantity,
            timestamp_ns: trade.ts_ns,
        }
    }
}

/// Envelope for WebSocket messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamMessage {
    Trade(TradeMessage),
    Book(SnapshotResponse),
}
