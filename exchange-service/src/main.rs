//! Single-symbol exchange service.
//!
//! Thin HTTP/WebSocket surface over the matching engine: REST endpoints
//! for order entry and snapshots, WebSocket streams for trades and
//! top-of-book updates, optional bearer-token auth, and CORS. All book
//! state lives in the engine; this binary only translates.

use std::env;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State, WebSocketUpgrade},
    http::{header::AUTHORIZATION, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use orderbook::{BookConfig, BookError, BookView, OrderBook, Trade};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod hub;
mod types;
mod websocket;

use hub::Hub;
use types::{AmendRequest, OrderRequest, OrderResponse, SnapshotResponse};

struct Config {
    listen_addr: String,
    symbol: String,
    tick_size: i64,
    max_depth: usize,
    auth_token: Option<String>,
    cors_origin: String,
}

impl Config {
    fn from_env() -> Self {
        Self {
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
            symbol: env_or("SYMBOL", "LMT"),
            tick_size: parse_env_or("TICK_SIZE", 1),
            max_depth: parse_env_or("MAX_DEPTH", 100),
            auth_token: env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            cors_origin: env_or("CORS_ORIGIN", "*"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn parse_env_or<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) if !value.is_empty() => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, %value, %default, "invalid value, falling back");
                default
            }
        },
        _ => default,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub book: Arc<OrderBook>,
    pub symbol: String,
    pub trade_hub: Arc<Hub<Trade>>,
    pub book_hub: Arc<Hub<BookView>>,
    pub auth_token: Option<Arc<str>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cfg = Config::from_env();

    let book = Arc::new(OrderBook::new(BookConfig::new(
        &cfg.symbol,
        cfg.tick_size,
        cfg.max_depth,
    )));

    let trade_hub = Arc::new(Hub::new(256));
    let book_hub = Arc::new(Hub::new(256));
    if let Some(trades) = book.trades() {
        trade_hub.pump(trades);
    }
    if let Some(updates) = book.book_updates() {
        book_hub.pump(updates);
    }

    let state = AppState {
        book,
        symbol: cfg.symbol.clone(),
        trade_hub,
        book_hub,
        auth_token: cfg.auth_token.map(Arc::from),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/orders", post(submit_order))
        .route("/orders/:id", axum::routing::delete(cancel_order).patch(amend_order))
        .route("/book", get(book_snapshot))
        .route("/ws/trades", get(trade_stream))
        .route("/ws/book", get(book_stream))
        .layer(middleware::from_fn_with_state(state.clone(), auth))
        .layer(cors_layer(&cfg.cors_origin))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .unwrap();
    info!(addr = %cfg.listen_addr, symbol = %cfg.symbol, "exchange service listening");
    axum::serve(listener, app).await.unwrap();
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::PATCH])
        .allow_headers(Any);
    if origin == "*" {
        layer.allow_origin(Any)
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                warn!(origin, "invalid CORS origin, allowing any");
                layer.allow_origin(Any)
            }
        }
    }
}

async fn auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };

    let header_token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let query_token = request
        .uri()
        .query()
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("token=")));

    if header_token == Some(expected) || query_token == Some(expected) {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, "missing or invalid token").into_response()
    }
}

/// Maps engine errors onto HTTP statuses.
struct ApiError(BookError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BookError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookError::DuplicateId { .. } => StatusCode::CONFLICT,
            BookError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            BookError::SymbolMismatch { .. }
            | BookError::InvalidQuantity
            | BookError::TickAlignment { .. } => StatusCode::BAD_REQUEST,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "symbol": state.symbol,
    }))
}

async fn submit_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<impl IntoResponse, Response> {
    if req.id.is_empty() || req.symbol.is_empty() {
        let body = Json(serde_json::json!({ "error": "id and symbol are required" }));
        return Err((StatusCode::BAD_REQUEST, body).into_response());
    }

    state
        .book
        .submit(req.into_order())
        .await
        .map_err(|err| ApiError(err).into_response())?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OrderResponse { status: "accepted" }),
    ))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.book.cancel(id).await.map_err(ApiError)?;
    Ok(Json(OrderResponse {
        status: "canceled",
    }))
}

async fn amend_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AmendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .book
        .amend(id, req.price, req.quantity)
        .await
        .map_err(ApiError)?;
    Ok(Json(OrderResponse { status: "amended" }))
}

async fn book_snapshot(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let view = state.book.snapshot().await.map_err(ApiError)?;
    Ok(Json(SnapshotResponse::from(view)))
}

async fn trade_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| websocket::serve_trades(socket, state))
}

async fn book_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| websocket::serve_book(socket, state))
}
