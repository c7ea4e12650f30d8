//! Runs the bot swarm against a fresh in-process book.

use std::sync::Arc;
use std::time::Duration;

use bots::Supervisor;
use clap::Parser;
use orderbook::{BookConfig, Order, OrderBook, Side};
use tracing::info;

#[derive(Parser)]
#[command(name = "bots")]
#[command(about = "Bot swarm demo driving an in-process matching engine")]
struct Args {
    #[arg(long, default_value = "SIM")]
    symbol: String,
    #[arg(long, default_value_t = 1)]
    tick: i64,
    #[arg(long, default_value_t = 50)]
    max_depth: usize,
    /// Session length in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Minimum spacing between swarm submissions, in milliseconds.
    #[arg(long, default_value_t = 50)]
    throttle_ms: u64,
    /// Mid price the book is seeded around.
    #[arg(long, default_value_t = 100)]
    seed_price: i64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let cfg = BookConfig::new(&args.symbol, args.tick, args.max_depth);
    let book = Arc::new(OrderBook::new(cfg.clone()));
    seed_book(&book, &args).await;

    let supervisor = Supervisor::new(book, &cfg, Duration::from_millis(args.throttle_ms));
    let (position, cash) = supervisor.run(Duration::from_secs(args.seconds)).await;
    info!(position, cash, "final swarm pnl");
}

/// The random bots quote around the mid, so give them one to start from.
async fn seed_book(book: &OrderBook, args: &Args) {
    let below = (args.seed_price - args.tick).max(args.tick);
    let above = args.seed_price + args.tick;
    let _ = book
        .submit(Order::limit("seed-bid", &args.symbol, Side::Buy, below, 1))
        .await;
    let _ = book
        .submit(Order::limit(
            "seed-ask",
            &args.symbol,
            Side::Sell,
            above,
            1,
        ))
        .await;
}
