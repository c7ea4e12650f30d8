//! Randomized load generator for the matching engine.
//!
//! Submits a seeded stream of limit and market orders and reports
//! throughput. `inline` mode drives the synchronous [`Book`] in the
//! caller; `channel` mode drives the async [`OrderBook`] worker to
//! exercise the command queue and the trade stream.

use std::time::Instant;

use clap::{Parser, ValueEnum};
use orderbook::{Book, BookConfig, Order, OrderBook, OrderKind, Side};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Process orders in the caller, no worker task.
    Inline,
    /// Post orders through the async command channel.
    Channel,
}

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(about = "Randomized order stream against the matching engine")]
struct Args {
    #[arg(long, default_value_t = 500_000)]
    orders: usize,
    /// Unique price levels on each side of the base price.
    #[arg(long, default_value_t = 200)]
    price_levels: i64,
    #[arg(long, default_value_t = 1)]
    tick: i64,
    #[arg(long, default_value_t = 10_000)]
    base_price: i64,
    #[arg(long, default_value = "SIM")]
    symbol: String,
    #[arg(long, default_value_t = 2048)]
    max_depth: usize,
    /// Cancel a random earlier order every N submissions; 0 disables.
    #[arg(long, default_value_t = 0)]
    cancel_every: usize,
    /// 1 in N orders is a market order; 0 disables.
    #[arg(long, default_value_t = 5)]
    market_ratio: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, value_enum, default_value = "inline")]
    mode: Mode,
    /// Command queue length for channel mode.
    #[arg(long, default_value_t = 2048)]
    request_buffer: usize,
}

struct Report {
    submitted: usize,
    matched: u64,
    elapsed: std::time::Duration,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let report = match args.mode {
        Mode::Inline => run_inline(&args),
        Mode::Channel => run_channel(&args).await,
    };

    let orders_per_sec = report.submitted as f64 / report.elapsed.as_secs_f64();
    let trades_per_sec = report.matched as f64 / report.elapsed.as_secs_f64();
    println!(
        "submitted {} orders in {:.3}s ({:.0} orders/s)",
        report.submitted,
        report.elapsed.as_secs_f64(),
        orders_per_sec
    );
    println!(
        "matched {} trades ({:.0} trades/s)",
        report.matched, trades_per_sec
    );
    println!(
        "config: mode={} depth={} request-buffer={} market-ratio=1/{}",
        match args.mode {
            Mode::Inline => "inline",
            Mode::Channel => "channel",
        },
        args.max_depth,
        args.request_buffer,
        args.market_ratio
    );
}

fn config(args: &Args) -> BookConfig {
    let mut cfg = BookConfig::new(&args.symbol, args.tick, args.max_depth);
    cfg.request_buffer = args.request_buffer;
    cfg
}

fn run_inline(args: &Args) -> Report {
    let mut book = Book::new(config(args));
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut matched = 0u64;

    let start = Instant::now();
    for i in 0..args.orders {
        let order = random_order(&mut rng, i, args);
        match book.submit(order) {
            Ok(trades) => matched += trades.len() as u64,
            Err(err) => eprintln!("submit failed: {err}"),
        }
        if args.cancel_every > 0 && i > 0 && i % args.cancel_every == 0 {
            let target = rng.gen_range(0..i);
            let _ = book.cancel(&format!("lg-{target}"));
        }
    }
    Report {
        submitted: args.orders,
        matched,
        elapsed: start.elapsed(),
    }
}

async fn run_channel(args: &Args) -> Report {
    let book = OrderBook::new(config(args));
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let counter = book.trades().map(|mut trades| {
        tokio::spawn(async move {
            let mut matched = 0u64;
            while trades.recv().await.is_some() {
                matched += 1;
            }
            matched
        })
    });

    let start = Instant::now();
    for i in 0..args.orders {
        let order = random_order(&mut rng, i, args);
        if let Err(err) = book.submit(order).await {
            eprintln!("submit failed: {err}");
        }
        if args.cancel_every > 0 && i > 0 && i % args.cancel_every == 0 {
            let target = rng.gen_range(0..i);
            let _ = book.cancel(format!("lg-{target}")).await;
        }
    }
    let elapsed = start.elapsed();

    book.stop().await;
    let matched = match counter {
        Some(handle) => handle.await.unwrap_or(0),
        None => 0,
    };
    Report {
        submitted: args.orders,
        matched,
        elapsed,
    }
}

/// Buys land at or above the base price and sells at or below, keeping the
/// stream crossable. Prices stay on the tick grid.
fn random_order(rng: &mut ChaCha8Rng, index: usize, args: &Args) -> Order {
    let side = if rng.gen_bool(0.5) {
        Side::Buy
    } else {
        Side::Sell
    };
    let base = (args.base_price / args.tick).max(1) * args.tick;
    let offset = rng.gen_range(0..args.price_levels) * args.tick;
    let price = match side {
        Side::Buy => base + offset,
        Side::Sell => (base - offset).max(args.tick),
    };

    let id = format!("lg-{index}");
    let quantity = rng.gen_range(1..=5);
    let mut order = Order::limit(id, &args.symbol, side, price, quantity);
    if args.market_ratio > 0 && rng.gen_range(0..args.market_ratio) == 0 {
        order.kind = OrderKind::Market;
    }
    order
}
