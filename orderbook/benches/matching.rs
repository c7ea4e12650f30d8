use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use orderbook::{Book, BookConfig, Order, OrderKind, Side};

const BASE_PRICE: i64 = 10_000;
const PRICE_WIDTH: i64 = 100;

/// Deterministic mixed order stream. Buys are priced at or above the mid,
/// sells at or below, so a meaningful fraction crosses.
fn random_orders(count: usize, seed: u64) -> Vec<Order> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut orders = Vec::with_capacity(count);
    for i in 0..count {
        let side = if rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let offset = rng.gen_range(0..PRICE_WIDTH);
        let price = match side {
            Side::Buy => BASE_PRICE + offset,
            Side::Sell => (BASE_PRICE - offset).max(1),
        };
        let quantity = rng.gen_range(1..=5);
        let mut order = Order::limit(format!("bench-{i}"), "SIM", side, price, quantity);
        if rng.gen_range(0..5) == 0 {
            order.kind = OrderKind::Market;
        }
        orders.push(order);
    }
    orders
}

fn bench_submit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_throughput");
    for &count in [1_000, 10_000, 100_000].iter() {
        let orders = random_orders(count, 42);
        group.bench_with_input(
            BenchmarkId::new("mixed_stream", count),
            &orders,
            |b, orders| {
                b.iter(|| {
                    let mut book = Book::new(BookConfig::new("SIM", 1, 2048));
                    let mut matched = 0u64;
                    for order in orders {
                        if let Ok(trades) = book.submit(order.clone()) {
                            matched += trades.len() as u64;
                        }
                    }
                    black_box(matched)
                })
            },
        );
    }
    group.finish();
}

fn bench_crossing_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossing_sweep");
    for &depth in [10, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("sweep", depth), &depth, |b, &depth| {
            b.iter_batched(
                || {
                    let mut book = Book::new(BookConfig::new("SIM", 1, 0));
                    for i in 0..depth {
                        let ask =
                            Order::limit(format!("ask-{i}"), "SIM", Side::Sell, 10_000 + i, 100);
                        let _ = book.submit(ask);
                    }
                    book
                },
                |mut book| {
                    let bid = Order::limit("sweep", "SIM", Side::Buy, 10_000 + depth, depth * 100);
                    black_box(book.submit(bid))
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_cancel(c: &mut Criterion) {
    c.bench_function("cancel_resting", |b| {
        b.iter_batched(
            || {
                let mut book = Book::new(BookConfig::new("SIM", 1, 0));
                for i in 0..1_000 {
                    let bid = Order::limit(format!("bid-{i}"), "SIM", Side::Buy, 9_000 - i, 1);
                    let _ = book.submit(bid);
                }
                book
            },
            |mut book| {
                for i in (0..1_000).step_by(2) {
                    let _ = book.cancel(&format!("bid-{i}"));
                }
                black_box(book.depth(Side::Buy))
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_submit_throughput,
    bench_crossing_sweep,
    bench_cancel
);
criterion_main!(benches);
