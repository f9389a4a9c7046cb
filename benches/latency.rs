//! Benchmark harness using Criterion for latency measurement.
//!
//! Measures:
//! - Add limit order (no match)
//! - Add + match at a single level
//! - Market order sweeping several levels
//! - Level index insert/remove churn
//! - Mixed workload

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tick_lob::{AddOrder, BookConfig, MatchingEngine, PriceLevelIndex, Side};

const TICK_LEVELS: u32 = 10_000;

/// Generate a random limit order around the middle of the grid
fn random_limit(rng: &mut ChaCha8Rng) -> AddOrder {
    let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
    AddOrder::limit(side, rng.gen_range(4_900..5_100), rng.gen_range(1..1000))
}

/// Benchmark: Add order that rests (no matching)
fn bench_add_no_match(c: &mut Criterion) {
    let config = BookConfig::new(TICK_LEVELS).with_level_capacity(64);
    let mut book = MatchingEngine::with_config(config).unwrap();
    book.warm_up();
    let mut i = 0u32;

    c.bench_function("add_no_match", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            // Bids spread below any ask
            black_box(book.add(AddOrder::limit(Side::Bid, 1_000 + i % 1_000, 100)))
        })
    });
}

/// Benchmark: Add a crossing bid then match it against resting asks
fn bench_add_and_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_and_match");

    for depth in [1u32, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let config = BookConfig::new(TICK_LEVELS).with_level_capacity(256);
            let mut book = MatchingEngine::with_config(config).unwrap();
            book.warm_up();

            for _ in 0..depth {
                book.add(AddOrder::limit(Side::Ask, 5_000, 100)).unwrap();
            }

            b.iter(|| {
                book.add(AddOrder::limit(Side::Bid, 5_000, 100)).unwrap();
                let trades = book.match_orders().unwrap();
                // Replenish the matched ask
                book.add(AddOrder::limit(Side::Ask, 5_000, 100)).unwrap();
                black_box(trades)
            })
        });
    }

    group.finish();
}

/// Benchmark: Market order sweeping `levels` ask levels
fn bench_market_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_sweep");

    for levels in [1u32, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(levels), levels, |b, &levels| {
            let mut book = MatchingEngine::new(TICK_LEVELS);
            book.warm_up();

            b.iter(|| {
                for offset in 0..levels {
                    book.add(AddOrder::limit(Side::Ask, 5_000 + offset, 10)).unwrap();
                }
                black_box(book.add(AddOrder::market(Side::Bid, 0, u64::from(levels) * 10)))
            })
        });
    }

    group.finish();
}

/// Benchmark: Insert/remove churn on one side's level index
fn bench_index_churn(c: &mut Criterion) {
    let mut index = PriceLevelIndex::new(TICK_LEVELS);
    index.warm_up();
    let mut rng = ChaCha8Rng::seed_from_u64(0xDEADBEEF);

    for _ in 0..1_000 {
        let _ = index.insert(rng.gen_range(0..TICK_LEVELS));
    }

    c.bench_function("index_churn", |b| {
        b.iter(|| {
            let price = rng.gen_range(0..TICK_LEVELS);
            if index.contains(price) {
                black_box(index.remove(price));
            } else {
                let _ = black_box(index.insert(price));
            }
            black_box(index.max())
        })
    });
}

/// Benchmark: Mixed workload (realistic trading scenario)
fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");

    // 80% add, 20% match
    group.bench_function("80_add_20_match", |b| {
        let mut book = MatchingEngine::new(TICK_LEVELS);
        book.warm_up();

        let mut rng = ChaCha8Rng::seed_from_u64(0xCAFEBABE);

        // Pre-populate
        for _ in 0..1000 {
            book.add(random_limit(&mut rng)).unwrap();
        }
        book.match_orders().unwrap();

        b.iter(|| {
            if rng.gen_bool(0.8) {
                black_box(book.add(random_limit(&mut rng)).map(drop))
            } else {
                black_box(book.match_orders().map(drop))
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_add_no_match,
    bench_add_and_match,
    bench_market_sweep,
    bench_index_churn,
    bench_mixed_workload,
);

criterion_main!(benches);
