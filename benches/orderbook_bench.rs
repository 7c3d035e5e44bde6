use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lob::{Order, OrderBook, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_order(rng: &mut StdRng, uid: u64) -> Order {
    let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
    let price = match side {
        Side::Bid => rng.gen_range(4_900..5_000),
        Side::Ask => rng.gen_range(5_000..5_100),
    };
    Order::new(uid, side, rng.gen_range(1..1_000), price)
}

fn benchmark_add_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_orders");

    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, &size| {
            b.iter(|| {
                let mut book = OrderBook::with_capacity(size, size / 10);
                for i in 0..size as u64 {
                    let side = if i % 2 == 0 { Side::Bid } else { Side::Ask };
                    let price = if side.is_bid() { 4_900 + i % 100 } else { 5_000 + i % 100 };
                    black_box(book.process(Order::new(i, side, 100, price)).unwrap());
                }
                black_box(book);
            });
        });

        group.bench_with_input(BenchmarkId::new("random", size), size, |b, &size| {
            b.iter(|| {
                let mut book = OrderBook::with_capacity(size, size / 10);
                let mut rng = StdRng::seed_from_u64(42);
                for i in 0..size as u64 {
                    black_box(book.process(random_order(&mut rng, i)).unwrap());
                }
                black_box(book);
            });
        });
    }
    group.finish();
}

fn benchmark_cancel_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel_orders");

    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("cancel", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let mut book = OrderBook::with_capacity(size, size / 10);
                    let mut rng = StdRng::seed_from_u64(42);
                    let mut orders = Vec::with_capacity(size);
                    for i in 0..size as u64 {
                        let order = random_order(&mut rng, i);
                        book.process(order).unwrap();
                        orders.push(order);
                    }
                    (book, orders)
                },
                |(mut book, orders)| {
                    for order in &orders {
                        black_box(book.remove(order.uid));
                    }
                    black_box(book);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn benchmark_process_feed(c: &mut Criterion) {
    // cancel-heavy mixed traffic, the shape market making produces
    let mut group = c.benchmark_group("process_feed");

    for size in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("mixed", size), size, |b, &size| {
            b.iter(|| {
                let mut book = OrderBook::with_capacity(size, size / 10);
                let mut rng = StdRng::seed_from_u64(42);
                let mut live: Vec<Order> = Vec::new();
                for i in 0..size as u64 {
                    let roll = rng.gen_range(0..10);
                    if live.is_empty() || roll < 5 {
                        let order = random_order(&mut rng, i);
                        book.process(order).unwrap();
                        live.push(order);
                    } else if roll < 8 {
                        let pick = rng.gen_range(0..live.len());
                        let order = live.swap_remove(pick);
                        book.process(Order::new(order.uid, order.side, 0, order.price))
                            .unwrap();
                    } else {
                        let pick = rng.gen_range(0..live.len());
                        let order = &mut live[pick];
                        order.size = rng.gen_range(1..1_000);
                        book.process(*order).unwrap();
                    }
                }
                black_box(book);
            });
        });
    }
    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");

    let mut book = OrderBook::with_capacity(10_000, 1_000);
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..10_000u64 {
        book.process(random_order(&mut rng, i)).unwrap();
    }

    group.bench_function("best_bid", |b| {
        b.iter(|| black_box(book.best_bid()));
    });

    group.bench_function("best_ask", |b| {
        b.iter(|| black_box(book.best_ask()));
    });

    group.bench_function("spread", |b| {
        b.iter(|| black_box(book.spread()));
    });

    group.bench_function("volume_at_price", |b| {
        b.iter(|| black_box(book.volume_at_price(5_000)));
    });

    group.bench_function("levels_depth_10", |b| {
        b.iter(|| black_box(book.levels(Some(10))));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_add_orders,
    benchmark_cancel_orders,
    benchmark_process_feed,
    benchmark_queries
);
criterion_main!(benches);
