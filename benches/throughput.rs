//! Throughput Benchmark for coolkv
//!
//! Measures the storage engine and the line parser under a few
//! representative workloads.

use coolkv::protocol::parse_line;
use coolkv::storage::StorageEngine;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i);
            engine.set(&key, "small_value", None).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = "x".repeat(32 * 1024);
        b.iter(|| {
            let key = format!("key:{}", i);
            engine.set(&key, &value, None).unwrap();
            i += 1;
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        engine
            .set(&format!("key:{}", i), &format!("value:{}", i), None)
            .unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// 80% reads, 20% writes
fn bench_mixed(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..10_000 {
        engine
            .set(&format!("key:{}", i), &format!("value:{}", i), None)
            .unwrap();
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                engine.set(&format!("new:{}", i), "value", None).unwrap();
            } else {
                black_box(engine.get(&format!("key:{}", i % 10_000)));
            }
            i += 1;
        });
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            engine.set(&key, "value", None).unwrap();
                            engine.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

fn bench_expiry(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i);
            engine
                .set(&key, "value", Some(Duration::from_secs(3600)))
                .unwrap();
            i += 1;
        });
    });

    // Nothing is due, so this measures the scan cost alone
    group.bench_function("sweep_live_store", |b| {
        b.iter(|| black_box(engine.cleanup_expired()));
    });

    group.finish();
}

fn bench_list_keys(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..3_000 {
        engine.set(&format!("user:{}", i), "user_data", None).unwrap();
    }

    let mut group = c.benchmark_group("list");

    group.bench_function("list_keys", |b| {
        b.iter(|| black_box(engine.list_keys()));
    });

    group.bench_function("live_len", |b| {
        b.iter(|| black_box(engine.live_len()));
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_set", |b| {
        b.iter(|| black_box(parse_line(black_box(b"SET user:1000 some_value 60"))));
    });

    group.bench_function("parse_get", |b| {
        b.iter(|| black_box(parse_line(black_box(b"get user:1000"))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_expiry,
    bench_list_keys,
    bench_parse,
);

criterion_main!(benches);
