use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use kvclient::groups::GroupString;
use kvclient::{AdapterOperation, Client, Context, MemoryAdapter, Value};
use rand::prelude::*;

fn filled_adapter() -> MemoryAdapter {
    let adapter = MemoryAdapter::new();
    let ctx = Context::background();
    for i in 0..100 {
        adapter
            .set(&ctx, &format!("key{}", i), Value::from("value"), None)
            .unwrap();
    }
    adapter
}

fn execute_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    let ctx = Context::background();

    group.bench_function("adapter", |b| {
        let adapter = filled_adapter();
        let mut rng = thread_rng();
        b.iter(|| {
            let key = format!("key{}", rng.gen_range(0..100));
            adapter
                .do_command(&ctx, "GET", vec![key.into()])
                .unwrap();
        });
    });

    group.bench_function("client", |b| {
        let client = Client::with_adapter(Arc::new(filled_adapter()));
        let mut rng = thread_rng();
        b.iter(|| {
            let key = format!("key{}", rng.gen_range(0..100));
            client.execute(&ctx, "GET", vec![key.into()]).unwrap();
        });
    });

    group.finish();
}

fn group_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_string");
    let ctx = Context::background();

    group.bench_function("adapter", |b| {
        let adapter = filled_adapter();
        let mut rng = thread_rng();
        b.iter(|| {
            let key = format!("key{}", rng.gen_range(0..100));
            adapter.set(&ctx, &key, Value::from("value"), None).unwrap();
        });
    });

    group.bench_function("client", |b| {
        let client = Client::with_adapter(Arc::new(filled_adapter()));
        let mut rng = thread_rng();
        b.iter(|| {
            let key = format!("key{}", rng.gen_range(0..100));
            client.set(&ctx, &key, Value::from("value"), None).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, execute_bench, group_bench);
criterion_main!(benches);
