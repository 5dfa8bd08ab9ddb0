//! Performance benchmarks for syncline-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use syncline_engine::{
    async_trait, ClientInfo, Cookie, Handler, MemoryStore, MemoryTransaction, Mutation,
    PatchOperation, PullPatch, Result, Syncer,
};
use tokio::runtime::Runtime;

/// Writes each mutation's args under its client and id.
struct Sink;

#[async_trait]
impl Handler<MemoryTransaction> for Sink {
    async fn apply_mutation(
        &self,
        tx: &mut MemoryTransaction,
        _info: &ClientInfo,
        mutation: &Mutation,
    ) -> Result<()> {
        tx.put(
            format!("{}/{}", mutation.client_id, mutation.id),
            mutation.args.clone(),
        );
        Ok(())
    }

    async fn compute_pull(
        &self,
        _tx: &mut MemoryTransaction,
        _info: &ClientInfo,
        cookie: &Cookie,
    ) -> Result<PullPatch> {
        Ok(PullPatch {
            cookie: cookie.clone(),
            patch: vec![PatchOperation::Clear],
        })
    }
}

fn batch(client: &str, len: u64) -> Vec<Mutation> {
    (1..=len)
        .map(|id| Mutation::new(client, id, "write", json!({"n": id})))
        .collect()
}

fn bench_push(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("push");

    for size in [1u64, 10, 100] {
        group.bench_with_input(BenchmarkId::new("fresh_batch", size), &size, |b, &size| {
            let mutations = batch("c1", size);
            b.to_async(&rt).iter(|| async {
                let syncer = Syncer::new(MemoryStore::new(), Sink);
                let info = ClientInfo::new("g1", "p1");
                syncer.push(&info, black_box(&mutations)).await
            })
        });
    }

    // Every mutation already applied, the retried-delivery fast path
    group.bench_function("replayed_batch_100", |b| {
        let syncer = Syncer::new(MemoryStore::new(), Sink);
        let info = ClientInfo::new("g1", "p1");
        let mutations = batch("c1", 100);
        rt.block_on(syncer.push(&info, &mutations)).unwrap();

        b.to_async(&rt)
            .iter(|| syncer.push(&info, black_box(&mutations)))
    });

    group.finish();
}

fn bench_pull(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("pull");

    for clients in [1u64, 10, 100] {
        group.bench_with_input(BenchmarkId::new("clients", clients), &clients, |b, &n| {
            let syncer = Syncer::new(MemoryStore::new(), Sink);
            let info = ClientInfo::new("g1", "p1");
            let mutations: Vec<_> = (0..n)
                .map(|i| Mutation::new(format!("c{i}"), 1, "write", json!(i)))
                .collect();
            rt.block_on(syncer.push(&info, &mutations)).unwrap();
            let cookie = json!(null);

            b.to_async(&rt)
                .iter(|| syncer.pull(&info, black_box(&cookie)))
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    group.bench_function("mutation_from_json", |b| {
        let json = r#"{"clientID":"c1","id":42,"name":"addTodo","args":{"text":"milk"},"timestamp":1706745600000.5}"#;

        b.iter(|| serde_json::from_str::<Mutation>(black_box(json)))
    });

    group.finish();
}

criterion_group!(benches, bench_push, bench_pull, bench_serialization);
criterion_main!(benches);
