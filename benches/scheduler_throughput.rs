//! Benchmarks for orchestration overhead
//!
//! This benchmark measures:
//! - Scheduler overhead per task with a no-op processor
//! - Dependency chains resolved through the completion signal
//! - Cache get/set on the fast tier
//! - Next-speaker selection over a long transcript

use assist_orchestrator::batch::{processor_fn, BatchScheduler, SchedulerConfig, Task};
use assist_orchestrator::cache::{CacheConfig, CacheManager};
use assist_orchestrator::coordinator::{
    determine_next_speaker, AgentCatalog, RoleRegistry, TranscriptMessage,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn config(concurrency: usize) -> SchedulerConfig {
    SchedulerConfig::new()
        .with_concurrency(concurrency)
        .with_batch_size(50)
        .with_batch_delay(Duration::ZERO)
        .with_caching(false)
}

fn bench_independent_tasks(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("scheduler_independent");
    for &n in &[10usize, 100, 500] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.to_async(&rt).iter(|| async move {
                let scheduler = BatchScheduler::new(
                    config(8),
                    processor_fn(|p| async move { anyhow::Ok(p) }),
                )
                .unwrap();
                scheduler
                    .add_tasks((0..n).map(|i| Task::new(format!("t{}", i), json!(i))).collect())
                    .await
                    .unwrap();
                black_box(scheduler.start_processing().await)
            })
        });
    }
    group.finish();
}

fn bench_dependency_fan_in(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("scheduler_fan_in_50", |b| {
        b.to_async(&rt).iter(|| async {
            let scheduler = BatchScheduler::new(
                config(4),
                processor_fn(|p| async move { anyhow::Ok(p) }),
            )
            .unwrap();
            let mut tasks: Vec<Task> = (0..49).map(|i| Task::new(format!("leaf{}", i), json!(i))).collect();
            let mut root = Task::new("root", json!("root"));
            for i in 0..49 {
                root = root.depends_on(format!("leaf{}", i));
            }
            tasks.push(root);
            scheduler.add_tasks(tasks).await.unwrap();
            black_box(scheduler.start_processing().await)
        })
    });
}

fn bench_cache(c: &mut Criterion) {
    let rt = runtime();
    let cache = CacheManager::in_memory(CacheConfig::default()).unwrap();
    rt.block_on(async {
        for i in 0..500 {
            let _ = cache.set(&format!("k{}", i), json!(i), "ai_responses", None).await;
        }
    });

    let mut group = c.benchmark_group("cache");
    group.bench_function("get_hit", |b| {
        b.to_async(&rt).iter(|| async { black_box(cache.get("k250", "ai_responses").await) })
    });
    group.bench_function("get_miss", |b| {
        b.to_async(&rt).iter(|| async { black_box(cache.get("absent", "ai_responses").await) })
    });
    group.bench_function("set_with_eviction", |b| {
        let mut i = 0u64;
        b.to_async(&rt).iter(|| {
            i += 1;
            let key = format!("new{}", i);
            let cache = &cache;
            async move {
                drop(cache.set(&key, json!(i), "ai_responses", None).await);
            }
        })
    });
    group.finish();
}

fn bench_next_speaker(c: &mut Criterion) {
    let catalog = AgentCatalog::default();
    let roster = catalog.agents().to_vec();
    let registry = RoleRegistry::default();
    let transcript: Vec<TranscriptMessage> = (0..200)
        .map(|i| TranscriptMessage::from_agent(&roster[(i * 7) % roster.len()], "noted", i))
        .collect();

    c.bench_function("next_speaker_200_messages", |b| {
        b.iter(|| black_box(determine_next_speaker(&roster, black_box(&transcript), &registry)))
    });
}

criterion_group!(
    benches,
    bench_independent_tasks,
    bench_dependency_fan_in,
    bench_cache,
    bench_next_speaker
);
criterion_main!(benches);
