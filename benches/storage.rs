//! Verdict store benchmark: record and read back encrypted checks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tempfile::tempdir;
use url_sentinel::{
    config::SentinelConfig,
    decision::{AssessmentContext, DecisionEngine},
    features::Lexicon,
    model::ModelSlot,
    storage::VerdictStore,
};

fn engine() -> DecisionEngine {
    DecisionEngine::from_config(
        &SentinelConfig::default(),
        Arc::new(Lexicon::default()),
        Arc::new(ModelSlot::empty()),
    )
}

fn bench_insert_check(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = VerdictStore::open(&dir.path().join("checks.db"), b"bench-secret").unwrap();
    let verdict = engine().assess("http://g00gle.com/admin/login.php");
    let ctx = AssessmentContext::for_client("198.51.100.4");

    c.bench_function("storage_insert_check", |b| {
        b.iter(|| store.insert(black_box(&verdict), &ctx).unwrap())
    });
}

fn bench_recent_checks(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = VerdictStore::open(&dir.path().join("checks.db"), b"bench-secret").unwrap();
    let e = engine();
    let ctx = AssessmentContext::for_client("198.51.100.4");
    for i in 0..200 {
        let v = e.assess(&format!("https://example.org/page/{}", i));
        store.insert(&v, &ctx).unwrap();
    }

    c.bench_function("storage_recent_20", |b| {
        b.iter(|| black_box(store.recent_checks(20)).unwrap())
    });
}

criterion_group!(benches, bench_insert_check, bench_recent_checks);
criterion_main!(benches);
