use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::TempDir;
use traincard::{Reporter, ReporterConfig};

fn bench_reporter(dir: &TempDir) -> Reporter {
    Reporter::new(ReporterConfig {
        output_dir: Some(dir.path().join("bench")),
        flush_interval: Duration::from_secs(3600),
        flush_every_n_metrics: u64::MAX,
        install_signal_handler: false,
        ..ReporterConfig::default()
    })
    .expect("reporter construction")
}

fn metric_ingestion(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let reporter = bench_reporter(&dir);
    let mut step = 0u64;

    c.bench_function("metric_ingestion", |b| {
        b.iter(|| {
            step += 1;
            reporter.metric_at("loss", 0.5, step);
        })
    });
}

fn snapshot_flush(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let reporter = bench_reporter(&dir);
    for step in 0..10_000u64 {
        reporter.metric_at("loss", 0.5, step);
        reporter.metric_at("lr", 1e-4, step);
    }

    c.bench_function("snapshot_flush_10k_points", |b| {
        b.iter(|| reporter.flush_now())
    });
}

criterion_group!(benches, metric_ingestion, snapshot_flush);
criterion_main!(benches);
