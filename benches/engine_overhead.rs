//! Engine overhead benchmark suite
//!
//! Measures what the engine itself adds around a callable:
//! - Probe start/stop pairs
//! - Fingerprinting static and dynamic values
//! - A full run over a trivial callable

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stability_bench::fingerprint::{Fingerprint, Value};
use stability_bench::harness::{Bench, BenchConfig};
use stability_bench::probe::Probe;

fn bench_probe(c: &mut Criterion) {
    let probe = Probe::system();
    c.bench_function("probe/start_stop", |b| {
        b.iter(|| {
            let snap = probe.start();
            black_box(probe.stop(snap))
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for len in [16usize, 1_024, 65_536] {
        let floats: Vec<f64> = (0..len).map(|i| i as f64).collect();
        group.bench_with_input(BenchmarkId::new("vec_f64", len), &floats, |b, xs| {
            b.iter(|| black_box(xs).fingerprint())
        });

        let values = Value::Seq((0..len).map(|i| Value::Int(i as i64)).collect());
        group.bench_with_input(BenchmarkId::new("dynamic_seq", len), &values, |b, v| {
            b.iter(|| black_box(v).fingerprint())
        });
    }

    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");

    for trials in [1usize, 10, 100] {
        let cfg = BenchConfig::default().with_warmup(1).with_trials(trials);
        group.bench_with_input(BenchmarkId::new("trivial", trials), &cfg, |b, cfg| {
            b.iter(|| {
                Bench::new("trivial", cfg.clone())
                    .run_infallible(|cx| (cx.index() as u64,), |(n,): (u64,), _| n.wrapping_mul(3))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_probe, bench_fingerprint, bench_full_run);
criterion_main!(benches);
