use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use runlog::models::{Run, RunInput};
use runlog::services::aggregate;
use std::hint::black_box;

/// Five years of near-daily runs with varied distance and pace.
fn sample_runs(count: usize) -> Vec<Run> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..count)
        .map(|i| {
            let date = start + Duration::days((i * 37 % 1826) as i64);
            let distance = 3.0 + (i % 19) as f64 * 0.75;
            let minutes = distance * (4.5 + (i % 7) as f64 * 0.3);
            let doc = RunInput::new(date, distance, minutes)
                .into_document("bench-owner")
                .expect("valid run");
            Run::from_document(format!("run-{}", i), doc)
        })
        .collect()
}

fn benchmark_aggregate(c: &mut Criterion) {
    let runs = sample_runs(2_000);

    let mut group = c.benchmark_group("aggregate");

    group.bench_function("group_by_month", |b| {
        b.iter(|| aggregate::group_by_month(black_box(&runs)))
    });

    group.bench_function("totals", |b| b.iter(|| aggregate::totals(black_box(&runs))));

    group.finish();
}

criterion_group!(benches, benchmark_aggregate);
criterion_main!(benches);
