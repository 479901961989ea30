//! Register evaluation benchmark
//!
//! Target: full tenant evaluation of 10k risks well under 50ms

use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grc_risk::{RegisterSnapshot, Risk, RiskAssessment, RiskEngine, RiskMatrix};
use uuid::Uuid;

fn register(size: usize) -> RegisterSnapshot {
    let mut snapshot = RegisterSnapshot::new("bench", RiskMatrix::default_5x5());
    for i in 0..size {
        let mut risk = Risk::new("bench risk", ["security", "ops", "financial"][i % 3], (i % 5) as u32 + 1, (i % 4) as u32 + 2);
        risk.id = Uuid::from_u128(i as u128 + 1);
        for c in 0..(i % 3) {
            snapshot.assessments.push(RiskAssessment::new(
                risk.id,
                Uuid::from_u128(c as u128 + 1),
                ((i * 37 + c * 11) % 101) as u32,
            ));
        }
        snapshot.risks.push(risk);
    }
    snapshot
}

fn evaluate_benchmark(c: &mut Criterion) {
    let engine = RiskEngine::default();
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or_else(|| Utc::now().date_naive());

    let mut group = c.benchmark_group("evaluate");
    for size in [100, 1_000, 10_000].iter() {
        let snapshot = register(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snapshot| {
            b.iter(|| black_box(engine.evaluate(black_box(snapshot), as_of)))
        });
    }
    group.finish();
}

fn classify_benchmark(c: &mut Criterion) {
    let matrix = RiskMatrix::default_5x5();
    c.bench_function("classify", |b| {
        b.iter(|| {
            let mut critical = 0;
            for score in 1..=25 {
                if matrix.classify(black_box(score)) == grc_risk::RiskLevel::Critical {
                    critical += 1;
                }
            }
            black_box(critical)
        })
    });
}

criterion_group!(benches, evaluate_benchmark, classify_benchmark);
criterion_main!(benches);
