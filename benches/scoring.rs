//! Performance benchmarks for a3s-anonid
//!
//! Run with: cargo bench

use a3s_anonid::{DisclosureGate, DisclosureRequest, KeywordClassifier, RiskScorer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn bench_scoring(c: &mut Criterion) {
    let scorer = RiskScorer::default();

    c.bench_function("RiskScorer::score safe", |b| {
        b.iter(|| scorer.score(black_box("Verify user is over 18 and Nigerian citizen")));
    });

    c.bench_function("RiskScorer::score high", |b| {
        b.iter(|| {
            scorer.score(black_box(
                "Request: Full name, NIN, phone number, bank account number, and residential address",
            ))
        });
    });
}

fn bench_classification(c: &mut Criterion) {
    let classifier = KeywordClassifier::default();
    let fields = [
        "full name",
        "date of birth",
        "country",
        "gender",
        "national identification number",
    ];

    c.bench_function("KeywordClassifier::classify record", |b| {
        b.iter(|| {
            for field in fields {
                black_box(classifier.classify(black_box(field)));
            }
        });
    });
}

fn bench_gate(c: &mut Criterion) {
    let gate = DisclosureGate::new(Arc::new(RiskScorer::default()));
    let request = DisclosureRequest::new(vec!["full name".into(), "gender".into()], None);

    c.bench_function("DisclosureGate::assess fields", |b| {
        b.iter(|| gate.assess(black_box(&request)));
    });
}

criterion_group!(benches, bench_scoring, bench_classification, bench_gate);
criterion_main!(benches);
