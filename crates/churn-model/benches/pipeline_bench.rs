//! Criterion benchmarks for churn-model: candidate training and batch scoring.

#[path = "../tests/common/mod.rs"]
mod common;

use criterion::{Criterion, criterion_group, criterion_main};

use churn_model::{
    ChurnScorer, ClassifierConfig, RandomForestConfig, SvcConfig, candidate_models, fit_one,
};
use churn_prep::{CleanOptions, ColumnTransformer, clean_records, split_label};

fn bench_fit_random_forest(c: &mut Criterion) {
    let cleaned = clean_records(&common::raw_customers(500, 42), &CleanOptions::training()).unwrap();
    let (x, y) = split_label(&cleaned).unwrap();
    let config = ClassifierConfig::RandomForest(RandomForestConfig::new(50).unwrap().with_seed(42));
    let preprocessor = ColumnTransformer::telco();

    c.bench_function("fit_random_forest_500_rows_50trees", |b| {
        b.iter(|| fit_one(&preprocessor, &config, &x, &y).unwrap());
    });
}

fn bench_fit_svc(c: &mut Criterion) {
    let cleaned = clean_records(&common::raw_customers(500, 42), &CleanOptions::training()).unwrap();
    let (x, y) = split_label(&cleaned).unwrap();
    let config = ClassifierConfig::Svm(SvcConfig::new());
    let preprocessor = ColumnTransformer::telco();

    c.bench_function("fit_svc_500_rows", |b| {
        b.iter(|| fit_one(&preprocessor, &config, &x, &y).unwrap());
    });
}

fn bench_predict_raw_batch(c: &mut Criterion) {
    let raw = common::raw_customers(1000, 7);
    let cleaned = clean_records(&raw, &CleanOptions::training()).unwrap();
    let (x, y) = split_label(&cleaned).unwrap();
    let preprocessor = ColumnTransformer::telco();

    let mut group = c.benchmark_group("predict_raw_1000");
    for candidate in candidate_models() {
        let pipeline = fit_one(&preprocessor, &candidate.config, &x, &y).unwrap();
        group.bench_function(candidate.name, |b| {
            b.iter(|| pipeline.predict_proba(&raw).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fit_random_forest,
    bench_fit_svc,
    bench_predict_raw_batch
);
criterion_main!(benches);
