//! End-to-end regression tests for churn-model.
//!
//! Raw synthetic customers go through cleaning, the stratified split, every
//! registry candidate, artifact persistence, and the inference facade.

mod common;

use churn_model::{
    CHURN_THRESHOLD, ChurnLabel, ChurnScorer, ModelArtifact, PREDICTION_COLUMN,
    PROBABILITY_COLUMN, TrainingOutcome, candidate_models, predict_batch, predict_one, train_all,
    train_test_split,
};
use churn_prep::{CleanOptions, ColumnTransformer, RecordSet, Value, clean_records, split_label};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helper: train every candidate on 400 synthetic customers
// ---------------------------------------------------------------------------

fn train_outcome() -> (TrainingOutcome, RecordSet) {
    let raw = common::raw_customers(400, 42);
    let cleaned = clean_records(&raw, &CleanOptions::training()).unwrap();
    let (x, y) = split_label(&cleaned).unwrap();
    let (train, test) = train_test_split(&y, 0.2, 42).unwrap();
    let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
    let y_test: Vec<usize> = test.iter().map(|&i| y[i]).collect();

    let outcome = train_all(
        &candidate_models(),
        &ColumnTransformer::telco(),
        &x.select_rows(&train),
        &y_train,
        &x.select_rows(&test),
        &y_test,
    )
    .unwrap();
    (outcome, raw)
}

// ---------------------------------------------------------------------------
// a) every candidate trains and scores sensibly
// ---------------------------------------------------------------------------

/// The label rule is simple, so every family should beat 0.75 accuracy and
/// the best F1 should exceed 0.7.
#[test]
fn every_candidate_beats_baseline() {
    let (outcome, _) = train_outcome();
    assert_eq!(outcome.models().len(), 5);
    for m in outcome.models() {
        assert!(m.metrics.accuracy > 0.75, "{} accuracy {}", m.name, m.metrics.accuracy);
        for score in [m.metrics.precision, m.metrics.recall, m.metrics.f1] {
            assert!((0.0..=1.0).contains(&score));
        }
    }
    let best = outcome.best_by_f1().unwrap();
    assert!(best.metrics.f1 > 0.7, "best f1 {}", best.metrics.f1);

    let table = outcome.score_table().to_string();
    assert_eq!(table.lines().count(), 6);
    assert!(table.starts_with("Model"));
}

// ---------------------------------------------------------------------------
// b) persisted artifact scores exactly like the in-memory pipeline
// ---------------------------------------------------------------------------

#[test]
fn artifact_round_trip_and_inference() {
    let (outcome, raw) = train_outcome();
    let best = outcome.into_best_by_f1().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("churn_model.bin");
    ModelArtifact::new(best.name, best.pipeline.clone())
        .save(&path)
        .unwrap();
    let loaded = ModelArtifact::load(&path).unwrap();
    assert_eq!(loaded.model_name(), best.name);

    let batch_input = raw.select_rows(&(0..25).collect::<Vec<_>>());
    let expected = best.pipeline.predict_proba(&batch_input).unwrap();
    let scored = predict_batch(loaded.pipeline(), &batch_input).unwrap();
    assert_eq!(scored.n_rows(), 25);
    for (i, p) in expected.iter().enumerate() {
        assert_eq!(scored.get(i, PROBABILITY_COLUMN).unwrap(), &Value::Number(*p));
        let class = if *p >= CHURN_THRESHOLD { 1.0 } else { 0.0 };
        assert_eq!(scored.get(i, PREDICTION_COLUMN).unwrap(), &Value::Number(class));
        // Input columns pass through untouched.
        assert_eq!(scored.rows()[i][..raw.columns().len()], batch_input.rows()[i][..]);
    }

    let single = raw.select_rows(&[3]);
    let prediction = predict_one(loaded.pipeline(), &single).unwrap();
    assert_eq!(prediction.probability, expected[3]);
    assert_eq!(
        prediction.label,
        ChurnLabel::from_probability(prediction.probability)
    );
}

// ---------------------------------------------------------------------------
// c) the same seed reproduces the same scores
// ---------------------------------------------------------------------------

#[test]
fn training_is_deterministic() {
    let (a, _) = train_outcome();
    let (b, _) = train_outcome();
    for (x, y) in a.models().iter().zip(b.models()) {
        assert_eq!(x.metrics, y.metrics, "{}", x.name);
    }
}
