//! Accuracy regression tests for arbor-forest.
//!
//! These tests verify that algorithmic changes do not degrade tree and
//! forest classification accuracy on a deterministic synthetic dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_forest::{
    ColumnKind, CrossValidation, DataFrame, DecisionTreeConfig, FrameBuilder, MaxFeatures,
    RandomForestConfig, leave_one_out,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic classification dataset
// ---------------------------------------------------------------------------

/// Generate a 300-row, 10-predictor, 3-class dataset.
///
/// Predictors 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Predictors 3-9 are pure noise in [0, 0.5]. Rows are assigned
/// round-robin across classes.
fn make_classification() -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_rows = 300;
    let n_predictors = 10;
    let n_classes = 3;

    let mut rows = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let class = i % n_classes;
        let mut row: Vec<String> = (0..n_predictors)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                format!("{:.4}", base + rng.r#gen::<f64>() * 0.5)
            })
            .collect();
        row.push(class.to_string());
        rows.push(row);
    }

    let mut names: Vec<String> = (0..n_predictors).map(|f| format!("f{f}")).collect();
    names.push("class".to_string());
    FrameBuilder::new().with_names(names).build_from_strings(&rows).unwrap()
}

// ---------------------------------------------------------------------------
// a) inferred_kinds
// ---------------------------------------------------------------------------

#[test]
fn inferred_kinds() {
    let data = make_classification();
    assert_eq!(data.n_predictor_variables(), 10);
    assert_eq!(data.schema().kind(0), ColumnKind::NumericFloat);
    assert_eq!(data.schema().kind(10), ColumnKind::TargetCategoricalInt);
}

// ---------------------------------------------------------------------------
// b) cv_error_below_threshold
// ---------------------------------------------------------------------------

/// 5-fold cross-validation mean error must stay below 0.15.
#[test]
fn cv_error_below_threshold() {
    let data = make_classification();
    let rf_config = RandomForestConfig::new(50).with_seed(42);
    let cv = CrossValidation::new(5).unwrap().with_seed(42);
    let result = cv.evaluate(&rf_config, &data).unwrap();

    assert!(
        result.mean_error_rate < 0.15,
        "cv mean error {} >= 0.15",
        result.mean_error_rate
    );
}

// ---------------------------------------------------------------------------
// c) oob_error_below_threshold
// ---------------------------------------------------------------------------

/// OOB error with 100 trees must stay below 0.20.
#[test]
fn oob_error_below_threshold() {
    let data = make_classification();
    let forest = RandomForestConfig::new(100).with_seed(42).fit(&data).unwrap();
    let oob = forest.error_estimate(&data).unwrap();

    assert!(oob.error < 0.20, "oob error {} >= 0.20", oob.error);
    assert_eq!(oob.n_evaluated, data.len());
}

// ---------------------------------------------------------------------------
// d) deterministic_predictions
// ---------------------------------------------------------------------------

/// Same config and seed must produce identical predictions across two
/// independent runs, whatever the thread scheduling.
#[test]
fn deterministic_predictions() {
    let data = make_classification();
    let rf_config = RandomForestConfig::new(40).with_seed(42);

    let preds1 = rf_config.fit(&data).unwrap().classify_frame(&data).unwrap();
    let preds2 = rf_config.fit(&data).unwrap().classify_frame(&data).unwrap();

    assert_eq!(preds1, preds2, "predictions differ across runs with the same seed");
}

// ---------------------------------------------------------------------------
// e) training_data_is_memorized
// ---------------------------------------------------------------------------

/// A single unrestricted tree classifies every training row correctly, and a
/// forest gets at least 95% of them.
#[test]
fn training_data_is_memorized() {
    let data = make_classification();

    let tree = DecisionTreeConfig::new().fit(&data).unwrap();
    for i in 0..data.len() {
        assert_eq!(tree.classify(&data.row(i)).unwrap(), data.target(i));
    }

    let forest = RandomForestConfig::new(60)
        .with_max_features(MaxFeatures::Log2)
        .with_seed(7)
        .fit(&data)
        .unwrap();
    let predictions = forest.classify_frame(&data).unwrap();
    let correct = (0..data.len()).filter(|&i| predictions[i] == data.target(i)).count();
    let accuracy = correct as f64 / data.len() as f64;

    assert!(accuracy > 0.95, "training accuracy {accuracy} <= 0.95");
}

// ---------------------------------------------------------------------------
// f) leave_one_out_tree
// ---------------------------------------------------------------------------

#[test]
fn leave_one_out_tree() {
    let data = make_classification().select_rows(&(0..60).collect::<Vec<_>>());
    let result = leave_one_out(&DecisionTreeConfig::new(), &data).unwrap();
    assert_eq!(result.n_rows, 60);
    assert!(result.error_rate < 0.15, "loo error {}", result.error_rate);
}
