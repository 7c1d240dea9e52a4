//! Criterion benchmarks for arbor-forest: split search, tree induction,
//! forest training and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_forest::{
    DataFrame, DecisionTreeConfig, FrameBuilder, RandomForestConfig, SplitCriterion,
    find_best_split,
};

fn make_classification(
    n_rows: usize,
    n_predictors: usize,
    n_classes: usize,
    seed: u64,
) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows: Vec<Vec<String>> = (0..n_rows)
        .map(|i| {
            let class = i % n_classes;
            let mut row: Vec<String> = (0..n_predictors)
                .map(|f| {
                    let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                    format!("{:.4}", base + rng.r#gen::<f64>() * 0.5)
                })
                .collect();
            row.push(class.to_string());
            row
        })
        .collect();
    FrameBuilder::new().build_from_strings(&rows).unwrap()
}

fn bench_find_best_split(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let candidates = data.schema().predictor_indexes();
    let total = data.target_counts();

    c.bench_function("find_best_split_500x20", |b| {
        b.iter(|| {
            let mut partition = data.clone();
            find_best_split(&mut partition, &candidates, &total, SplitCriterion::Entropy)
        });
    });
}

fn bench_tree_fit(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let config = DecisionTreeConfig::new();

    c.bench_function("tree_fit_500x20_5class", |b| {
        b.iter(|| config.fit(&data).unwrap());
    });
}

fn bench_forest_train(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let config = RandomForestConfig::new(50).with_seed(42);

    c.bench_function("forest_train_500x20_5class_50trees", |b| {
        b.iter(|| config.fit(&data).unwrap());
    });
}

fn bench_forest_classify(c: &mut Criterion) {
    let data = make_classification(500, 20, 5, 42);
    let forest = RandomForestConfig::new(50).with_seed(42).fit(&data).unwrap();

    c.bench_function("forest_classify_frame_500x20_50trees", |b| {
        b.iter(|| forest.classify_frame(&data).unwrap());
    });
}

criterion_group!(
    benches,
    bench_find_best_split,
    bench_tree_fit,
    bench_forest_train,
    bench_forest_classify
);
criterion_main!(benches);
