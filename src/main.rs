use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use arbor_forest::{
    ColumnKind, CrossValidation, CrossValidationResult, DataFrame, DecisionTreeConfig, Learner,
    LeaveOneOutResult, MaxFeatures, OobEstimate, RandomForest, RandomForestConfig,
    SplitCriterion, leave_one_out,
};
use arbor_io::{CsvReader, EvaluationSummary, ExperimentName, ReportWriter};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Decision trees and random forests over typed tabular data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 777_111_333, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input table and output naming shared by every training command.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the input CSV file (header row required)
    #[arg(long)]
    data: PathBuf,

    /// Comma-separated column kinds, e.g. "string,int,float,target"
    /// (inferred from the values if not set; last column is the target)
    #[arg(long)]
    kinds: Option<String>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Tree-growing parameters shared by trees and forests.
#[derive(Args, Debug, Clone)]
struct GrowthArgs {
    /// Nodes with this many rows or fewer become leaves
    #[arg(long, default_value_t = 1)]
    min_leaf_size: usize,

    /// Split criterion: "entropy" or "gini"
    #[arg(long, default_value = "entropy")]
    criterion: String,
}

/// Ensemble parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Predictors tried per split: "sqrt", "log2", "all", or a count
    #[arg(long, default_value = "sqrt")]
    max_features: String,
}

#[derive(Subcommand)]
enum Command {
    /// Fit a single decision tree and write it as JSON and DOT
    Tree {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        growth: GrowthArgs,

        /// Predictors tried per split, chosen at random (0 = all)
        #[arg(long, default_value_t = 0)]
        vars_per_split: usize,
    },

    /// Fit a random forest, report its out-of-bag error, and save the model
    Forest {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        growth: GrowthArgs,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Estimate generalization error by leave-one-out and/or k-fold validation
    Validate {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        growth: GrowthArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Learner to validate: "tree" or "forest"
        #[arg(long, default_value = "tree")]
        learner: String,

        /// Run leave-one-out validation
        #[arg(long, default_value_t = false)]
        loo: bool,

        /// Run k-fold cross-validation with this many folds
        #[arg(long)]
        folds: Option<usize>,

        /// Seed for the fold shuffle
        #[arg(long, default_value_t = 333_888_333)]
        cv_seed: u64,
    },

    /// Classify the rows of a CSV file with a saved forest
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the CSV file to classify (columns in training order;
        /// the target column may be omitted)
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TreeOutput {
    experiment: String,
    n_rows: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    json: PathBuf,
    dot: PathBuf,
}

#[derive(Serialize)]
struct ForestOutput {
    experiment: String,
    n_rows: usize,
    n_trees: usize,
    vars_per_split: usize,
    oob_error: Option<f64>,
    oob_evaluated: Option<usize>,
    model: PathBuf,
}

#[derive(Serialize)]
struct ValidateOutput {
    experiment: String,
    learner: String,
    n_rows: usize,
    loo_error: Option<f64>,
    cv_mean_error: Option<f64>,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_rows: usize,
    model_n_trees: usize,
    predictions: PathBuf,
}

fn parse_kinds(s: &str) -> Result<Vec<ColumnKind>> {
    s.split(',')
        .map(|k| k.parse::<ColumnKind>().context("invalid --kinds"))
        .collect()
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "entropy" => Ok(SplitCriterion::Entropy),
        "gini" => Ok(SplitCriterion::Gini),
        other => anyhow::bail!("unknown criterion: {other} (expected entropy or gini)"),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => other
            .parse::<usize>()
            .map(MaxFeatures::Fixed)
            .with_context(|| {
                format!("unknown max features: {other} (expected sqrt, log2, all, or a count)")
            }),
    }
}

fn read_table(input: &InputArgs) -> Result<DataFrame> {
    let mut reader = CsvReader::new(&input.data);
    if let Some(kinds) = &input.kinds {
        reader = reader.with_kinds(parse_kinds(kinds)?);
    }
    let data = reader.read().context("failed to read input CSV")?;
    info!(n_rows = data.len(), n_columns = data.n_columns(), "dataset loaded");
    Ok(data)
}

fn forest_config(
    growth: &GrowthArgs,
    forest: &ForestArgs,
    seed: u64,
) -> Result<RandomForestConfig> {
    Ok(RandomForestConfig::new(forest.n_trees)
        .with_max_features(parse_max_features(&forest.max_features)?)
        .with_min_leaf_size(growth.min_leaf_size)
        .with_criterion(parse_criterion(&growth.criterion)?)
        .with_seed(seed))
}

/// Estimate the forest's error on its own training rows.
///
/// A forest of zero trees has no votes to count, so the estimate is skipped
/// rather than failing the run.
fn out_of_bag_estimate(model: &RandomForest, data: &DataFrame) -> Result<Option<OobEstimate>> {
    if model.is_empty() {
        warn!("forest has no trees, skipping out-of-bag estimate");
        return Ok(None);
    }
    let oob = model
        .error_estimate(data)
        .context("out-of-bag estimation failed")?;
    info!(error = oob.error, n_evaluated = oob.n_evaluated, "out-of-bag estimate");
    Ok(Some(oob))
}

fn run_validation<L: Learner>(
    learner: &L,
    data: &DataFrame,
    loo: bool,
    cv: Option<&CrossValidation>,
) -> Result<(Option<LeaveOneOutResult>, Option<CrossValidationResult>)> {
    let loo_result = if loo {
        let result = leave_one_out(learner, data).context("leave-one-out failed")?;
        info!(error_rate = result.error_rate, "leave-one-out complete");
        Some(result)
    } else {
        None
    };

    let cv_result = match cv {
        Some(cv) => {
            let result = cv.evaluate(learner, data).context("cross-validation failed")?;
            info!(mean_error_rate = result.mean_error_rate, "cross-validation complete");
            Some(result)
        }
        None => None,
    };

    Ok((loo_result, cv_result))
}

fn writer_for(output_dir: &Path, experiment: &str) -> Result<ReportWriter> {
    let name = ExperimentName::new(experiment.to_string())?;
    Ok(ReportWriter::new(output_dir, name)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Tree {
            input,
            growth,
            vars_per_split,
        } => {
            let writer = writer_for(&input.output_dir, &input.experiment)?;
            let data = read_table(&input)?;

            let tree = DecisionTreeConfig::new()
                .with_vars_per_split(vars_per_split)
                .with_min_leaf_size(growth.min_leaf_size)
                .with_criterion(parse_criterion(&growth.criterion)?)
                .with_seed(cli.seed)
                .fit(&data)
                .context("tree induction failed")?;
            info!(n_nodes = tree.n_nodes(), depth = tree.depth(), "tree fitted");

            let (json, dot) = writer.write_tree(&tree)?;

            let output = TreeOutput {
                experiment: input.experiment,
                n_rows: data.len(),
                n_nodes: tree.n_nodes(),
                n_leaves: tree.n_leaves(),
                depth: tree.depth(),
                json,
                dot,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Forest {
            input,
            growth,
            forest,
        } => {
            let writer = writer_for(&input.output_dir, &input.experiment)?;
            let data = read_table(&input)?;

            // 1. Train
            let config = forest_config(&growth, &forest, cli.seed)?;
            let model = config.fit(&data).context("forest training failed")?;

            // 2. Out-of-bag estimate on the training rows
            let oob = out_of_bag_estimate(&model, &data)?;

            // 3. Save model and evaluation
            let model_path = writer.model_path();
            model.save(&model_path).context("failed to save model")?;
            info!(path = %model_path.display(), "model saved");

            writer.write_evaluation(&EvaluationSummary {
                learner: "forest".to_string(),
                n_rows: data.len(),
                oob,
                ..EvaluationSummary::default()
            })?;

            let output = ForestOutput {
                experiment: input.experiment,
                n_rows: data.len(),
                n_trees: model.n_trees(),
                vars_per_split: model.vars_per_split(),
                oob_error: oob.map(|o| o.error),
                oob_evaluated: oob.map(|o| o.n_evaluated),
                model: model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Validate {
            input,
            growth,
            forest,
            learner,
            loo,
            folds,
            cv_seed,
        } => {
            if !loo && folds.is_none() {
                anyhow::bail!("nothing to validate: pass --loo and/or --folds <k>");
            }
            let writer = writer_for(&input.output_dir, &input.experiment)?;
            let data = read_table(&input)?;
            let cv = folds
                .map(|k| CrossValidation::new(k).map(|cv| cv.with_seed(cv_seed)))
                .transpose()?;

            let (loo_result, cv_result) = match learner.as_str() {
                "tree" => {
                    let config = DecisionTreeConfig::new()
                        .with_min_leaf_size(growth.min_leaf_size)
                        .with_criterion(parse_criterion(&growth.criterion)?)
                        .with_seed(cli.seed);
                    run_validation(&config, &data, loo, cv.as_ref())?
                }
                "forest" => {
                    let config = forest_config(&growth, &forest, cli.seed)?;
                    run_validation(&config, &data, loo, cv.as_ref())?
                }
                other => anyhow::bail!("unknown learner: {other} (expected tree or forest)"),
            };

            writer.write_evaluation(&EvaluationSummary {
                learner: learner.clone(),
                n_rows: data.len(),
                oob: None,
                leave_one_out: loo_result,
                cross_validation: cv_result.clone(),
            })?;

            let output = ValidateOutput {
                experiment: input.experiment,
                learner,
                n_rows: data.len(),
                loo_error: loo_result.map(|r| r.error_rate),
                cv_mean_error: cv_result.map(|r| r.mean_error_rate),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            experiment,
            output_dir,
        } => {
            let writer = writer_for(&output_dir, &experiment)?;

            // 1. Load model
            let forest = RandomForest::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trees(),
                n_training_rows = forest.n_training_rows(),
                "model loaded"
            );

            // 2. Encode rows against the model's schema
            let raw = CsvReader::new(&data)
                .read_raw()
                .context("failed to read input CSV")?;
            let schema = forest.schema();

            // 3. Classify and decode
            let labels = raw
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let x = schema
                        .encode_row(i, row)
                        .with_context(|| format!("row {i} does not fit the model"))?;
                    forest
                        .predict_label(&x)
                        .with_context(|| format!("prediction failed for row {i}"))
                })
                .collect::<Result<Vec<_>>>()?;

            let predictions = writer.write_predictions(&labels)?;

            let output = PredictOutput {
                experiment,
                n_rows: labels.len(),
                model_n_trees: forest.n_trees(),
                predictions,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
