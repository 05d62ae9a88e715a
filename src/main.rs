use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use churn_io::{
    CsvRecordReader, JsonRecordReader, ModelScores, ReportWriter, RunName, TrainingReport,
    record_from_fields, write_records_csv,
};
use churn_model::{
    CHURN_THRESHOLD, ChurnLabel, ModelArtifact, PROBABILITY_COLUMN, TrainedModel,
    candidate_models_with_seed, predict_batch, predict_one, train_all, train_test_split,
};
use churn_prep::schema::SCHEMA_VERSION;
use churn_prep::{
    CleanOptions, ColumnTransformer, RecordSet, clean_records, split_label, unknown_categories,
};

#[derive(Parser)]
#[command(name = "churn")]
#[command(about = "Telco customer churn: train baseline classifiers and score customers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the train/test split and the stochastic learners
    #[arg(long, default_value_t = 42, global = true)]
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

#[derive(Subcommand)]
enum Command {
    /// Train every candidate model, report scores, and persist the best one
    Train {
        /// Path to the raw customer CSV file (must include Churn)
        #[arg(long)]
        data: PathBuf,

        /// Run name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        run: String,

        /// Output directory for the model artifact and report
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
    },

    /// Score a single customer record
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to a JSON object holding one customer record
        #[arg(long, conflicts_with = "fields", required_unless_present = "fields")]
        record: Option<PathBuf>,

        /// A single `key=value` field; repeat for every column
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Score every row of a CSV file
    PredictBatch {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the raw customer CSV file
        #[arg(long)]
        input: PathBuf,

        /// Path of the scored CSV to write
        #[arg(long)]
        output: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    run: String,
    selected_model: String,
    accuracy: f64,
    f1: f64,
    n_train: usize,
    n_test: usize,
    model_path: PathBuf,
    report_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    model: String,
    label: ChurnLabel,
    probability: f64,
}

#[derive(Serialize)]
struct PredictBatchOutput {
    model: String,
    n_rows: usize,
    n_churn: usize,
    threshold: f64,
    output: PathBuf,
}

fn model_scores(model: &TrainedModel) -> ModelScores {
    let c = model.metrics.confusion;
    ModelScores {
        name: model.name.to_string(),
        accuracy: model.metrics.accuracy,
        precision: model.metrics.precision,
        recall: model.metrics.recall,
        f1: model.metrics.f1,
        confusion_matrix: [
            [c.true_negative, c.false_positive],
            [c.false_negative, c.true_positive],
        ],
    }
}

fn warn_unknown_categories(records: &RecordSet) {
    for unknown in unknown_categories(records) {
        warn!(
            column = %unknown.column,
            row = unknown.row_index,
            value = %unknown.value,
            "unknown category, encoded as all zeros"
        );
    }
}

fn load_model(path: &Path) -> Result<ModelArtifact> {
    let artifact = ModelArtifact::load(path)
        .with_context(|| format!("failed to load model {}", path.display()))?;
    info!(
        model = artifact.model_name(),
        n_features = artifact.pipeline().feature_names().len(),
        "model loaded"
    );
    Ok(artifact)
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

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            run,
            output_dir,
            test_fraction,
        } => {
            let run_name = RunName::new(run.clone())?;

            // 1. Read and clean
            let raw = CsvRecordReader::new(&data)
                .read()
                .context("failed to read input CSV")?;
            warn_unknown_categories(&raw);
            let cleaned = clean_records(&raw, &CleanOptions::training())
                .context("failed to clean records")?;
            let (features, labels) = split_label(&cleaned).context("failed to split labels")?;
            info!(
                n_raw = raw.n_rows(),
                n_clean = cleaned.n_rows(),
                "records cleaned"
            );

            // 2. Stratified split
            let (train, test) = train_test_split(&labels, test_fraction, cli.seed)?;
            let y_train: Vec<usize> = train.iter().map(|&i| labels[i]).collect();
            let y_test: Vec<usize> = test.iter().map(|&i| labels[i]).collect();

            // 3. Train and score every candidate
            let outcome = train_all(
                &candidate_models_with_seed(cli.seed),
                &ColumnTransformer::telco(),
                &features.select_rows(&train),
                &y_train,
                &features.select_rows(&test),
                &y_test,
            )
            .context("training failed")?;
            if !cli.quiet {
                eprint!("{}", outcome.score_table());
            }

            // 4. Persist the best model and the report
            let best = outcome
                .best_by_f1()
                .context("no candidate models were trained")?;
            let writer = ReportWriter::new(&output_dir, run_name)?;
            let model_path = writer.model_path();
            ModelArtifact::new(best.name, best.pipeline.clone())
                .save(&model_path)
                .context("failed to save model")?;

            let report = TrainingReport {
                run: run.clone(),
                schema_version: SCHEMA_VERSION,
                n_rows_raw: raw.n_rows(),
                n_rows_clean: cleaned.n_rows(),
                n_train: train.len(),
                n_test: test.len(),
                seed: cli.seed,
                selected_model: best.name.to_string(),
                model_path: model_path.clone(),
                models: outcome.models().iter().map(model_scores).collect(),
            };
            let report_path = writer.write_report(&report)?;
            info!(model = best.name, f1 = best.metrics.f1, "best model selected");

            let output = TrainOutput {
                run,
                selected_model: best.name.to_string(),
                accuracy: best.metrics.accuracy,
                f1: best.metrics.f1,
                n_train: train.len(),
                n_test: test.len(),
                model_path,
                report_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            record,
            fields,
        } => {
            let artifact = load_model(&model)?;

            let raw = match record {
                Some(path) => JsonRecordReader::new(&path)
                    .read()
                    .context("failed to read record JSON")?,
                None => record_from_fields(&fields)?,
            };
            warn_unknown_categories(&raw);

            let prediction =
                predict_one(artifact.pipeline(), &raw).context("prediction failed")?;

            let output = PredictOutput {
                model: artifact.model_name().to_string(),
                label: prediction.label,
                probability: prediction.probability,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::PredictBatch {
            model,
            input,
            output,
        } => {
            let artifact = load_model(&model)?;

            let raw = CsvRecordReader::new(&input)
                .read()
                .context("failed to read input CSV")?;
            warn_unknown_categories(&raw);

            let scored = predict_batch(artifact.pipeline(), &raw).context("prediction failed")?;
            write_records_csv(&output, &scored)?;

            let n_churn = scored
                .column(PROBABILITY_COLUMN)?
                .filter(|v| v.as_number().is_some_and(|p| p >= CHURN_THRESHOLD))
                .count();
            info!(n_rows = scored.n_rows(), n_churn, "batch scored");

            let summary = PredictBatchOutput {
                model: artifact.model_name().to_string(),
                n_rows: scored.n_rows(),
                n_churn,
                threshold: CHURN_THRESHOLD,
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
