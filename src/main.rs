use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use patternkit::results::{write_classification_results, write_regression_results};
use patternkit::{
    Anbc, ClassificationData, Classifier, ExperimentConfig, LinearRegression,
    MultidimensionalRegression, Persistent, Pipeline, RegressionData,
};

#[derive(Parser)]
#[command(name = "patternkit", version, about = "Train and evaluate classifiers and regressors")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with model settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an adaptive naive Bayes classifier on part of a dataset and test it on the rest
    Classify(ClassifyArgs),
    /// Train a multi-output linear regression pipeline and test it on a separate dataset
    Regress(RegressArgs),
}

#[derive(Args)]
struct ClassifyArgs {
    /// Labelled classification data (native format or .csv)
    #[arg(long)]
    data: PathBuf,

    /// Percentage of the data kept for training
    #[arg(long)]
    train_pct: Option<f64>,

    /// Split each class separately
    #[arg(long)]
    stratified: bool,

    #[arg(long, default_value = "anbc_model.json")]
    model: PathBuf,

    #[arg(long)]
    null_rejection_coeff: Option<f64>,

    #[arg(long)]
    no_scaling: bool,

    #[arg(long)]
    no_null_rejection: bool,

    /// Seed for partitioning the data
    #[arg(long)]
    seed: Option<u64>,

    /// Write `index, label, predicted` for each test sample here
    #[arg(long)]
    results: Option<PathBuf>,
}

#[derive(Args)]
struct RegressArgs {
    /// Regression training data (native format or .csv)
    #[arg(long)]
    train: PathBuf,

    /// Regression test data
    #[arg(long)]
    test: PathBuf,

    #[arg(long, default_value = "pipeline.json")]
    pipeline: PathBuf,

    #[arg(long, default_value = "regression_results.tsv")]
    results: PathBuf,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    max_epochs: Option<usize>,

    #[arg(long)]
    min_change: Option<f64>,

    /// Seed for weight initialisation and sample order
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "patternkit=debug"
    } else {
        "patternkit=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = match &cli.config {
        Some(path) => ExperimentConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    match cli.command {
        Commands::Classify(args) => classify(config, args),
        Commands::Regress(args) => regress(config, args),
    }
}

fn classify(mut config: ExperimentConfig, args: ClassifyArgs) -> Result<()> {
    if let Some(pct) = args.train_pct {
        config.training_percentage = pct;
    }
    if let Some(coeff) = args.null_rejection_coeff {
        config.classifier.null_rejection_coeff = coeff;
    }
    if args.no_scaling {
        config.classifier.use_scaling = false;
    }
    if args.no_null_rejection {
        config.classifier.use_null_rejection = false;
    }
    config.stratified |= args.stratified;
    config.seed = args.seed.or(config.seed);
    config.validate()?;

    let mut training_data = load_classification(&args.data)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let test_data = training_data
        .partition_with_rng(config.training_percentage, config.stratified, &mut rng)
        .context("failed to partition the data")?;
    tracing::info!(
        training = training_data.num_samples(),
        test = test_data.num_samples(),
        "partitioned dataset"
    );

    let mut anbc = Anbc::with_settings(config.classifier.clone())?;
    anbc.train(&training_data)
        .context("failed to train classifier")?;
    anbc.save_model_to_file(&args.model)
        .with_context(|| format!("failed to save the classifier model to {}", args.model.display()))?;
    anbc.load_model_from_file(&args.model)
        .with_context(|| format!("failed to load the classifier model from {}", args.model.display()))?;

    let mut correct = 0;
    for (i, sample) in test_data.iter().enumerate() {
        let predicted = anbc
            .predict_label(sample.sample())
            .with_context(|| format!("failed to perform prediction for test sample {}", i))?;
        if predicted == sample.class_label() {
            correct += 1;
        }
        tracing::info!(
            sample = i,
            class_label = sample.class_label(),
            predicted,
            max_likelihood = anbc.max_likelihood(),
            "test sample"
        );
    }

    if let Some(path) = &args.results {
        write_classification_results(path, &mut anbc, &test_data)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
    }

    let accuracy = patternkit::metrics::accuracy(correct, test_data.num_samples());
    println!("Test Accuracy: {:.2}%", accuracy * 100.0);
    Ok(())
}

fn regress(mut config: ExperimentConfig, args: RegressArgs) -> Result<()> {
    if let Some(rate) = args.learning_rate {
        config.regression.learning_rate = rate;
    }
    if let Some(epochs) = args.max_epochs {
        config.regression.max_epochs = epochs;
    }
    if let Some(min_change) = args.min_change {
        config.regression.min_change = min_change;
    }
    config.regression.seed = args.seed.or(config.regression.seed);
    config.validate()?;

    let training_data = load_regression(&args.train)?;
    let test_data = load_regression(&args.test)?;

    if training_data.num_input_dimensions() != test_data.num_input_dimensions() {
        bail!(
            "the number of input dimensions in the training data ({}) does not match the test data ({})",
            training_data.num_input_dimensions(),
            test_data.num_input_dimensions()
        );
    }
    if training_data.num_target_dimensions() != test_data.num_target_dimensions() {
        bail!(
            "the number of target dimensions in the training data ({}) does not match the test data ({})",
            training_data.num_target_dimensions(),
            test_data.num_target_dimensions()
        );
    }

    println!("Training data stats:\n{}", training_data.stats());
    println!("Test data stats:\n{}", test_data.stats());

    let template = LinearRegression::with_settings(config.regression.clone())?;
    let mut pipeline = Pipeline::new();
    pipeline.set_regressifier(MultidimensionalRegression::new(template, true));

    pipeline
        .train_regression(&training_data)
        .context("failed to train the regression model")?;
    pipeline
        .save_pipeline_to_file(&args.pipeline)
        .with_context(|| format!("failed to save pipeline to {}", args.pipeline.display()))?;
    pipeline
        .load_pipeline_from_file(&args.pipeline)
        .with_context(|| format!("failed to load pipeline from {}", args.pipeline.display()))?;

    let rms_error = pipeline
        .test_regression(&test_data)
        .context("failed to test the regression model")?
        .rms_error;
    println!("Test complete. Test RMS error: {}", rms_error);

    write_regression_results(&args.results, &mut pipeline, &test_data)
        .with_context(|| format!("failed to write results to {}", args.results.display()))?;
    Ok(())
}

fn load_classification(path: &Path) -> Result<ClassificationData> {
    let data = ClassificationData::load_from_file(path)
        .with_context(|| format!("failed to load classification data from {}", path.display()))?;
    if data.is_empty() {
        bail!("{} contains no samples", path.display());
    }
    Ok(data)
}

fn load_regression(path: &Path) -> Result<RegressionData> {
    let data = RegressionData::load_from_file(path)
        .with_context(|| format!("failed to load regression data from {}", path.display()))?;
    if data.is_empty() {
        bail!("{} contains no samples", path.display());
    }
    Ok(data)
}
