//! Accuracy and latency evaluation CLI.
//!
//! Benchmarks an image classifier served over a KServe v2 HTTP endpoint
//! against a labeled dataset, or fires synthetic inputs to check that the
//! endpoint is responsive at all.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use bench_client::{HttpInferenceClient, InferenceClient, InferenceError, RetryClient};
use bench_core::{cli, EvaluationConfig};
use bench_dataset::{list_samples, load_class_mapping, resolve_label_space};
use bench_harness::{
    report::write_json, run_synthetic, EvaluationDriver, Report, SyntheticConfig,
};

/// Image Classification Serving Benchmark
#[derive(Parser, Debug)]
#[command(
    name = "evaluate",
    about = "Benchmark a served image classifier for accuracy and latency",
    long_about = "Sends a labeled image dataset through an HTTP inference endpoint and \
                  reports top-1/top-5 accuracy, per-class accuracy, and latency \
                  percentiles. With --synthetic, sends random inputs instead to check \
                  endpoint responsiveness."
)]
struct Args {
    /// Optional TOML configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL of the inference server
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Model name as registered on the server
    #[arg(long, value_name = "NAME")]
    model_name: Option<String>,

    /// Dataset root directory
    #[arg(short, long, value_name = "DIR")]
    dataset_path: Option<PathBuf>,

    /// Local-to-target class index mapping file
    #[arg(long, value_name = "FILE")]
    mapping_file: Option<PathBuf>,

    /// Evaluate at most this many samples
    #[arg(short, long, value_name = "N")]
    num_samples: Option<usize>,

    /// Number of requests in flight at once
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Path for the JSON report
    #[arg(short, long, value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Send synthetic random inputs instead of dataset images
    #[arg(long)]
    synthetic: bool,

    /// Attempts per request, including the first (1 disables retries)
    #[arg(long, default_value = "1", value_name = "N")]
    retries: u32,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    cli::setup_cli_logging(args.verbose)?;

    info!("Image Classification Serving Benchmark");
    info!("======================================");

    let config = build_config(&args)?;
    config.validate()?;

    let http_client = HttpInferenceClient::new(&config.endpoint)?;
    probe_endpoint(&http_client, &config.endpoint.base_url).await?;

    let client: Arc<dyn InferenceClient> = if args.retries > 1 {
        Arc::new(RetryClient::new(
            http_client,
            args.retries,
            Duration::from_secs(1),
        ))
    } else {
        Arc::new(http_client)
    };

    if args.synthetic {
        run_synthetic_benchmark(client, &config).await
    } else {
        run_dataset_evaluation(client, config).await
    }
}

/// Loads the TOML configuration when given and applies flag overrides.
fn build_config(args: &Args) -> Result<EvaluationConfig> {
    let mut config = match &args.config {
        Some(path) => EvaluationConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EvaluationConfig::default(),
    };

    if let Some(url) = &args.url {
        config.endpoint.base_url = url.clone();
    }
    if let Some(model_name) = &args.model_name {
        config.endpoint.model_name = model_name.clone();
    }
    if let Some(dataset_path) = &args.dataset_path {
        config.dataset.root = dataset_path.clone();
    }
    if let Some(mapping_file) = &args.mapping_file {
        config.mapping_file = Some(mapping_file.clone());
    }
    if let Some(num_samples) = args.num_samples {
        config.num_samples = Some(num_samples);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(output_file) = &args.output_file {
        config.output_file = output_file.clone();
    }

    Ok(config)
}

/// Checks the server readiness endpoint before committing to a full run.
/// An unreachable server is fatal; a not-ready answer is only a warning
/// since some servers omit the health route.
async fn probe_endpoint(client: &HttpInferenceClient, base_url: &str) -> Result<()> {
    match client.ready().await {
        Ok(true) => {
            info!("Endpoint ready: {}", base_url);
            Ok(())
        }
        Ok(false) => {
            warn!("Endpoint answered but reported not ready: {}", base_url);
            Ok(())
        }
        Err(InferenceError::Unreachable(err)) => {
            bail!("Cannot reach inference server at {base_url}: {err}")
        }
        Err(err) => {
            warn!("Readiness probe failed ({err}), continuing anyway");
            Ok(())
        }
    }
}

async fn run_dataset_evaluation(
    client: Arc<dyn InferenceClient>,
    config: EvaluationConfig,
) -> Result<()> {
    info!("Dataset: {}", config.dataset.root.display());
    let labels = resolve_label_space(&config.dataset)?;
    info!("Label space: {} classes", labels.len());

    let mapping = match &config.mapping_file {
        Some(path) => {
            let mapping = load_class_mapping(path)
                .with_context(|| format!("failed to load mapping from {}", path.display()))?;
            info!("Class mapping: {} entries from {}", mapping.len(), path.display());
            Some(mapping)
        }
        None => None,
    };

    let samples = list_samples(&config.dataset, &labels)?;
    if samples.is_empty() {
        bail!("No samples found under {}", config.dataset.root.display());
    }
    let total = config.num_samples.unwrap_or(samples.len()).min(samples.len());
    info!("Evaluating {} of {} samples", total, samples.len());

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples ({eta})")?
            .progress_chars("=>-"),
    );
    let bar = progress.clone();

    let output_file = config.output_file.clone();
    let driver = EvaluationDriver::new(config, mapping, client).with_progress(Box::new(
        move |completed, _total| bar.set_position(completed as u64),
    ));

    let report = driver.run(samples).await?;
    progress.finish_and_clear();

    print_report(&report);
    report.save(&output_file)?;
    info!("Report saved to: {}", output_file.display());

    Ok(())
}

async fn run_synthetic_benchmark(
    client: Arc<dyn InferenceClient>,
    config: &EvaluationConfig,
) -> Result<()> {
    let synthetic_config = SyntheticConfig {
        num_samples: config.num_samples.unwrap_or(100),
        image_size: config.dataset.image_size,
        concurrency: config.concurrency,
        detail_limit: config.detail_limit,
    };
    info!("Synthetic benchmark: {} samples", synthetic_config.num_samples);

    let report = run_synthetic(client, synthetic_config).await?;

    info!("");
    info!("=== Synthetic Benchmark Results ===");
    info!(
        "Success rate: {:.1}% ({}/{})",
        report.success_rate * 100.0,
        report.successful_count,
        report.total_count
    );
    info!(
        "Responsive: {}",
        if report.is_responsive { "yes" } else { "no" }
    );
    info!(
        "Latency: mean {:.1}ms, p95 {:.1}ms, p99 {:.1}ms",
        report.latency.mean_ms, report.latency.p95_ms, report.latency.p99_ms
    );
    info!("Throughput: {:.1} samples/s", report.samples_per_second);

    write_json(&report, &config.output_file)?;
    info!("Report saved to: {}", config.output_file.display());

    Ok(())
}

fn print_report(report: &Report) {
    info!("");
    info!("=== Evaluation Results ===");
    info!(
        "Top-1 accuracy: {:.4} ({}/{})",
        report.top1_accuracy, report.top1_correct_count, report.scored_count
    );
    info!(
        "Top-5 accuracy: {:.4} ({}/{})",
        report.top5_accuracy, report.top5_correct_count, report.scored_count
    );
    if report.excluded_count > 0 {
        info!("Excluded (failed): {}", report.excluded_count);
    }
    if report.unscoreable_count > 0 {
        info!("Unscoreable (no truth index): {}", report.unscoreable_count);
    }
    info!(
        "Latency: mean {:.1}ms, p50 {:.1}ms, p95 {:.1}ms, p99 {:.1}ms",
        report.latency.mean_ms, report.latency.p50_ms, report.latency.p95_ms, report.latency.p99_ms
    );
    info!(
        "Throughput: {:.2} images/s over {:.1}s",
        report.images_per_second, report.elapsed_seconds
    );
    info!("");
}
