use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use dashguard_core::{
    AnalysisConfig, Analyzer, ChatCompletionsOracle, OracleSettings, ProgressSink,
    PromptTemplates, Provider, ReportKey, RunState, RunSupervisor, VideoPayload, VotePolicy,
    format_report_readable, get_cache_dir, get_report_path, load_report, probe_duration,
    save_report,
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Openrouter,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Openrouter => Provider::OpenRouter,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "dashguard")]
#[command(
    about = "Find the collision in a dashcam video, vote on fault, and describe before, during and after"
)]
struct Cli {
    /// Path to the dashcam video
    video: PathBuf,

    /// Video duration in seconds. Probed with ffprobe when omitted.
    #[arg(long)]
    duration: Option<f64>,

    /// Number of independent estimates to request
    #[arg(short = 'n', long, default_value_t = 5)]
    samples: usize,

    /// AI provider for inference
    #[arg(short, long, default_value = "openrouter")]
    provider: CliProvider,

    /// Override the provider's default model
    #[arg(long)]
    model: Option<String>,

    /// Override the provider's chat completions endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Require 60% agreement on the verdict, otherwise fall back to plain majority
    #[arg(long)]
    supermajority: bool,

    /// JSON file with describe prompts, keyed by verdict then section
    #[arg(long)]
    prompts: Option<PathBuf>,

    /// Force re-processing even if a cached report exists
    #[arg(short, long)]
    force: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

/// Mirrors run state transitions onto the spinner.
struct SpinnerSink {
    spinner: ProgressBar,
}

impl ProgressSink for SpinnerSink {
    fn on_state(&self, state: &RunState) {
        let message = match state {
            RunState::Sampling { requested } => {
                format!("Requesting {} collision estimates...", requested)
            }
            RunState::Aggregating {
                valid,
                rejected,
                failed,
            } => {
                self.spinner.println(format!(
                    "{} Estimates: {} valid, {} rejected, {} failed",
                    style("✓").green().bold(),
                    valid,
                    rejected,
                    failed
                ));
                "Aggregating...".to_string()
            }
            RunState::Sectionizing { robust_time } => {
                format!("Splitting timeline around {:.2}s...", robust_time)
            }
            RunState::Describing { verdict } => {
                self.spinner.println(format!(
                    "{} Verdict: {}",
                    style("✓").green().bold(),
                    style(verdict).yellow()
                ));
                "Describing sections...".to_string()
            }
            RunState::Complete => "Done".to_string(),
            RunState::Failed { reason } => format!("Failed: {}", reason),
        };
        self.spinner.set_message(message);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let provider: Provider = cli.provider.into();

    // Validate configuration early
    let settings = OracleSettings::resolve(provider, cli.api_url, cli.model)
        .unwrap_or_else(|e| fail(e));
    let config = AnalysisConfig {
        sample_count: cli.samples,
        vote_policy: if cli.supermajority {
            VotePolicy::supermajority()
        } else {
            VotePolicy::Majority
        },
    };
    if let Err(e) = config.validate() {
        fail(e);
    }
    let prompts = match &cli.prompts {
        Some(path) => PromptTemplates::load(path).await,
        None => PromptTemplates::builtin(),
    }
    .unwrap_or_else(|e| fail(e));

    // Keep stdout clean for --json
    let status = |line: String| {
        if !cli.json {
            println!("{}", line);
        }
    };

    status(format!(
        "\n{}  {}\n",
        style("dashguard").cyan().bold(),
        style("Collision Analyzer").dim()
    ));

    let total_start = Instant::now();

    // Step 1: Duration
    let duration = match cli.duration {
        Some(duration) => duration,
        None => probe_duration(&cli.video).await?,
    };
    status(format!("{} Duration: {:.1}s", style("✓").green().bold(), duration));

    // Step 2: Encode once, shared by every request
    let video = VideoPayload::from_file(&cli.video).await?;
    status(format!(
        "{} Encoded: {} {}",
        style("✓").green().bold(),
        style(cli.video.display()).dim(),
        style(format!("[{} KiB, {}]", video.byte_len() / 1024, video.mime())).dim()
    ));
    status(style("─".repeat(60)).dim().to_string());

    // Step 3: Analyze (check cache with every input that shapes the report)
    let report_key = ReportKey {
        provider,
        model: &settings.model,
        api_url: &settings.api_url,
        config: &config,
        duration,
        prompts_fingerprint: prompts.fingerprint(),
    };
    let report_path = get_report_path(&get_cache_dir(&video), &report_key);
    let report = if !cli.force && report_path.exists() {
        let report = load_report(&report_path).await?;
        status(format!(
            "{} Report generated ({}) {}",
            style("✓").green().bold(),
            provider.name(),
            style("(cached)").dim()
        ));
        report
    } else {
        let step_start = Instant::now();
        let model = settings.model.clone();
        let oracle = Arc::new(ChatCompletionsOracle::new(settings));
        let analyzer = Analyzer::new(oracle, Arc::new(prompts), config)?;
        let supervisor = RunSupervisor::new(analyzer);

        let spinner = create_spinner(&format!("Analyzing with {}...", provider.name()))?;
        let sink = SpinnerSink {
            spinner: spinner.clone(),
        };
        let report = match supervisor.run(video, duration, &sink).await {
            Ok(report) => report,
            Err(e) => {
                spinner.finish_and_clear();
                fail(e);
            }
        };
        save_report(&report, &report_path).await?;
        spinner.finish_with_message(format!(
            "{} Report generated ({}, {}) {}",
            style("✓").green().bold(),
            provider.name(),
            model,
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        ));
        report
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "\n{} {}",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}\n",
        style("Saved:").dim(),
        style(report_path.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());

    let readable = format_report_readable(&report);
    println!("{}", readable);

    Ok(())
}
