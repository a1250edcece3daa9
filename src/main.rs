use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repurposer::cli::{Cli, Commands, OutputFormat};
use repurposer::completion::OpenAiCompletion;
use repurposer::config::Config;
use repurposer::extractors::ExtractorRegistry;
use repurposer::output::{ConsoleSink, FileSink, OutputSink};
use repurposer::pipeline::Pipeline;
use repurposer::stages::{LengthUnit, Platform};
use repurposer::utils;

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose {
        "repurposer=debug"
    } else {
        "repurposer=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so console reports stay clean on stdout
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(progress_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        progress.set_style(progress_style);
    }
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::Repurpose {
            source,
            output,
            format,
            concurrency,
            timeout,
        } => {
            // Local transcripts do not need yt-dlp
            let registry = ExtractorRegistry::new();
            if !registry.is_local_file(&source) {
                let missing_deps = utils::check_dependencies().await;
                if !missing_deps.is_empty() {
                    eprintln!("{}", style("Dependency check warnings:").yellow());
                    for dep in missing_deps {
                        eprintln!("   • {}", dep);
                    }
                    eprintln!("   (Continuing anyway - tools may be available)");
                }
            }

            let mut config = Config::load().await?;
            if let Some(concurrency) = concurrency {
                config.pipeline.concurrency = concurrency;
            }
            if let Some(timeout) = timeout {
                config.pipeline.run_timeout_secs = timeout;
            }
            config.validate()?;

            let format = format
                .or_else(|| OutputFormat::from_config(&config.output.format))
                .unwrap_or(OutputFormat::Text);

            let completion = OpenAiCompletion::from_config(&config.completion)
                .context("Failed to set up the completion service")?;

            let progress = spinner(cli.quiet);
            let pipeline = Pipeline::new(Arc::new(registry), Arc::new(completion), &config)
                .with_progress(progress.clone());

            tracing::info!("Starting repurposing for: {}", source);
            let started = Instant::now();
            let result = pipeline.run(&source).await;
            progress.finish_and_clear();

            if let Some(failure) = &result.error {
                eprintln!("{} {}", style("Repurposing failed:").red().bold(), failure);
                anyhow::bail!("run stopped at {}", failure.stage);
            }

            let report = result
                .report
                .context("Run finished without producing a report")?;

            let sink: Box<dyn OutputSink> = match (output, &config.output.output_dir) {
                (Some(path), _) => Box::new(FileSink::to_path(path, format.clone())),
                (None, Some(dir)) => Box::new(FileSink::in_directory(dir, format.clone())),
                (None, None) => Box::new(ConsoleSink::new(format.clone())),
            };
            let location = sink.persist(&report).await?;

            let summary = format!(
                "Generated {} post(s) in {}",
                report.artifact_count(),
                utils::format_duration(started.elapsed())
            );
            eprintln!("{}", style(summary).green());
            if result.skipped_units > 0 {
                eprintln!(
                    "{}",
                    style(format!("{} post(s) could not be generated", result.skipped_units))
                        .yellow()
                );
            }
            if location != "stdout" {
                println!("Report saved to: {}", location);
            }
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
                println!(
                    "Default report format: {}",
                    OutputFormat::from_config(&config.output.format).unwrap_or(OutputFormat::Text)
                );
            }
        }
        Commands::Platforms => {
            let config = Config::load_or_default()?;
            println!("Output platforms:");
            for platform in Platform::ALL {
                let spec = config.platforms.spec(platform);
                let unit = match spec.unit {
                    LengthUnit::Words => "words",
                    LengthUnit::Chars => "characters",
                };
                println!(
                    "  • {} ({}): up to {} {}, {} per video",
                    platform.display_name(),
                    platform,
                    spec.limit,
                    unit,
                    spec.quota
                );
            }
            println!();
            println!("Supported sources:");
            for source in ExtractorRegistry::new().list_platforms() {
                println!("  • {}", source);
            }
        }
    }

    Ok(())
}
