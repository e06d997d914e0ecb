use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_text_extractor::backend::{self, HttpBackend, TranscriptionBackend};
use video_text_extractor::controller::progress::ProgressSnapshot;
use video_text_extractor::controller::{DisplayOutcome, ExtractionController, SubmitOutcome};
use video_text_extractor::history::{HistoryStore, JsonFileStorage};
use video_text_extractor::{output, platforms, utils};
use video_text_extractor::{Cli, Commands, Config, ExtractionError, HistoryCommands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "video_text_extractor=debug,vtextract=debug"
    } else {
        "video_text_extractor=info,vtextract=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?.with_backend_url(cli.backend_url.clone())?;

    match cli.command {
        Commands::Extract {
            url,
            format,
            output,
            save,
        } => {
            let backend = backend::from_config(&config.backend)?;
            let controller = ExtractionController::new(backend, config.progress_config());

            if !controller.set_input(&url).await {
                return Err(ExtractionError::InvalidInput(url).into());
            }

            let renderer = (!cli.quiet).then(|| spawn_progress_bar(&controller));
            let outcome = controller.submit().await;
            if let Some(renderer) = renderer {
                if matches!(outcome, SubmitOutcome::Settled(_)) {
                    renderer.await.context("Progress display task failed")?;
                } else {
                    renderer.abort();
                }
            }

            let displayed = match outcome {
                SubmitOutcome::Settled(displayed) => displayed,
                SubmitOutcome::Disabled => return Err(ExtractionError::InvalidInput(url).into()),
                SubmitOutcome::Busy => anyhow::bail!("An extraction is already running"),
            };

            match &output {
                Some(path) => {
                    output::save_to_file(&displayed, path, &format).await?;
                    println!("Transcription saved to: {}", path.display());
                }
                None => output::print_to_console(&displayed, &format)?,
            }

            if displayed.outcome == DisplayOutcome::Failed {
                std::process::exit(1);
            }

            if save {
                let store = open_history(&config)?;
                let id = store.save(&displayed.result, &displayed.url)?;
                println!("Saved to history: {}", id);
            }
        }
        Commands::History { command } => {
            let store = open_history(&config)?;

            match command {
                HistoryCommands::List { format } => {
                    let records = store.list()?;
                    println!("{}", output::render_history(&records, &format)?);
                }
                HistoryCommands::Show { id, format, output } => {
                    let record = store
                        .get(&id)?
                        .ok_or_else(|| anyhow::anyhow!("No saved transcription with id {}", id))?;

                    // Replay through the controller; no request is sent
                    let backend = backend::from_config(&config.backend)?;
                    let controller = ExtractionController::new(backend, config.progress_config());
                    if !controller.restore(&record).await {
                        anyhow::bail!("Could not restore transcription {}: an extraction is in progress", id);
                    }
                    let displayed = controller
                        .display()
                        .await
                        .context("Restored transcription is not displayed")?;

                    match &output {
                        Some(path) => {
                            output::save_to_file(&displayed, path, &format).await?;
                            println!("Transcription saved to: {}", path.display());
                        }
                        None => output::print_to_console(&displayed, &format)?,
                    }
                }
                HistoryCommands::Clear { yes } => {
                    if !yes && !confirm_clear()? {
                        println!("History left unchanged.");
                        return Ok(());
                    }
                    store.clear()?;
                    println!("Transcription history cleared.");
                }
            }
        }
        Commands::Check => {
            let backend = backend::from_config(&config.backend)?;
            check_backend(&backend).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration file:");
                println!("  {}", Config::config_path()?.display());
            }
        }
        Commands::Platforms => {
            println!("Supported platforms:");
            for name in platforms::list_platforms() {
                println!("  • {} ({})", name, platforms::domains_for(name).join(", "));
            }
        }
    }

    Ok(())
}

fn open_history(config: &Config) -> Result<HistoryStore<JsonFileStorage>> {
    let path = config.history_path()?;
    tracing::debug!("Using history file: {}", path.display());
    Ok(HistoryStore::new(JsonFileStorage::new(path)))
}

/// Mirror the controller's progress feed on an indicatif bar until it settles
fn spawn_progress_bar<B: TranscriptionBackend>(
    controller: &ExtractionController<B>,
) -> tokio::task::JoinHandle<()> {
    let mut updates = controller.subscribe_progress();

    tokio::spawn(async move {
        let progress = ProgressBar::new(100);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap(),
        );

        loop {
            let snapshot: ProgressSnapshot = *updates.borrow_and_update();
            progress.set_position(snapshot.percent.round() as u64);
            progress.set_message(snapshot.phase);

            if snapshot.settled {
                progress.finish_and_clear();
                break;
            }

            if updates.changed().await.is_err() {
                progress.abandon();
                break;
            }
        }
    })
}

fn confirm_clear() -> Result<bool> {
    let term = console::Term::stderr();
    term.write_str("Are you sure you want to clear all transcription history? [y/N] ")?;
    let answer = term.read_line()?;
    Ok(utils::is_affirmative(&answer))
}

async fn check_backend(backend: &HttpBackend) -> Result<()> {
    println!("Checking {} ...", backend.base_url());

    match backend.health().await {
        Ok(health) => {
            println!("  Status: {}", health.status);
            println!("  Model loaded: {}", if health.model_loaded { "yes" } else { "no" });
            Ok(())
        }
        Err(failure) => {
            let error = video_text_extractor::controller::classify(&failure);
            tracing::debug!("Health check failed: {}", failure);
            anyhow::bail!("Transcription service unavailable: {}", error)
        }
    }
}
