use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use transcript_enricher::ai::{AiProvider, LlmBackend};
use transcript_enricher::output::{self, TranscriptView};
use transcript_enricher::storage::Database;
use transcript_enricher::youtube::{resolve_video_id, YtDlpClient};
use transcript_enricher::{Cli, Commands, Config, Enricher, OutputFormat, RequestContext, TranscriptPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    // Resolving needs neither configuration nor the store
    if let Commands::Resolve { url } = &cli.command {
        let video_id = resolve_video_id(url)?;
        match cli.format {
            OutputFormat::Text => println!("{}", video_id),
            OutputFormat::Json => println!("{}", serde_json::json!({ "video_id": video_id })),
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    if let Commands::Config { show } = &cli.command {
        if *show {
            config.display();
        } else {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => Config::config_path()?,
            };
            println!("Configuration file: {}", path.display());
            println!("Run with --show to print the current settings.");
        }
        return Ok(());
    }

    let db = Database::open(&config.database.path, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path.display()))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight request");
            on_interrupt.cancel();
        }
    });

    let result = run(&cli, &config, db.clone(), cancel).await;
    db.close().await;
    result
}

async fn run(cli: &Cli, config: &Config, db: Database, cancel: CancellationToken) -> Result<()> {
    let format = cli.format;

    match &cli.command {
        Commands::Fetch { url, language } => {
            let client = YtDlpClient::with_path(&config.youtube.yt_dlp_path);
            if !client.check_availability().await {
                tracing::warn!(
                    "{} was not found or failed to run; fetching will likely fail",
                    config.youtube.yt_dlp_path
                );
            }

            let pipeline = TranscriptPipeline::from_config(config, Arc::new(client), db);
            let ctx = RequestContext::with_cancellation(config.youtube.request_timeout(), cancel);

            let fetched = with_spinner(
                cli.quiet,
                "Fetching transcript...",
                pipeline.fetch(&ctx, url, language.as_deref()),
            )
            .await?;
            println!("{}", output::render_fetched(&fetched, format)?);
        }
        Commands::Summarize { transcript_id, kind } => {
            let enricher = enricher(config, db);
            let ctx = RequestContext::with_cancellation(config.ai.operation_timeout(), cancel);

            let summary = with_spinner(
                cli.quiet,
                "Summarizing transcript...",
                enricher.summarize(&ctx, transcript_id, kind),
            )
            .await?;
            println!("{}", output::render_summary(&summary, format)?);
        }
        Commands::Extract { transcript_id, kind } => {
            let enricher = enricher(config, db);
            let ctx = RequestContext::with_cancellation(config.ai.operation_timeout(), cancel);

            let extraction = with_spinner(
                cli.quiet,
                "Extracting from transcript...",
                enricher.extract(&ctx, transcript_id, kind),
            )
            .await?;
            println!("{}", output::render_extraction(&extraction, format)?);
        }
        Commands::Ask { transcript_id, question } => {
            let enricher = enricher(config, db);
            let ctx = RequestContext::with_cancellation(config.ai.operation_timeout(), cancel);

            let answer = with_spinner(
                cli.quiet,
                "Answering question...",
                enricher.answer(&ctx, transcript_id, question),
            )
            .await?;
            println!("{}", output::render_answer(&answer, format)?);
        }
        Commands::Show { transcript_id } => {
            let transcript = db
                .get_transcript(transcript_id)
                .await
                .with_context(|| format!("transcript {} not found", transcript_id))?;
            let video = db.get_video(&transcript.video_id).await?;
            let summaries = db.list_summaries(&transcript.id).await?;
            let extractions = db.list_extractions(&transcript.id).await?;

            let view = TranscriptView {
                video: &video,
                transcript: &transcript,
                summaries: &summaries,
                extractions: &extractions,
            };
            println!("{}", output::render_view(&view, format)?);
        }
        Commands::Forget { summary_id } => {
            db.delete_summary(summary_id)
                .await
                .with_context(|| format!("summary {} not found", summary_id))?;
            println!("Deleted summary {}", summary_id);
        }
        Commands::Resolve { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

/// Build the enricher; a missing vendor key still allows cached results
fn enricher(config: &Config, db: Database) -> Enricher {
    let provider = match LlmBackend::from_config(&config.ai) {
        Ok(backend) => Some(AiProvider::new(Arc::new(backend))),
        Err(err) => {
            tracing::warn!("AI provider unavailable: {}", err);
            None
        }
    };

    Enricher::new(db, provider, config.ai.operation_timeout())
}

async fn with_spinner<F: Future>(quiet: bool, message: &'static str, future: F) -> F::Output {
    if quiet {
        return future.await;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = future.await;
    spinner.finish_and_clear();
    output
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "transcript_enricher=debug" } else { "transcript_enricher=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
