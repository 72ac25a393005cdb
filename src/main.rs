//! jobmatch - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use jobmatch::{
    analysis::{analyze, ChatContext},
    cli::{Args, Commands, Config, Verbosity},
    repl::{ChatRepl, DisplayManager},
    session::ConversationSession,
    streaming::{ClientConfig, CompletionBackend, GeminiClient},
    telemetry::TelemetryCollector,
    types::AnalysisResult,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbosity());

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;

    match &args.command {
        Commands::Analyze { resume, job, json } => {
            run_analyze(&args, &config, resume.as_deref(), job, *json).await?;
        }
        Commands::Chat { resume, job } => {
            run_chat(&args, &config, resume.as_deref(), job.as_deref()).await?;
        }
        Commands::Models => {
            list_models(&args, &config).await?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over -v/-q
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn client_config(args: &Args, config: &Config) -> Result<ClientConfig> {
    Ok(config.client_config(args.api_key.as_deref(), args.model.as_deref())?)
}

/// Read a source text file, `-` meaning stdin
fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn resolve_resume(config: &Config, resume: Option<&Path>) -> Result<PathBuf> {
    resume
        .map(Path::to_path_buf)
        .or_else(|| config.resume_path())
        .context("No resume given; pass --resume or set [profile] resume_path")
}

/// Run the one-shot analysis with a spinner and save the chat context
async fn analyze_and_save(
    args: &Args,
    config: &Config,
    client: &GeminiClient,
    resume: Option<&Path>,
    job: &Path,
) -> Result<ChatContext> {
    let resume_text = read_source(&resolve_resume(config, resume)?)?;
    let job_text = read_source(job)?;

    let mut display = DisplayManager::new();
    if args.verbosity().show_progress() {
        display.start_analysis(client.model());
    }
    let outcome = analyze(client, &resume_text, &job_text).await;
    display.finish_spinner();

    let result: AnalysisResult = outcome.context("Analysis failed")?;
    let context = ChatContext::new(resume_text, job_text, result, client.model());

    let path = ChatContext::path_in(&config.state_dir());
    if let Err(e) = context.save(&path) {
        tracing::warn!(error = %e, path = %path.display(), "could not save analysis context");
    }

    Ok(context)
}

async fn run_analyze(
    args: &Args,
    config: &Config,
    resume: Option<&Path>,
    job: &Path,
    json: bool,
) -> Result<()> {
    let client = GeminiClient::new(client_config(args, config)?)?;
    let context = analyze_and_save(args, config, &client, resume, job).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&context.analysis)?);
    } else {
        let display = DisplayManager::new();
        display.show_analysis(&context.analysis);
        if !matches!(args.verbosity(), Verbosity::Quiet) {
            display.show_info(&format!("Continue with {}", "jobmatch chat".green()));
        }
    }

    Ok(())
}

async fn run_chat(
    args: &Args,
    config: &Config,
    resume: Option<&Path>,
    job: Option<&Path>,
) -> Result<()> {
    let telemetry = TelemetryCollector::new();
    let client_config = client_config(args, config)?;
    let client = GeminiClient::new(client_config.clone())?.with_telemetry(telemetry.clone());

    let context = match job {
        Some(job) => {
            let context = analyze_and_save(args, config, &client, resume, job).await?;
            DisplayManager::new().show_analysis(&context.analysis);
            context
        }
        None => {
            let context = ChatContext::load(&ChatContext::path_in(&config.state_dir()))?;
            DisplayManager::new().show_info(&format!(
                "Resuming analysis from {} ({}/100)",
                context.analyzed_at.format("%Y-%m-%d %H:%M UTC"),
                context.analysis.match_score
            ));
            context
        }
    };

    let mut session = ConversationSession::with_backend(client_config, client);
    context.bootstrap_session(&mut session)?;

    let history_path = config.state_dir().join("chat_history");
    let mut repl = ChatRepl::new(history_path, telemetry, args.verbosity())?;
    repl.run(&mut session).await
}

async fn list_models(args: &Args, config: &Config) -> Result<()> {
    let client = GeminiClient::new(client_config(args, config)?)?;
    let models = client.list_models().await.context("Failed to list models")?;

    if models.is_empty() {
        println!("No generation models available for this key.");
        return Ok(());
    }

    let current = client.config().model_id.as_str();
    println!("Available models ({}):", models.len());
    for model in &models {
        let marker = if model.name == current { "*".green() } else { " ".normal() };
        println!("  {} {:<32} {}", marker, model.name, model.display_name.dimmed());
    }

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let path = args.config.clone().or_else(Config::default_path);
    if let Some(path) = path {
        let status = if path.exists() { "" } else { " (not found, using defaults)" };
        println!("# {}{}", path.display(), status);
    }

    let rendered = toml::to_string_pretty(&config.redacted()).context("Failed to render config")?;
    println!("{}", rendered);

    if args.api_key.is_some() {
        println!("# API key overridden by --api-key / GEMINI_API_KEY");
    }
    Ok(())
}
