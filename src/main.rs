use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use meetline::config::{OpenAiConfig, SessionConfig, DEFAULT_ANSWER_PROMPT};
use meetline::kernel::reactor::{Session, SessionHandle};
use meetline::outputs::text::render;
use meetline::recognition::{ConsoleFeed, ConsoleRecognizer};
use meetline::services::{AudioClip, DirectCompletionService, EnrichmentService, HttpEnrichmentClient};

#[derive(Debug, Parser)]
#[command(name = "meetline", version, about = "Live meeting transcript with translation and answer hints")]
struct Cli {
    /// Where enrichment requests go.
    #[arg(long, value_enum, default_value_t = Backend::Http)]
    backend: Backend,

    /// Base URL of the meeting service (http backend).
    #[arg(long)]
    service_url: Option<String>,

    /// Custom answer prompt.
    #[arg(long)]
    prompt: Option<String>,

    /// Log filter, e.g. `debug` or `meetline=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// The meeting service's `/api/*` endpoints
    Http,
    /// An OpenAI-compatible API, called directly
    Openai,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Live session driven from stdin (default).
    Live,
    /// Transcribe and translate a recorded audio file.
    Transcribe { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let mut config = SessionConfig::from_env()?;
    if let Some(url) = cli.service_url.clone() {
        config.service_url = url;
    }
    if let Some(prompt) = cli.prompt.clone() {
        config.answer_prompt = prompt;
    }
    config.validate()?;

    let service = build_service(cli.backend, &config)?;

    match cli.mode.unwrap_or(Mode::Live) {
        Mode::Live => run_live(config, service).await,
        Mode::Transcribe { file } => run_transcribe(service, file).await,
    }
}

fn build_service(backend: Backend, config: &SessionConfig) -> Result<Arc<dyn EnrichmentService>> {
    let service: Arc<dyn EnrichmentService> = match backend {
        Backend::Http => {
            let client = HttpEnrichmentClient::new(config.service_url.clone(), config.request_timeout());
            info!("Using meeting service at {}", client.base_url());
            Arc::new(client)
        }
        Backend::Openai => {
            let openai = OpenAiConfig::from_env()?;
            info!("Using completion API at {} ({})", openai.base_url, openai.chat_model);
            Arc::new(DirectCompletionService::new(openai, config.request_timeout())?)
        }
    };
    Ok(service)
}

async fn run_live(config: SessionConfig, service: Arc<dyn EnrichmentService>) -> Result<()> {
    let mut session = Session::new(config, service);
    let handle = session.handle();

    let (recognizer, feed) = ConsoleRecognizer::new(handle.sink());
    session.attach_recognizer(Box::new(recognizer));

    let mut view = session.subscribe();
    let printer = tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let snapshot = view.borrow_and_update().clone();
            println!("{}", render(&snapshot));
        }
    });

    let lines = spawn_stdin_reader()?;
    let input = tokio::spawn(read_console(handle.clone(), feed, lines));

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            interrupt.shutdown();
        }
    });

    session.run().await;
    info!("Session summary: {:?}", session.telemetry());

    input.abort();
    drop(session);
    let _ = printer.await;
    Ok(())
}

/// Blocking stdin reads live on their own thread so the runtime can shut
/// down without waiting for the next line.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        })
        .context("failed to spawn stdin reader")?;
    Ok(rx)
}

async fn read_console(handle: SessionHandle, feed: ConsoleFeed, mut lines: mpsc::UnboundedReceiver<String>) {
    println!("Commands: /start /stop /clear /prompt <text> /quit. Prefix a line with ~ for interim speech.");

    while let Some(line) = lines.recv().await {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('/') else {
            if !feed.push(line) {
                println!("(not listening; type /start first)");
            }
            continue;
        };

        let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
        let delivered = match name {
            "start" => handle.start(),
            "stop" => handle.stop(),
            "toggle" => handle.toggle(),
            "clear" => handle.clear(),
            "prompt" if arg.trim().is_empty() => handle.set_answer_prompt(DEFAULT_ANSWER_PROMPT),
            "prompt" => handle.set_answer_prompt(arg.trim()),
            "quit" | "exit" => break,
            other => {
                warn!("Unknown command /{}", other);
                true
            }
        };
        if !delivered {
            return;
        }
    }

    handle.shutdown();
}

async fn run_transcribe(service: Arc<dyn EnrichmentService>, file: PathBuf) -> Result<()> {
    let clip = AudioClip::from_path(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    info!("Transcribing {} ({} bytes)", clip.file_name, clip.bytes.len());

    let transcript = service.transcribe(clip).await?;
    println!("EN: {}", transcript.english_transcript);
    println!("ZH: {}", transcript.chinese_translation);
    Ok(())
}
