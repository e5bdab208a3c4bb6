use chatpick::{ChatPick, Config, SelectionMode, SelectionResult, StdoutSpeaker};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chatpick", about = "chatpick — ingest chat, pick a message to read aloud")]
struct Cli {
    /// Config file (created with defaults if missing).
    #[arg(long, default_value = chatpick_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Write debug logs to <log_dir>/chatpick-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one or more channels until Ctrl-C or every relay hangs up.
    Listen {
        #[arg(required = true)]
        channels: Vec<String>,
    },
    /// Pick one message from a channel's log.
    Pick {
        channel: String,
        /// random | last | mention
        #[arg(long, default_value = "random")]
        mode: SelectionMode,
        /// Print the result as JSON instead of speaking it.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(Some(&cli.config))?;
    init_tracing(&config, cli.debug)?;

    let app = ChatPick::new(&config);
    match cli.command {
        Command::Listen { channels } => listen(&app, &channels).await,
        Command::Pick { channel, mode, json } => pick(&app, &channel, mode, json).await,
    }
}

fn init_tracing(config: &Config, debug: bool) -> anyhow::Result<()> {
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };

    if debug {
        std::fs::create_dir_all(&config.value.log_dir)?;
        let path = config.value.log_dir.join("chatpick-debug.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(filter("debug"))
            .init();
        tracing::info!(path = %path.display(), "chatpick debug log started");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("info"))
            .init();
    }
    Ok(())
}

async fn listen(app: &ChatPick, channels: &[String]) -> anyhow::Result<()> {
    for channel in channels {
        app.start_ingestion(channel).await?;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut tick = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted, stopping sessions");
                break;
            }
            _ = tick.tick() => {
                if app.running_channels().await.is_empty() {
                    tracing::info!("every session has ended");
                    break;
                }
            }
        }
    }

    let mut failed = 0;
    for (channel, end) in app.shutdown().await {
        match end {
            Ok(end) => tracing::info!(channel = %channel, ?end, "session ended"),
            Err(e) => {
                failed += 1;
                tracing::error!(channel = %channel, error = %e, "session failed");
            }
        }
    }
    if failed > 0 && failed == channels.len() {
        anyhow::bail!("every session failed");
    }
    Ok(())
}

async fn pick(app: &ChatPick, channel: &str, mode: SelectionMode, json: bool) -> anyhow::Result<()> {
    if json {
        let result = app.request_selection(channel, mode).await?;
        println!("{}", serde_json::to_string(&result)?);
        return Ok(());
    }

    match app.announce(channel, mode, &StdoutSpeaker).await? {
        SelectionResult::Found(_) => {}
        SelectionResult::NotFound(reason) => println!("{reason}"),
    }
    Ok(())
}
