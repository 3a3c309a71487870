use clap::{Args, Parser, Subcommand};
use eyre::Context;
use jiff::civil::DateTime;
use oauth2::basic::BasicTokenResponse;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_live::youtube_api::datetime::format_scheduled_start;
use youtube_live::{
    AlertSink, BroadcastFilter, BroadcastStatus, Config, IngestionType, LiveStreamingClient,
    OAuthGate, OAuthManager, VideoFormat,
};

/// Manage YouTube live broadcasts and streams from the command line.
#[derive(Parser)]
#[command(name = "youtube-live-cli", version, about)]
struct Cli {
    /// Where the OAuth token is kept between runs
    #[arg(long, global = true, default_value = "tokens.json")]
    tokens: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Viewer-facing live events
    #[command(subcommand)]
    Broadcasts(BroadcastCommand),
    /// Encoder-facing ingestion pipelines
    #[command(subcommand)]
    Streams(StreamCommand),
}

#[derive(Args)]
struct PageArgs {
    /// Continue from a previous page
    #[arg(long, conflicts_with = "all_pages")]
    page_token: Option<String>,
    /// Follow page tokens until the list is exhausted
    #[arg(long)]
    all_pages: bool,
}

#[derive(Subcommand)]
enum BroadcastCommand {
    /// List broadcasts
    List {
        /// active, all, completed or upcoming
        #[arg(long, default_value = "all")]
        status: BroadcastFilter,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one broadcast
    Get { id: String },
    /// Schedule a new broadcast
    Create {
        #[arg(long)]
        title: String,
        /// Local wall-clock start time, e.g. 2024-01-05T10:00:00
        #[arg(long)]
        start: DateTime,
    },
    /// Move a broadcast to testing, live or complete
    Transition { id: String, status: BroadcastStatus },
    Delete { id: String },
    /// Attach a stream to a broadcast
    Bind { id: String, stream_id: String },
    /// Detach whatever stream a broadcast is bound to
    Unbind { id: String },
    /// Retitle a broadcast
    Update {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "1080p")]
        format: VideoFormat,
    },
}

#[derive(Subcommand)]
enum StreamCommand {
    /// List the user's streams
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one stream
    Get { id: String },
    /// Create a 720p60 RTMP stream
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// The stream key
        #[arg(long)]
        stream_name: String,
    },
    Delete { id: String },
    /// Retitle a stream and change its format
    Update {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        format: VideoFormat,
        /// dash or rtmp
        #[arg(long, default_value = "rtmp")]
        ingestion_type: IngestionType,
    },
}

/// Alerts go to stderr so stdout stays machine-readable.
#[derive(Debug)]
struct StderrAlerts;

impl AlertSink for StderrAlerts {
    fn show(&self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("load configuration")?;

    let manager = OAuthManager::from_config(&config);
    let gate = match load_token(&cli.tokens).await? {
        Some(token) => OAuthGate::with_stored_token(manager, token),
        None => OAuthGate::new(manager),
    };
    let yt = LiveStreamingClient::new(config, gate).with_alerts(StderrAlerts);

    let outcome = match cli.command {
        Command::Broadcasts(command) => run_broadcast_command(&yt, command).await,
        Command::Streams(command) => run_stream_command(&yt, command).await,
    };

    // Persist whatever the gate ended up with, even if the command itself failed.
    if let Some(token) = yt.authorizer().token().await {
        save_token(&cli.tokens, &token).await?;
    }

    outcome
}

async fn run_broadcast_command(
    yt: &LiveStreamingClient,
    command: BroadcastCommand,
) -> eyre::Result<()> {
    match command {
        BroadcastCommand::List { status, page } => {
            if page.all_pages {
                let broadcasts = yt.broadcasts(status);
                let mut broadcasts = std::pin::pin!(broadcasts);
                while let Some(broadcast) = broadcasts.next().await {
                    print_json(&broadcast.context("fetch broadcast")?)?;
                }
            } else {
                let list = yt
                    .list_broadcasts(status, page.page_token.as_deref())
                    .await?;
                print_json(&list)?;
            }
        }
        BroadcastCommand::Get { id } => match yt.get_broadcast(&id).await? {
            Some(broadcast) => print_json(&broadcast)?,
            None => eyre::bail!("no broadcast with id {id}"),
        },
        BroadcastCommand::Create { title, start } => {
            let start = start
                .to_zoned(jiff::tz::TimeZone::system())
                .context("resolve start time in the local time zone")?;
            tracing::info!(scheduled = %format_scheduled_start(&start), "creating broadcast");
            print_json(&yt.create_broadcast(&title, &start).await?)?;
        }
        BroadcastCommand::Transition { id, status } => {
            print_json(&yt.transition_broadcast(&id, status).await?)?;
        }
        BroadcastCommand::Delete { id } => {
            yt.delete_broadcast(&id).await?;
            eprintln!("deleted broadcast {id}");
        }
        BroadcastCommand::Bind { id, stream_id } => {
            print_json(&yt.bind_broadcast(&id, &stream_id).await?)?;
        }
        BroadcastCommand::Unbind { id } => {
            print_json(&yt.unbind_broadcast(&id).await?)?;
        }
        BroadcastCommand::Update { id, title, format } => {
            print_json(&yt.update_broadcast(&id, &title, format).await?)?;
        }
    }
    Ok(())
}

async fn run_stream_command(yt: &LiveStreamingClient, command: StreamCommand) -> eyre::Result<()> {
    match command {
        StreamCommand::List { page } => {
            if page.all_pages {
                let streams = yt.streams();
                let mut streams = std::pin::pin!(streams);
                while let Some(stream) = streams.next().await {
                    print_json(&stream.context("fetch stream")?)?;
                }
            } else {
                print_json(&yt.list_streams(page.page_token.as_deref()).await?)?;
            }
        }
        StreamCommand::Get { id } => match yt.get_stream(&id).await? {
            Some(stream) => print_json(&stream)?,
            None => eyre::bail!("no stream with id {id}"),
        },
        StreamCommand::Create {
            title,
            description,
            stream_name,
        } => {
            print_json(&yt.create_stream(&title, &description, &stream_name).await?)?;
        }
        StreamCommand::Delete { id } => {
            yt.delete_stream(&id).await?;
            eprintln!("deleted stream {id}");
        }
        StreamCommand::Update {
            id,
            title,
            format,
            ingestion_type,
        } => {
            print_json(
                &yt.update_stream(&id, &title, format, ingestion_type)
                    .await?,
            )?;
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

async fn load_token(path: &Path) -> eyre::Result<Option<BasicTokenResponse>> {
    if !tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("check for {}", path.display()))?
    {
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    if json.trim().is_empty() {
        return Ok(None);
    }
    let token = serde_json::from_str(&json).context("parse stored YouTube access token")?;
    Ok(Some(token))
}

async fn save_token(path: &Path, token: &BasicTokenResponse) -> eyre::Result<()> {
    let json = serde_json::to_string(token).context("serialize YouTube access token")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("write {}", path.display()))
}
