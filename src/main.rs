use clap::{Parser, Subcommand};
use etransfer_relay::application::matcher::{InboundMatcher, MailboxHeartbeat, MatchOutcome};
use etransfer_relay::application::webhook::WebhookNotifier;
use etransfer_relay::config::AppConfig;
use etransfer_relay::domain::alias::EmailAlias;
use etransfer_relay::domain::ports::{AliasStoreRef, InstructionStoreRef, WebhookTransportRef};
use etransfer_relay::infrastructure::in_memory::{
    InMemoryAliasStore, InMemoryBlacklistStore, InMemoryInstructionStore,
};
use etransfer_relay::infrastructure::queue::InMemoryJobQueue;
#[cfg(feature = "storage-rocksdb")]
use etransfer_relay::infrastructure::rocksdb::RocksDBStore;
use etransfer_relay::infrastructure::webhook::LoggingWebhookTransport;
use etransfer_relay::interfaces::csv::notification_reader::NotificationReader;
use etransfer_relay::interfaces::http::{create_router, state::AppState};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP surface and the outbound job queue.
    Serve {
        /// Bind address override, e.g. 0.0.0.0:8080.
        #[arg(long)]
        bind: Option<String>,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// JSON file with the initial alias pool.
        #[arg(long)]
        aliases: Option<PathBuf>,
    },
    /// Feed a CSV export of mailbox notifications through the matcher.
    Replay {
        /// Input notifications CSV file.
        input: PathBuf,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Serve {
            bind,
            db_path,
            aliases,
        } => serve(config, bind, db_path, aliases).await,
        Commands::Replay { input, db_path } => replay(config, input, db_path).await,
    }
}

async fn serve(
    config: AppConfig,
    bind: Option<String>,
    db_path: Option<PathBuf>,
    alias_pool: Option<PathBuf>,
) -> Result<()> {
    let (instructions, aliases) = open_stores(db_path)?;
    if let Some(path) = alias_pool {
        let seeded = seed_aliases(&aliases, &path).await?;
        tracing::info!(count = seeded, file = %path.display(), "seeded alias pool");
    }

    let state = AppState::assemble(
        &config,
        instructions,
        aliases,
        Arc::new(InMemoryBlacklistStore::new()),
        Arc::new(InMemoryJobQueue::new()),
        Arc::new(LoggingWebhookTransport::new()) as WebhookTransportRef,
    );

    let addr = bind.unwrap_or_else(|| config.bind_address());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "etransfer relay listening");
    axum::serve(listener, create_router(state))
        .await
        .into_diagnostic()?;

    Ok(())
}

async fn replay(config: AppConfig, input: PathBuf, db_path: Option<PathBuf>) -> Result<()> {
    let (instructions, _aliases) = open_stores(db_path)?;
    let notifier = WebhookNotifier::new(
        Arc::new(LoggingWebhookTransport::new()) as WebhookTransportRef,
        &config.webhook,
    );
    let matcher = InboundMatcher::new(instructions, notifier, MailboxHeartbeat::new());

    let file = File::open(&input).into_diagnostic()?;
    let reader = NotificationReader::new(file);

    let (mut processed, mut matched, mut reconfirmed, mut dropped, mut errors) = (0, 0, 0, 0, 0);
    for result in reader.notifications() {
        match result {
            Ok(notification) => {
                processed += 1;
                match matcher.handle(notification).await.into_diagnostic()? {
                    MatchOutcome::Matched { .. } => matched += 1,
                    MatchOutcome::Reconfirmed { .. } => reconfirmed += 1,
                    MatchOutcome::NoMatch => dropped += 1,
                }
            }
            Err(err) => {
                errors += 1;
                tracing::warn!(error = %err, "skipping unreadable notification row");
            }
        }
    }

    println!(
        "processed={processed} matched={matched} reconfirmed={reconfirmed} dropped={dropped} errors={errors}"
    );
    Ok(())
}

fn open_stores(db_path: Option<PathBuf>) -> Result<(InstructionStoreRef, AliasStoreRef)> {
    match db_path {
        None => Ok((
            Arc::new(InMemoryInstructionStore::new()) as InstructionStoreRef,
            Arc::new(InMemoryAliasStore::new()) as AliasStoreRef,
        )),
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok((
                Arc::new(store.clone()) as InstructionStoreRef,
                Arc::new(store) as AliasStoreRef,
            ))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            "persistent storage requested but this build lacks the storage-rocksdb feature"
        )),
    }
}

async fn seed_aliases(aliases: &AliasStoreRef, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path).into_diagnostic()?;
    let pool: Vec<EmailAlias> = serde_json::from_str(&raw).into_diagnostic()?;
    let count = pool.len();
    for alias in pool {
        aliases.insert(alias).await.into_diagnostic()?;
    }
    Ok(count)
}
