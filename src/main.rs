use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use logbook_sync::backend::{BackendService, HttpBackend, MutationRequest};
use logbook_sync::config::{self, Config};
use logbook_sync::connectivity::{self, NetState};
use logbook_sync::db::{self, Pool};
use logbook_sync::events::{EventBus, QueueEvent};
use logbook_sync::queue::OfflineQueue;
use logbook_sync::sync::{SyncAgent, PROMPT_SUPPRESSED_KEY};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the sync daemon: watch connectivity and replay queued mutations.
    Run,
    /// Replay every queued mutation once ("Sync Now").
    Sync,
    /// Show queue state and pending actions.
    Status,
    /// Queue a mutation for later delivery.
    Queue {
        method: String,
        url: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
    /// Enable or disable the startup sync-review prompt.
    Prompt {
        #[arg(value_enum)]
        mode: PromptMode,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PromptMode {
    Enable,
    Disable,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/queue.db?mode=rwc", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let backend: Arc<dyn BackendService> = Arc::new(HttpBackend::from_config(&cfg)?);
    let events = EventBus::default();
    let queue = Arc::new(OfflineQueue::new(pool.clone(), backend.clone(), events.clone()));

    match args.command {
        Command::Run => run_daemon(cfg, pool, backend, queue, events).await,
        Command::Sync => {
            match queue.replay().await? {
                Some(summary) => {
                    println!("synced {} action(s), {} failed", summary.success, summary.failed)
                }
                None => println!("a sync is already running"),
            }
            Ok(())
        }
        Command::Status => {
            let state = queue.state().await?;
            println!("state: {}", state.as_str());
            for action in queue.pending_actions().await? {
                println!(
                    "#{} {} (queued {})",
                    action.id,
                    action.message,
                    action.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
        Command::Queue { method, url, body } => {
            let body: Option<serde_json::Value> =
                body.as_deref().map(serde_json::from_str).transpose()?;
            let id = queue.enqueue(&method, &url, body).await?;
            println!("queued action #{id}");
            Ok(())
        }
        Command::Prompt { mode } => {
            db::set_flag(&pool, PROMPT_SUPPRESSED_KEY, matches!(mode, PromptMode::Disable)).await?;
            Ok(())
        }
    }
}

/// Reachability check against the configured probe endpoint. Any response,
/// whatever its status, means the backend is reachable.
async fn reachability(backend: &Arc<dyn BackendService>, path: &str) -> NetState {
    let req = MutationRequest::new("GET", path, None);
    match backend.send(&req).await {
        Ok(_) => NetState::Online,
        Err(_) => NetState::Offline,
    }
}

async fn run_daemon(
    cfg: Config,
    pool: Pool,
    backend: Arc<dyn BackendService>,
    queue: Arc<OfflineQueue>,
    events: EventBus,
) -> Result<()> {
    let initial = reachability(&backend, &cfg.probe.path).await;
    let (handle, monitor) = connectivity::channel(initial);
    info!(state = ?initial, "starting sync daemon");

    // Shell-level adapter: a headless process has no browser online/offline
    // events, so reachability transitions are fed into the handle here. The
    // core observer stays purely reactive.
    let probe_backend = backend.clone();
    let probe_path = cfg.probe.path.clone();
    let interval = Duration::from_millis(cfg.probe.interval_ms);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let state = reachability(&probe_backend, &probe_path).await;
            handle.set(state);
        }
    });

    // Operator-facing mirror of what the UI surfaces show as toasts.
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                QueueEvent::ActionQueued { message, .. } => info!(%message, "action queued"),
                QueueEvent::SyncAvailable { actions } => {
                    info!(pending = actions.len(), "sync available")
                }
                QueueEvent::ConnectionLost => info!("offline; actions will be queued"),
                QueueEvent::ConnectionRestored => info!("back online"),
                QueueEvent::SyncFinished { summary } => {
                    info!(success = summary.success, failed = summary.failed, "sync finished")
                }
            }
        }
    });

    SyncAgent::new(pool, queue, monitor, events).run().await
}
