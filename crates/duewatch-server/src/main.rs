//! duewatch server binary.
//!
//! Loads `.env`, reads `config.toml` (or the path given with `--config`)
//! under `DUEWATCH_*` environment overrides, opens the SQLite store, starts
//! the daily reminder scheduler, and serves the sign-in flow over HTTP until
//! Ctrl-C or SIGTERM.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use duewatch_classroom::{ClassroomClient, GoogleOAuth};
use duewatch_notify::DiscordDispatcher;
use duewatch_scheduler::{ReminderScheduler, WallClock};
use duewatch_server::{AppState, ServerConfig};
use duewatch_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Classroom deadline reminder server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single reminder cycle now and exit without serving HTTP.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let dotenv = dotenvy::dotenv();

  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  match dotenv {
    Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
    Err(e) if e.not_found() => tracing::debug!("no .env file; using process environment"),
    Err(e) => return Err(e).context("failed to read .env file"),
  }

  let cli = Cli::parse();

  // Load and validate configuration.
  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  let settings = server_cfg
    .scheduler
    .resolve()
    .context("invalid scheduler configuration")?;

  // Collaborators.
  let oauth = GoogleOAuth::new(server_cfg.google.clone())
    .context("invalid Google OAuth configuration")?;
  let classroom = ClassroomClient::new().context("failed to build Classroom client")?;
  let display_zone = match settings.clock {
    WallClock::Zone(tz) => Some(tz),
    WallClock::System => None,
  };
  let discord = DiscordDispatcher::new(&server_cfg.discord, settings.lookahead)
    .context("invalid Discord configuration")?
    .with_display_zone(display_zone);

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let lookahead = settings.lookahead;
  let scheduler = ReminderScheduler::new(
    settings,
    store.clone(),
    classroom.clone(),
    store.clone(),
    discord,
  );

  if cli.once {
    let report = scheduler.run_cycle().await.context("reminder cycle failed")?;
    tracing::info!(?report, "single reminder cycle finished");
    return Ok(());
  }

  let cancel = CancellationToken::new();
  let scheduler_task = tokio::spawn(scheduler.run(cancel.child_token()));

  let app = duewatch_server::router(AppState::new(store, oauth, classroom, lookahead));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(cancel.clone()))
    .await
    .context("server error")?;

  // The scheduler finishes the user it is on, then stops.
  cancel.cancel();
  scheduler_task.await.context("scheduler task panicked")?;
  tracing::info!("shut down cleanly");

  Ok(())
}

/// Resolve on Ctrl-C, SIGTERM, or an external cancel, and cancel `cancel`.
async fn shutdown_signal(cancel: CancellationToken) {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::warn!(error = %e, "cannot listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        tracing::warn!(error = %e, "cannot listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {}
    _ = terminate => {}
    _ = cancel.cancelled() => {}
  }

  tracing::info!("shutdown requested");
  cancel.cancel();
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
