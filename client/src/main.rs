//! feedsync - console client for an ordered record feed.
//!
//! Fetches the feed snapshot on login, on a timer, and whenever a line is
//! entered on stdin, and prints the merged newest-first list on every change.

use feedsync_client::auth::{self, Session};
use feedsync_client::cache::ViewCache;
use feedsync_client::config::Config;
use feedsync_client::render;
use feedsync_client::source::HttpRecordSource;
use feedsync_client::sync::{
    spawn_periodic, trigger_channel, SyncController, TriggerHandle, TRIGGER_QUEUE_CAPACITY,
};
use feedsync_engine::OrderedSyncView;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on waiting for background tasks at exit.
///
/// The stdin reader blocks on a read that cannot be cancelled.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedsync=info,feedsync_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        feed_url = %config.feed_url,
        merge_policy = ?config.merge_policy,
        overlap_policy = ?config.overlap_policy,
        "Starting feedsync"
    );

    let source = HttpRecordSource::new(&config.feed_url, config.request_timeout)?;
    let view = restore_view(&config).await;

    let mut controller = SyncController::new(source, view).with_overlap(config.overlap_policy);
    if let Some(path) = &config.view_cache_path {
        controller = controller.with_cache(ViewCache::new(path));
    }
    let controller = Arc::new(controller);

    let (triggers, trigger_rx) = trigger_channel(TRIGGER_QUEUE_CAPACITY);

    // Presentation
    let mut updates = controller.subscribe();
    if !updates.borrow().records.is_empty() {
        println!("{}", render::render(&updates.borrow_and_update()));
    }
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            println!("{}", render::render(&state));
        }
    });

    // Login completion
    let (completer, signal) = auth::auth_signal();
    controller.forward_auth(signal, triggers.clone());
    match config.feed_token.clone() {
        Some(token) => {
            completer.complete(Session::new(token));
        }
        None => {
            drop(completer);
            triggers.refresh();
        }
    }

    // Timer and manual refreshes
    if let Some(period) = config.refresh_interval {
        spawn_periodic(triggers.clone(), period);
    }
    spawn_stdin_refresh(triggers);

    controller
        .run(trigger_rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("feedsync stopped");
    Ok(())
}

/// Load the cached view, falling back to an empty one.
async fn restore_view(config: &Config) -> OrderedSyncView {
    let empty = OrderedSyncView::with_policy(config.merge_policy);
    let Some(path) = &config.view_cache_path else {
        return empty;
    };

    match ViewCache::new(path).load().await {
        Ok(Some(view)) if view.policy() == config.merge_policy => {
            tracing::info!(
                records = view.len(),
                watermark = ?view.watermark(),
                "Restored cached view"
            );
            view
        }
        Ok(Some(view)) => {
            tracing::info!(
                cached = ?view.policy(),
                configured = ?config.merge_policy,
                "Cached view uses another merge policy, starting empty"
            );
            empty
        }
        Ok(None) => empty,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable view cache");
            empty
        }
    }
}

/// Every line on stdin requests a refresh.
fn spawn_stdin_refresh(triggers: TriggerHandle) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if !triggers.refresh() {
                tracing::debug!("Manual refresh skipped, one is already pending");
            }
        }
    });
}
