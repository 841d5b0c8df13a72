mod config;
mod render;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use domain::{SessionUser, SubjectId, ThreadError, UserId};
use dotenvy::dotenv;
use thread::{SharedSession, SubjectView};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Settings;
use render::{render, Terminal};
use storage::Db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;
    let subject = SubjectId::new(settings.subject.id.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid subject id: {}", e))?;

    let db = Db::with_feed_capacity(&settings.database.url, settings.database.feed_capacity)
        .await
        .with_context(|| format!("Failed to open database: {}", settings.database.url))?;

    let session = SharedSession::new(settings.identity.map(|id| SessionUser {
        id: UserId::new(id.user_id),
        username: id.username,
    }));
    let mut view = SubjectView::new(Arc::new(db), Arc::new(session));
    let mut revisions = view.store().subscribe();

    match view.open(subject.clone()).await {
        Ok(()) => {}
        Err(ThreadError::Fetch(e)) => {
            warn!("Initial load failed, following live changes only: {}", e)
        }
        Err(e) => return Err(e).context("Failed to open subject"),
    }
    info!("Watching comments for {}", subject);

    let mut terminal = Terminal::default();
    let mut expanded = HashSet::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        for entry in view.entries() {
            if entry.reply_count > 0 && expanded.insert(entry.comment.id.clone()) {
                view.toggle_replies(&entry.comment.id, &mut terminal, |_| {});
            }
        }
        print!("{}", render(subject.as_str(), &view.entries()));

        tokio::select! {
            _ = &mut shutdown => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    error!("Comment store went away");
                    break;
                }
            }
        }
    }

    view.close();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
