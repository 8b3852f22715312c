// This is the entry point of the comment moderation service.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `settings.rs` = Validated configuration boundary
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the background retention sweep
// 4. Serve the host platform over a JSON-lines stdin/stdout protocol

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
mod settings;

use crate::core::moderation::{
    AuditLogStore, CommentSubmission, ModerationPolicy, ModerationService, ScoreProvider,
};
use crate::infra::audit::{InMemoryAuditStore, SqliteAuditStore};
use crate::infra::scoring::OpenAiScoringClient;
use crate::settings::Settings;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;

/// Page size of the admin log view, matching the log viewer's pagination.
const LOGS_PAGE_SIZE: u32 = 20;
const RETENTION_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// One line of input from the host platform.
#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum HostRequest {
    /// A comment submission from the host's comment-processing hook
    Evaluate { author: String, content: String },
    /// Operator request: fetch one page of the audit log
    Logs {
        #[serde(default = "default_page")]
        page: u32,
    },
    /// Operator request: clear the audit log
    ClearLogs,
}

fn default_page() -> u32 {
    1
}

/// Serve the JSON-lines protocol until the reader is exhausted.
///
/// Evaluations run concurrently with no ordering guarantee between them;
/// responses carry the author back so the host can correlate. In-flight
/// evaluations are drained before returning - every accepted submission
/// gets its audit entry even when input ends mid-evaluation.
async fn serve<P, R>(
    reader: R,
    service: Arc<ModerationService<P, Arc<dyn AuditLogStore>>>,
    policy: Arc<ModerationPolicy>,
    store: Arc<dyn AuditLogStore>,
) -> anyhow::Result<()>
where
    P: ScoreProvider + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut evaluations = JoinSet::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        // Reap finished evaluations so the set doesn't grow unbounded.
        while evaluations.try_join_next().is_some() {}

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: HostRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("Ignoring malformed request line: {err}");
                continue;
            }
        };

        match request {
            HostRequest::Evaluate { author, content } => {
                let service = Arc::clone(&service);
                let policy = Arc::clone(&policy);
                evaluations.spawn(async move {
                    let submission = CommentSubmission { author, content };
                    let verdict = service.evaluate(&policy, &submission).await;
                    let response = serde_json::json!({
                        "author": submission.author,
                        "action": verdict.action,
                        "message": verdict.visitor_message,
                    });
                    println!("{response}");
                });
            }
            HostRequest::Logs { page } => {
                match (
                    store.list_page(page, LOGS_PAGE_SIZE).await,
                    store.count().await,
                ) {
                    (Ok(logs), Ok(total)) => {
                        let response = serde_json::json!({
                            "page": page,
                            "total": total,
                            "logs": logs,
                        });
                        println!("{response}");
                    }
                    (Err(err), _) | (_, Err(err)) => {
                        tracing::error!("Failed to fetch audit log page: {err}");
                        println!("{}", serde_json::json!({ "error": "log fetch failed" }));
                    }
                }
            }
            HostRequest::ClearLogs => match store.clear_all().await {
                Ok(()) => println!("{}", serde_json::json!({ "cleared": true })),
                Err(err) => {
                    tracing::error!("Failed to clear audit log: {err}");
                    println!("{}", serde_json::json!({ "cleared": false }));
                }
            },
        }
    }

    // Input is done; wait for the evaluations still in flight.
    while evaluations.join_next().await.is_some() {}

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let store: Arc<dyn AuditLogStore> = if settings.database_path == ":memory:" {
        Arc::new(InMemoryAuditStore::new())
    } else {
        Arc::new(SqliteAuditStore::new(&settings.database_path).await?)
    };

    // Background retention sweep. Runs out of band and never blocks
    // in-flight evaluations; disabled and forever retention need no sweep.
    if let Some(days) = settings.policy.log_retention.sweep_days() {
        let sweep_store = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                match sweep_store.expire_older_than(days).await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Expired audit log entries");
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!("Retention sweep failed: {err}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(
                    RETENTION_SWEEP_INTERVAL_SECS,
                ))
                .await;
            }
        });
    }

    let service = Arc::new(ModerationService::new(
        OpenAiScoringClient::new(),
        Arc::clone(&store),
    ));
    let policy = Arc::new(settings.policy);

    tracing::info!("Comment guard ready, reading submissions from stdin");

    serve(
        tokio::io::BufReader::new(tokio::io::stdin()),
        service,
        policy,
        store,
    )
    .await
}
