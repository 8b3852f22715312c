// Moderation service - orchestrates one comment evaluation end to end.
//
// Flow: score the comment -> decide its fate -> build the audit record ->
// hand it to the store -> pick the visitor-facing message.
//
// NO HTTP or database dependencies here - just pure domain logic behind
// the ScoreProvider and AuditLogStore ports.

use super::decision::{decide, visitor_message};
use super::moderation_models::{
    AuditEntry, CommentSubmission, LogRetention, ModerationAction, ModerationOutcome,
    ModerationPolicy, ScoringResult,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Trait for the external scoring service.
///
/// Exactly one attempt per evaluation - retry policy belongs to the caller,
/// and this pipeline deliberately has none so moderation latency stays
/// bounded by the configured timeout. Implementations convert every
/// transport or parsing failure into a `ScoringResult` variant instead of
/// propagating raw errors.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn score(&self, policy: &ModerationPolicy, submission: &CommentSubmission)
        -> ScoringResult;
}

/// Trait for persisting audit log entries.
///
/// Following the same port pattern as `ScoreProvider`. Inserts are
/// append-only; entries are never mutated. The store applies the retention
/// policy on insert (retention `Disabled` makes it a no-op) - callers
/// always hand over the entry.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn insert(&self, entry: AuditEntry, retention: LogRetention) -> Result<(), AuditError>;

    /// Fetch one page of entries, most recent first. Pages are 1-based.
    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<AuditEntry>, AuditError>;

    async fn count(&self) -> Result<u64, AuditError>;

    async fn clear_all(&self) -> Result<(), AuditError>;

    /// Delete entries older than the given number of days.
    /// Returns how many were removed. Runs out of band; must not block
    /// in-flight inserts.
    async fn expire_older_than(&self, days: u32) -> Result<u64, AuditError>;
}

// Blanket implementations for Arc so the composition root can share one
// store between the service and the background retention sweeper.
#[async_trait]
impl<S: AuditLogStore + ?Sized> AuditLogStore for Arc<S> {
    async fn insert(&self, entry: AuditEntry, retention: LogRetention) -> Result<(), AuditError> {
        (**self).insert(entry, retention).await
    }

    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<AuditEntry>, AuditError> {
        (**self).list_page(page, page_size).await
    }

    async fn count(&self) -> Result<u64, AuditError> {
        (**self).count().await
    }

    async fn clear_all(&self) -> Result<(), AuditError> {
        (**self).clear_all().await
    }

    async fn expire_older_than(&self, days: u32) -> Result<u64, AuditError> {
        (**self).expire_older_than(days).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Final disposition handed back to the host platform.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Verdict {
    pub action: ModerationAction,
    /// Text to show the commenting visitor, if the policy configures one
    /// for this outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_message: Option<String>,
}

/// Comment moderation pipeline.
///
/// Stateless across evaluations - concurrent submissions are evaluated
/// independently with no coordination between them.
pub struct ModerationService<P: ScoreProvider, S: AuditLogStore> {
    provider: P,
    store: S,
}

impl<P: ScoreProvider, S: AuditLogStore> ModerationService<P, S> {
    pub fn new(provider: P, store: S) -> Self {
        Self { provider, store }
    }

    /// Evaluate one comment submission.
    ///
    /// Never fails: every scoring failure collapses onto the configured
    /// fallback action, and a store error is logged without changing the
    /// verdict. Exactly one audit entry is built per evaluation, on every
    /// branch.
    pub async fn evaluate(
        &self,
        policy: &ModerationPolicy,
        submission: &CommentSubmission,
    ) -> Verdict {
        let result = self.provider.score(policy, submission).await;
        let outcome = decide(policy, &result);

        tracing::info!(
            author = %submission.author,
            action = %outcome.action,
            score = outcome.ai_score,
            status = outcome.api_status_code,
            "Comment evaluated"
        );

        self.log_outcome(policy, submission, &outcome).await;

        Verdict {
            visitor_message: visitor_message(policy, &outcome),
            action: outcome.action,
        }
    }

    async fn log_outcome(
        &self,
        policy: &ModerationPolicy,
        submission: &CommentSubmission,
        outcome: &ModerationOutcome,
    ) {
        let entry = AuditEntry::record(submission, outcome, Utc::now());
        if let Err(err) = self.store.insert(entry, policy.log_retention).await {
            tracing::error!("Failed to persist audit entry: {err}");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
