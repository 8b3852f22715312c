// Moderation domain models - data structures for the comment evaluation pipeline.
//
// These are pure domain types with no HTTP or database dependencies.
// The infra layer converts these to wire payloads and table rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a comment goes when its score falls below the threshold.
///
/// Kept separate from `FailureAction` even though both contain a "hold"
/// variant - the two policy axes evolve independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamAction {
    /// Route to the platform's spam queue
    Spam,
    /// Route to the platform's pending-review queue
    Hold,
}

/// Where a comment goes when scoring fails (timeout, transport error,
/// or an unusable response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureAction {
    /// Route to the platform's pending-review queue
    Hold,
    /// Publish without review
    Approve,
}

/// Final disposition of an evaluated comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Spam,
    Approved,
    Hold,
}

impl From<SpamAction> for ModerationAction {
    fn from(action: SpamAction) -> Self {
        match action {
            SpamAction::Spam => ModerationAction::Spam,
            SpamAction::Hold => ModerationAction::Hold,
        }
    }
}

impl From<FailureAction> for ModerationAction {
    fn from(action: FailureAction) -> Self {
        match action {
            FailureAction::Hold => ModerationAction::Hold,
            FailureAction::Approve => ModerationAction::Approved,
        }
    }
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationAction::Spam => write!(f, "spam"),
            ModerationAction::Approved => write!(f, "approved"),
            ModerationAction::Hold => write!(f, "hold"),
        }
    }
}

impl std::str::FromStr for ModerationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(ModerationAction::Spam),
            "approved" => Ok(ModerationAction::Approved),
            "hold" => Ok(ModerationAction::Hold),
            other => Err(format!("unknown moderation action: {other}")),
        }
    }
}

/// How long audit log entries are kept before the retention sweep removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRetention {
    /// Never persist entries at all
    Disabled,
    /// Keep entries forever
    Forever,
    /// Expire entries older than this many days
    Days(u32),
}

impl LogRetention {
    /// Parse the raw setting value: `0` = disabled, negative = forever,
    /// positive = day-bounded.
    pub fn from_days(raw: i32) -> Self {
        match raw {
            0 => LogRetention::Disabled,
            n if n < 0 => LogRetention::Forever,
            n => LogRetention::Days(n as u32),
        }
    }

    /// Day bound for the retention sweep, if one applies.
    /// `Disabled` and `Forever` both mean the sweep has nothing to do.
    pub fn sweep_days(&self) -> Option<u32> {
        match self {
            LogRetention::Days(days) => Some(*days),
            LogRetention::Disabled | LogRetention::Forever => None,
        }
    }
}

/// Immutable moderation configuration, read once per evaluation.
///
/// All range invariants (temperature in [0,2], threshold in [0,100],
/// timeout >= 5s) are enforced at the settings boundary - the pipeline
/// trusts them and never re-validates.
///
/// No `Debug` derive: `api_key` must never end up in logs.
#[derive(Clone)]
pub struct ModerationPolicy {
    /// OpenAI-format chat completion endpoint, validated as a URL at load time
    pub endpoint: String,
    /// Bearer credential for the scoring endpoint
    pub api_key: String,
    pub model_id: String,
    pub temperature: f32,
    /// Instruction telling the model how to score comments
    pub system_prompt: String,
    /// Scores strictly below this are spam; equal passes
    pub score_threshold: u8,
    pub spam_action: SpamAction,
    /// Bound on the full scoring round trip, connect through body parse
    pub timeout: Duration,
    pub timeout_action: FailureAction,
    /// Shown to the visitor on a spam verdict; empty = no message
    pub spam_message: String,
    /// Shown to the visitor when scoring fails; empty = no message
    pub error_message: String,
    pub log_retention: LogRetention,
}

/// One incoming comment, as handed over by the host platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSubmission {
    pub author: String,
    pub content: String,
}

/// Classified outcome of a single scoring attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringResult {
    /// Response received with a success status and a usable score.
    /// Out-of-range scores are clamped to [0,100] before this is built.
    Success { http_status: u16, score: u8 },
    /// Response received but unusable: non-success status or a body
    /// that yields no score
    ApiError { http_status: u16 },
    /// The configured bound elapsed before the round trip finished
    TimedOut,
    /// Never reached the remote (DNS, TLS, refused connection).
    /// Distinct from `TimedOut` for diagnostics only - both collapse
    /// onto the same fallback action.
    TransportFailure,
}

/// What the decision engine concluded for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationOutcome {
    /// HTTP status of the scoring call; `None` if it never completed
    pub api_status_code: Option<u16>,
    /// Score the model assigned; `None` on any failure path
    pub ai_score: Option<u8>,
    pub action: ModerationAction,
}

/// Immutable record of one evaluation. Write-once; never mutated after
/// creation. Owned by the audit log store once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub comment_author: String,
    pub comment_content: String,
    pub api_status_code: Option<u16>,
    pub ai_score: Option<u8>,
    pub action_taken: ModerationAction,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Assemble the audit record for one evaluation.
    ///
    /// Pure assembly - every evaluation produces exactly one entry, on
    /// success and failure paths alike. Whether the entry actually
    /// persists is the store's concern (retention may be disabled).
    pub fn record(
        submission: &CommentSubmission,
        outcome: &ModerationOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            comment_author: submission.author.clone(),
            comment_content: submission.content.clone(),
            api_status_code: outcome.api_status_code,
            ai_score: outcome.ai_score,
            action_taken: outcome.action,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_retention_parses_raw_setting() {
        assert_eq!(LogRetention::from_days(0), LogRetention::Disabled);
        assert_eq!(LogRetention::from_days(-1), LogRetention::Forever);
        assert_eq!(LogRetention::from_days(30), LogRetention::Days(30));
    }

    #[test]
    fn sweep_only_applies_to_day_bounded_retention() {
        assert_eq!(LogRetention::Days(7).sweep_days(), Some(7));
        assert_eq!(LogRetention::Forever.sweep_days(), None);
        assert_eq!(LogRetention::Disabled.sweep_days(), None);
    }

    #[test]
    fn action_round_trips_through_string_form() {
        for action in [
            ModerationAction::Spam,
            ModerationAction::Approved,
            ModerationAction::Hold,
        ] {
            assert_eq!(
                action.to_string().parse::<ModerationAction>(),
                Ok(action)
            );
        }
        assert!("published".parse::<ModerationAction>().is_err());
    }

    #[test]
    fn audit_entry_carries_outcome_fields_verbatim() {
        let submission = CommentSubmission {
            author: "alice".to_string(),
            content: "Nice article!".to_string(),
        };
        let outcome = ModerationOutcome {
            api_status_code: Some(200),
            ai_score: Some(88),
            action: ModerationAction::Approved,
        };
        let now = Utc::now();

        let entry = AuditEntry::record(&submission, &outcome, now);

        assert_eq!(entry.comment_author, "alice");
        assert_eq!(entry.comment_content, "Nice article!");
        assert_eq!(entry.api_status_code, Some(200));
        assert_eq!(entry.ai_score, Some(88));
        assert_eq!(entry.action_taken, ModerationAction::Approved);
        assert_eq!(entry.created_at, now);
    }
}
