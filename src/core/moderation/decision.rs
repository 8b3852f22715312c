// Decision engine - maps a scoring result onto a moderation action.
//
// Pure functions, no I/O. The transition table:
//
//   Success, score <  threshold  -> policy.spam_action
//   Success, score >= threshold  -> Approved
//   ApiError                     -> policy.timeout_action (status recorded)
//   TimedOut / TransportFailure  -> policy.timeout_action (no status)

use super::moderation_models::{
    ModerationAction, ModerationOutcome, ModerationPolicy, ScoringResult,
};

/// Decide the fate of a comment from its scoring result.
///
/// The threshold is an exclusive lower bound for the spam verdict: a score
/// exactly equal to the threshold passes. Reversing that inequality would
/// silently change moderation outcomes, so it is pinned by tests.
pub fn decide(policy: &ModerationPolicy, result: &ScoringResult) -> ModerationOutcome {
    match *result {
        ScoringResult::Success { http_status, score } => {
            let action = if score < policy.score_threshold {
                policy.spam_action.into()
            } else {
                ModerationAction::Approved
            };
            ModerationOutcome {
                api_status_code: Some(http_status),
                ai_score: Some(score),
                action,
            }
        }
        ScoringResult::ApiError { http_status } => ModerationOutcome {
            api_status_code: Some(http_status),
            ai_score: None,
            action: policy.timeout_action.into(),
        },
        ScoringResult::TimedOut | ScoringResult::TransportFailure => ModerationOutcome {
            api_status_code: None,
            ai_score: None,
            action: policy.timeout_action.into(),
        },
    }
}

/// Select the message (if any) to surface to the commenting visitor.
///
/// - spam verdict: the configured spam message
/// - any failure path (recognizable by the missing score): the configured
///   error message
/// - everything else, including a Hold reached via a successful score: none
///
/// That asymmetry is deliberate: a visitor whose comment was scored and
/// held for review gets no hint, only failure paths and spam verdicts do.
pub fn visitor_message(policy: &ModerationPolicy, outcome: &ModerationOutcome) -> Option<String> {
    let text = match outcome.action {
        ModerationAction::Spam => &policy.spam_message,
        _ if outcome.ai_score.is_none() => &policy.error_message,
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text.clone())
    }
}
