// Settings boundary - turns environment variables into a validated
// ModerationPolicy.
//
// All clamping happens here and only here: temperature to [0,2], score
// threshold to [0,100], timeout floored at 5 seconds, unknown action
// strings falling back to their defaults. The pipeline trusts the
// resulting policy and never re-validates.

use crate::core::moderation::{FailureAction, LogRetention, ModerationPolicy, SpamAction};
use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_MODEL_ID: &str = "gpt-3.5-turbo";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_SCORE_THRESHOLD: u8 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_RETENTION_DAYS: i32 = 30;
const MIN_TIMEOUT_SECS: u64 = 5;

pub struct Settings {
    pub policy: ModerationPolicy,
    /// SQLite file for the audit log; `:memory:` selects the in-memory store
    pub database_path: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Split out from `from_env` so
    /// tests don't have to mutate process-wide environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = lookup("COMMENT_GUARD_API_ENDPOINT")
            .context("Missing COMMENT_GUARD_API_ENDPOINT environment variable")?;
        let url = reqwest::Url::parse(&endpoint)
            .with_context(|| format!("COMMENT_GUARD_API_ENDPOINT is not a valid URL: {endpoint}"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("COMMENT_GUARD_API_ENDPOINT must be an http(s) URL");
        }

        let api_key = lookup("COMMENT_GUARD_API_KEY")
            .context("Missing COMMENT_GUARD_API_KEY environment variable")?;

        let system_prompt = lookup("COMMENT_GUARD_SYSTEM_PROMPT")
            .filter(|prompt| !prompt.trim().is_empty())
            .context("Missing or empty COMMENT_GUARD_SYSTEM_PROMPT environment variable")?;

        let temperature = lookup("COMMENT_GUARD_TEMPERATURE")
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(DEFAULT_TEMPERATURE)
            .clamp(0.0, 2.0);

        let score_threshold = lookup("COMMENT_GUARD_SCORE_THRESHOLD")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|v| v.clamp(0, 100) as u8)
            .unwrap_or(DEFAULT_SCORE_THRESHOLD);

        let timeout_secs = lookup("COMMENT_GUARD_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(MIN_TIMEOUT_SECS);

        let spam_action = match lookup("COMMENT_GUARD_SPAM_ACTION").as_deref() {
            Some("hold") => SpamAction::Hold,
            // "spam" and anything unrecognized fall back to the default
            _ => SpamAction::Spam,
        };

        let timeout_action = match lookup("COMMENT_GUARD_TIMEOUT_ACTION").as_deref() {
            Some("approve") => FailureAction::Approve,
            _ => FailureAction::Hold,
        };

        let log_retention = LogRetention::from_days(
            lookup("COMMENT_GUARD_LOG_RETENTION_DAYS")
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(DEFAULT_LOG_RETENTION_DAYS),
        );

        let policy = ModerationPolicy {
            endpoint,
            api_key,
            model_id: lookup("COMMENT_GUARD_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            temperature,
            system_prompt,
            score_threshold,
            spam_action,
            timeout: Duration::from_secs(timeout_secs),
            timeout_action,
            spam_message: lookup("COMMENT_GUARD_SPAM_MESSAGE").unwrap_or_default(),
            error_message: lookup("COMMENT_GUARD_ERROR_MESSAGE").unwrap_or_default(),
            log_retention,
        };

        Ok(Self {
            policy,
            database_path: lookup("COMMENT_GUARD_DATABASE_PATH")
                .unwrap_or_else(|| "data/audit.db".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, String> {
        HashMap::from([
            (
                "COMMENT_GUARD_API_ENDPOINT",
                "https://api.example.com/v1/chat/completions".to_string(),
            ),
            ("COMMENT_GUARD_API_KEY", "sk-test".to_string()),
            (
                "COMMENT_GUARD_SYSTEM_PROMPT",
                "Score this comment from 0 to 100.".to_string(),
            ),
        ])
    }

    fn settings_from(vars: HashMap<&'static str, String>) -> Result<Settings> {
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_config_gets_the_documented_defaults() {
        let settings = settings_from(base_vars()).unwrap();
        let policy = settings.policy;

        assert_eq!(policy.model_id, "gpt-3.5-turbo");
        assert_eq!(policy.temperature, 0.3);
        assert_eq!(policy.score_threshold, 50);
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.spam_action, SpamAction::Spam);
        assert_eq!(policy.timeout_action, FailureAction::Hold);
        assert_eq!(policy.log_retention, LogRetention::Days(30));
        assert!(policy.spam_message.is_empty());
        assert!(policy.error_message.is_empty());
    }

    #[test]
    fn missing_required_keys_are_rejected() {
        for key in [
            "COMMENT_GUARD_API_ENDPOINT",
            "COMMENT_GUARD_API_KEY",
            "COMMENT_GUARD_SYSTEM_PROMPT",
        ] {
            let mut vars = base_vars();
            vars.remove(key);
            assert!(settings_from(vars).is_err(), "expected {key} to be required");
        }
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let mut vars = base_vars();
        vars.insert("COMMENT_GUARD_API_ENDPOINT", "not a url".to_string());
        assert!(settings_from(vars).is_err());

        let mut vars = base_vars();
        vars.insert(
            "COMMENT_GUARD_API_ENDPOINT",
            "ftp://example.com/score".to_string(),
        );
        assert!(settings_from(vars).is_err());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut vars = base_vars();
        vars.insert("COMMENT_GUARD_TEMPERATURE", "3.5".to_string());
        vars.insert("COMMENT_GUARD_SCORE_THRESHOLD", "250".to_string());
        vars.insert("COMMENT_GUARD_TIMEOUT_SECS", "1".to_string());

        let policy = settings_from(vars).unwrap().policy;
        assert_eq!(policy.temperature, 2.0);
        assert_eq!(policy.score_threshold, 100);
        assert_eq!(policy.timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_action_strings_fall_back_to_defaults() {
        let mut vars = base_vars();
        vars.insert("COMMENT_GUARD_SPAM_ACTION", "delete".to_string());
        vars.insert("COMMENT_GUARD_TIMEOUT_ACTION", "retry".to_string());

        let policy = settings_from(vars).unwrap().policy;
        assert_eq!(policy.spam_action, SpamAction::Spam);
        assert_eq!(policy.timeout_action, FailureAction::Hold);
    }

    #[test]
    fn retention_setting_maps_onto_the_three_modes() {
        for (raw, expected) in [
            ("0", LogRetention::Disabled),
            ("-1", LogRetention::Forever),
            ("90", LogRetention::Days(90)),
        ] {
            let mut vars = base_vars();
            vars.insert("COMMENT_GUARD_LOG_RETENTION_DAYS", raw.to_string());
            assert_eq!(settings_from(vars).unwrap().policy.log_retention, expected);
        }
    }
}
