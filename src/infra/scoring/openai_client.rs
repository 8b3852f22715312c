// HTTP scoring client for OpenAI-format chat completion endpoints.
//
// Builds the scoring payload, enforces the round-trip bound, and folds
// every transport and parsing failure into a typed ScoringResult -
// nothing here propagates a raw error to the pipeline.

use crate::core::moderation::{
    CommentSubmission, ModerationPolicy, ScoreProvider, ScoringResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub struct OpenAiScoringClient {
    client: Client,
}

impl OpenAiScoringClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn request(
        &self,
        policy: &ModerationPolicy,
        submission: &CommentSubmission,
    ) -> ScoringResult {
        // Only the comment text is sent to the model. Author-supplied
        // names stay out of the prompt and are used for logging alone.
        let payload = json!({
            "model": policy.model_id,
            "temperature": policy.temperature,
            "messages": [
                { "role": "system", "content": policy.system_prompt },
                { "role": "user", "content": submission.content },
            ],
        });

        let response = match self
            .client
            .post(&policy.endpoint)
            .header("Authorization", format!("Bearer {}", policy.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return ScoringResult::TimedOut,
            Err(_) => return ScoringResult::TransportFailure,
        };

        let http_status = response.status().as_u16();
        if !response.status().is_success() {
            return ScoringResult::ApiError { http_status };
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(_) => return ScoringResult::ApiError { http_status },
        };

        match body["choices"][0]["message"]["content"]
            .as_str()
            .and_then(parse_score)
        {
            Some(score) => ScoringResult::Success { http_status, score },
            None => ScoringResult::ApiError { http_status },
        }
    }
}

impl Default for OpenAiScoringClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoreProvider for OpenAiScoringClient {
    /// One attempt, bounded by `policy.timeout` across the whole round
    /// trip - connect, transfer, and body parse all count against it.
    async fn score(
        &self,
        policy: &ModerationPolicy,
        submission: &CommentSubmission,
    ) -> ScoringResult {
        match tokio::time::timeout(policy.timeout, self.request(policy, submission)).await {
            Ok(result) => result,
            Err(_) => ScoringResult::TimedOut,
        }
    }
}

/// Extract the score from the model's reply.
///
/// Models occasionally wrap the number in prose ("Score: 85."), so the
/// first integer wins - except integers that are halves of a range like
/// "0-100", which are only a fallback. "On a scale of 0-100, this
/// scores 85" resolves to 85, not 0. Values outside [0,100] are
/// clamped, never rejected - the remote's numeric range may drift and
/// a rigid rejection would fail comments incorrectly.
fn parse_score(text: &str) -> Option<u8> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(clamp_score(value));
    }

    let bytes = trimmed.as_bytes();
    let mut first_standalone = None;
    let mut first_range_half = None;
    let mut i = 0;

    while i < bytes.len() {
        // A '-' is a sign only when it doesn't follow a digit;
        // "0-100" keeps its dash as a range separator.
        let signed = bytes[i] == b'-'
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_digit()
            && (i == 0 || !bytes[i - 1].is_ascii_digit());

        if !bytes[i].is_ascii_digit() && !signed {
            i += 1;
            continue;
        }

        let start = i;
        if signed {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        if let Ok(value) = trimmed[start..i].parse::<i64>() {
            let after_range_dash =
                start > 1 && bytes[start - 1] == b'-' && bytes[start - 2].is_ascii_digit();
            let before_range_dash =
                i + 1 < bytes.len() && bytes[i] == b'-' && bytes[i + 1].is_ascii_digit();

            if after_range_dash || before_range_dash {
                first_range_half.get_or_insert(value);
            } else if first_standalone.is_none() {
                first_standalone = Some(value);
            }
        }
    }

    first_standalone.or(first_range_half).map(clamp_score)
}

fn clamp_score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{FailureAction, LogRetention, SpamAction};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn parses_a_bare_integer() {
        assert_eq!(parse_score("85"), Some(85));
        assert_eq!(parse_score("  42 \n"), Some(42));
        assert_eq!(parse_score("0"), Some(0));
    }

    #[test]
    fn tolerates_surrounding_prose() {
        assert_eq!(parse_score("Score: 85."), Some(85));
        assert_eq!(parse_score("The comment scores 70 out of 100."), Some(70));
    }

    #[test]
    fn range_mentions_do_not_shadow_the_score() {
        assert_eq!(
            parse_score("On a scale of 0-100, this scores 85"),
            Some(85)
        );
        assert_eq!(parse_score("I'd rate it 90/100."), Some(90));
        // A reply that only restates the scale still yields something
        // rather than failing the comment.
        assert_eq!(parse_score("somewhere in 0-100"), Some(0));
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(parse_score("150"), Some(100));
        assert_eq!(parse_score("-10"), Some(0));
    }

    #[test]
    fn rejects_text_without_a_number() {
        assert_eq!(parse_score("looks fine to me"), None);
        assert_eq!(parse_score(""), None);
    }

    fn policy(endpoint: String, timeout: Duration) -> ModerationPolicy {
        ModerationPolicy {
            endpoint,
            api_key: "test-key".to_string(),
            model_id: "gpt-3.5-turbo".to_string(),
            temperature: 0.3,
            system_prompt: "Score this comment from 0 to 100.".to_string(),
            score_threshold: 50,
            spam_action: SpamAction::Spam,
            timeout,
            timeout_action: FailureAction::Hold,
            spam_message: String::new(),
            error_message: String::new(),
            log_retention: LogRetention::Forever,
        }
    }

    fn submission() -> CommentSubmission {
        CommentSubmission {
            author: "carol".to_string(),
            content: "Great write-up, thanks!".to_string(),
        }
    }

    /// Serve exactly one HTTP exchange: read the full request, then write
    /// the canned response.
    async fn serve_once(listener: TcpListener, response: String) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(headers_end) = text.find("\r\n\r\n") {
                let content_length = text
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length: "))
                    .or_else(|| {
                        text.lines()
                            .find_map(|line| line.strip_prefix("Content-Length: "))
                    })
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= headers_end + 4 + content_length {
                    break;
                }
            }
        }

        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn successful_response_yields_the_parsed_score() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = r#"{"choices":[{"message":{"content":"30"}}]}"#;
        let server = tokio::spawn(serve_once(listener, http_response("200 OK", body)));

        let client = OpenAiScoringClient::new();
        let result = client
            .score(
                &policy(format!("http://{addr}/v1/chat/completions"), Duration::from_secs(5)),
                &submission(),
            )
            .await;

        assert_eq!(
            result,
            ScoringResult::Success {
                http_status: 200,
                score: 30
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            http_response("500 Internal Server Error", "{}"),
        ));

        let client = OpenAiScoringClient::new();
        let result = client
            .score(
                &policy(format!("http://{addr}/v1/chat/completions"), Duration::from_secs(5)),
                &submission(),
            )
            .await;

        assert_eq!(result, ScoringResult::ApiError { http_status: 500 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unscorable_body_is_an_api_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = r#"{"choices":[{"message":{"content":"I cannot rate this."}}]}"#;
        let server = tokio::spawn(serve_once(listener, http_response("200 OK", body)));

        let client = OpenAiScoringClient::new();
        let result = client
            .score(
                &policy(format!("http://{addr}/v1/chat/completions"), Duration::from_secs(5)),
                &submission(),
            )
            .await;

        assert_eq!(result, ScoringResult::ApiError { http_status: 200 });
        server.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection but never answer.
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = OpenAiScoringClient::new();
        let result = client
            .score(
                &policy(
                    format!("http://{addr}/v1/chat/completions"),
                    Duration::from_millis(300),
                ),
                &submission(),
            )
            .await;

        assert_eq!(result, ScoringResult::TimedOut);
        server.abort();
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenAiScoringClient::new();
        let result = client
            .score(
                &policy(format!("http://{addr}/v1/chat/completions"), Duration::from_secs(5)),
                &submission(),
            )
            .await;

        assert_eq!(result, ScoringResult::TransportFailure);
    }
}
