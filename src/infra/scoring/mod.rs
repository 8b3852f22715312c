// Scoring infra layer.
// - `openai_client.rs` talks to an OpenAI-format chat completion endpoint.

#[path = "openai_client.rs"]
pub mod openai_client;

pub use openai_client::OpenAiScoringClient;
