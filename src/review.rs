//! Optional remote review via OpenRouter
//!
//! Sends the staged diff for a second opinion. Strictly best-effort: any
//! missing key, network failure, or timeout degrades to local-only analysis.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REVIEW_MODEL: &str = "deepseek/deepseek-chat";
const REVIEW_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

fn api_key() -> Option<String> {
    std::env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Check if remote review is available (API key is set)
pub fn is_available() -> bool {
    api_key().is_some()
}

/// Ask the remote reviewer about the staged diff. Returns the feedback text,
/// or `None` on any failure; the caller falls back to local analysis.
pub fn review_diff(diff: &str) -> Option<String> {
    let key = api_key()?;

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("  Warning: remote review unavailable: {}", err);
            return None;
        }
    };

    let result = runtime.block_on(async {
        tokio::time::timeout(REVIEW_TIMEOUT, request_review(&key, diff)).await
    });

    match result {
        Ok(Ok(text)) => Some(text),
        Ok(Err(err)) => {
            eprintln!("  Warning: remote review failed: {}; continuing with local analysis", err);
            None
        }
        Err(_) => {
            eprintln!("  Warning: remote review timed out; continuing with local analysis");
            None
        }
    }
}

async fn request_review(api_key: &str, diff: &str) -> Result<String, String> {
    let system = "You are a pre-commit reviewer. Given a staged unified diff, \
                  point out suspicious or low-quality additions in a few short \
                  bullet points. Only mention real problems.";

    let request = ChatRequest {
        model: REVIEW_MODEL.to_string(),
        messages: vec![
            Message { role: "system".to_string(), content: system.to_string() },
            Message {
                role: "user".to_string(),
                content: format!("Staged diff:\n```diff\n{}\n```", diff),
            },
        ],
        max_tokens: 1024,
        stream: false,
    };

    let client = reqwest::Client::new();
    let response = client
        .post(OPENROUTER_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(format!("API error {}: {}", status, text));
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .map_err(|e| format!("failed to parse response: {}", e))?;

    chat_response
        .choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| "empty response".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_diff() {
        let request = ChatRequest {
            model: REVIEW_MODEL.to_string(),
            messages: vec![Message { role: "user".to_string(), content: "+ added".to_string() }],
            max_tokens: 1024,
            stream: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("deepseek"));
        assert!(json.contains("+ added"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"content":"looks fine"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "looks fine");
    }
}
