//! LLM-backed advisor client.
//!
//! Talks to an Anthropic-style messages API. The reply is expected to be a
//! single JSON object (the system prompt demands it); markdown fences and
//! surrounding prose are tolerated and stripped.

use crate::error::{AdvisorError, AdvisorResult};
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::Advisor;
use async_trait::async_trait;
use pilot_core::{Direction, ExecutionStrategy, Price, Recommendation, TradingMode};
use pilot_exchange::MarketSnapshot;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// Structured signal the model is instructed to reply with.
#[derive(Debug, Deserialize)]
struct SignalDto {
    direction: String,
    #[serde(default)]
    entry_price: Decimal,
    #[serde(default)]
    stop_loss: Decimal,
    #[serde(default)]
    take_profit: Decimal,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Advisor backed by an LLM messages API.
pub struct LlmAdvisor {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmAdvisor {
    /// Create a new advisor client.
    pub fn new(api_key: impl Into<String>) -> AdvisorResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AdvisorError::Config("API key cannot be empty".to_string()));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AdvisorError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Override the API endpoint (for gateways and tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn complete(&self, user_prompt: String) -> AdvisorResult<String> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: MessageResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Http(format!("Failed to parse API response: {e}")))?;

        reply
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text.clone())
            .ok_or_else(|| AdvisorError::Malformed("reply contained no text block".to_string()))
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        mode: TradingMode,
    ) -> AdvisorResult<Recommendation> {
        let prompt = build_prompt(snapshot, mode);
        let reply = self.complete(prompt).await?;
        debug!(symbol = %snapshot.symbol, reply_len = reply.len(), "Advisor reply received");
        parse_signal(&reply, &snapshot.symbol)
    }
}

/// Parse the model reply into a recommendation.
///
/// Tolerates markdown fences and prose around the JSON object.
pub fn parse_signal(reply: &str, symbol: &str) -> AdvisorResult<Recommendation> {
    let start = reply
        .find('{')
        .ok_or_else(|| AdvisorError::Malformed("no JSON object in reply".to_string()))?;
    let end = reply
        .rfind('}')
        .ok_or_else(|| AdvisorError::Malformed("unterminated JSON object in reply".to_string()))?;
    if end < start {
        return Err(AdvisorError::Malformed("unbalanced JSON object".to_string()));
    }

    let dto: SignalDto = serde_json::from_str(&reply[start..=end])
        .map_err(|e| AdvisorError::Malformed(format!("bad signal JSON: {e}")))?;

    let direction: Direction = dto
        .direction
        .parse()
        .map_err(|e| AdvisorError::Malformed(format!("{e}")))?;

    let strategy = match dto.strategy.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("limit") => ExecutionStrategy::Limit,
        Some("market") | None => ExecutionStrategy::Market,
        Some(other) => {
            warn!(strategy = other, "Unknown strategy hint, defaulting to market");
            ExecutionStrategy::Market
        }
    };

    let confidence = dto.confidence.round().clamp(0.0, 100.0) as u8;

    Ok(Recommendation {
        symbol: symbol.to_string(),
        direction,
        entry: Price::new(dto.entry_price),
        stop: Price::new(dto.stop_loss),
        target: Price::new(dto.take_profit),
        confidence,
        rationale: dto.rationale.unwrap_or_default(),
        strategy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_signal() {
        let reply = r#"{"direction": "long", "entry_price": 2740.5, "stop_loss": 2726.8,
            "take_profit": 2768.0, "confidence": 82, "strategy": "limit",
            "rationale": "higher low on 15m"}"#;
        let rec = parse_signal(reply, "ETHUSD").unwrap();
        assert_eq!(rec.direction, Direction::Long);
        assert_eq!(rec.confidence, 82);
        assert_eq!(rec.strategy, ExecutionStrategy::Limit);
        assert_eq!(rec.symbol, "ETHUSD");
    }

    #[test]
    fn test_parse_fenced_signal() {
        let reply = "Here is my analysis:\n```json\n{\"direction\": \"short\", \
            \"entry_price\": 2730, \"stop_loss\": 2744, \"take_profit\": 2703, \
            \"confidence\": 74.6}\n```";
        let rec = parse_signal(reply, "ETHUSD").unwrap();
        assert_eq!(rec.direction, Direction::Short);
        assert_eq!(rec.confidence, 75);
        assert_eq!(rec.strategy, ExecutionStrategy::Market);
    }

    #[test]
    fn test_parse_none_direction() {
        let reply = r#"{"direction": "none", "confidence": 10, "rationale": "chop"}"#;
        let rec = parse_signal(reply, "ETHUSD").unwrap();
        assert!(!rec.is_actionable());
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(parse_signal("I cannot help with that.", "ETHUSD").is_err());
        assert!(parse_signal(r#"{"direction": "sideways"}"#, "ETHUSD").is_err());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(LlmAdvisor::new("").is_err());
    }
}
