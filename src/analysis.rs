use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::extract::ItemRecord;

const SYSTEM_PROMPT: &str = "You are Carlos Vega, a fast-food marketing consultant. \
Review menus bluntly and suggest names, descriptions, combos and pricing that sell desire.";

/// Bullet list of `name | price_text` pairs for the first `limit` items.
pub fn summary_payload(items: &[ItemRecord], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .map(|item| format!("- {} | {}", item.name, item.price_text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(items: &[ItemRecord], limit: usize) -> String {
    let shown = items.len().min(limit);
    format!(
        "The menu has {total} items. Here are the first {shown}:\n{payload}\n\n\
         Give a general diagnosis of the menu, point out weak product names, \
         suggest better names and selling descriptions, combo ideas and price positioning.",
        total = items.len(),
        payload = summary_payload(items, limit),
    )
}

/// Text-in, text-out contract of the commentary service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str, items: &[ItemRecord]) -> AnalysisResult<String>;
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct ChatCompletionsGenerator {
    config: GeneratorConfig,
    client: Client,
}

impl ChatCompletionsGenerator {
    pub fn new(config: GeneratorConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    async fn generate(&self, prompt: &str, _items: &[ItemRecord]) -> AnalysisResult<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "requesting commentary");
        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "text generation failed");
            return Err(classify_status(status, text));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|err| AnalysisError::InvalidResponse(err.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AnalysisError::InvalidResponse("no message content".to_string()))
    }
}

fn classify_status(status: StatusCode, body: String) -> AnalysisError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AnalysisError::Auth,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => AnalysisError::Quota,
        _ => AnalysisError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

/// Offline consultant report, used when no remote service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateGenerator;

#[async_trait]
impl TextGenerator for TemplateGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn generate(&self, _prompt: &str, items: &[ItemRecord]) -> AnalysisResult<String> {
        let Some(first) = items.first() else {
            return Err(AnalysisError::InvalidResponse(
                "no items to analyze".to_string(),
            ));
        };

        Ok(format!(
            "### General diagnosis\n\n\
             Your menu has **{count} items**.\n\n\
             - **Product names:** functional, but without emotion. \
             \"{name}\" needs more desire.\n\n\
             - **Improvements:**\n\
             1. **Memorable names:** \"Cheeseburger\" -> \"Cheddar Turbo\", \"Soda\" -> \"Ice Blast\".\n\
             2. **Descriptions that sell:** \"Our {name} is grilled to order, with melted cheese and secret sauce.\"\n\
             3. **Build combos** to raise the average ticket.\n\
             4. **Price positioning:** highlight either quality or value.\n\n\
             ### Conclusion\n\n\
             The menu is solid but is not selling desire yet. Small changes can lift sales by 20% or more.",
            count = items.len(),
            name = first.name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<ItemRecord> {
        (0..n)
            .map(|i| ItemRecord::new(format!("Lanche numero {i}"), format!("R$ {i},00")))
            .collect()
    }

    #[test]
    fn test_summary_payload_truncates() {
        let payload = summary_payload(&items(25), 20);
        assert_eq!(payload.lines().count(), 20);
        assert_eq!(payload.lines().next(), Some("- Lanche numero 0 | R$ 0,00"));
    }

    #[test]
    fn test_prompt_mentions_totals() {
        let prompt = build_prompt(&items(3), 20);
        assert!(prompt.starts_with("The menu has 3 items. Here are the first 3:"));
        assert!(prompt.contains("- Lanche numero 2 | R$ 2,00"));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            AnalysisError::Auth
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            AnalysisError::Quota
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "oops".into()),
            AnalysisError::Status { status: 502, .. }
        ));
    }

    #[tokio::test]
    async fn test_template_report() {
        let report = TemplateGenerator.generate("", &items(2)).await.unwrap();
        assert!(report.contains("**2 items**"));
        assert!(report.contains("\"Lanche numero 0\""));

        assert!(TemplateGenerator.generate("", &[]).await.is_err());
    }
}
