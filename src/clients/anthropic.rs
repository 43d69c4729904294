//! Anthropic Messages API client with forced tool-use structured output

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::clients::traits::{ModelClient, ModelError, ModelRequest};
use crate::config::ModelConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug)]
pub struct AnthropicClient {
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    timeout_ms: u64,
    client: Client,
}

impl AnthropicClient {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self, ModelError> {
        // Accept either the bare host or a base already ending in /v1 or /v1/messages
        let base = config.base_url.trim_end_matches('/');
        let endpoint = if base.ends_with("/v1/messages") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
            timeout_ms: config.timeout_ms,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Messages request body: attachments first, then the text, with the
    /// schema registered as the only tool and forced.
    pub fn request_body(&self, request: &ModelRequest) -> Value {
        let mut content: Vec<Value> = request
            .attachments
            .iter()
            .filter(|a| a.is_image())
            .map(|a| {
                json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": a.mime_type,
                        "data": a.base64_payload,
                    }
                })
            })
            .collect();
        let skipped: Vec<&str> = request
            .attachments
            .iter()
            .filter(|a| !a.is_image())
            .map(|a| a.display_name.as_str())
            .collect();
        if !skipped.is_empty() {
            tracing::debug!("Skipping non-image attachments: {}", skipped.join(", "));
        }
        content.push(json!({"type": "text", "text": request.user_text}));

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": request.system,
            "messages": [{"role": "user", "content": content}],
            "tools": [{
                "name": request.schema_name,
                "description": "Return the structured result.",
                "input_schema": request.schema,
            }],
            "tool_choice": {"type": "tool", "name": request.schema_name},
        })
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ModelRequest) -> Result<Value, ModelError> {
        let body = self.request_body(&request);

        let res = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    ModelError::Http(e.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate_snippet(&text, 500),
            });
        }

        res.json::<Value>()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))
    }
}

fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Attachment;

    fn client(base_url: &str) -> AnthropicClient {
        let config = ModelConfig {
            base_url: base_url.to_string(),
            ..ModelConfig::default()
        };
        AnthropicClient::new(&config, "sk-test").unwrap()
    }

    fn request() -> ModelRequest {
        ModelRequest {
            system: "sys".into(),
            user_text: "Check my page".into(),
            attachments: vec![
                Attachment {
                    display_name: "hero.png".into(),
                    mime_type: "image/png".into(),
                    base64_payload: "aGVsbG8=".into(),
                },
                Attachment {
                    display_name: "notes.txt".into(),
                    mime_type: "text/plain".into(),
                    base64_payload: "bm90ZXM=".into(),
                },
            ],
            schema_name: "trust_scorecard".into(),
            schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn endpoint_normalization() {
        assert_eq!(
            client("https://api.anthropic.com").endpoint(),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            client("http://localhost:9/v1/").endpoint(),
            "http://localhost:9/v1/messages"
        );
        assert_eq!(
            client("http://localhost:9/v1/messages").endpoint(),
            "http://localhost:9/v1/messages"
        );
    }

    #[test]
    fn body_forces_the_schema_tool() {
        let body = client("https://api.anthropic.com").request_body(&request());
        assert_eq!(body["tool_choice"]["name"], "trust_scorecard");
        assert_eq!(body["tools"][0]["input_schema"], json!({"type": "object"}));
        assert_eq!(body["system"], "sys");

        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["text"], "Check my page");
    }

    #[test]
    fn snippets_are_truncated_on_char_boundaries() {
        assert_eq!(truncate_snippet("short", 10), "short");
        assert_eq!(truncate_snippet("ééééé", 2), "éé…");
    }
}
