use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Uploaded file carried inline with a model request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(alias = "display_name")]
    pub display_name: String,
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    #[serde(alias = "base64_payload")]
    pub base64_payload: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// One structured-output call: instructions, user text, attachments and the
/// schema the answer must fill.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user_text: String,
    pub attachments: Vec<Attachment>,
    pub schema_name: String,
    pub schema: Value,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http error: {0}")]
    Http(String),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model name for logs and `/api/info`
    fn model_name(&self) -> &str;

    /// Raw response envelope; extraction happens in the normalizer
    async fn generate(&self, request: ModelRequest) -> Result<Value, ModelError>;
}
