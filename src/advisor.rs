//! Request orchestration: live model when configured, deterministic fallback
//! otherwise.
//!
//! A failed live call (error, timeout, unusable output) falls back exactly
//! once to the offline generator. There are no retries.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::build_plan::fallback_build_plan;
use crate::clients::{AnthropicClient, Attachment, ModelClient, ModelRequest};
use crate::config::Config;
use crate::error::{Result, TrustcardError};
use crate::guidance::GuidanceProfile;
use crate::normalize::{build_plan_from_value, extract_structured, scorecard_from_value};
use crate::prompts::{PromptMode, flatten_history, system_bundle, user_text};
use crate::rng::SeedCursor;
use crate::schemas::{BuildPlan, Scorecard, new_build_id};
use crate::sessions::Turn;
use crate::templates::TemplateLibrary;
use crate::variant::VariantSelector;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub prompt: String,
    pub tone: String,
    pub builder: String,
    pub attachments: Vec<Attachment>,
    pub history: Vec<Turn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutcome {
    pub scorecard: Scorecard,
    pub source: Source,
    /// Seed of the offline variant; absent for live results
    pub seed: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub prompt: String,
    pub tone: String,
    pub builder: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub plan: BuildPlan,
    pub source: Source,
}

pub struct Advisor {
    config: Config,
    templates: TemplateLibrary,
    cursor: SeedCursor,
    model: Option<Arc<dyn ModelClient>>,
}

impl std::fmt::Debug for Advisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advisor")
            .field("seed_pool", &self.cursor.pool())
            .field("model", &self.model_name())
            .finish()
    }
}

impl Advisor {
    /// Build from configuration: load templates and, when a key is present,
    /// the live client.
    pub fn from_config(config: Config) -> Result<Self> {
        let templates = TemplateLibrary::load(config.variants.templates_path.as_deref())?;
        let model: Option<Arc<dyn ModelClient>> = match &config.runtime.api_key {
            Some(key) if config.model_enabled() => {
                let client = AnthropicClient::new(&config.model, key.clone())?;
                tracing::info!("Live model enabled: {}", config.model.model);
                Some(Arc::new(client) as Arc<dyn ModelClient>)
            }
            _ => {
                tracing::info!("No live model configured; serving offline variants");
                None
            }
        };
        Ok(Self::new(config, templates, model))
    }

    pub fn new(
        config: Config,
        templates: TemplateLibrary,
        model: Option<Arc<dyn ModelClient>>,
    ) -> Self {
        let cursor = SeedCursor::new(config.variants.seed_pool);
        Self {
            config,
            templates,
            cursor,
            model,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn seed_pool(&self) -> u32 {
        self.cursor.pool()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.model_name())
    }

    /// Deterministic scorecard for a fixed seed
    pub fn variant(&self, seed: i64, tone: &str, builder: &str) -> Scorecard {
        let guidance = GuidanceProfile::resolve(tone, builder);
        let mut card = VariantSelector::new(&self.templates).variant(seed, &guidance);
        card.map_prose(|t| guidance.tone.rewrite(t));
        card
    }

    pub async fn analyze(&self, req: AnalyzeRequest) -> Result<AnalyzeOutcome> {
        if req.prompt.trim().is_empty() && req.attachments.is_empty() {
            return Err(TrustcardError::Validation {
                message: "provide a prompt or at least one screenshot".to_string(),
            });
        }
        let guidance = GuidanceProfile::resolve(&req.tone, &req.builder);

        let live = match &self.model {
            Some(model) => match self.live_scorecard(model.as_ref(), &req, &guidance).await {
                Ok(card) => Some(card),
                Err(e) => {
                    tracing::warn!("Live analysis failed, serving offline variant: {}", e);
                    None
                }
            },
            None => None,
        };

        let (mut scorecard, source, seed) = match live {
            Some(card) => (card, Source::Live, None),
            None => {
                let (seed, card) =
                    VariantSelector::new(&self.templates).next_variant(&self.cursor, &guidance);
                (card, Source::Fallback, Some(seed))
            }
        };
        scorecard.map_prose(|t| guidance.tone.rewrite(t));

        Ok(AnalyzeOutcome {
            scorecard,
            source,
            seed,
        })
    }

    pub async fn build(&self, req: BuildRequest) -> Result<BuildOutcome> {
        if req.prompt.trim().is_empty() {
            return Err(TrustcardError::Validation {
                message: "prompt is required to build a plan".to_string(),
            });
        }
        let guidance = GuidanceProfile::resolve(&req.tone, &req.builder);
        let build_id = new_build_id();

        let live = match &self.model {
            Some(model) => match self
                .live_build_plan(model.as_ref(), &req, &guidance, &build_id)
                .await
            {
                Ok(plan) => Some(plan),
                Err(e) => {
                    tracing::warn!("Live build failed, serving offline plan: {}", e);
                    None
                }
            },
            None => None,
        };

        let (mut plan, source) = match live {
            Some(plan) => (plan, Source::Live),
            None => (
                fallback_build_plan(&req.prompt, &guidance, &build_id),
                Source::Fallback,
            ),
        };
        plan.map_prose(|t| guidance.tone.rewrite(t));
        plan.map_labels(|t| guidance.tone.plain_terms(t));

        Ok(BuildOutcome { plan, source })
    }

    async fn live_scorecard(
        &self,
        model: &dyn ModelClient,
        req: &AnalyzeRequest,
        guidance: &GuidanceProfile,
    ) -> Result<Scorecard> {
        let names: Vec<String> = req
            .attachments
            .iter()
            .map(|a| a.display_name.clone())
            .collect();
        let history = flatten_history(&req.history);
        let request = model_request(
            guidance,
            PromptMode::Scorecard,
            user_text(&req.prompt, history.as_deref(), &names),
            req.attachments.clone(),
        );
        let payload = self.call_structured(model, request).await?;
        scorecard_from_value(&payload).ok_or_else(|| TrustcardError::Model {
            message: "structured output is not a scorecard object".to_string(),
        })
    }

    async fn live_build_plan(
        &self,
        model: &dyn ModelClient,
        req: &BuildRequest,
        guidance: &GuidanceProfile,
        build_id: &str,
    ) -> Result<BuildPlan> {
        let history = flatten_history(&req.history);
        let request = model_request(
            guidance,
            PromptMode::BuildPlan,
            user_text(&req.prompt, history.as_deref(), &[]),
            Vec::new(),
        );
        let payload = self.call_structured(model, request).await?;
        build_plan_from_value(&payload, build_id).ok_or_else(|| TrustcardError::Model {
            message: "structured output is not a build plan object".to_string(),
        })
    }

    /// One bounded model call, reduced to its structured payload
    async fn call_structured(&self, model: &dyn ModelClient, request: ModelRequest) -> Result<Value> {
        let timeout_ms = self.config.model.timeout_ms;
        let started = std::time::Instant::now();
        let envelope = tokio::time::timeout(Duration::from_millis(timeout_ms), model.generate(request))
            .await
            .map_err(|_| TrustcardError::Timeout {
                operation: "live model call".to_string(),
                timeout_ms,
            })??;
        tracing::debug!(
            model = model.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "live model responded"
        );
        extract_structured(&envelope).ok_or_else(|| TrustcardError::Model {
            message: "response carried no structured output".to_string(),
        })
    }
}

fn model_request(
    guidance: &GuidanceProfile,
    mode: PromptMode,
    user_text: String,
    attachments: Vec<Attachment>,
) -> ModelRequest {
    ModelRequest {
        system: system_bundle(guidance, mode),
        user_text,
        attachments,
        schema_name: mode.schema_name().to_string(),
        schema: mode.schema(),
    }
}
