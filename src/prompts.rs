//! Prompt assembly for the live model: system instructions from resolved
//! guidance, and the strict output schemas the model is asked to fill.

use serde_json::{Value, json};

use crate::guidance::GuidanceProfile;
use crate::sessions::Turn;

/// Which operation the prompt is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Scorecard,
    BuildPlan,
}

impl PromptMode {
    /// Name of the forced output tool
    pub fn schema_name(&self) -> &'static str {
        match self {
            PromptMode::Scorecard => "trust_scorecard",
            PromptMode::BuildPlan => "build_plan",
        }
    }

    pub fn schema(&self) -> Value {
        match self {
            PromptMode::Scorecard => scorecard_schema(),
            PromptMode::BuildPlan => build_plan_schema(),
        }
    }
}

const SCORECARD_ROLE: &str = "You are a conversion and trust reviewer for landing pages and app screens. \
Score how much a first-time visitor would trust the page (confidence), how much pressure it applies (pushiness) \
and how easy it is to understand (clarity), each from 0 to 100. Flag at most three concrete issues with the \
visible evidence for each, propose one rewrite of existing copy, and suggest small experiments.";

const BUILD_ROLE: &str = "You are a product architect for no-code and AI-assisted builders. Turn the brief into \
screens, user flows, a data model and builder-specific steps that a solo founder can follow this week.";

/// System instruction bundle for one request
pub fn system_bundle(guidance: &GuidanceProfile, mode: PromptMode) -> String {
    let role = match mode {
        PromptMode::Scorecard => SCORECARD_ROLE,
        PromptMode::BuildPlan => BUILD_ROLE,
    };
    let knowledge = guidance
        .builder
        .knowledge
        .iter()
        .map(|k| format!("- {k}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{role}\n\nTone: {label}. {instruction}\n\nBuilder: {builder}. {builder_prompt}\n{knowledge}\n\n\
Respond only by calling the `{tool}` tool. Do not invent metrics you cannot see.",
        label = guidance.tone.label,
        instruction = guidance.tone.instruction,
        builder = guidance.builder.label,
        builder_prompt = guidance.builder.system_prompt,
        tool = mode.schema_name(),
    )
}

/// Flatten recent turns into one context block, oldest first
pub fn flatten_history(turns: &[Turn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }
    let lines: Vec<String> = turns
        .iter()
        .map(|t| format!("[{}] {}: {}", t.at.format("%Y-%m-%d %H:%M"), t.role, t.text))
        .collect();
    Some(format!("Earlier in this session:\n{}", lines.join("\n")))
}

/// User message text: the brief plus optional session context
pub fn user_text(prompt: &str, history: Option<&str>, attachment_names: &[String]) -> String {
    let mut out = String::new();
    if let Some(h) = history {
        out.push_str(h);
        out.push_str("\n\n");
    }
    if !attachment_names.is_empty() {
        out.push_str(&format!("Attached screenshots: {}\n\n", attachment_names.join(", ")));
    }
    if prompt.trim().is_empty() {
        out.push_str("Review the attached screenshots.");
    } else {
        out.push_str(prompt.trim());
    }
    out
}

fn string_array() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

fn object_of(fields: &[&str]) -> Value {
    let props: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| (f.to_string(), json!({"type": "string"})))
        .collect();
    json!({
        "type": "object",
        "properties": props,
        "required": fields,
        "additionalProperties": false
    })
}

pub fn scorecard_schema() -> Value {
    let score = json!({"type": "integer", "minimum": 0, "maximum": 100});
    json!({
        "type": "object",
        "properties": {
            "scores": {
                "type": "object",
                "properties": {
                    "confidence": score,
                    "pushiness": score,
                    "clarity": score
                },
                "required": ["confidence", "pushiness", "clarity"],
                "additionalProperties": false
            },
            "flags": {"type": "array", "maxItems": 3, "items": object_of(&["title", "detail", "evidence"])},
            "freeRewrite": object_of(&["before", "after", "rationale"]),
            "lockedInsights": {"type": "array", "maxItems": 3, "items": object_of(&["title", "summary"])},
            "builderActions": {"type": "array", "items": object_of(&["title", "detail"])},
            "experiments": string_array(),
            "checklist": string_array()
        },
        "required": ["scores", "flags", "freeRewrite", "lockedInsights", "builderActions", "experiments", "checklist"],
        "additionalProperties": false
    })
}

pub fn build_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "screens": {"type": "array", "items": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "goal": {"type": "string"},
                    "key_elements": string_array()
                },
                "required": ["name", "goal", "key_elements"]
            }},
            "flows": {"type": "array", "items": {
                "type": "object",
                "properties": {"title": {"type": "string"}, "steps": string_array()},
                "required": ["title", "steps"]
            }},
            "dataModel": {"type": "array", "items": {
                "type": "object",
                "properties": {"entity": {"type": "string"}, "fields": string_array()},
                "required": ["entity", "fields"]
            }},
            "builderSteps": {"type": "array", "items": object_of(&["title", "detail"])},
            "exportPlan": {
                "type": "object",
                "properties": {"description": {"type": "string"}, "files": string_array()}
            },
            "nextSteps": string_array(),
            "suggestedPrompts": string_array()
        },
        "required": ["screens", "flows", "dataModel", "builderSteps", "nextSteps", "suggestedPrompts"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bundle_carries_tone_and_builder_guidance() {
        let g = GuidanceProfile::resolve("low-tech", "Webflow");
        let text = system_bundle(&g, PromptMode::Scorecard);
        assert!(text.contains("Plain English"));
        assert!(text.contains("Webflow"));
        assert!(text.contains("- Components (symbols)"));
        assert!(text.contains("`trust_scorecard`"));

        let build = system_bundle(&g, PromptMode::BuildPlan);
        assert!(build.contains("product architect"));
        assert!(build.contains("`build_plan`"));
    }

    #[test]
    fn scorecard_schema_requires_every_section() {
        let schema = scorecard_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for key in ["scores", "flags", "freeRewrite", "lockedInsights", "experiments", "checklist"] {
            assert!(required.contains(&key), "missing {key}");
        }
        assert_eq!(schema["properties"]["flags"]["maxItems"], 3);
        assert_eq!(
            schema["properties"]["flags"]["items"]["required"],
            json!(["title", "detail", "evidence"])
        );
    }

    #[test]
    fn build_plan_schema_uses_wire_names() {
        let schema = build_plan_schema();
        assert!(schema["properties"]["screens"]["items"]["properties"]["key_elements"].is_object());
        assert!(schema["properties"]["dataModel"].is_object());
    }

    #[test]
    fn history_flattens_oldest_first() {
        assert!(flatten_history(&[]).is_none());
        let at = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let turns = vec![
            Turn {
                role: "user".into(),
                text: "first".into(),
                at,
            },
            Turn {
                role: "assistant".into(),
                text: "second".into(),
                at,
            },
        ];
        let flat = flatten_history(&turns).unwrap();
        assert!(flat.starts_with("Earlier in this session:"));
        let first = flat.find("user: first").unwrap();
        let second = flat.find("assistant: second").unwrap();
        assert!(first < second);
        assert!(flat.contains("[2025-03-01 09:30]"));
    }

    #[test]
    fn user_text_handles_empty_prompt() {
        let text = user_text("  ", None, &["hero.png".to_string()]);
        assert!(text.contains("hero.png"));
        assert!(text.ends_with("Review the attached screenshots."));
        let text = user_text("Check my page", Some("ctx"), &[]);
        assert_eq!(text, "ctx\n\nCheck my page");
    }
}
