//! Coerce loosely shaped model output into [`Scorecard`] and [`BuildPlan`].
//!
//! Nothing here returns an error. Missing or mistyped fields get defaults,
//! unparseable text falls back to the caller-supplied generator, and model
//! envelopes that hide the payload are searched block by block.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::schemas::{
    ActionItem, BuildPlan, Entity, ExportPlan, Flag, Flow, LockedInsight, Rewrite, Scorecard,
    Scores, Screen,
};
use crate::variant::{clamp_score, default_rewrite};

const MAX_FLAGS: usize = 3;
const MAX_LOCKED_INSIGHTS: usize = 3;

/// Payload as received: raw model text or an already-parsed value
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Text(String),
    Json(Value),
}

impl From<&str> for RawPayload {
    fn from(s: &str) -> Self {
        RawPayload::Text(s.to_string())
    }
}

impl From<String> for RawPayload {
    fn from(s: String) -> Self {
        RawPayload::Text(s)
    }
}

impl From<Value> for RawPayload {
    fn from(v: Value) -> Self {
        RawPayload::Json(v)
    }
}

impl RawPayload {
    /// Parsed JSON, or `None` when the text is not JSON
    pub fn into_value(self) -> Option<Value> {
        match self {
            RawPayload::Json(v) => Some(v),
            RawPayload::Text(s) => parse_json_text(&s),
        }
    }
}

/// Parse model text as JSON, tolerating markdown fences and chatter around a
/// single top-level object.
pub fn parse_json_text(text: &str) -> Option<Value> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

// ---------------------------------------------------------------------------
// Envelope extraction
// ---------------------------------------------------------------------------

/// Known content-block shapes across model APIs
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    #[serde(alias = "json", alias = "json_schema", alias = "output_json_schema")]
    OutputJson {
        #[serde(alias = "parsed")]
        json: Value,
    },
    ToolUse {
        input: Value,
    },
    #[serde(alias = "output_text")]
    Text {
        text: String,
    },
    Refusal {
        #[serde(default)]
        refusal: String,
    },
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    fn from_value(v: &Value) -> Self {
        match v {
            Value::String(s) => ContentBlock::Text { text: s.clone() },
            Value::Object(map) if !map.contains_key("type") => match map.get("text") {
                // Gemini parts carry no discriminator
                Some(Value::String(s)) => ContentBlock::Text { text: s.clone() },
                _ => ContentBlock::Unknown,
            },
            _ => ContentBlock::deserialize(v).unwrap_or(ContentBlock::Unknown),
        }
    }

    fn structured(&self) -> Option<&Value> {
        match self {
            ContentBlock::OutputJson { json } if json.is_object() => Some(json),
            ContentBlock::ToolUse { input } if input.is_object() => Some(input),
            _ => None,
        }
    }
}

/// Every content block the envelope exposes, in the order they should be
/// tried.
pub fn content_blocks(envelope: &Value) -> Vec<ContentBlock> {
    fn push_all(v: &Value, blocks: &mut Vec<ContentBlock>) {
        match v {
            Value::Array(items) => blocks.extend(items.iter().map(ContentBlock::from_value)),
            Value::Null => {}
            other => blocks.push(ContentBlock::from_value(other)),
        }
    }

    let mut blocks = Vec::new();

    // Anthropic Messages
    if let Some(content) = envelope.get("content") {
        push_all(content, &mut blocks);
    }
    // OpenAI Responses
    if let Some(Value::Array(items)) = envelope.get("output") {
        for item in items {
            match item.get("content") {
                Some(content) => push_all(content, &mut blocks),
                None => blocks.push(ContentBlock::from_value(item)),
            }
        }
    }
    // OpenAI Chat Completions
    if let Some(Value::Array(choices)) = envelope.get("choices") {
        for message in choices.iter().filter_map(|c| c.get("message")) {
            if let Some(Value::Array(calls)) = message.get("tool_calls") {
                for args in calls
                    .iter()
                    .filter_map(|c| c.pointer("/function/arguments"))
                    .filter_map(Value::as_str)
                {
                    blocks.push(ContentBlock::Text {
                        text: args.to_string(),
                    });
                }
            }
            if let Some(content) = message.get("content") {
                push_all(content, &mut blocks);
            }
        }
    }
    // Gemini generateContent
    if let Some(Value::Array(candidates)) = envelope.get("candidates") {
        for parts in candidates.iter().filter_map(|c| c.pointer("/content/parts")) {
            push_all(parts, &mut blocks);
        }
    }
    if let Some(Value::String(text)) = envelope.get("output_text") {
        blocks.push(ContentBlock::Text { text: text.clone() });
    }
    blocks
}

/// Find the structured payload inside a model response envelope.
///
/// Tagged JSON blocks win in order; text blocks are JSON-parsed only when no
/// tagged block exists. An envelope that is itself a payload is returned
/// as-is. `None` means the caller should fall back.
pub fn extract_structured(envelope: &Value) -> Option<Value> {
    let blocks = content_blocks(envelope);
    if let Some(v) = blocks.iter().find_map(ContentBlock::structured) {
        return Some(v.clone());
    }
    for block in &blocks {
        match block {
            ContentBlock::Text { text } => {
                if let Some(v) = parse_json_text(text).filter(Value::is_object) {
                    return Some(v);
                }
            }
            ContentBlock::Refusal { refusal } => {
                tracing::warn!("Model refused structured output: {}", refusal);
            }
            _ => {}
        }
    }
    if looks_like_payload(envelope) {
        return Some(envelope.clone());
    }
    None
}

fn looks_like_payload(v: &Value) -> bool {
    ["scores", "flags", "freeRewrite", "screens", "flows", "scorecard"]
        .iter()
        .any(|k| v.get(k).is_some())
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn text_or(v: Option<&Value>, default: &str) -> String {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn list(v: Option<&Value>) -> &[Value] {
    match v {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// Numeric coercion for a score: numbers and numeric strings are clamped,
/// anything else is 50.
pub fn coerce_score(v: Option<&Value>) -> u8 {
    match v {
        Some(Value::Number(n)) => clamp_score(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::String(s)) => clamp_score(s.trim().parse::<f64>().unwrap_or(f64::NAN)),
        _ => 50,
    }
}

fn coerce_scores(obj: &Map<String, Value>) -> Scores {
    // Scores may be nested or flattened onto the card
    let source = match field(obj, &["scores"]) {
        Some(Value::Object(s)) => s,
        _ => obj,
    };
    Scores {
        confidence: coerce_score(field(source, &["confidence"])),
        pushiness: coerce_score(field(source, &["pushiness"])),
        clarity: coerce_score(field(source, &["clarity"])),
    }
}

fn string_items(v: Option<&Value>) -> Vec<String> {
    list(v)
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(o) => field(o, &["text", "title", "detail", "name"])
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn coerce_flag(v: &Value) -> Flag {
    const TITLE: &str = "Issue";
    const DETAIL: &str = "Needs clarification.";
    const EVIDENCE: &str = "No evidence provided.";
    match v {
        Value::Object(o) => Flag {
            title: text_or(field(o, &["title", "name"]), TITLE),
            detail: text_or(field(o, &["detail", "description"]), DETAIL),
            evidence: text_or(field(o, &["evidence"]), EVIDENCE),
        },
        Value::String(_) => Flag {
            title: TITLE.to_string(),
            detail: text_or(Some(v), DETAIL),
            evidence: EVIDENCE.to_string(),
        },
        _ => Flag {
            title: TITLE.to_string(),
            detail: DETAIL.to_string(),
            evidence: EVIDENCE.to_string(),
        },
    }
}

fn coerce_rewrite(v: Option<&Value>) -> Rewrite {
    let d = default_rewrite();
    match v {
        Some(Value::Object(o)) => Rewrite {
            before: text_or(field(o, &["before", "original"]), &d.before),
            after: text_or(field(o, &["after", "rewrite", "suggested"]), &d.after),
            rationale: text_or(field(o, &["rationale", "why"]), &d.rationale),
        },
        Some(Value::String(s)) if !s.trim().is_empty() => Rewrite {
            after: s.trim().to_string(),
            ..d
        },
        _ => d,
    }
}

fn coerce_insight(v: &Value) -> LockedInsight {
    const TITLE: &str = "Locked insight";
    const SUMMARY: &str = "Unlock the full report to read this insight.";
    match v {
        Value::Object(o) => LockedInsight {
            title: text_or(field(o, &["title"]), TITLE),
            summary: text_or(field(o, &["summary", "detail"]), SUMMARY),
        },
        Value::String(_) => LockedInsight {
            title: text_or(Some(v), TITLE),
            summary: SUMMARY.to_string(),
        },
        _ => LockedInsight {
            title: TITLE.to_string(),
            summary: SUMMARY.to_string(),
        },
    }
}

fn coerce_action(v: &Value, title_default: &str) -> ActionItem {
    const DETAIL: &str = "Details to follow.";
    match v {
        Value::Object(o) => ActionItem {
            title: text_or(field(o, &["title", "name"]), title_default),
            detail: text_or(field(o, &["detail", "description"]), DETAIL),
        },
        Value::String(_) => ActionItem {
            title: title_default.to_string(),
            detail: text_or(Some(v), DETAIL),
        },
        _ => ActionItem {
            title: title_default.to_string(),
            detail: DETAIL.to_string(),
        },
    }
}

/// First `limit` records that differ from every record already kept
fn distinct<T: PartialEq>(items: impl Iterator<Item = T>, limit: usize) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(limit);
    for item in items {
        if out.len() == limit {
            break;
        }
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Unwrap `{ "scorecard": {...} }` / `{ "result": {...} }` wrappers
fn unwrap_nested<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> &'a Map<String, Value> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_object))
        .unwrap_or(obj)
}

// ---------------------------------------------------------------------------
// Scorecard
// ---------------------------------------------------------------------------

/// Coerce a parsed value into a scorecard. `None` only for non-objects.
pub fn scorecard_from_value(value: &Value) -> Option<Scorecard> {
    let obj = unwrap_nested(value.as_object()?, &["scorecard", "result"]);
    Some(Scorecard {
        scores: coerce_scores(obj),
        flags: distinct(list(field(obj, &["flags"])).iter().map(coerce_flag), MAX_FLAGS),
        free_rewrite: coerce_rewrite(field(obj, &["freeRewrite", "free_rewrite", "rewrite"])),
        locked_insights: distinct(
            list(field(obj, &["lockedInsights", "locked_insights"]))
                .iter()
                .map(coerce_insight),
            MAX_LOCKED_INSIGHTS,
        ),
        builder_actions: list(field(obj, &["builderActions", "builder_actions"]))
            .iter()
            .map(|v| coerce_action(v, "Builder tip"))
            .collect(),
        experiments: string_items(field(obj, &["experiments"])),
        checklist: string_items(field(obj, &["checklist"])),
    })
}

/// Total scorecard normalization: anything that is not a JSON object ends up
/// as `fallback()`.
pub fn normalize_scorecard(payload: RawPayload, fallback: impl FnOnce() -> Scorecard) -> Scorecard {
    match payload.into_value().as_ref().and_then(scorecard_from_value) {
        Some(card) => card,
        None => {
            tracing::debug!("Scorecard payload unusable; using offline variant");
            fallback()
        }
    }
}

// ---------------------------------------------------------------------------
// Build plan
// ---------------------------------------------------------------------------

fn coerce_screen(v: &Value) -> Screen {
    match v {
        Value::Object(o) => Screen {
            name: text_or(field(o, &["name", "title"]), "Screen"),
            goal: text_or(field(o, &["goal", "purpose"]), "Goal to be defined."),
            key_elements: string_items(field(o, &["key_elements", "keyElements", "elements"])),
        },
        _ => Screen {
            name: text_or(Some(v), "Screen"),
            goal: "Goal to be defined.".to_string(),
            key_elements: Vec::new(),
        },
    }
}

fn coerce_flow(v: &Value) -> Flow {
    match v {
        Value::Object(o) => Flow {
            title: text_or(field(o, &["title", "name"]), "Flow"),
            steps: string_items(field(o, &["steps"])),
        },
        _ => Flow {
            title: text_or(Some(v), "Flow"),
            steps: Vec::new(),
        },
    }
}

fn coerce_entity(v: &Value) -> Entity {
    match v {
        Value::Object(o) => Entity {
            entity: text_or(field(o, &["entity", "name"]), "Record"),
            fields: string_items(field(o, &["fields"])),
        },
        _ => Entity {
            entity: text_or(Some(v), "Record"),
            fields: Vec::new(),
        },
    }
}

fn coerce_export(v: Option<&Value>) -> Option<ExportPlan> {
    let o = v?.as_object()?;
    Some(ExportPlan {
        description: text_or(field(o, &["description", "summary"]), "Export the project."),
        files: string_items(field(o, &["files"])),
    })
}

/// Coerce a parsed value into a build plan. `None` only for non-objects.
pub fn build_plan_from_value(value: &Value, build_id: &str) -> Option<BuildPlan> {
    let obj = unwrap_nested(value.as_object()?, &["buildPlan", "build_plan", "plan", "result"]);
    Some(BuildPlan {
        build_id: build_id.to_string(),
        screens: list(field(obj, &["screens"])).iter().map(coerce_screen).collect(),
        flows: list(field(obj, &["flows"])).iter().map(coerce_flow).collect(),
        data_model: list(field(obj, &["dataModel", "data_model"]))
            .iter()
            .map(coerce_entity)
            .collect(),
        builder_steps: list(field(obj, &["builderSteps", "builder_steps"]))
            .iter()
            .map(|v| coerce_action(v, "Step"))
            .collect(),
        export_plan: coerce_export(field(obj, &["exportPlan", "export_plan"])),
        next_steps: string_items(field(obj, &["nextSteps", "next_steps"])),
        suggested_prompts: string_items(field(obj, &["suggestedPrompts", "suggested_prompts"])),
    })
}

/// Total build-plan normalization; junk input yields an empty plan carrying
/// `build_id`.
pub fn normalize_build_plan(payload: RawPayload, build_id: &str) -> BuildPlan {
    payload
        .into_value()
        .as_ref()
        .and_then(|v| build_plan_from_value(v, build_id))
        .unwrap_or_else(|| BuildPlan::empty(build_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sentinel() -> Scorecard {
        scorecard_from_value(&json!({"flags": ["sentinel"]})).unwrap()
    }

    #[test]
    fn strips_markdown_fences() {
        let v = parse_json_text("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(v, json!({"a": 1}));
        let v = parse_json_text("Here you go: {\"a\": 2} hope that helps").unwrap();
        assert_eq!(v, json!({"a": 2}));
        assert!(parse_json_text("not json").is_none());
        assert!(parse_json_text("   ").is_none());
    }

    #[test]
    fn unparseable_text_falls_back() {
        let card = normalize_scorecard("not json".into(), sentinel);
        assert_eq!(card, sentinel());
    }

    #[test]
    fn non_object_json_falls_back() {
        for payload in [json!(null), json!([1, 2]), json!("text"), json!(4)] {
            assert_eq!(normalize_scorecard(payload.into(), sentinel), sentinel());
        }
    }

    #[test]
    fn empty_object_gets_full_defaults() {
        let card = normalize_scorecard(json!({}).into(), sentinel);
        assert_eq!(card.scores, Scores::default());
        assert!(card.flags.is_empty());
        assert_eq!(card.free_rewrite, default_rewrite());
        assert!(card.experiments.is_empty());
    }

    #[test]
    fn scores_are_coerced_and_clamped() {
        let card = scorecard_from_value(&json!({
            "scores": {"confidence": "71.6", "pushiness": 180, "clarity": "high"}
        }))
        .unwrap();
        assert_eq!(
            card.scores,
            Scores {
                confidence: 72,
                pushiness: 100,
                clarity: 50
            }
        );
    }

    #[test]
    fn flattened_scores_are_accepted() {
        let card = scorecard_from_value(&json!({"confidence": 12, "clarity": -4})).unwrap();
        assert_eq!(card.scores.confidence, 12);
        assert_eq!(card.scores.clarity, 0);
        assert_eq!(card.scores.pushiness, 50);
    }

    #[test]
    fn mistyped_flag_entries_become_default_records() {
        let card = scorecard_from_value(&json!({
            "flags": ["CTA is vague", 7, {"title": "Pushy popup"}, {"title": "extra"}]
        }))
        .unwrap();
        assert_eq!(card.flags.len(), 3);
        assert_eq!(card.flags[0].title, "Issue");
        assert_eq!(card.flags[0].detail, "CTA is vague");
        assert_eq!(card.flags[0].evidence, "No evidence provided.");
        assert_eq!(card.flags[1].detail, "Needs clarification.");
        assert_eq!(card.flags[2].title, "Pushy popup");
        assert_eq!(card.flags[2].detail, "Needs clarification.");
    }

    #[test]
    fn repeated_records_are_kept_once() {
        let same = json!({"title": "Same", "detail": "Same detail", "evidence": "hero"});
        let card = scorecard_from_value(&json!({
            "flags": [same, same, same, {"title": "Other"}, {"title": "Third"}],
            "lockedInsights": ["A", "A", {"title": "A"}, "B"]
        }))
        .unwrap();
        let titles: Vec<&str> = card.flags.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Same", "Other", "Third"]);
        let insights: Vec<&str> = card.locked_insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(insights, vec!["A", "B"]);
    }

    #[test]
    fn snake_case_and_wrapped_payloads_are_read() {
        let card = scorecard_from_value(&json!({
            "scorecard": {
                "free_rewrite": {"before": "Buy", "after": "Start free"},
                "locked_insights": [{"title": "A"}, "B", null, "D"],
                "builder_actions": ["Use a reusable header"],
                "experiments": ["x", 3, {"text": "y"}, null, ""],
                "checklist": "not a list"
            }
        }))
        .unwrap();
        assert_eq!(card.free_rewrite.before, "Buy");
        assert_eq!(card.free_rewrite.after, "Start free");
        assert_eq!(card.free_rewrite.rationale, default_rewrite().rationale);
        assert_eq!(card.locked_insights.len(), 3);
        assert_eq!(card.locked_insights[1].title, "B");
        assert_eq!(card.locked_insights[2].title, "Locked insight");
        assert_eq!(card.builder_actions[0].detail, "Use a reusable header");
        assert_eq!(card.experiments, vec!["x", "3", "y"]);
        assert!(card.checklist.is_empty());
    }

    #[test]
    fn build_plan_totality() {
        for junk in [json!(null), json!({}), json!({"screens": "nope", "flows": [1, null]})] {
            let plan = normalize_build_plan(junk.into(), "b-1");
            assert_eq!(plan.build_id, "b-1");
        }
        let plan = normalize_build_plan("garbage".into(), "b-2");
        assert_eq!(plan, BuildPlan::empty("b-2"));
    }

    #[test]
    fn build_plan_fields_are_coerced() {
        let plan = build_plan_from_value(
            &json!({
                "buildId": "model-made-this-up",
                "screens": [{"name": "Home", "keyElements": ["Hero", 2]}, "Settings"],
                "flows": [{"title": "Sign up", "steps": ["Enter email", "Confirm"]}],
                "data_model": [{"entity": "User", "fields": ["email", {"name": "plan"}]}],
                "builderSteps": ["Create the User type"],
                "exportPlan": {"files": ["app.zip"]},
                "nextSteps": ["Launch"],
                "suggestedPrompts": ["Add payments"]
            }),
            "fresh",
        )
        .unwrap();
        assert_eq!(plan.build_id, "fresh");
        assert_eq!(plan.screens[0].key_elements, vec!["Hero", "2"]);
        assert_eq!(plan.screens[1].name, "Settings");
        assert_eq!(plan.flows[0].steps.len(), 2);
        assert_eq!(plan.data_model[0].fields, vec!["email", "plan"]);
        assert_eq!(plan.builder_steps[0].title, "Step");
        assert_eq!(plan.export_plan.as_ref().unwrap().description, "Export the project.");
        assert_eq!(plan.suggested_prompts, vec!["Add payments"]);
    }

    #[test]
    fn extracts_anthropic_tool_use() {
        let envelope = json!({
            "content": [
                {"type": "text", "text": "Thinking out loud"},
                {"type": "tool_use", "id": "t1", "name": "scorecard", "input": {"scores": {"confidence": 80}}}
            ]
        });
        let v = extract_structured(&envelope).unwrap();
        assert_eq!(v["scores"]["confidence"], 80);
    }

    #[test]
    fn tagged_block_beats_earlier_text_json() {
        let envelope = json!({
            "content": [
                {"type": "text", "text": "{\"scores\": {\"confidence\": 1}}"},
                {"type": "output_json", "json": {"scores": {"confidence": 2}}}
            ]
        });
        assert_eq!(extract_structured(&envelope).unwrap()["scores"]["confidence"], 2);
    }

    #[test]
    fn extracts_openai_responses_text() {
        let envelope = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "```json\n{\"flags\": []}\n```"}
                ]}
            ]
        });
        assert_eq!(extract_structured(&envelope).unwrap(), json!({"flags": []}));
    }

    #[test]
    fn extracts_chat_completion_and_gemini_shapes() {
        let chat = json!({"choices": [{"message": {"content": "{\"screens\": []}"}}]});
        assert_eq!(extract_structured(&chat).unwrap(), json!({"screens": []}));

        let tool = json!({"choices": [{"message": {"content": null, "tool_calls": [
            {"function": {"name": "plan", "arguments": "{\"flows\": []}"}}
        ]}}]});
        assert_eq!(extract_structured(&tool).unwrap(), json!({"flows": []}));

        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "{\"flags\": [\"x\"]}"}]}}]});
        assert_eq!(extract_structured(&gemini).unwrap()["flags"][0], "x");
    }

    #[test]
    fn bare_payload_is_its_own_envelope() {
        let payload = json!({"scores": {"confidence": 3}});
        assert_eq!(extract_structured(&payload).unwrap(), payload);
    }

    #[test]
    fn nothing_extractable_is_none() {
        assert!(extract_structured(&json!({"content": [{"type": "text", "text": "sorry"}]})).is_none());
        assert!(extract_structured(&json!({"content": [{"type": "refusal", "refusal": "no"}]})).is_none());
        assert!(extract_structured(&json!({"id": "msg_1"})).is_none());
        assert!(extract_structured(&json!(null)).is_none());
        assert!(extract_structured(&json!({"content": [{"type": "image", "source": {}}]})).is_none());
    }
}
