//! Output records returned by the advisor and builder operations.
//!
//! Every type here is a plain value: built fresh per request and never shared.

use serde::{Deserialize, Serialize};

/// The three headline metrics, each in `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub confidence: u8,
    pub pushiness: u8,
    pub clarity: u8,
}

impl Scores {
    pub fn spread(&self) -> u8 {
        let vals = [self.confidence, self.pushiness, self.clarity];
        let max = vals.iter().copied().max().unwrap_or(0);
        let min = vals.iter().copied().min().unwrap_or(0);
        max - min
    }

    /// Lookup by metric
    pub fn get(&self, metric: Metric) -> u8 {
        match metric {
            Metric::Confidence => self.confidence,
            Metric::Pushiness => self.pushiness,
            Metric::Clarity => self.clarity,
        }
    }
}

impl Default for Scores {
    fn default() -> Self {
        Self {
            confidence: 50,
            pushiness: 50,
            clarity: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Confidence,
    Pushiness,
    Clarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub title: String,
    pub detail: String,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    pub before: String,
    pub after: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedInsight {
    pub title: String,
    pub summary: String,
}

/// `{title, detail}` pair shared by builder actions and build-plan steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub title: String,
    pub detail: String,
}

/// Trust scorecard for a page or screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub scores: Scores,
    pub flags: Vec<Flag>,
    pub free_rewrite: Rewrite,
    pub locked_insights: Vec<LockedInsight>,
    pub builder_actions: Vec<ActionItem>,
    pub experiments: Vec<String>,
    pub checklist: Vec<String>,
}

impl Scorecard {
    /// Apply `f` to every prose field.
    ///
    /// Titles, evidence and the before/after copy are left alone: they are
    /// labels or quotations, not advice.
    pub fn map_prose(&mut self, f: impl Fn(&str) -> String) {
        for flag in &mut self.flags {
            flag.detail = f(&flag.detail);
        }
        self.free_rewrite.rationale = f(&self.free_rewrite.rationale);
        for insight in &mut self.locked_insights {
            insight.summary = f(&insight.summary);
        }
        for action in &mut self.builder_actions {
            action.detail = f(&action.detail);
        }
        for item in self.experiments.iter_mut().chain(self.checklist.iter_mut()) {
            *item = f(item);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    pub name: String,
    pub goal: String,
    pub key_elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub title: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPlan {
    pub description: String,
    pub files: Vec<String>,
}

/// Screens, flows, data model and steps for building an app in a no-code tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPlan {
    pub build_id: String,
    pub screens: Vec<Screen>,
    pub flows: Vec<Flow>,
    pub data_model: Vec<Entity>,
    pub builder_steps: Vec<ActionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_plan: Option<ExportPlan>,
    pub next_steps: Vec<String>,
    pub suggested_prompts: Vec<String>,
}

impl BuildPlan {
    pub fn empty(build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            screens: Vec::new(),
            flows: Vec::new(),
            data_model: Vec::new(),
            builder_steps: Vec::new(),
            export_plan: None,
            next_steps: Vec::new(),
            suggested_prompts: Vec::new(),
        }
    }

    /// Apply `f` to every prose field: screen goals, flow steps, step
    /// details, next steps, suggested prompts and the export description.
    pub fn map_prose(&mut self, f: impl Fn(&str) -> String) {
        for screen in &mut self.screens {
            screen.goal = f(&screen.goal);
        }
        for step in self.flows.iter_mut().flat_map(|flow| flow.steps.iter_mut()) {
            *step = f(step);
        }
        for step in &mut self.builder_steps {
            step.detail = f(&step.detail);
        }
        for item in self
            .next_steps
            .iter_mut()
            .chain(self.suggested_prompts.iter_mut())
        {
            *item = f(item);
        }
        if let Some(export) = &mut self.export_plan {
            export.description = f(&export.description);
        }
    }

    /// Apply `f` to short labels: screen names, key elements, flow and step
    /// titles. Entity and field names are identifiers and stay as they are.
    pub fn map_labels(&mut self, f: impl Fn(&str) -> String) {
        for screen in &mut self.screens {
            screen.name = f(&screen.name);
            for element in &mut screen.key_elements {
                *element = f(element);
            }
        }
        for flow in &mut self.flows {
            flow.title = f(&flow.title);
        }
        for step in &mut self.builder_steps {
            step.title = f(&step.title);
        }
    }
}

/// Fresh opaque build identifier
pub fn new_build_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scorecard_serializes_with_camel_case_keys() {
        let card = Scorecard {
            scores: Scores::default(),
            flags: vec![],
            free_rewrite: Rewrite {
                before: "a".into(),
                after: "b".into(),
                rationale: "c".into(),
            },
            locked_insights: vec![],
            builder_actions: vec![],
            experiments: vec![],
            checklist: vec![],
        };
        let v = serde_json::to_value(&card).unwrap();
        assert!(v.get("freeRewrite").is_some());
        assert!(v.get("lockedInsights").is_some());
        assert!(v.get("builderActions").is_some());
        assert_eq!(v["scores"], json!({"confidence": 50, "pushiness": 50, "clarity": 50}));
    }

    #[test]
    fn build_plan_keeps_snake_case_key_elements() {
        let mut plan = BuildPlan::empty("b-1");
        plan.screens.push(Screen {
            name: "Home".into(),
            goal: "Orient".into(),
            key_elements: vec!["Hero".into()],
        });
        let v = serde_json::to_value(&plan).unwrap();
        assert_eq!(v["buildId"], "b-1");
        assert_eq!(v["screens"][0]["key_elements"][0], "Hero");
        assert!(v.get("exportPlan").is_none());
    }

    #[test]
    fn build_plan_prose_and_labels_are_mapped_separately() {
        let mut plan = BuildPlan::empty("b-2");
        plan.screens.push(Screen {
            name: "Home".into(),
            goal: "Orient".into(),
            key_elements: vec!["Hero".into()],
        });
        plan.flows.push(Flow {
            title: "Start".into(),
            steps: vec!["Open".into()],
        });
        plan.next_steps.push("Ship".into());
        plan.map_prose(|t| format!("{t}!"));
        assert_eq!(plan.screens[0].goal, "Orient!");
        assert_eq!(plan.screens[0].key_elements[0], "Hero");
        assert_eq!(plan.flows[0].steps[0], "Open!");
        assert_eq!(plan.flows[0].title, "Start");
        assert_eq!(plan.next_steps[0], "Ship!");

        plan.map_labels(|t| t.to_uppercase());
        assert_eq!(plan.screens[0].name, "HOME");
        assert_eq!(plan.screens[0].key_elements[0], "HERO");
        assert_eq!(plan.flows[0].title, "START");
        assert_eq!(plan.build_id, "b-2");
    }

    #[test]
    fn spread_is_max_minus_min() {
        let s = Scores {
            confidence: 40,
            pushiness: 70,
            clarity: 55,
        };
        assert_eq!(s.spread(), 30);
        assert_eq!(s.get(Metric::Pushiness), 70);
    }

    #[test]
    fn build_ids_are_fresh() {
        assert_ne!(new_build_id(), new_build_id());
    }
}
