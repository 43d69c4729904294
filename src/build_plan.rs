//! Deterministic build plan used when no live model answers.
//!
//! The plan is assembled from a fixed app skeleton plus feature modules
//! switched on by keywords in the brief.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::guidance::GuidanceProfile;
use crate::schemas::{ActionItem, BuildPlan, Entity, ExportPlan, Flow, Screen};

/// Optional feature detected from the brief
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Bookings,
    Payments,
    Messaging,
    Marketplace,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Bookings => "bookings",
            Feature::Payments => "payments",
            Feature::Messaging => "messaging",
            Feature::Marketplace => "marketplace",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Feature::Bookings => &["book", "appointment", "schedule", "reservation", "calendar"],
            Feature::Payments => &["pay", "checkout", "subscription", "pricing", "invoice", "stripe"],
            Feature::Messaging => &["chat", "message", "inbox", "notify", "comment"],
            Feature::Marketplace => &["marketplace", "listing", "seller", "buyer", "vendor"],
        }
    }
}

const ALL_FEATURES: [Feature; 4] = [
    Feature::Bookings,
    Feature::Payments,
    Feature::Messaging,
    Feature::Marketplace,
];

/// One pattern per feature; keywords must start a word, so "notebook" is
/// not a booking and "repay" is not a payment.
static FEATURE_PATTERNS: Lazy<Vec<(Feature, Regex)>> = Lazy::new(|| {
    ALL_FEATURES
        .into_iter()
        .filter_map(|f| {
            let alternatives: Vec<String> = f.keywords().iter().map(|kw| regex::escape(kw)).collect();
            let pattern = format!(r"(?i)\b(?:{})", alternatives.join("|"));
            match Regex::new(&pattern) {
                Ok(re) => Some((f, re)),
                Err(e) => {
                    tracing::error!("Invalid keyword pattern for {}: {}", f.as_str(), e);
                    None
                }
            }
        })
        .collect()
});

/// Features mentioned in the brief, in a fixed order
pub fn detect_features(prompt: &str) -> Vec<Feature> {
    FEATURE_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(prompt))
        .map(|(f, _)| *f)
        .collect()
}

/// Short app name from the first few words of the brief
pub fn app_name(prompt: &str) -> String {
    let words: Vec<String> = prompt
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .take(4)
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Your App".to_string()
    } else {
        words.join(" ")
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn screen(name: &str, goal: &str, elements: &[&str]) -> Screen {
    Screen {
        name: name.to_string(),
        goal: goal.to_string(),
        key_elements: strings(elements),
    }
}

fn flow(title: &str, steps: &[&str]) -> Flow {
    Flow {
        title: title.to_string(),
        steps: strings(steps),
    }
}

fn entity(name: &str, fields: &[&str]) -> Entity {
    Entity {
        entity: name.to_string(),
        fields: strings(fields),
    }
}

fn step(title: impl Into<String>, detail: impl Into<String>) -> ActionItem {
    ActionItem {
        title: title.into(),
        detail: detail.into(),
    }
}

/// Build plan for `prompt` without any model call
pub fn fallback_build_plan(prompt: &str, guidance: &GuidanceProfile, build_id: &str) -> BuildPlan {
    let name = app_name(prompt);
    let builder = &guidance.builder;
    let features = detect_features(prompt);
    let has = |f: Feature| features.contains(&f);

    let mut screens = vec![
        screen(
            "Landing",
            &format!("Explain what {name} does and earn the first click."),
            &["Outcome-first headline", "Proof strip", "Primary CTA"],
        ),
        screen(
            "Sign up",
            "Create an account with as few fields as possible.",
            &["Email field", "Password or magic link", "Terms note"],
        ),
        screen(
            "Dashboard",
            "Show the user's current state and the next action.",
            &["Summary cards", "Recent activity", "Primary action button"],
        ),
    ];
    let mut flows = vec![flow(
        "First-time sign up",
        &[
            "Visitor lands on the landing page",
            "Clicks the primary CTA",
            "Creates an account",
            "Sees an empty-state dashboard with one suggested action",
        ],
    )];
    let mut data_model = vec![entity("User", &["email", "name", "created_at", "plan"])];

    if has(Feature::Bookings) {
        screens.push(screen(
            "Booking",
            "Let the user pick a slot and confirm.",
            &["Calendar", "Time slots", "Confirmation summary"],
        ));
        flows.push(flow(
            "Book a slot",
            &["Open booking screen", "Choose a date and time", "Confirm", "Receive confirmation email"],
        ));
        data_model.push(entity("Booking", &["user", "starts_at", "ends_at", "status"]));
    }
    if has(Feature::Marketplace) {
        screens.push(screen(
            "Listings",
            "Browse and filter what sellers offer.",
            &["Search bar", "Filters", "Listing cards"],
        ));
        flows.push(flow(
            "Publish a listing",
            &["Seller opens new listing form", "Adds photos and price", "Publishes", "Listing appears in search"],
        ));
        data_model.push(entity("Listing", &["seller", "title", "price", "photos", "status"]));
    }
    if has(Feature::Messaging) {
        screens.push(screen(
            "Inbox",
            "Keep conversations in one place.",
            &["Conversation list", "Message thread", "Composer"],
        ));
        data_model.push(entity("Message", &["sender", "recipient", "body", "sent_at", "read"]));
    }
    if has(Feature::Payments) {
        screens.push(screen(
            "Pricing",
            "Show plans, limits and refund terms side by side.",
            &["Plan cards", "Feature comparison", "Refund note"],
        ));
        flows.push(flow(
            "Upgrade",
            &["Open pricing", "Choose a plan", "Pay through hosted checkout", "Return to dashboard with plan active"],
        ));
        data_model.push(entity("Payment", &["user", "amount", "currency", "status", "provider_ref"]));
    }
    screens.push(screen(
        "Settings",
        "Let users manage their account and leave cleanly.",
        &["Profile form", "Notification preferences", "Delete account"],
    ));

    let mut builder_steps = vec![
        step(
            format!("Set up the data in {}", builder.label),
            format!(
                "Create {} with the fields listed in the data model before building any screen.",
                data_model
                    .iter()
                    .map(|e| e.entity.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ),
        step(
            "Build the landing and sign-up screens",
            "Start with the path every visitor takes; polish inner screens after the first sign-up works.",
        ),
    ];
    if let Some(note) = builder.knowledge.first() {
        builder_steps.push(step(format!("Work with {}", builder.label), note.clone()));
    }
    builder_steps.extend(builder.tips.iter().take(2).cloned());

    let export_plan = builder.exports_code.then(|| ExportPlan {
        description: format!(
            "{} can export the project; keep the generated code in version control.",
            builder.label
        ),
        files: strings(&["README.md", "src/", ".env.example"]),
    });

    let mut suggested_prompts = vec![
        format!("Write the landing page copy for {name}"),
        format!("Design the empty state for the {name} dashboard"),
    ];
    if !has(Feature::Payments) {
        suggested_prompts.push(format!("Add paid plans to {name}"));
    }

    tracing::debug!(
        build_id,
        features = ?features.iter().map(Feature::as_str).collect::<Vec<_>>(),
        "assembled offline build plan"
    );

    BuildPlan {
        build_id: build_id.to_string(),
        screens,
        flows,
        data_model,
        builder_steps,
        export_plan,
        next_steps: strings(&[
            "Build the sign-up flow end to end.",
            "Invite three target users to try it.",
            "Run the landing page through the trust scorecard.",
        ]),
        suggested_prompts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_uses_first_words() {
        assert_eq!(app_name("dog walking booking app for busy owners"), "Dog Walking Booking App");
        assert_eq!(app_name("  ...  "), "Your App");
        assert_eq!(app_name(""), "Your App");
    }

    #[test]
    fn features_follow_keywords() {
        assert_eq!(
            detect_features("A marketplace where sellers take bookings and get paid at checkout"),
            vec![Feature::Bookings, Feature::Payments, Feature::Marketplace]
        );
        assert!(detect_features("a recipe collection").is_empty());
    }

    #[test]
    fn keywords_inside_other_words_do_not_count() {
        assert!(detect_features("a notebook app").is_empty());
        assert!(detect_features("track who needs to repay a loan").is_empty());
        assert!(detect_features("share recipes on Facebook").is_empty());
        assert_eq!(detect_features("Booking page"), vec![Feature::Bookings]);
        assert_eq!(detect_features("PAYMENTS dashboard"), vec![Feature::Payments]);
    }

    #[test]
    fn plan_always_has_core_screens() {
        let g = GuidanceProfile::resolve("balanced", "Bubble");
        let plan = fallback_build_plan("recipe collection", &g, "id-1");
        let names: Vec<&str> = plan.screens.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Landing", "Sign up", "Dashboard", "Settings"]);
        assert_eq!(plan.build_id, "id-1");
        assert!(plan.export_plan.is_none());
        assert_eq!(plan.data_model[0].entity, "User");
    }

    #[test]
    fn features_add_screens_and_entities() {
        let g = GuidanceProfile::resolve("balanced", "Webflow");
        let plan = fallback_build_plan("salon booking with stripe checkout", &g, "id-2");
        assert!(plan.screens.iter().any(|s| s.name == "Booking"));
        assert!(plan.screens.iter().any(|s| s.name == "Pricing"));
        assert!(plan.data_model.iter().any(|e| e.entity == "Payment"));
        assert!(plan.export_plan.is_some());
        assert!(!plan.suggested_prompts.iter().any(|p| p.starts_with("Add paid plans")));
    }

    #[test]
    fn builder_steps_mention_builder_and_entities() {
        let g = GuidanceProfile::resolve("balanced", "Carrd");
        let plan = fallback_build_plan("team chat", &g, "id-3");
        assert!(plan.builder_steps[0].title.contains("Carrd"));
        assert!(plan.builder_steps[0].detail.contains("Message"));
        assert_eq!(plan.builder_steps.len(), 5);
        assert_eq!(plan.builder_steps[2].title, "Work with Carrd");
    }

    #[test]
    fn same_input_same_plan() {
        let g = GuidanceProfile::resolve("technical", "Glide");
        assert_eq!(
            fallback_build_plan("inventory tracker", &g, "x"),
            fallback_build_plan("inventory tracker", &g, "x")
        );
    }
}
