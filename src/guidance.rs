//! Tone and builder guidance: canned instruction text and tips keyed by the
//! request's `tone` and `builder` fields.
//!
//! Pure lookups. Unknown tones resolve to [`Tone::Balanced`]; unknown builders
//! resolve to a generic profile labelled with the raw input.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::Serialize;

use crate::schemas::ActionItem;

/// Wording preset. Changes vocabulary, never content depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    LowTech,
    Balanced,
    Technical,
}

impl Tone {
    pub fn from_key(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low-tech" | "lowtech" | "low_tech" | "plain" | "simple" => Tone::LowTech,
            "technical" | "tech" | "pro" | "dev" => Tone::Technical,
            _ => Tone::Balanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::LowTech => "low-tech",
            Tone::Balanced => "balanced",
            Tone::Technical => "technical",
        }
    }

    pub fn all() -> [Tone; 3] {
        [Tone::LowTech, Tone::Balanced, Tone::Technical]
    }
}

/// Suffix appended to prose in the technical tone
pub const TECHNICAL_SUFFIX: &str =
    "Instrument the change with analytics events so its impact is measurable.";

/// Jargon swapped out in the low-tech tone, matched case-insensitively
const JARGON: &[(&str, &str)] = &[
    ("above the fold", "top of the page"),
    ("social proof", "reviews and testimonials"),
    ("conversion rate", "sign-up rate"),
    ("value prop", "main promise"),
    ("onboarding", "first-time setup"),
    ("friction", "hassle"),
    ("CTA", "main button"),
    ("UX", "experience"),
];

static JARGON_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    JARGON
        .iter()
        .filter_map(|(term, plain)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            match Regex::new(&pattern) {
                Ok(re) => Some((re, *plain)),
                Err(e) => {
                    tracing::error!("Invalid jargon pattern for '{}': {}", term, e);
                    None
                }
            }
        })
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToneProfile {
    pub tone: Tone,
    pub label: &'static str,
    pub instruction: &'static str,
}

impl ToneProfile {
    /// Reword `text` for this tone
    pub fn rewrite(&self, text: &str) -> String {
        match self.tone {
            Tone::LowTech => self.plain_terms(text),
            Tone::Technical => {
                let trimmed = text.trim_end();
                if trimmed.is_empty() || trimmed.ends_with(TECHNICAL_SUFFIX) {
                    text.to_string()
                } else {
                    format!("{trimmed} {TECHNICAL_SUFFIX}")
                }
            }
            Tone::Balanced => text.to_string(),
        }
    }

    /// Jargon replacement only, for short labels that take no suffix
    pub fn plain_terms(&self, text: &str) -> String {
        if self.tone != Tone::LowTech {
            return text.to_string();
        }
        JARGON_PATTERNS
            .iter()
            .fold(text.to_string(), |acc, (re, plain)| {
                re.replace_all(&acc, NoExpand(plain)).into_owned()
            })
    }
}

pub fn resolve_tone(key: &str) -> ToneProfile {
    profile_for_tone(Tone::from_key(key))
}

pub fn profile_for_tone(tone: Tone) -> ToneProfile {
    match tone {
        Tone::LowTech => ToneProfile {
            tone,
            label: "Plain English",
            instruction: "Write for a non-technical founder. Use everyday words, short sentences and no acronyms. Explain any design term in plain language the first time it appears.",
        },
        Tone::Balanced => ToneProfile {
            tone,
            label: "Balanced",
            instruction: "Write for a product-minded founder. Be direct and specific. Common marketing and UX terms are fine; avoid deep engineering detail.",
        },
        Tone::Technical => ToneProfile {
            tone,
            label: "Technical",
            instruction: "Write for a product engineer or growth lead. Reference concrete UI components, analytics events and experiment design. Precise terminology is welcome.",
        },
    }
}

/// Static entry in the known-builder table
struct BuilderEntry {
    keys: &'static [&'static str],
    label: &'static str,
    exports_code: bool,
    system_prompt: &'static str,
    knowledge: &'static [&'static str],
    tips: &'static [(&'static str, &'static str)],
}

const BUILDERS: &[BuilderEntry] = &[
    BuilderEntry {
        keys: &["bubble", "bubble.io"],
        label: "Bubble",
        exports_code: false,
        system_prompt: "The user builds in Bubble. Recommend changes using Bubble's visual editor, reusable elements, workflows and the built-in database.",
        knowledge: &[
            "Reusable elements keep headers, footers and trust badges consistent across pages.",
            "Workflows trigger on element events; conditional visibility handles gated content.",
            "Privacy rules on data types control what each user can read.",
        ],
        tips: &[
            ("Make the trust strip reusable", "Build the logos and testimonial row as a reusable element so every page shows the same proof."),
            ("Use conditional states for the CTA", "Give the main button a loading and disabled state so double clicks don't create duplicate sign-ups."),
            ("Tighten privacy rules", "Add privacy rules on user data before launch; visitors notice when profiles leak into search results."),
            ("Set page SEO fields", "Fill in the page title and description in the page settings so shared links look intentional."),
        ],
    },
    BuilderEntry {
        keys: &["webflow"],
        label: "Webflow",
        exports_code: true,
        system_prompt: "The user builds in Webflow. Recommend changes using classes, symbols (components), CMS collections and interactions.",
        knowledge: &[
            "Components (symbols) propagate edits to every instance.",
            "CMS collections drive testimonials, case studies and blog lists.",
            "Interactions should stay subtle; heavy animation hurts perceived speed.",
        ],
        tips: &[
            ("Drive testimonials from the CMS", "Create a Testimonials collection with name, role and company fields so every quote carries a source."),
            ("Turn the hero into a component", "Make the hero a component with text overrides so variants for experiments are one click away."),
            ("Audit interactions on mobile", "Disable scroll-triggered animations on the phone breakpoint where they delay the first readable text."),
        ],
    },
    BuilderEntry {
        keys: &["framer"],
        label: "Framer",
        exports_code: false,
        system_prompt: "The user builds in Framer. Recommend changes using stacks, components with variants, CMS and built-in A/B testing.",
        knowledge: &[
            "Component variants make hover and pressed states trivial.",
            "Stacks handle responsive layout better than absolute positioning.",
            "Framer sites can run simple A/B tests on pages.",
        ],
        tips: &[
            ("Use stacks for the hero", "Rebuild the hero with stacks so the headline and CTA reflow cleanly on small screens."),
            ("Add a pressed variant to the CTA", "A visible pressed state on the main button reassures people that the click registered."),
            ("Split-test the headline", "Use a page A/B test to compare the current headline with an outcome-first version."),
        ],
    },
    BuilderEntry {
        keys: &["softr"],
        label: "Softr",
        exports_code: false,
        system_prompt: "The user builds in Softr on top of Airtable or Google Sheets. Recommend changes using Softr blocks, user groups and visibility rules.",
        knowledge: &[
            "Blocks are configured, not coded; custom code blocks exist for edge cases.",
            "User groups control which blocks each visitor sees.",
            "Data lives in the connected Airtable base or sheet.",
        ],
        tips: &[
            ("Use a testimonial block", "Swap the free-text section for a testimonial block fed by a table with names and companies."),
            ("Gate pricing details by user group", "Show detailed limits to signed-in users only if the public pricing block gets too dense."),
            ("Trim the signup form", "Remove optional fields from the sign-up block and collect them later in the profile page."),
        ],
    },
    BuilderEntry {
        keys: &["glide", "glideapps"],
        label: "Glide",
        exports_code: false,
        system_prompt: "The user builds in Glide. Recommend changes using screens, components, computed columns and actions.",
        knowledge: &[
            "Screens are generated from tables; components are added per screen.",
            "Computed columns handle formatting without touching source data.",
            "Actions chain steps such as add row, show notification and navigate.",
        ],
        tips: &[
            ("Add a first-run screen", "Show a short welcome screen with one clear action before dropping people into the data."),
            ("Use computed columns for friendly labels", "Format raw values into readable text so lists don't expose internal IDs."),
            ("Confirm destructive actions", "Add a confirmation step before delete actions so users trust they can explore safely."),
        ],
    },
    BuilderEntry {
        keys: &["flutterflow"],
        label: "FlutterFlow",
        exports_code: true,
        system_prompt: "The user builds in FlutterFlow. Recommend changes using widgets, app state, Firebase or Supabase backends and custom code where needed.",
        knowledge: &[
            "Widget trees map directly to Flutter code and can be exported.",
            "App state and page state hold UI data between actions.",
            "Backend queries bind Firestore or Supabase data to widgets.",
        ],
        tips: &[
            ("Add empty states", "Give every list a friendly empty state so new users see guidance instead of a blank screen."),
            ("Show progress during backend calls", "Bind a loading indicator to the query state so slow networks don't look broken."),
            ("Export and review the code", "Download the generated code before launch to check error handling around auth."),
        ],
    },
    BuilderEntry {
        keys: &["lovable", "lovable.dev"],
        label: "Lovable",
        exports_code: true,
        system_prompt: "The user builds in Lovable by prompting an AI that writes a React + Supabase app. Recommend changes as short, specific prompts.",
        knowledge: &[
            "Each prompt edits the generated React codebase.",
            "Supabase provides auth, database and storage.",
            "Projects sync to GitHub for review and export.",
        ],
        tips: &[
            ("Prompt one change at a time", "Ask for a single section change per prompt so regressions are easy to spot and revert."),
            ("Ask for real testimonial data", "Prompt it to create a testimonials table in Supabase instead of hard-coded quotes."),
            ("Request accessible components", "Ask for labelled form fields and alt text so the page passes a basic accessibility check."),
        ],
    },
    BuilderEntry {
        keys: &["bolt", "bolt.new"],
        label: "Bolt",
        exports_code: true,
        system_prompt: "The user builds in Bolt, an in-browser AI coding environment. Recommend changes as focused prompts and small file edits.",
        knowledge: &[
            "Bolt generates full-stack JavaScript projects in the browser.",
            "Changes are applied as file diffs that can be reviewed.",
            "Projects can be deployed directly or downloaded.",
        ],
        tips: &[
            ("Pin the layout before styling", "Lock the page structure in one prompt, then adjust copy and styling in follow-ups."),
            ("Keep copy in one file", "Ask Bolt to move page text into a single content file so rewrites don't touch components."),
            ("Review diffs before deploy", "Check each generated diff for removed validation or error handling before publishing."),
        ],
    },
    BuilderEntry {
        keys: &["replit", "replit agent"],
        label: "Replit",
        exports_code: true,
        system_prompt: "The user builds on Replit with the Replit Agent. Recommend changes as agent prompts and small, testable edits.",
        knowledge: &[
            "The agent scaffolds and edits full projects inside a Repl.",
            "Deployments publish the Repl to a public URL.",
            "Secrets are stored in the Repl's secret manager.",
        ],
        tips: &[
            ("Move keys into Secrets", "Make sure API keys live in the secret manager, not in client code visitors can read."),
            ("Ask the agent for a checkpoint", "Create a checkpoint before large changes so you can roll back a broken page."),
            ("Add a custom domain", "A custom domain on the deployment looks more trustworthy than the default subdomain."),
        ],
    },
];

const GENERIC_TIPS: &[(&str, &str)] = &[
    ("Make the main button unmistakable", "Give the primary action one color used nowhere else on the page."),
    ("Put proof next to the ask", "Place a testimonial or customer count within one scroll of every sign-up button."),
    ("Check the page on a phone", "Preview on a small screen and make sure the headline and button fit in the first view."),
];

/// Builder knowledge for prompts and builder actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderProfile {
    pub label: String,
    pub known: bool,
    pub exports_code: bool,
    pub system_prompt: String,
    pub knowledge: Vec<String>,
    pub tips: Vec<ActionItem>,
}

fn to_actions(tips: &[(&str, &str)]) -> Vec<ActionItem> {
    tips.iter()
        .map(|(title, detail)| ActionItem {
            title: title.to_string(),
            detail: detail.to_string(),
        })
        .collect()
}

/// Resolve a builder by name, case and surrounding whitespace ignored
pub fn resolve_builder(name: &str) -> BuilderProfile {
    let key = name.trim().to_lowercase();
    if let Some(entry) = BUILDERS.iter().find(|b| b.keys.contains(&key.as_str())) {
        return BuilderProfile {
            label: entry.label.to_string(),
            known: true,
            exports_code: entry.exports_code,
            system_prompt: entry.system_prompt.to_string(),
            knowledge: entry.knowledge.iter().map(|k| k.to_string()).collect(),
            tips: to_actions(entry.tips),
        };
    }
    let label = if name.trim().is_empty() {
        "your builder".to_string()
    } else {
        name.to_string()
    };
    BuilderProfile {
        system_prompt: format!(
            "The user builds with {label}. Recommend changes that any visual or AI-assisted site builder can make."
        ),
        label,
        known: false,
        exports_code: false,
        knowledge: vec![
            "Most builders support reusable sections, basic forms and page-level SEO settings.".to_string(),
        ],
        tips: to_actions(GENERIC_TIPS),
    }
}

/// Labels of every known builder, in table order
pub fn known_builders() -> Vec<&'static str> {
    BUILDERS.iter().map(|b| b.label).collect()
}

/// Resolved guidance for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuidanceProfile {
    pub tone: ToneProfile,
    pub builder: BuilderProfile,
}

impl GuidanceProfile {
    pub fn resolve(tone: &str, builder: &str) -> Self {
        Self {
            tone: resolve_tone(tone),
            builder: resolve_builder(builder),
        }
    }
}
