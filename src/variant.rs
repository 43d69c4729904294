//! Offline scorecard generator.
//!
//! Turns a seed plus resolved guidance into a complete [`Scorecard`] without
//! any external call. The draw order below is part of the output contract:
//! reordering draws changes every fixture.

use crate::guidance::GuidanceProfile;
use crate::rng::{Mulberry32, SeedCursor, sample_distinct};
use crate::schemas::{ActionItem, Flag, LockedInsight, Rewrite, Scorecard, Scores};
use crate::templates::{TemplateLibrary, instantiate};

const BASE_MIN: i64 = 35;
const BASE_MAX: i64 = 82;
const CONFIDENCE_JITTER: i64 = 5;
const PUSHINESS_JITTER: i64 = 6;
const CLARITY_JITTER: i64 = 4;
const SMOOTHING_JITTER: i64 = 4;
/// Largest spread between metrics before the smoothing pass kicks in
pub const MAX_COHERENT_SPREAD: u8 = 10;

const FLAG_COUNT: usize = 3;
const LOCKED_INSIGHT_COUNT: usize = 3;
const CHECKLIST_COUNT: usize = 3;
const BUILDER_ACTION_COUNT: usize = 2;

/// Clamp to `0..=100` after rounding; non-finite input becomes 50
pub fn clamp_score(x: f64) -> u8 {
    if !x.is_finite() {
        return 50;
    }
    x.round().clamp(0.0, 100.0) as u8
}

/// Derive the three metrics from the head of the stream
pub fn derive_scores(rng: &mut Mulberry32) -> Scores {
    let base = rng.int_between(BASE_MIN, BASE_MAX);
    let confidence = clamp_score((base + rng.jitter(CONFIDENCE_JITTER)) as f64);
    let pushiness = clamp_score((i64::from(confidence) + rng.jitter(PUSHINESS_JITTER)) as f64);
    let mid = ((f64::from(confidence) + f64::from(pushiness)) / 2.0).round();
    let clarity = clamp_score(mid + rng.jitter(CLARITY_JITTER) as f64);
    smooth_scores(
        Scores {
            confidence,
            pushiness,
            clarity,
        },
        rng,
    )
}

/// Pull scattered metrics back around their mean.
///
/// Runs a single pass and does not re-check the result.
pub fn smooth_scores(scores: Scores, rng: &mut Mulberry32) -> Scores {
    if scores.spread() <= MAX_COHERENT_SPREAD {
        return scores;
    }
    let mean = (f64::from(scores.confidence) + f64::from(scores.pushiness) + f64::from(scores.clarity))
        / 3.0;
    Scores {
        confidence: clamp_score(mean + rng.jitter(SMOOTHING_JITTER) as f64),
        pushiness: clamp_score(mean + rng.jitter(SMOOTHING_JITTER) as f64),
        clarity: clamp_score(mean + rng.jitter(SMOOTHING_JITTER) as f64),
    }
}

/// Deterministic scorecard generator over a template library
#[derive(Debug, Clone, Copy)]
pub struct VariantSelector<'a> {
    library: &'a TemplateLibrary,
}

impl<'a> VariantSelector<'a> {
    pub fn new(library: &'a TemplateLibrary) -> Self {
        Self { library }
    }

    /// Scorecard for `seed`. Same seed and guidance, same scorecard.
    pub fn variant(&self, seed: i64, guidance: &GuidanceProfile) -> Scorecard {
        let mut rng = Mulberry32::new(seed);
        let builder = guidance.builder.label.as_str();

        let scores = derive_scores(&mut rng);

        let flags = sample_distinct(&mut rng, &self.library.flag_pool(&scores), FLAG_COUNT)
            .into_iter()
            .map(|t| Flag {
                title: instantiate(&t.title, builder),
                detail: instantiate(&t.detail, builder),
                evidence: instantiate(&t.evidence, builder),
            })
            .collect();

        let free_rewrite = sample_distinct(&mut rng, &self.library.rewrite_pool(&scores), 1)
            .into_iter()
            .next()
            .map(|t| Rewrite {
                before: instantiate(&t.before, builder),
                after: instantiate(&t.after, builder),
                rationale: instantiate(&t.rationale, builder),
            })
            .unwrap_or_else(default_rewrite);

        let locked_insights = sample_distinct(
            &mut rng,
            &self.library.locked_insights,
            LOCKED_INSIGHT_COUNT,
        )
        .into_iter()
        .map(|t| LockedInsight {
            title: instantiate(&t.title, builder),
            summary: instantiate(&t.summary, builder),
        })
        .collect();

        let experiment_count = 2 + rng.pick_index(2).unwrap_or(0);
        let experiments = sample_distinct(&mut rng, &self.library.experiments, experiment_count)
            .into_iter()
            .map(|t| instantiate(t, builder))
            .collect();

        let checklist = sample_distinct(&mut rng, &self.library.checklist, CHECKLIST_COUNT)
            .into_iter()
            .map(|t| instantiate(t, builder))
            .collect();

        let builder_actions: Vec<ActionItem> =
            sample_distinct(&mut rng, &guidance.builder.tips, BUILDER_ACTION_COUNT)
                .into_iter()
                .cloned()
                .collect();

        tracing::debug!(
            seed,
            builder,
            confidence = scores.confidence,
            pushiness = scores.pushiness,
            clarity = scores.clarity,
            "generated offline scorecard"
        );

        Scorecard {
            scores,
            flags,
            free_rewrite,
            locked_insights,
            builder_actions,
            experiments,
            checklist,
        }
    }

    /// Scorecard for the next seed on `cursor`, returned with the seed used
    pub fn next_variant(&self, cursor: &SeedCursor, guidance: &GuidanceProfile) -> (u32, Scorecard) {
        let seed = cursor.next_seed();
        (seed, self.variant(i64::from(seed), guidance))
    }
}

pub(crate) fn default_rewrite() -> Rewrite {
    Rewrite {
        before: "Original copy not provided.".to_string(),
        after: "Lead with the outcome your visitor wants, then show one proof point.".to_string(),
        rationale: "Outcome-first copy with nearby proof is the most reliable trust lift.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> TemplateLibrary {
        TemplateLibrary::builtin().expect("builtin templates")
    }

    #[test]
    fn clamp_handles_bounds_and_non_finite() {
        assert_eq!(clamp_score(-12.0), 0);
        assert_eq!(clamp_score(140.2), 100);
        assert_eq!(clamp_score(49.5), 50);
        assert_eq!(clamp_score(f64::NAN), 50);
        assert_eq!(clamp_score(f64::INFINITY), 50);
        assert_eq!(clamp_score(f64::NEG_INFINITY), 50);
    }

    #[test]
    fn clamp_is_idempotent() {
        for x in [-1e9, -0.4, 0.0, 12.5, 63.49, 99.9, 100.0, 1e12, f64::NAN, f64::INFINITY] {
            let once = clamp_score(x);
            assert_eq!(clamp_score(f64::from(once)), once, "x = {x}");
        }
    }

    #[test]
    fn seed_one_scores_match_reference() {
        let mut rng = Mulberry32::new(1);
        assert_eq!(
            derive_scores(&mut rng),
            Scores {
                confidence: 60,
                pushiness: 60,
                clarity: 64
            }
        );
    }

    #[test]
    fn smoothing_pulls_scattered_scores_together() {
        let scattered = Scores {
            confidence: 20,
            pushiness: 80,
            clarity: 50,
        };
        for seed in 1..=100 {
            let mut rng = Mulberry32::new(seed);
            let smoothed = smooth_scores(scattered, &mut rng);
            assert!(smoothed.spread() <= 8, "seed {seed}: {smoothed:?}");
            for v in [smoothed.confidence, smoothed.pushiness, smoothed.clarity] {
                assert!((46..=54).contains(&v));
            }
        }
    }

    #[test]
    fn coherent_scores_skip_smoothing() {
        let tight = Scores {
            confidence: 60,
            pushiness: 64,
            clarity: 58,
        };
        let mut rng = Mulberry32::new(5);
        assert_eq!(smooth_scores(tight, &mut rng), tight);
    }

    #[test]
    fn scores_bounded_and_coherent_across_seeds() {
        for seed in -500..500 {
            let mut rng = Mulberry32::new(seed);
            let s = derive_scores(&mut rng);
            assert!(s.confidence <= 100 && s.pushiness <= 100 && s.clarity <= 100);
            assert!(s.spread() <= MAX_COHERENT_SPREAD, "seed {seed}: {s:?}");
        }
    }

    #[test]
    fn variant_is_deterministic() {
        let lib = library();
        let selector = VariantSelector::new(&lib);
        let guidance = GuidanceProfile::resolve("technical", "Webflow");
        for seed in [1, 7, 42, 99, -3] {
            let a = serde_json::to_string(&selector.variant(seed, &guidance)).unwrap();
            let b = serde_json::to_string(&selector.variant(seed, &guidance)).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn variant_has_expected_shape() {
        let lib = library();
        let selector = VariantSelector::new(&lib);
        let guidance = GuidanceProfile::resolve("balanced", "Glide");
        for seed in 1..=100 {
            let card = selector.variant(seed, &guidance);
            assert_eq!(card.flags.len(), 3);
            let mut titles: Vec<&str> = card.flags.iter().map(|f| f.title.as_str()).collect();
            titles.sort_unstable();
            titles.dedup();
            assert_eq!(titles.len(), 3, "seed {seed} repeated a flag");
            assert_eq!(card.locked_insights.len(), 3);
            assert!((2..=3).contains(&card.experiments.len()));
            assert_eq!(card.checklist.len(), 3);
            assert_eq!(card.builder_actions.len(), 2);
            assert_ne!(card.builder_actions[0], card.builder_actions[1]);
        }
    }

    #[test]
    fn builder_placeholder_never_leaks() {
        let lib = library();
        let selector = VariantSelector::new(&lib);
        let guidance = GuidanceProfile::resolve("balanced", "Carrd");
        for seed in 1..=100 {
            let json = serde_json::to_string(&selector.variant(seed, &guidance)).unwrap();
            assert!(!json.contains("{{builder}}"), "seed {seed}");
        }
    }

    #[test]
    fn seed_one_bubble_fixture() {
        let lib = library();
        let selector = VariantSelector::new(&lib);
        let guidance = GuidanceProfile::resolve("low-tech", "Bubble");
        let card = selector.variant(1, &guidance);
        let titles: Vec<&str> = card.flags.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Bubble defaults still showing",
                "Form asks for too much",
                "Pricing hides the catch"
            ]
        );
        assert_eq!(card.free_rewrite.before, "We are passionate about quality.");
        let insights: Vec<&str> = card.locked_insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            insights,
            vec![
                "Pricing page friction",
                "Bubble performance audit",
                "Competitor proof gap"
            ]
        );
        assert_eq!(card.experiments.len(), 2);
    }

    #[test]
    fn next_variant_follows_cursor() {
        let lib = library();
        let selector = VariantSelector::new(&lib);
        let guidance = GuidanceProfile::resolve("balanced", "Bubble");
        let cursor = SeedCursor::new(2);
        let (s1, c1) = selector.next_variant(&cursor, &guidance);
        let (s2, _) = selector.next_variant(&cursor, &guidance);
        let (s3, c3) = selector.next_variant(&cursor, &guidance);
        assert_eq!((s1, s2, s3), (1, 2, 1));
        assert_eq!(c1, c3);
        assert_eq!(c1, selector.variant(1, &guidance));
    }
}
