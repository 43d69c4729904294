pub mod advisor;
pub mod build_plan;
pub mod clients;
pub mod config;
pub mod error;
pub mod guidance;
pub mod http;
pub mod normalize;
pub mod prompts;
pub mod rng;
pub mod schemas;
pub mod sessions;
pub mod templates;
pub mod variant;

pub use advisor::{Advisor, AnalyzeOutcome, AnalyzeRequest, BuildOutcome, BuildRequest, Source};
pub use config::Config;
pub use error::{Result, TrustcardError};
pub use guidance::GuidanceProfile;
pub use schemas::{BuildPlan, Scorecard, Scores};
