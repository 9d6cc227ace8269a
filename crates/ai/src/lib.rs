//! `careerforge-ai` — the analysis seam.
//!
//! The queue core treats every career analysis as an opaque long-running
//! callable: typed input in, JSON insight out. This crate defines that
//! contract ([`CareerFlows`]) and ships a local heuristic implementation
//! for dev/tests. Model-backed implementations live with deployment, not
//! here.

pub mod flows;
pub mod result;

pub use flows::{
    CareerFlows, CareerInsightsRequest, ExperienceLevel, LocalCareerFlows,
    ResumeGenerationRequest, ResumeOptimizationRequest, SkillGapRequest,
};
pub use result::AnalysisError;
