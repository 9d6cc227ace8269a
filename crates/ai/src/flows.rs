//! Analysis flow contract and a local heuristic implementation.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::result::AnalysisError;

/// Seniority band used by the career-insights flow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Lead,
}

/// Input for resume optimization against a target role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeOptimizationRequest {
    pub resume_text: String,
    pub target_role: String,
    pub industry: Option<String>,
}

/// Input for a skill-gap analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGapRequest {
    pub target_role: String,
    pub industry: String,
    pub current_skills: Vec<String>,
}

/// Input for market/career insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerInsightsRequest {
    pub domain: String,
    pub current_role: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub location: Option<String>,
}

/// Input for generating a resume from structured profile data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeGenerationRequest {
    pub resume: JsonValue,
    pub target_role: Option<String>,
    pub industry: Option<String>,
}

/// The opaque-callable contract for every long-running analysis.
///
/// Implementations may take seconds to minutes and must be idempotent with
/// respect to external side effects: at-least-once execution means the same
/// request can run more than once across retries.
pub trait CareerFlows: Send + Sync {
    fn optimize_resume(&self, req: ResumeOptimizationRequest) -> Result<JsonValue, AnalysisError>;

    fn analyze_skill_gap(&self, req: SkillGapRequest) -> Result<JsonValue, AnalysisError>;

    fn career_insights(&self, req: CareerInsightsRequest) -> Result<JsonValue, AnalysisError>;

    fn generate_resume(&self, req: ResumeGenerationRequest) -> Result<JsonValue, AnalysisError>;
}

/// Local, deterministic heuristics standing in for the hosted model.
///
/// Good enough to exercise the whole pipeline end-to-end; not career advice.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCareerFlows;

impl LocalCareerFlows {
    pub fn new() -> Self {
        Self
    }
}

/// Keywords we expect to see for a role, derived from the role name itself
/// plus a small common vocabulary.
fn role_keywords(role: &str) -> Vec<String> {
    let mut keywords: Vec<String> = role
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect();
    for common in ["design", "testing", "collaboration", "delivery"] {
        keywords.push(common.to_string());
    }
    keywords.sort();
    keywords.dedup();
    keywords
}

fn contains_word(text: &str, word: &str) -> bool {
    text.to_lowercase().contains(word)
}

impl CareerFlows for LocalCareerFlows {
    fn optimize_resume(&self, req: ResumeOptimizationRequest) -> Result<JsonValue, AnalysisError> {
        if req.resume_text.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("empty resume text".into()));
        }

        let keywords = role_keywords(&req.target_role);
        let (present, missing): (Vec<_>, Vec<_>) = keywords
            .iter()
            .cloned()
            .partition(|k| contains_word(&req.resume_text, k));

        // Coverage drives both scores; ATS gets a small structure bonus for
        // multi-line resumes (sections are detectable).
        let coverage = if keywords.is_empty() {
            100
        } else {
            (present.len() * 100 / keywords.len()) as u64
        };
        let structure_bonus = if req.resume_text.lines().count() > 5 { 10 } else { 0 };
        let ats_score = (coverage * 9 / 10 + structure_bonus).min(100);

        Ok(json!({
            "atsScore": ats_score,
            "overallQuality": coverage,
            "keywordAnalysis": {
                "presentKeywords": present,
                "missingCriticalKeywords": missing,
                "keywordDensity": coverage,
            },
            "strengths": if structure_bonus > 0 {
                vec!["Clear multi-section layout"]
            } else {
                vec![]
            },
            "quickWins": [
                format!("Mirror the language of the '{}' posting", req.target_role),
            ],
            "industry": req.industry,
        }))
    }

    fn analyze_skill_gap(&self, req: SkillGapRequest) -> Result<JsonValue, AnalysisError> {
        if req.current_skills.is_empty() {
            return Err(AnalysisError::InvalidInput("no current skills given".into()));
        }

        let wanted = role_keywords(&req.target_role);
        let have: Vec<String> = req
            .current_skills
            .iter()
            .map(|s| s.to_lowercase())
            .collect();

        let matched: Vec<_> = wanted.iter().filter(|k| have.contains(k)).cloned().collect();
        let missing: Vec<_> = wanted.iter().filter(|k| !have.contains(k)).cloned().collect();
        let readiness = if wanted.is_empty() {
            100
        } else {
            (matched.len() * 100 / wanted.len()) as u64
        };

        Ok(json!({
            "readinessScore": readiness,
            "skillBreakdown": {
                "matchedSkills": matched,
                "missingCriticalSkills": missing,
            },
            "learningPath": req.current_skills,
            "marketContext": {
                "industry": req.industry,
                "targetRole": req.target_role,
            },
        }))
    }

    fn career_insights(&self, req: CareerInsightsRequest) -> Result<JsonValue, AnalysisError> {
        if req.domain.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("empty domain".into()));
        }

        let level = req.experience_level.unwrap_or(ExperienceLevel::Entry);
        let next = match level {
            ExperienceLevel::Entry => "Mid",
            ExperienceLevel::Mid => "Senior",
            ExperienceLevel::Senior => "Lead",
            ExperienceLevel::Lead => "Principal",
        };

        Ok(json!({
            "domain": req.domain,
            "currentRole": req.current_role,
            "location": req.location,
            "trajectory": { "currentLevel": level, "nextLevel": next },
            "immediateActions": [
                format!("Survey {} openings at the {} level in your market", req.domain, next),
                "Collect recent wins into a portfolio update",
            ],
        }))
    }

    fn generate_resume(&self, req: ResumeGenerationRequest) -> Result<JsonValue, AnalysisError> {
        let profile = req
            .resume
            .as_object()
            .ok_or_else(|| AnalysisError::InvalidInput("resume data must be an object".into()))?;

        Ok(json!({
            "sections": profile.keys().collect::<Vec<_>>(),
            "targetRole": req.target_role,
            "industry": req.industry,
            "resume": req.resume,
        }))
    }
}
