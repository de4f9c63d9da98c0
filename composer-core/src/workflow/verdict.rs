//! Evaluator verdicts and their fail-closed parsing.
//!
//! A model reply is decoded into a [`Verdict`] in two stages: the trimmed
//! reply as-is, then the contents of a markdown fence or the first balanced
//! `{...}` span. No syntactic repair is attempted; a reply that needs it is
//! not trusted. Whatever cannot be decoded becomes a NEEDS_IMPROVEMENT
//! verdict tagged [`VerdictParse::Fallback`], so a garbled evaluation can
//! never end a refinement loop early.
//!
//! Every decoded verdict is normalized: an overall PASS with any failing
//! criterion is downgraded to NEEDS_IMPROVEMENT.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parsing::JsonParser;

/// Criterion scores at or above this count as passing
pub const CRITERION_PASS_SCORE: f64 = 7.0;

/// Feedback attached when the evaluator returned nothing
pub const EMPTY_EVALUATION_FEEDBACK: &str =
    "Unable to evaluate. Please improve clarity and completeness.";

/// Overall evaluation status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum VerdictStatus {
    Pass,
    #[default]
    NeedsImprovement,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Pass => "PASS",
            VerdictStatus::NeedsImprovement => "NEEDS_IMPROVEMENT",
        }
    }
}

/// Anything other than a (case-insensitive) PASS needs improvement.
impl From<String> for VerdictStatus {
    fn from(status: String) -> Self {
        if status.trim().eq_ignore_ascii_case("pass") {
            VerdictStatus::Pass
        } else {
            VerdictStatus::NeedsImprovement
        }
    }
}

impl From<VerdictStatus> for &'static str {
    fn from(status: VerdictStatus) -> Self {
        status.as_str()
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one rubric criterion.
///
/// Accepts `{"name", "passed", "feedback"}`. When `passed` is absent a
/// numeric `score` is compared against [`CRITERION_PASS_SCORE`]; with
/// neither the criterion fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCriterion")]
pub struct CriterionResult {
    pub name: String,
    pub passed: bool,
    pub feedback: String,
}

impl CriterionResult {
    pub fn new(name: impl Into<String>, passed: bool, feedback: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            feedback: feedback.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawCriterion {
    #[serde(alias = "criterion")]
    name: String,
    #[serde(default)]
    passed: Option<bool>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    feedback: String,
}

impl From<RawCriterion> for CriterionResult {
    fn from(raw: RawCriterion) -> Self {
        let passed = match (raw.passed, raw.score) {
            (Some(passed), _) => passed,
            (None, Some(score)) => score >= CRITERION_PASS_SCORE,
            (None, None) => false,
        };
        Self {
            name: raw.name,
            passed,
            feedback: raw.feedback,
        }
    }
}

/// Structured evaluation of one artifact
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub status: VerdictStatus,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub criteria: Vec<CriterionResult>,
}

impl Verdict {
    pub fn pass(feedback: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Pass,
            feedback: feedback.into(),
            criteria: Vec::new(),
        }
    }

    pub fn needs_improvement(feedback: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::NeedsImprovement,
            feedback: feedback.into(),
            criteria: Vec::new(),
        }
    }

    pub fn with_criterion(mut self, criterion: CriterionResult) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// PASS and every criterion passed
    pub fn is_pass(&self) -> bool {
        self.status == VerdictStatus::Pass && self.criteria.iter().all(|c| c.passed)
    }

    /// Names of failing criteria
    pub fn failed_criteria(&self) -> Vec<&str> {
        self.criteria
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Downgrade a PASS that any criterion contradicts.
    pub fn normalized(mut self) -> Self {
        if self.status == VerdictStatus::Pass && !self.is_pass() {
            warn!(
                failed = ?self.failed_criteria(),
                "evaluator reported PASS with failing criteria"
            );
            self.status = VerdictStatus::NeedsImprovement;
        }
        self
    }
}

/// A verdict plus whether it was actually read from the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "verdict", rename_all = "snake_case")]
pub enum VerdictParse {
    /// Decoded from the evaluator reply
    Parsed(Verdict),
    /// Substituted because the reply was missing or unreadable
    Fallback(Verdict),
}

impl VerdictParse {
    pub fn verdict(&self) -> &Verdict {
        match self {
            VerdictParse::Parsed(v) | VerdictParse::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, VerdictParse::Fallback(_))
    }

    /// Only a parsed verdict can pass
    pub fn is_pass(&self) -> bool {
        matches!(self, VerdictParse::Parsed(v) if v.is_pass())
    }

    /// Fallback for an evaluator call that failed or returned nothing
    pub fn unavailable(reason: Option<&str>) -> Self {
        let feedback = match reason {
            Some(reason) => format!("{} ({})", EMPTY_EVALUATION_FEEDBACK, reason),
            None => EMPTY_EVALUATION_FEEDBACK.to_string(),
        };
        VerdictParse::Fallback(Verdict::needs_improvement(feedback))
    }
}

/// Parse an evaluator reply. Never fails.
pub fn parse_verdict(reply: &str) -> VerdictParse {
    if reply.trim().is_empty() {
        return VerdictParse::unavailable(None);
    }

    match JsonParser::strict().decode::<Verdict>(reply) {
        Ok(decoded) => VerdictParse::Parsed(decoded.value.normalized()),
        Err(e) => {
            warn!(error = %e, "unreadable evaluator reply, treating as NEEDS_IMPROVEMENT");
            VerdictParse::Fallback(Verdict::needs_improvement(format!(
                "Error parsing evaluation: {}. Please revise and resubmit.",
                e
            )))
        }
    }
}
