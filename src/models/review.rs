//! Review, checklist and parse-result types produced by the parsers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::asset::Target;
use crate::models::result_engine::ResultEngine;

/// Canonical result of evaluating one rule.
///
/// The first three values are the only "reviewed" outcomes; everything else
/// is subject to the unreviewed import policy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReviewResult {
    Pass,
    Fail,
    Notapplicable,
    Notchecked,
    Notselected,
    Informational,
    Error,
    Fixed,
    Unknown,
}

impl ReviewResult {
    /// Map an XCCDF result token to the enumeration. Returns `None` for
    /// tokens outside the fixed vocabulary.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            "notapplicable" => Some(Self::Notapplicable),
            "notchecked" => Some(Self::Notchecked),
            "notselected" => Some(Self::Notselected),
            "informational" => Some(Self::Informational),
            "error" => Some(Self::Error),
            "fixed" => Some(Self::Fixed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Notapplicable => "notapplicable",
            Self::Notchecked => "notchecked",
            Self::Notselected => "notselected",
            Self::Informational => "informational",
            Self::Error => "error",
            Self::Fixed => "fixed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status attached to a review. "No status" is `Option::None` on
/// the review itself, never a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Saved,
    Submitted,
    Accepted,
    Rejected,
}

/// One normalized rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rule_id: String,
    pub result: ReviewResult,
    pub detail: Option<String>,
    pub comment: Option<String>,
    /// `None` serializes as an explicit `null`: absence of provenance is a
    /// stated fact, not a missing key.
    pub result_engine: Option<ResultEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
}

/// Fixed-shape counters, one per result value, zero-filled and incremented
/// once per retained review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistStats {
    pub pass: u32,
    pub fail: u32,
    pub notapplicable: u32,
    pub notchecked: u32,
    pub notselected: u32,
    pub informational: u32,
    pub error: u32,
    pub fixed: u32,
    pub unknown: u32,
}

impl ChecklistStats {
    pub fn increment(&mut self, result: ReviewResult) {
        match result {
            ReviewResult::Pass => self.pass += 1,
            ReviewResult::Fail => self.fail += 1,
            ReviewResult::Notapplicable => self.notapplicable += 1,
            ReviewResult::Notchecked => self.notchecked += 1,
            ReviewResult::Notselected => self.notselected += 1,
            ReviewResult::Informational => self.informational += 1,
            ReviewResult::Error => self.error += 1,
            ReviewResult::Fixed => self.fixed += 1,
            ReviewResult::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.pass
            + self.fail
            + self.notapplicable
            + self.notchecked
            + self.notselected
            + self.informational
            + self.error
            + self.fixed
            + self.unknown
    }
}

/// Reviews for one STIG benchmark found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub benchmark_id: String,
    /// `V<version>R<release>`, or `None` when either component is
    /// unobtainable.
    pub revision_str: Option<String>,
    pub reviews: Vec<Review>,
    pub stats: ChecklistStats,
    pub source_ref: Value,
}

/// Output of one parser invocation over one raw document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub target: Target,
    pub checklists: Vec<Checklist>,
    pub source_ref: Value,
    /// Soft errors accumulated while parsing. Only the CKL parser records
    /// any (malformed embedded provenance comments).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Open string map used for target metadata.
pub type Metadata = BTreeMap<String, String>;
