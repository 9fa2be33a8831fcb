//! Import and reconciliation policy objects supplied by collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::review::ReviewResult;

/// A value the auto-status policy can resolve to. `Null` is the literal
/// string `"null"` in configuration and means "assign no status at all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoStatusValue {
    Null,
    Saved,
    Submitted,
    Accepted,
}

/// Auto-status policy: either the legacy single value applied to every
/// review, or a per-result mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutoStatus {
    Scalar(AutoStatusValue),
    PerResult(BTreeMap<ReviewResult, AutoStatusValue>),
}

impl AutoStatus {
    /// Resolve the setting for one review result. A result absent from the
    /// per-result mapping defaults to `Saved`.
    pub fn resolve(&self, result: ReviewResult) -> AutoStatusValue {
        match self {
            Self::Scalar(value) => *value,
            Self::PerResult(map) => map.get(&result).copied().unwrap_or(AutoStatusValue::Saved),
        }
    }
}

/// How to treat reviews whose source tool reported no compliance finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreviewedPolicy {
    Never,
    Commented,
    Always,
}

/// How to populate `detail`/`comment` when the source field is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyFieldPolicy {
    Ignore,
    Import,
    Replace,
}

/// Import behavior supplied by the caller, honored identically by all three
/// parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub auto_status: AutoStatus,
    pub unreviewed: UnreviewedPolicy,
    /// Result assigned to an unreviewed-but-commented review; restricted to
    /// `informational` or `notchecked` by convention.
    pub unreviewed_commented: ReviewResult,
    pub empty_detail: EmptyFieldPolicy,
    pub empty_comment: EmptyFieldPolicy,
    pub allow_custom: bool,
}

/// When a review field must be populated before the review can leave the
/// `saved` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredPolicy {
    Optional,
    Findings,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSetting {
    pub required: RequiredPolicy,
}

/// Per-field requirement policy for `detail` and `comment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSettings {
    pub detail: FieldSetting,
    pub comment: FieldSetting,
}
