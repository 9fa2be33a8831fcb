//! Provenance metadata describing which tool produced a review and how.

use serde::{Deserialize, Serialize};

use crate::models::review::ReviewResult;

/// Broad class of result producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Scap,
    Script,
    Other,
}

/// Pointer to the check content a tool evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

/// A recorded result override (answer file, authority decision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    pub old_result: ReviewResult,
    pub new_result: ReviewResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Canonical result-engine descriptor. Optional fields are omitted from the
/// serialized form when absent; `overrides` in particular is never an empty
/// list — either at least one valid override exists or the key is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEngine {
    #[serde(rename = "type")]
    pub engine_type: EngineType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_content: Option<CheckContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Vec<Override>>,
}

impl ResultEngine {
    /// Bare engine of the given type with every descriptive field empty.
    pub fn new(engine_type: EngineType) -> Self {
        Self {
            engine_type,
            product: None,
            version: None,
            time: None,
            check_content: None,
            overrides: None,
        }
    }
}
