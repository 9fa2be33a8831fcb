//! Scanned-target and inventory asset types.

use serde::{Deserialize, Serialize};

use crate::models::review::Metadata;

/// Well-known metadata keys injected by the checklist parsers and consumed
/// during identity resolution.
pub mod metadata_keys {
    pub const CKL_ROLE: &str = "cklRole";
    pub const CKL_TECH_AREA: &str = "cklTechArea";
    pub const CKL_WEB_OR_DATABASE: &str = "cklWebOrDatabase";
    pub const CKL_HOST_NAME: &str = "cklHostName";
    pub const CKL_WEB_DB_SITE: &str = "cklWebDbSite";
    pub const CKL_WEB_DB_INSTANCE: &str = "cklWebDbInstance";
}

/// One scanned host/instance as described by a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub description: Option<String>,
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    pub noncomputing: bool,
    pub metadata: Metadata,
}

/// STIG assignment attached to an inventory asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAssetStig {
    pub benchmark_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_str: Option<String>,
}

/// Pre-existing inventory asset as returned by the API.
///
/// Consumed (moved) by `TaskObject::new`: reconciliation flattens the
/// structured `stigs` records into benchmark-id strings, so a given
/// `ApiAsset` value cannot feed two reconciliation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAsset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub ip: Option<String>,
    pub fqdn: Option<String>,
    pub mac: Option<String>,
    pub noncomputing: bool,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub stigs: Vec<ApiAssetStig>,
}

/// Installed benchmark definition: which revisions of a STIG the
/// destination system holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStig {
    pub benchmark_id: String,
    #[serde(default)]
    pub revision_strs: Vec<String>,
}

/// Asset record in the shape expected by the persistence layer: assignments
/// are a flat benchmark-id list. Built either from an existing `ApiAsset`
/// or seeded from a parsed target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub ip: Option<String>,
    pub fqdn: Option<String>,
    pub mac: Option<String>,
    pub noncomputing: bool,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    pub stigs: Vec<String>,
}

impl From<ApiAsset> for AssetProps {
    fn from(asset: ApiAsset) -> Self {
        Self {
            asset_id: asset.asset_id,
            name: asset.name,
            description: asset.description,
            ip: asset.ip,
            fqdn: asset.fqdn,
            mac: asset.mac,
            noncomputing: asset.noncomputing,
            metadata: asset.metadata,
            collection_id: asset.collection_id,
            stigs: asset.stigs.into_iter().map(|s| s.benchmark_id).collect(),
        }
    }
}

impl AssetProps {
    /// Seed a new asset record from a parsed target, with the given name
    /// (plain target name, or the synthesized effective name for web/db
    /// instances) and no assignments yet.
    pub fn from_target(target: &Target, name: String, collection_id: &str) -> Self {
        Self {
            asset_id: None,
            name,
            description: target.description.clone(),
            ip: target.ip.clone(),
            fqdn: target.fqdn.clone(),
            mac: target.mac.clone(),
            noncomputing: target.noncomputing,
            metadata: target.metadata.clone(),
            collection_id: Some(collection_id.to_string()),
            stigs: Vec::new(),
        }
    }
}
