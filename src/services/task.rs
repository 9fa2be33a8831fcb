//! Reconciliation of parsed results against an asset/STIG inventory.
//!
//! One [`TaskObject`] run is a one-shot synchronous batch: it indexes the
//! supplied inventory, resolves each parsed target to an asset identity,
//! vets every checklist against installation and assignment gates, and
//! folds everything into per-asset merge decisions for a downstream writer.
//! All lookup state is built fresh per run and discarded with it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::asset::{metadata_keys, ApiAsset, ApiStig, AssetProps, Target};
use crate::models::review::{Checklist, ParseResult};

/// Merge policy for one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    /// Create assets and STIG assignments that do not exist yet. When
    /// false, unmatched targets error out and unassigned checklists are
    /// ignored.
    pub create_objects: bool,
    /// Collection new assets are created in.
    pub collection_id: String,
    /// Require the checklist's `revisionStr` to be installed, not just the
    /// benchmark.
    pub strict_revision_check: bool,
}

/// A checklist accepted for merging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VettedChecklist {
    #[serde(flatten)]
    pub checklist: Checklist,
    /// Whether the benchmark was assigned to the asset during this run.
    pub new_assignment: bool,
}

/// A checklist excluded from merging, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IgnoredChecklist {
    #[serde(flatten)]
    pub checklist: Checklist,
    pub ignored: String,
}

/// Per-asset merge decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAsset {
    /// False when the asset must be created by the writer.
    pub known_asset: bool,
    pub asset_props: AssetProps,
    pub has_new_assignment: bool,
    pub new_assignments: Vec<String>,
    /// Vetted checklists keyed by benchmark id; several source documents
    /// may contribute checklists for the same benchmark.
    pub checklists: BTreeMap<String, Vec<VettedChecklist>>,
    pub checklists_ignored: Vec<IgnoredChecklist>,
    pub source_refs: Vec<Value>,
}

/// Unresolvable parse result recorded during reconciliation. The whole
/// result is skipped; nothing is partially merged.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    pub message: String,
    pub target: Target,
    pub source_ref: Value,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskObject {
    /// Merge decisions keyed by the asset identity key (lowercased plain
    /// name, or lowercased effective name for web/db instances).
    pub task_assets: BTreeMap<String, TaskAsset>,
    pub errors: Vec<TaskError>,
    pub source_refs: Vec<Value>,
}

struct AssetRecord {
    props: AssetProps,
}

struct TaskAssetBuilder {
    record: usize,
    known: bool,
    has_new_assignment: bool,
    new_assignments: Vec<String>,
    checklists: BTreeMap<String, Vec<VettedChecklist>>,
    checklists_ignored: Vec<IgnoredChecklist>,
    source_refs: Vec<Value>,
}

impl TaskObject {
    /// Reconcile `parsed_results` against the supplied inventory.
    ///
    /// `api_assets` is consumed: assignment records are flattened into
    /// benchmark-id lists and newly assigned benchmarks are appended, so
    /// the inputs cannot be reused for another run.
    pub fn new(
        api_assets: Vec<ApiAsset>,
        api_stigs: Vec<ApiStig>,
        parsed_results: Vec<ParseResult>,
        options: &TaskOptions,
    ) -> Self {
        debug!(
            assets = api_assets.len(),
            stigs = api_stigs.len(),
            results = parsed_results.len(),
            "reconciling parsed results"
        );

        let mut records: Vec<AssetRecord> = api_assets
            .into_iter()
            .map(|asset| AssetRecord {
                props: asset.into(),
            })
            .collect();

        // run-local indexes; newly created assets are registered as they
        // appear so later results in the same batch resolve against them
        let mut name_index: HashMap<String, usize> = HashMap::new();
        let mut ckl_hostname_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            name_index.insert(record.props.name.to_lowercase(), i);
            if let Some(host) = record.props.metadata.get(metadata_keys::CKL_HOST_NAME) {
                ckl_hostname_index
                    .entry(host.to_lowercase())
                    .or_default()
                    .push(i);
            }
        }
        let benchmark_index: HashMap<String, Vec<String>> = api_stigs
            .into_iter()
            .map(|stig| (stig.benchmark_id, stig.revision_strs))
            .collect();

        let mut errors: Vec<TaskError> = Vec::new();
        let mut source_refs: Vec<Value> = Vec::new();
        let mut builders: BTreeMap<String, TaskAssetBuilder> = BTreeMap::new();

        for parsed in parsed_results {
            if !parsed.source_ref.is_null() {
                source_refs.push(parsed.source_ref.clone());
            }

            let meta = &parsed.target.metadata;
            let asset_name = match meta.get(metadata_keys::CKL_HOST_NAME) {
                None => parsed.target.name.clone(),
                Some(host) => format!(
                    "{host}-{}-{}",
                    meta.get(metadata_keys::CKL_WEB_DB_SITE)
                        .map(String::as_str)
                        .unwrap_or("NA"),
                    meta.get(metadata_keys::CKL_WEB_DB_INSTANCE)
                        .map(String::as_str)
                        .unwrap_or("NA"),
                ),
            };
            let map_key = asset_name.to_lowercase();

            let found = find_asset(&name_index, &ckl_hostname_index, &records, &parsed.target);
            if found.is_none() && !options.create_objects {
                warn!(host = %parsed.target.name, "unmatched target with createObjects disabled");
                errors.push(TaskError {
                    message: "Asset does not exist for target and createObjects is false"
                        .to_string(),
                    target: parsed.target,
                    source_ref: parsed.source_ref,
                });
                continue;
            }

            if !builders.contains_key(&map_key) {
                let (record, known) = match found {
                    Some(index) => (index, true),
                    None => {
                        let props = AssetProps::from_target(
                            &parsed.target,
                            asset_name.clone(),
                            &options.collection_id,
                        );
                        records.push(AssetRecord { props });
                        let index = records.len() - 1;
                        name_index.insert(map_key.clone(), index);
                        if let Some(host) = meta.get(metadata_keys::CKL_HOST_NAME) {
                            ckl_hostname_index
                                .entry(host.to_lowercase())
                                .or_default()
                                .push(index);
                        }
                        debug!(name = %asset_name, "created asset for unmatched target");
                        (index, false)
                    }
                };
                builders.insert(
                    map_key.clone(),
                    TaskAssetBuilder {
                        record,
                        known,
                        has_new_assignment: false,
                        new_assignments: Vec::new(),
                        checklists: BTreeMap::new(),
                        checklists_ignored: Vec::new(),
                        source_refs: Vec::new(),
                    },
                );
            }
            let builder = builders
                .get_mut(&map_key)
                .expect("builder inserted above");
            if !parsed.source_ref.is_null() {
                builder.source_refs.push(parsed.source_ref.clone());
            }

            for checklist in parsed.checklists {
                let installed = match benchmark_index.get(&checklist.benchmark_id) {
                    Some(revisions) => match (&checklist.revision_str, options.strict_revision_check)
                    {
                        (Some(revision), true) => revisions.contains(revision),
                        _ => true,
                    },
                    None => false,
                };
                if !installed {
                    builder.checklists_ignored.push(IgnoredChecklist {
                        checklist,
                        ignored: "Not installed".to_string(),
                    });
                    continue;
                }

                let props = &mut records[builder.record].props;
                if props.stigs.contains(&checklist.benchmark_id) {
                    let new_assignment = builder.new_assignments.contains(&checklist.benchmark_id);
                    builder
                        .checklists
                        .entry(checklist.benchmark_id.clone())
                        .or_default()
                        .push(VettedChecklist {
                            checklist,
                            new_assignment,
                        });
                } else if options.create_objects {
                    builder.has_new_assignment = true;
                    builder
                        .new_assignments
                        .push(checklist.benchmark_id.clone());
                    props.stigs.push(checklist.benchmark_id.clone());
                    builder
                        .checklists
                        .entry(checklist.benchmark_id.clone())
                        .or_default()
                        .push(VettedChecklist {
                            checklist,
                            new_assignment: true,
                        });
                } else {
                    builder.checklists_ignored.push(IgnoredChecklist {
                        checklist,
                        ignored: "STIG not assigned to Asset and createObjects is false."
                            .to_string(),
                    });
                }
            }
        }

        // each builder owns exactly one record: identity keys and record
        // names correspond one to one
        let mut records: Vec<Option<AssetRecord>> = records.into_iter().map(Some).collect();
        let task_assets = builders
            .into_iter()
            .map(|(key, builder)| {
                let record = records[builder.record]
                    .take()
                    .expect("one record per task asset");
                (
                    key,
                    TaskAsset {
                        known_asset: builder.known,
                        asset_props: record.props,
                        has_new_assignment: builder.has_new_assignment,
                        new_assignments: builder.new_assignments,
                        checklists: builder.checklists,
                        checklists_ignored: builder.checklists_ignored,
                        source_refs: builder.source_refs,
                    },
                )
            })
            .collect();

        TaskObject {
            task_assets,
            errors,
            source_refs,
        }
    }
}

/// Resolve a parsed target to an inventory record.
///
/// Plain targets match by case-insensitive name. Web/db targets match by
/// `cklHostName` plus site/instance metadata, and additionally require the
/// synthesized effective name to exist in the name registry — metadata
/// agreement alone is not sufficient.
fn find_asset(
    name_index: &HashMap<String, usize>,
    ckl_hostname_index: &HashMap<String, Vec<usize>>,
    records: &[AssetRecord],
    target: &Target,
) -> Option<usize> {
    let meta = &target.metadata;
    let Some(host) = meta.get(metadata_keys::CKL_HOST_NAME) else {
        return name_index.get(&target.name.to_lowercase()).copied();
    };

    let candidates = ckl_hostname_index.get(&host.to_lowercase())?;
    let site = meta
        .get(metadata_keys::CKL_WEB_DB_SITE)
        .map(|s| s.to_lowercase());
    let instance = meta
        .get(metadata_keys::CKL_WEB_DB_INSTANCE)
        .map(|s| s.to_lowercase());
    candidates.iter().copied().find(|&i| {
        let m = &records[i].props.metadata;
        m.get(metadata_keys::CKL_WEB_DB_INSTANCE)
            .map(|s| s.to_lowercase())
            == instance
            && m.get(metadata_keys::CKL_WEB_DB_SITE).map(|s| s.to_lowercase()) == site
    })?;

    let effective_name = format!(
        "{host}-{}-{}",
        site.as_deref().unwrap_or("NA"),
        instance.as_deref().unwrap_or("NA"),
    )
    .to_lowercase();
    name_index.get(&effective_name).copied()
}
