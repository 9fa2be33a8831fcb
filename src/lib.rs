//! Normalization and reconciliation of compliance-scan artifacts.
//!
//! Three independent parsers turn DISA checklist documents (CKL XML, CKLB
//! JSON) and XCCDF/SCC result files into one canonical review/asset model,
//! applying the caller's import policies (unreviewed handling, empty-field
//! treatment, automatic status derivation) and extracting result-engine
//! provenance. A [`TaskObject`] run then reconciles any number of parsed
//! results against an existing inventory, deciding per result whether it
//! is a new asset, a new STIG assignment, a mergeable update, or must be
//! rejected or ignored.
//!
//! The crate performs no I/O: callers read documents and persist the
//! reconciled output themselves.

pub mod errors;
pub mod models;
pub mod parsers;
pub mod services;

pub use errors::ParseError;
pub use models::asset::{ApiAsset, ApiAssetStig, ApiStig, AssetProps, Target};
pub use models::options::{
    AutoStatus, AutoStatusValue, EmptyFieldPolicy, FieldSetting, FieldSettings, ImportOptions,
    RequiredPolicy, UnreviewedPolicy,
};
pub use models::result_engine::{CheckContent, EngineType, Override, ResultEngine};
pub use models::review::{
    Checklist, ChecklistStats, ParseResult, Review, ReviewResult, ReviewStatus,
};
pub use parsers::{
    best_status_for_review, reviews_from_ckl, reviews_from_cklb, reviews_from_scc,
    reviews_from_xccdf,
};
pub use services::task::{
    IgnoredChecklist, TaskAsset, TaskError, TaskObject, TaskOptions, VettedChecklist,
};
