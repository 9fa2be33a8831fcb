//! Document parsers normalizing compliance-scan artifacts into the
//! canonical review/asset model.
//!
//! Three formats are supported: DISA Checklist XML (CKL), its JSON
//! successor (CKLB), and XCCDF result XML as produced by SCAP-compliant
//! tools. Each parser consumes one raw document plus the shared policy
//! objects and produces one [`crate::models::review::ParseResult`].

pub mod ckl;
pub mod cklb;
pub mod status;
mod xml;
pub mod xccdf;

pub use ckl::reviews_from_ckl;
pub use cklb::reviews_from_cklb;
pub use status::best_status_for_review;
pub use xccdf::reviews_from_xccdf;
/// SCC result files are a compatible XCCDF dialect.
pub use xccdf::reviews_from_xccdf as reviews_from_scc;

/// Schema caps applied during normalization.
pub(crate) const MAX_FIELD_LEN: usize = 32767;
pub(crate) const MAX_RULE_ID_LEN: usize = 45;
pub(crate) const MAX_STRING_LEN: usize = 255;

/// Namespace prefixes stripped from document identifiers.
pub(crate) const BENCHMARK_ID_PREFIX: &str = "xccdf_mil.disa.stig_benchmark_";
pub(crate) const RULE_ID_PREFIX: &str = "xccdf_mil.disa.stig_rule_";

/// Placeholders injected by the `replace` empty-field policy (CKL/CKLB).
pub(crate) const EMPTY_DETAIL_PLACEHOLDER: &str =
    "There is no detail provided for the assessment";
pub(crate) const EMPTY_COMMENT_PLACEHOLDER: &str =
    "There is no comment provided for the assessment";

/// Sentinel opening an embedded Evaluate-STIG provenance payload.
pub(crate) const EVAL_STIG_SENTINEL: &str = "<Evaluate-STIG>";

/// Cap a string at `max` characters, leaving shorter input untouched.
pub(crate) fn truncate_string(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// Normalize a checklist rule id for STIG Viewer 3.2 compatibility: append
/// the `_rule` suffix when missing, then cap at the schema limit. Callers
/// drop empty ids before getting here.
pub(crate) fn normalize_rule_id(raw: &str) -> String {
    let suffixed = if raw.ends_with("_rule") {
        raw.to_string()
    } else {
        format!("{raw}_rule")
    };
    truncate_string(&suffixed, MAX_RULE_ID_LEN)
}

/// Apply the empty-field policy to a review detail/comment source value.
/// A populated source is truncated to the schema cap regardless of policy.
pub(crate) fn populate_field(
    raw: &str,
    policy: crate::models::options::EmptyFieldPolicy,
    placeholder: &str,
) -> Option<String> {
    use crate::models::options::EmptyFieldPolicy::*;
    if !raw.is_empty() {
        return Some(truncate_string(raw, MAX_FIELD_LEN));
    }
    match policy {
        Ignore => None,
        Import => Some(String::new()),
        Replace => Some(placeholder.to_string()),
    }
}

/// Build a `name:version` check-content location, omitting the colon when
/// either half is missing and yielding an empty string when both are.
pub(crate) fn module_location(name: Option<&str>, version: Option<&str>) -> String {
    let name = name.unwrap_or("");
    let version = version.unwrap_or("");
    if !name.is_empty() && !version.is_empty() {
        format!("{name}:{version}")
    } else {
        format!("{name}{version}")
    }
}
