//! DISA Checklist JSON (CKLB) parser.
//!
//! CKLB is the JSON successor to CKL: same per-rule decision tables, field
//! names changed (`status` tokens lowercased, `finding_details`/`comments`,
//! `rule_id_src` with a `rule_id` fallback). Evaluate-STIG provenance comes
//! from `evaluate-stig` sub-objects at the root and per stig entry; the
//! merge precedence matches CKL, including the rule that a missing root
//! object means no result engine at all.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::ParseError;
use crate::models::asset::{metadata_keys, Target};
use crate::models::options::{FieldSettings, ImportOptions, UnreviewedPolicy};
use crate::models::result_engine::{CheckContent, EngineType, ResultEngine};
use crate::models::review::{
    Checklist, ChecklistStats, Metadata, ParseResult, Review, ReviewResult,
};
use crate::parsers::status::best_status_for_review;
use crate::parsers::{
    module_location, normalize_rule_id, populate_field, truncate_string, BENCHMARK_ID_PREFIX,
    EMPTY_COMMENT_PLACEHOLDER, EMPTY_DETAIL_PLACEHOLDER, MAX_STRING_LEN,
};

/// Map a CKLB status token to the canonical result. Tokens are lowercase in
/// the format; anything else drops the review.
fn cklb_result(raw: &str) -> Option<ReviewResult> {
    match raw {
        "not_a_finding" => Some(ReviewResult::Pass),
        "open" => Some(ReviewResult::Fail),
        "not_applicable" => Some(ReviewResult::Notapplicable),
        "not_reviewed" => Some(ReviewResult::Notchecked),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CklbDocument {
    target_data: CklbTargetData,
    stigs: Vec<CklbStig>,
    #[serde(rename = "evaluate-stig")]
    evaluate_stig: Option<CklbEvalStig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CklbTargetData {
    host_name: String,
    comments: Option<String>,
    ip_address: Option<String>,
    mac_address: Option<String>,
    fqdn: Option<String>,
    target_type: Option<String>,
    role: Option<String>,
    technology_area: Option<String>,
    is_web_database: Value,
    web_db_site: Option<String>,
    web_db_instance: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CklbStig {
    stig_id: Value,
    version: Value,
    release_info: Value,
    rules: Vec<CklbRule>,
    #[serde(rename = "evaluate-stig")]
    evaluate_stig: Option<CklbEvalStig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CklbRule {
    rule_id: Option<String>,
    rule_id_src: Option<String>,
    status: Option<String>,
    finding_details: Option<String>,
    comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CklbEvalStig {
    version: Option<String>,
    time: Option<String>,
    module: Option<CklbEvalStigModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CklbEvalStigModule {
    name: Option<String>,
    version: Option<String>,
}

/// JavaScript-style truthiness for loosely typed CKLB fields.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse a CKLB document into a normalized [`ParseResult`].
pub fn reviews_from_cklb(
    data: &str,
    field_settings: &FieldSettings,
    allow_accept: bool,
    import_options: &ImportOptions,
    source_ref: Value,
) -> Result<ParseResult, ParseError> {
    let raw: Value = serde_json::from_str(data).map_err(ParseError::Json)?;

    let host_name_present = raw
        .get("target_data")
        .and_then(|td| td.get("host_name"))
        .is_some_and(is_truthy);
    if !host_name_present {
        return Err(ParseError::InvalidCklb("No target_data.host_name found"));
    }
    if !raw.get("stigs").is_some_and(Value::is_array) {
        return Err(ParseError::InvalidCklb("No stigs array found"));
    }

    let doc: CklbDocument = serde_json::from_value(raw).map_err(ParseError::Json)?;

    let root_engine = doc.evaluate_stig.as_ref().map(|module| ResultEngine {
        engine_type: EngineType::Script,
        product: Some("Evaluate-STIG".to_string()),
        version: module
            .version
            .as_deref()
            .map(|v| truncate_string(v, MAX_STRING_LEN)),
        time: None,
        check_content: None,
        overrides: None,
    });

    let target = target_from_target_data(&doc.target_data);
    if target.name.is_empty() {
        return Err(ParseError::MissingHostName("target_data"));
    }
    if target.name.chars().count() > MAX_STRING_LEN {
        return Err(ParseError::HostNameTooLong);
    }

    let mut checklists = Vec::new();
    for stig in &doc.stigs {
        let benchmark_id = match stig.stig_id.as_str() {
            Some(id) => truncate_string(&id.replacen(BENCHMARK_ID_PREFIX, "", 1), MAX_STRING_LEN),
            None => String::new(),
        };
        if benchmark_id.is_empty() {
            continue;
        }

        let version = match &stig.version {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => "0".to_string(),
        };
        let release = stig
            .release_info
            .as_str()
            .and_then(release_token)
            .filter(|r| !r.is_empty());
        let revision_str = release.map(|r| format!("V{version}R{r}"));

        let istig_engine = stig.evaluate_stig.as_ref().map(|module| IstigEngine {
            time: module.time.clone(),
            check_content: CheckContent {
                location: Some(module_location(
                    module.module.as_ref().and_then(|m| m.name.as_deref()),
                    module.module.as_ref().and_then(|m| m.version.as_deref()),
                )),
                component: None,
            },
        });

        let mut reviews = Vec::new();
        let mut stats = ChecklistStats::default();
        for rule in &stig.rules {
            if let Some(review) = generate_review(
                rule,
                root_engine.as_ref(),
                istig_engine.as_ref(),
                field_settings,
                allow_accept,
                import_options,
            ) {
                stats.increment(review.result);
                reviews.push(review);
            }
        }

        checklists.push(Checklist {
            benchmark_id,
            revision_str,
            reviews,
            stats,
            source_ref: source_ref.clone(),
        });
    }

    if checklists.is_empty() {
        return Err(ParseError::EmptyStigs);
    }

    debug!(
        host = %target.name,
        checklists = checklists.len(),
        "parsed CKLB document"
    );
    Ok(ParseResult {
        target,
        checklists,
        source_ref,
        errors: Vec::new(),
    })
}

struct IstigEngine {
    time: Option<String>,
    check_content: CheckContent,
}

fn generate_review(
    rule: &CklbRule,
    root_engine: Option<&ResultEngine>,
    istig_engine: Option<&IstigEngine>,
    field_settings: &FieldSettings,
    allow_accept: bool,
    import_options: &ImportOptions,
) -> Option<Review> {
    let mut result = cklb_result(rule.status.as_deref().unwrap_or(""))?;

    // rule_id_src wins when present; STIG Viewer 3.2 exports only rule_id
    let raw_rule_id = match (&rule.rule_id_src, &rule.rule_id) {
        (Some(src), _) => src.as_str(),
        (None, Some(id)) => id.as_str(),
        (None, None) => return None,
    };
    if raw_rule_id.is_empty() {
        return None;
    }
    let rule_id = normalize_rule_id(raw_rule_id);

    let detail_raw = rule.finding_details.as_deref().unwrap_or("");
    let comment_raw = rule.comments.as_deref().unwrap_or("");
    let has_comments = !detail_raw.is_empty() || !comment_raw.is_empty();

    if result == ReviewResult::Notchecked {
        result = match import_options.unreviewed {
            UnreviewedPolicy::Never => return None,
            UnreviewedPolicy::Commented => {
                if !has_comments {
                    return None;
                }
                import_options.unreviewed_commented
            }
            UnreviewedPolicy::Always => {
                if has_comments {
                    import_options.unreviewed_commented
                } else {
                    ReviewResult::Notchecked
                }
            }
        };
    }

    let detail = populate_field(detail_raw, import_options.empty_detail, EMPTY_DETAIL_PLACEHOLDER);
    let comment = populate_field(
        comment_raw,
        import_options.empty_comment,
        EMPTY_COMMENT_PLACEHOLDER,
    );

    let result_engine = root_engine.map(|root| {
        let mut engine = root.clone();
        if let Some(istig) = istig_engine {
            engine.time = istig.time.clone();
            engine.check_content = Some(istig.check_content.clone());
        }
        engine
    });

    let mut review = Review {
        rule_id,
        result,
        detail,
        comment,
        result_engine,
        status: None,
    };
    review.status = best_status_for_review(&review, import_options, field_settings, allow_accept);
    Some(review)
}

fn target_from_target_data(td: &CklbTargetData) -> Target {
    let text = |value: &Option<String>| -> Option<String> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| truncate_string(v, MAX_STRING_LEN))
    };

    let mut metadata = Metadata::new();
    if let Some(role) = td.role.as_deref().filter(|v| !v.is_empty()) {
        metadata.insert(metadata_keys::CKL_ROLE.to_string(), role.to_string());
    }
    if let Some(area) = td.technology_area.as_deref().filter(|v| !v.is_empty()) {
        metadata.insert(metadata_keys::CKL_TECH_AREA.to_string(), area.to_string());
    }
    if is_truthy(&td.is_web_database) {
        metadata.insert(
            metadata_keys::CKL_WEB_OR_DATABASE.to_string(),
            "true".to_string(),
        );
        metadata.insert(
            metadata_keys::CKL_HOST_NAME.to_string(),
            td.host_name.clone(),
        );
        if let Some(site) = td.web_db_site.as_deref().filter(|v| !v.is_empty()) {
            metadata.insert(metadata_keys::CKL_WEB_DB_SITE.to_string(), site.to_string());
        }
        if let Some(instance) = td.web_db_instance.as_deref().filter(|v| !v.is_empty()) {
            metadata.insert(
                metadata_keys::CKL_WEB_DB_INSTANCE.to_string(),
                instance.to_string(),
            );
        }
    }

    Target {
        name: td.host_name.clone(),
        description: text(&td.comments),
        ip: text(&td.ip_address),
        fqdn: text(&td.fqdn),
        mac: text(&td.mac_address),
        noncomputing: td.target_type.as_deref() == Some("Non-Computing"),
        metadata,
    }
}

/// Release token from `release_info`, e.g.
/// `Release: 5 Benchmark Date: 09 Nov 2022` yields `5`.
fn release_token(s: &str) -> Option<String> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN
        .get_or_init(|| regex::Regex::new(r"Release:\s*(.+?)\s").expect("valid pattern"));
    re.captures(s).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::options::{
        AutoStatus, AutoStatusValue, EmptyFieldPolicy, FieldSetting, RequiredPolicy,
    };
    use crate::models::review::ReviewStatus;

    const BASIC: &str = include_str!("../../tests/fixtures/cklb_basic.cklb");
    const RESULT_ENGINE: &str = include_str!("../../tests/fixtures/cklb_result_engine.cklb");

    fn import_options() -> ImportOptions {
        ImportOptions {
            auto_status: AutoStatus::Scalar(AutoStatusValue::Saved),
            unreviewed: UnreviewedPolicy::Commented,
            unreviewed_commented: ReviewResult::Informational,
            empty_detail: EmptyFieldPolicy::Ignore,
            empty_comment: EmptyFieldPolicy::Ignore,
            allow_custom: true,
        }
    }

    fn field_settings() -> FieldSettings {
        FieldSettings {
            detail: FieldSetting {
                required: RequiredPolicy::Always,
            },
            comment: FieldSetting {
                required: RequiredPolicy::Findings,
            },
        }
    }

    fn parse(data: &str, opts: &ImportOptions) -> ParseResult {
        reviews_from_cklb(data, &field_settings(), true, opts, Value::Null).unwrap()
    }

    #[test]
    fn parses_target_from_target_data() {
        let result = parse(BASIC, &import_options());
        let target = &result.target;
        assert_eq!(target.name, "WIN10-TEST-01");
        assert_eq!(target.description.as_deref(), Some("Lab workstation"));
        assert_eq!(target.ip.as_deref(), Some("10.20.30.40"));
        assert_eq!(target.fqdn.as_deref(), Some("win10-test-01.example.mil"));
        assert!(!target.noncomputing);
        assert!(!target.metadata.contains_key("cklHostName"));
    }

    #[test]
    fn maps_lowercase_statuses() {
        let result = parse(BASIC, &import_options());
        let checklist = &result.checklists[0];
        let results: Vec<_> = checklist.reviews.iter().map(|r| r.result).collect();
        // not_reviewed with no comments is dropped; bogus status is dropped
        assert_eq!(
            results,
            vec![
                ReviewResult::Pass,
                ReviewResult::Fail,
                ReviewResult::Notapplicable,
            ]
        );
        assert_eq!(checklist.stats.total(), 3);
    }

    #[test]
    fn revision_str_uses_numeric_version() {
        let result = parse(BASIC, &import_options());
        assert_eq!(
            result.checklists[0].revision_str.as_deref(),
            Some("V2R5")
        );
    }

    #[test]
    fn falls_back_to_rule_id_with_suffix() {
        let mut opts = import_options();
        opts.unreviewed = UnreviewedPolicy::Always;
        let result = parse(BASIC, &opts);
        let review = result.checklists[0]
            .reviews
            .iter()
            .find(|r| r.result == ReviewResult::Notchecked)
            .unwrap();
        // sourced from rule_id, not rule_id_src
        assert_eq!(review.rule_id, "SV-220699r569189_rule");
    }

    #[test]
    fn rule_id_src_is_used_verbatim() {
        let result = parse(BASIC, &import_options());
        assert_eq!(
            result.checklists[0].reviews[0].rule_id,
            "SV-220697r569187_rule"
        );
    }

    #[test]
    fn statuses_follow_auto_status_policy() {
        let result = parse(BASIC, &import_options());
        for review in &result.checklists[0].reviews {
            assert_eq!(review.status, Some(ReviewStatus::Saved));
        }
    }

    #[test]
    fn no_root_evaluate_stig_means_no_result_engine() {
        let result = parse(BASIC, &import_options());
        for review in &result.checklists[0].reviews {
            assert!(review.result_engine.is_none());
        }
    }

    #[test]
    fn stig_module_overrides_root_engine() {
        let result = parse(RESULT_ENGINE, &import_options());
        let engine = result.checklists[0].reviews[0]
            .result_engine
            .as_ref()
            .unwrap();
        assert_eq!(engine.engine_type, EngineType::Script);
        assert_eq!(engine.product.as_deref(), Some("Evaluate-STIG"));
        assert_eq!(engine.version.as_deref(), Some("1.2310.1"));
        assert_eq!(engine.time.as_deref(), Some("2023-12-11T12:56:14.3576272-05:00"));
        assert_eq!(
            engine.check_content.as_ref().unwrap().location.as_deref(),
            Some("Scan-Windows10_Checks:1.2022.6.2")
        );
    }

    #[test]
    fn root_only_engine_has_no_check_content() {
        let result = parse(RESULT_ENGINE, &import_options());
        // second stig entry carries no evaluate-stig module
        let engine = result.checklists[1].reviews[0]
            .result_engine
            .as_ref()
            .unwrap();
        assert_eq!(engine.version.as_deref(), Some("1.2310.1"));
        assert!(engine.time.is_none());
        assert!(engine.check_content.is_none());
    }

    #[test]
    fn invalid_json_is_fatal() {
        let err = reviews_from_cklb(
            "{not json",
            &field_settings(),
            true,
            &import_options(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse as JSON");
    }

    #[test]
    fn missing_host_name_is_fatal() {
        let err = reviews_from_cklb(
            r#"{"target_data":{},"stigs":[]}"#,
            &field_settings(),
            true,
            &import_options(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid CKLB object: No target_data.host_name found"
        );
    }

    #[test]
    fn non_array_stigs_is_fatal() {
        let err = reviews_from_cklb(
            r#"{"target_data":{"host_name":"h"},"stigs":{}}"#,
            &field_settings(),
            true,
            &import_options(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid CKLB object: No stigs array found");
    }

    #[test]
    fn empty_stigs_array_is_fatal() {
        let err = reviews_from_cklb(
            r#"{"target_data":{"host_name":"h"},"stigs":[]}"#,
            &field_settings(),
            true,
            &import_options(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "stigs array is empty");
    }

    #[test]
    fn oversized_host_name_is_fatal() {
        let data = format!(
            r#"{{"target_data":{{"host_name":"{}"}},"stigs":[]}}"#,
            "h".repeat(256)
        );
        let err = reviews_from_cklb(&data, &field_settings(), true, &import_options(), Value::Null)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Asset hostname cannot be more than 255 characters"
        );
    }

    #[test]
    fn stig_entry_without_id_is_skipped() {
        let data = r#"{
            "target_data": {"host_name": "h"},
            "stigs": [
                {"stig_id": "", "rules": []},
                {"stig_id": "Real_STIG", "rules": [
                    {"rule_id_src": "SV-1_rule", "status": "open",
                     "finding_details": "d", "comments": ""}
                ]}
            ]
        }"#;
        let result = parse(data, &import_options());
        assert_eq!(result.checklists.len(), 1);
        assert_eq!(result.checklists[0].benchmark_id, "Real_STIG");
    }

    #[test]
    fn parsing_is_idempotent() {
        let opts = import_options();
        assert_eq!(parse(BASIC, &opts), parse(BASIC, &opts));
    }
}
