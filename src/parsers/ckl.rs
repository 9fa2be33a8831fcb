//! DISA Checklist (CKL) XML parser.
//!
//! A CKL records per-rule assessment results for one host against one or
//! more STIGs (`iSTIG` blocks). Evaluate-STIG embeds provenance as XML
//! comments at three levels: document (tool identity), iSTIG (module and
//! scan time), and VULN (answer-file overrides). Checklist-level fields
//! override document-level fields; without a document-level comment there
//! is no result engine at all, even when iSTIG comments exist.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::ParseError;
use crate::models::asset::{metadata_keys, Target};
use crate::models::options::{FieldSettings, ImportOptions, UnreviewedPolicy};
use crate::models::result_engine::{CheckContent, EngineType, Override, ResultEngine};
use crate::models::review::{
    Checklist, ChecklistStats, Metadata, ParseResult, Review, ReviewResult,
};
use crate::parsers::status::best_status_for_review;
use crate::parsers::xml::{parse_document, Element};
use crate::parsers::{
    module_location, normalize_rule_id, populate_field, truncate_string, BENCHMARK_ID_PREFIX,
    EMPTY_COMMENT_PLACEHOLDER, EMPTY_DETAIL_PLACEHOLDER, EVAL_STIG_SENTINEL, MAX_STRING_LEN,
};

/// Map a CKL STATUS token to the canonical result. Unmapped tokens drop the
/// review.
fn ckl_result(raw: &str) -> Option<ReviewResult> {
    match raw {
        "NotAFinding" => Some(ReviewResult::Pass),
        "Open" => Some(ReviewResult::Fail),
        "Not_Applicable" => Some(ReviewResult::Notapplicable),
        "Not_Reviewed" => Some(ReviewResult::Notchecked),
        _ => None,
    }
}

/// Parse a CKL document into a normalized [`ParseResult`].
pub fn reviews_from_ckl(
    data: &str,
    field_settings: &FieldSettings,
    allow_accept: bool,
    import_options: &ImportOptions,
    source_ref: Value,
) -> Result<ParseResult, ParseError> {
    let doc = parse_document(data)?;
    let root = doc
        .root_named("CHECKLIST")
        .ok_or(ParseError::MissingElement("CHECKLIST"))?;
    let asset = root
        .child("ASSET")
        .ok_or(ParseError::MissingElement("ASSET"))?;
    let stigs = root
        .child("STIGS")
        .ok_or(ParseError::MissingElement("STIGS"))?;

    let mut errors = Vec::new();
    let root_engine = root_engine_from_comments(&doc.comments, &mut errors);

    let target = target_from_asset(asset);
    if target.name.is_empty() {
        return Err(ParseError::MissingHostName("ASSET"));
    }
    if target.name.chars().count() > MAX_STRING_LEN {
        return Err(ParseError::HostNameTooLong);
    }

    let mut parser = CklParser {
        field_settings,
        allow_accept,
        import_options,
        source_ref: source_ref.clone(),
        root_engine,
        errors,
    };

    let mut checklists = Vec::new();
    for istig in stigs.children("iSTIG") {
        if let Some(checklist) = parser.checklist_from_istig(istig) {
            checklists.push(checklist);
        }
    }
    if checklists.is_empty() {
        return Err(ParseError::MissingStigId);
    }

    debug!(
        host = %target.name,
        checklists = checklists.len(),
        soft_errors = parser.errors.len(),
        "parsed CKL document"
    );
    Ok(ParseResult {
        target,
        checklists,
        source_ref,
        errors: parser.errors,
    })
}

struct CklParser<'a> {
    field_settings: &'a FieldSettings,
    allow_accept: bool,
    import_options: &'a ImportOptions,
    source_ref: Value,
    root_engine: Option<ResultEngine>,
    errors: Vec<String>,
}

impl CklParser<'_> {
    fn checklist_from_istig(&mut self, istig: &Element) -> Option<Checklist> {
        let stig_info = istig.child("STIG_INFO")?;

        let benchmark_id = truncate_string(
            &si_data(stig_info, "stigid")?.replacen(BENCHMARK_ID_PREFIX, "", 1),
            MAX_STRING_LEN,
        );
        if benchmark_id.is_empty() {
            return None;
        }

        let version = si_data(stig_info, "version").and_then(leading_digits);
        let release = si_data(stig_info, "releaseinfo").and_then(release_token);
        let revision_str = match (version, release) {
            (Some(v), Some(r)) => Some(format!("V{v}R{r}")),
            _ => None,
        };

        let istig_engine = self.istig_engine_from_comments(&istig.comments);

        let mut reviews = Vec::new();
        let mut stats = ChecklistStats::default();
        for vuln in istig.children("VULN") {
            if let Some(review) = self.generate_review(vuln, istig_engine.as_ref()) {
                stats.increment(review.result);
                reviews.push(review);
            }
        }

        Some(Checklist {
            benchmark_id,
            revision_str,
            reviews,
            stats,
            source_ref: self.source_ref.clone(),
        })
    }

    fn generate_review(&mut self, vuln: &Element, istig_engine: Option<&IstigEngine>) -> Option<Review> {
        let mut result = ckl_result(vuln.child_text("STATUS").unwrap_or(""))?;
        let raw_rule_id = vuln
            .children("STIG_DATA")
            .find(|d| d.child_text("VULN_ATTRIBUTE") == Some("Rule_ID"))
            .and_then(|d| d.child_text("ATTRIBUTE_DATA"))
            .filter(|id| !id.is_empty())?;
        let rule_id = normalize_rule_id(raw_rule_id);

        let detail_raw = vuln.child_text("FINDING_DETAILS").unwrap_or("");
        let comment_raw = vuln.child_text("COMMENTS").unwrap_or("");
        let has_comments = !detail_raw.is_empty() || !comment_raw.is_empty();

        if result == ReviewResult::Notchecked {
            result = match self.import_options.unreviewed {
                UnreviewedPolicy::Never => return None,
                UnreviewedPolicy::Commented => {
                    if !has_comments {
                        return None;
                    }
                    self.import_options.unreviewed_commented
                }
                UnreviewedPolicy::Always => {
                    if has_comments {
                        self.import_options.unreviewed_commented
                    } else {
                        ReviewResult::Notchecked
                    }
                }
            };
        }

        let detail = populate_field(
            detail_raw,
            self.import_options.empty_detail,
            EMPTY_DETAIL_PLACEHOLDER,
        );
        let comment = populate_field(
            comment_raw,
            self.import_options.empty_comment,
            EMPTY_COMMENT_PLACEHOLDER,
        );

        let result_engine = match &self.root_engine {
            Some(root) => {
                let mut engine = root.clone();
                if let Some(istig) = istig_engine {
                    engine.time = istig.time.clone();
                    engine.check_content = Some(istig.check_content.clone());
                }
                let overrides = self.overrides_from_vuln_comments(vuln, &rule_id, result);
                if !overrides.is_empty() {
                    engine.overrides = Some(overrides);
                }
                Some(engine)
            }
            None => None,
        };

        let mut review = Review {
            rule_id,
            result,
            detail,
            comment,
            result_engine,
            status: None,
        };
        review.status = best_status_for_review(
            &review,
            self.import_options,
            self.field_settings,
            self.allow_accept,
        );
        Some(review)
    }

    /// Evaluate-STIG comments directly inside an iSTIG supply the scan time
    /// and the module check-content location for that checklist.
    fn istig_engine_from_comments(&mut self, comments: &[String]) -> Option<IstigEngine> {
        let mut engine = None;
        for comment in comments {
            if !comment.starts_with(EVAL_STIG_SENTINEL) {
                continue;
            }
            let payload = match parse_eval_stig(comment) {
                Ok(p) => p,
                Err(_) => {
                    self.errors.push(format!(
                        "Failed to parse Evaluate-STIG ISTIG XML comment  {comment}"
                    ));
                    EvalStigPayload::default()
                }
            };
            engine = Some(IstigEngine {
                time: payload.time,
                check_content: CheckContent {
                    location: Some(module_location(
                        payload.module_name.as_deref(),
                        payload.module_version.as_deref(),
                    )),
                    component: None,
                },
            });
        }
        engine
    }

    /// VULN-level Evaluate-STIG comments record answer-file overrides.
    fn overrides_from_vuln_comments(
        &mut self,
        vuln: &Element,
        rule_id: &str,
        new_result: ReviewResult,
    ) -> Vec<Override> {
        let mut overrides = Vec::new();
        for comment in &vuln.comments {
            if !comment.starts_with(EVAL_STIG_SENTINEL) {
                continue;
            }
            let payload = match parse_eval_stig(comment) {
                Ok(p) => p,
                Err(_) => {
                    self.errors.push(format!(
                        "Failed to parse Evaluate-STIG VULN XML comment for {rule_id}, comment: {comment}"
                    ));
                    EvalStigPayload::default()
                }
            };
            if payload
                .afmod
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            {
                overrides.push(Override {
                    authority: payload
                        .answer_file
                        .map(|a| truncate_string(&a, MAX_STRING_LEN)),
                    old_result: payload
                        .old_status
                        .as_deref()
                        .and_then(ckl_result)
                        .unwrap_or(ReviewResult::Unknown),
                    new_result,
                    remark: Some("Evaluate-STIG Answer File".to_string()),
                    time: None,
                });
            }
        }
        overrides
    }
}

struct IstigEngine {
    time: Option<String>,
    check_content: CheckContent,
}

/// SI_DATA value for the given SID_NAME within a STIG_INFO block.
fn si_data<'e>(stig_info: &'e Element, key: &str) -> Option<&'e str> {
    stig_info
        .children("SI_DATA")
        .find(|d| d.child_text("SID_NAME") == Some(key))
        .and_then(|d| d.child_text("SID_DATA"))
}

fn target_from_asset(asset: &Element) -> Target {
    let text = |name: &str| asset.child_text(name).filter(|t| !t.is_empty());

    let name = asset.child_text("HOST_NAME").unwrap_or("").to_string();
    let mut metadata = Metadata::new();
    if let Some(role) = text("ROLE") {
        metadata.insert(metadata_keys::CKL_ROLE.to_string(), role.to_string());
    }
    if let Some(area) = text("TECH_AREA") {
        metadata.insert(metadata_keys::CKL_TECH_AREA.to_string(), area.to_string());
    }
    if asset.child_text("WEB_OR_DATABASE") == Some("true") {
        metadata.insert(
            metadata_keys::CKL_WEB_OR_DATABASE.to_string(),
            "true".to_string(),
        );
        metadata.insert(metadata_keys::CKL_HOST_NAME.to_string(), name.clone());
        if let Some(site) = text("WEB_DB_SITE") {
            metadata.insert(metadata_keys::CKL_WEB_DB_SITE.to_string(), site.to_string());
        }
        if let Some(instance) = text("WEB_DB_INSTANCE") {
            metadata.insert(
                metadata_keys::CKL_WEB_DB_INSTANCE.to_string(),
                instance.to_string(),
            );
        }
    }

    Target {
        name,
        description: None,
        ip: text("HOST_IP").map(|v| truncate_string(v, MAX_STRING_LEN)),
        fqdn: text("HOST_FQDN").map(|v| truncate_string(v, MAX_STRING_LEN)),
        mac: text("HOST_MAC").map(|v| truncate_string(v, MAX_STRING_LEN)),
        noncomputing: asset.child_text("ASSET_TYPE") == Some("Non-Computing"),
        metadata,
    }
}

/// Document-level Evaluate-STIG comment establishes the engine identity.
/// The last sentinel comment wins when several are present.
fn root_engine_from_comments(comments: &[String], errors: &mut Vec<String>) -> Option<ResultEngine> {
    let mut engine = None;
    for comment in comments {
        if !comment.starts_with(EVAL_STIG_SENTINEL) {
            continue;
        }
        let payload = match parse_eval_stig(comment) {
            Ok(p) => p,
            Err(_) => {
                errors.push(format!(
                    "Failed to parse Evaluate-STIG root XML comment for {comment}"
                ));
                EvalStigPayload::default()
            }
        };
        let version = payload.global_version.or(payload.version);
        engine = Some(ResultEngine {
            engine_type: EngineType::Script,
            product: Some("Evaluate-STIG".to_string()),
            version: version.map(|v| truncate_string(&v, MAX_STRING_LEN)),
            time: payload.global_time,
            check_content: Some(CheckContent {
                location: Some(module_location(
                    payload.module_name.as_deref(),
                    payload.module_version.as_deref(),
                )),
                component: None,
            }),
            overrides: None,
        });
    }
    engine
}

/// Fields of an embedded `<Evaluate-STIG>` payload. Element names are
/// matched leniently (lowercased, first hyphen dropped), and only the first
/// `<global>`/`<module>` block is consulted.
#[derive(Debug, Default)]
struct EvalStigPayload {
    version: Option<String>,
    time: Option<String>,
    global_version: Option<String>,
    global_time: Option<String>,
    module_name: Option<String>,
    module_version: Option<String>,
    afmod: Option<String>,
    answer_file: Option<String>,
    old_status: Option<String>,
}

fn normalize_key(name: &str) -> String {
    name.to_lowercase().replacen('-', "", 1)
}

fn norm_child_text(element: &Element, key: &str) -> Option<String> {
    element
        .children
        .iter()
        .find(|c| normalize_key(&c.name) == key)
        .map(|c| c.text.clone())
        .filter(|t| !t.is_empty())
}

fn parse_eval_stig(comment: &str) -> Result<EvalStigPayload, ParseError> {
    let doc = parse_document(comment)?;
    let root = doc
        .root
        .filter(|r| normalize_key(&r.name) == "evaluatestig")
        .ok_or_else(|| ParseError::Xml("not an Evaluate-STIG payload".to_string()))?;

    let mut payload = EvalStigPayload::default();
    let mut seen_global = false;
    let mut seen_module = false;
    for child in &root.children {
        match normalize_key(&child.name).as_str() {
            "version" if payload.version.is_none() => {
                payload.version = Some(child.text.clone()).filter(|t| !t.is_empty());
            }
            "time" if payload.time.is_none() => {
                payload.time = Some(child.text.clone()).filter(|t| !t.is_empty());
            }
            "global" if !seen_global => {
                seen_global = true;
                payload.global_version = norm_child_text(child, "version");
                payload.global_time = norm_child_text(child, "time");
            }
            "module" if !seen_module => {
                seen_module = true;
                payload.module_name = norm_child_text(child, "name");
                payload.module_version = norm_child_text(child, "version");
            }
            "afmod" if payload.afmod.is_none() => {
                payload.afmod = Some(child.text.clone()).filter(|t| !t.is_empty());
            }
            "answerfile" if payload.answer_file.is_none() => {
                payload.answer_file = Some(child.text.clone()).filter(|t| !t.is_empty());
            }
            "oldstatus" if payload.old_status.is_none() => {
                payload.old_status = Some(child.text.clone()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }
    Ok(payload)
}

/// First run of digits in a version field.
fn leading_digits(s: &str) -> Option<String> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Release token from a `releaseinfo` field, e.g.
/// `Release: 5 Benchmark Date: 09 Nov 2022` yields `5`.
fn release_token(s: &str) -> Option<String> {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"Release:\s*(.+?)\s").expect("valid pattern"));
    re.captures(s).map(|c| c[1].to_string())
}
