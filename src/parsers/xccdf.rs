//! XCCDF result parser (SCC and other SCAP-compliant tools).
//!
//! Accepts either a `<Benchmark>` root containing a `<TestResult>`, or a
//! bare `<TestResult>` with a `<benchmark>` reference child. Engine
//! provenance is synthesized from the `test-system` identifier except for
//! self-produced documents (`stig-manager`, `evaluate-stig`), which embed a
//! pre-built `resultEngine` block inside `check-content`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::ParseError;
use crate::models::asset::Target;
use crate::models::options::{EmptyFieldPolicy, FieldSettings, ImportOptions, UnreviewedPolicy};
use crate::models::result_engine::{CheckContent, EngineType, Override, ResultEngine};
use crate::models::review::{
    Checklist, ChecklistStats, Metadata, ParseResult, Review, ReviewResult,
};
use crate::parsers::status::best_status_for_review;
use crate::parsers::xml::{parse_document, Element};
use crate::parsers::{
    truncate_string, BENCHMARK_ID_PREFIX, MAX_FIELD_LEN, MAX_RULE_ID_LEN, MAX_STRING_LEN,
    RULE_ID_PREFIX,
};

const CHECK_CONTENT_HREF_PREFIX: &str = "#scap_mil.disa.stig_comp_";
const CHECK_CONTENT_NAME_PREFIX: &str = "oval:mil.disa.stig.";

/// Reserved target-fact tag carrying canonical asset properties.
const ASSET_FACT_TAG: &str = "tag:stig-manager@users.noreply.github.com,2020:asset:";

fn cpe_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^cpe:(?:/|2\.3:)[aho]:(.*)").expect("valid pattern"))
}

/// Parse an XCCDF result document into a normalized [`ParseResult`].
///
/// `scap_benchmark_map` remaps alternate SCAP benchmark identifiers to
/// canonical STIG ids; pass an empty map when no remapping applies.
pub fn reviews_from_xccdf(
    data: &str,
    field_settings: &FieldSettings,
    allow_accept: bool,
    import_options: &ImportOptions,
    scap_benchmark_map: &HashMap<String, String>,
    source_ref: Value,
) -> Result<ParseResult, ParseError> {
    let doc = parse_document(data)?;
    let root = doc
        .root
        .as_ref()
        .filter(|r| r.name == "Benchmark" || r.name == "TestResult")
        .ok_or(ParseError::MissingElement("Benchmark or TestResult"))?;

    let (test_result, mut benchmark_id) = if root.name == "Benchmark" {
        let test_result = root
            .child("TestResult")
            .ok_or(ParseError::MissingElement("Benchmark.TestResult"))?;
        if test_result.child("target").is_none() {
            return Err(ParseError::MissingElement("Benchmark.TestResult.target"));
        }
        if test_result.child("rule-result").is_none() {
            return Err(ParseError::MissingElement(
                "Benchmark.TestResult.rule-result",
            ));
        }
        let benchmark_id = root
            .attr("id")
            .unwrap_or("")
            .replacen(BENCHMARK_ID_PREFIX, "", 1);
        (test_result, benchmark_id)
    } else {
        let benchmark = root
            .child("benchmark")
            .ok_or(ParseError::MissingElement("TestResult.benchmark"))?;
        if root.child("target").is_none() {
            return Err(ParseError::MissingElement("TestResult.target"));
        }
        if root.child("rule-result").is_none() {
            return Err(ParseError::MissingElement("TestResult.rule-result"));
        }
        let attr = [benchmark.attr("id"), benchmark.attr("href")]
            .into_iter()
            .flatten()
            .find(|v| v.starts_with(BENCHMARK_ID_PREFIX))
            .ok_or(ParseError::UnresolvableBenchmark)?;
        (root, attr.replacen(BENCHMARK_ID_PREFIX, "", 1))
    };

    // required by XCCDF 1.2 rev 4
    let default_result_time = test_result.attr("end-time").map(str::to_string);

    if let Some(mapped) = scap_benchmark_map.get(&benchmark_id) {
        benchmark_id = mapped.clone();
    }
    let benchmark_id = truncate_string(&benchmark_id, MAX_STRING_LEN);

    let mut target = target_from_test_result(test_result);
    if target.name.is_empty() {
        return Err(ParseError::EmptyTarget);
    }
    if target.name.chars().count() > MAX_STRING_LEN {
        return Err(ParseError::HostNameTooLong);
    }
    for field in [
        &mut target.description,
        &mut target.ip,
        &mut target.fqdn,
        &mut target.mac,
    ] {
        let value = field.take();
        *field = value.map(|v| {
            if v.is_empty() {
                v
            } else {
                truncate_string(&v, MAX_STRING_LEN)
            }
        });
    }

    // SCC binds a CPE WFN to the test-system URN; other tools use a plain
    // product:version pair
    let test_system = test_result.attr("test-system").unwrap_or("");
    let (product, version) = match cpe_pattern()
        .captures(test_system)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    {
        Some(wfn) => {
            let mut parts = wfn.split(':').skip(1);
            (parts.next(), parts.next())
        }
        None => {
            let mut parts = test_system.split(':');
            (parts.next(), parts.next())
        }
    };
    let engine_common = ResultEngine {
        engine_type: EngineType::Scap,
        product: product.map(|p| truncate_string(p, MAX_STRING_LEN)),
        version: version.map(|v| truncate_string(v, MAX_STRING_LEN)),
        time: None,
        check_content: None,
        overrides: None,
    };

    let parser = XccdfParser {
        field_settings,
        allow_accept,
        import_options,
        engine_common,
        default_result_time,
    };

    let mut reviews = Vec::new();
    let mut stats = ChecklistStats::default();
    for rule_result in test_result.children("rule-result") {
        if let Some(review) = parser.generate_review(rule_result) {
            stats.increment(review.result);
            reviews.push(review);
        }
    }

    debug!(
        host = %target.name,
        benchmark_id = %benchmark_id,
        reviews = reviews.len(),
        "parsed XCCDF document"
    );
    Ok(ParseResult {
        target,
        checklists: vec![Checklist {
            benchmark_id,
            revision_str: None,
            reviews,
            stats,
            source_ref: source_ref.clone(),
        }],
        source_ref,
        errors: Vec::new(),
    })
}

struct XccdfParser<'a> {
    field_settings: &'a FieldSettings,
    allow_accept: bool,
    import_options: &'a ImportOptions,
    engine_common: ResultEngine,
    default_result_time: Option<String>,
}

impl XccdfParser<'_> {
    fn generate_review(&self, rule_result: &Element) -> Option<Review> {
        let result_raw = rule_result.child_text("result").filter(|r| !r.is_empty())?;
        let rule_id = truncate_string(
            &rule_result
                .attr("idref")
                .unwrap_or("")
                .replacen(RULE_ID_PREFIX, "", 1),
            MAX_RULE_ID_LEN,
        );
        if rule_id.is_empty() {
            return None;
        }

        // anything that is not an actual compliance decision falls under the
        // unreviewed policy; XCCDF has no comment source, so `commented`
        // behaves like `never`
        let result = match ReviewResult::from_str(result_raw) {
            Some(r @ (ReviewResult::Pass | ReviewResult::Fail | ReviewResult::Notapplicable)) => r,
            _ => match self.import_options.unreviewed {
                UnreviewedPolicy::Never | UnreviewedPolicy::Commented => return None,
                UnreviewedPolicy::Always => ReviewResult::Notchecked,
            },
        };

        let check_content = rule_result
            .child("check")
            .and_then(|c| c.child("check-content"));
        let self_produced = matches!(
            self.engine_common.product.as_deref(),
            Some("stig-manager") | Some("evaluate-stig")
        );

        let result_engine = if self_produced {
            check_content
                .and_then(|cc| cc.child("resultEngine"))
                .map(embedded_result_engine)
        } else {
            Some(self.synthesized_engine(rule_result))
        };

        let engine = result_engine.as_ref();
        let undef = |v: Option<&str>| v.unwrap_or("undefined").to_string();
        let replacement_text = format!(
            "Result was reported by product \"{}\" version {} at {} using check content \"{}\"",
            undef(engine.and_then(|e| e.product.as_deref())),
            undef(engine.and_then(|e| e.version.as_deref())),
            undef(engine.and_then(|e| e.time.as_deref())),
            undef(
                engine
                    .and_then(|e| e.check_content.as_ref())
                    .and_then(|cc| cc.location.as_deref())
            ),
        );

        let mut detail = check_content
            .and_then(|cc| cc.child_text("detail"))
            .filter(|d| !d.is_empty())
            .or_else(|| rule_result.child_text("message").filter(|m| !m.is_empty()))
            .map(str::to_string);
        if detail.is_none() {
            detail = match self.import_options.empty_detail {
                EmptyFieldPolicy::Ignore => None,
                EmptyFieldPolicy::Import => Some(String::new()),
                EmptyFieldPolicy::Replace => Some(replacement_text.clone()),
            };
        }

        let mut comment = check_content
            .and_then(|cc| cc.child_text("comment"))
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if comment.is_none() {
            // Evaluate-STIG style documents carry the override remark as the
            // comment, concatenated onto detail for STIG Viewer display
            comment = check_content
                .and_then(|cc| cc.child("resultEngine"))
                .and_then(|re| re.children("overrides").next())
                .and_then(|o| o.child_text("remark"))
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            let trimmed = match (detail.as_deref(), comment.as_deref()) {
                (Some(d), Some(c)) if !d.is_empty() && d.ends_with(c) => {
                    Some(d[..d.len() - c.len()].trim().to_string())
                }
                _ => None,
            };
            if trimmed.is_some() {
                detail = trimmed;
            }
        }

        // re-truncate: the override remark may have been removed, but the
        // remaining detail can still exceed the cap
        let detail = detail.map(|d| truncate_string(&d, MAX_FIELD_LEN));
        if comment.is_none() {
            comment = match self.import_options.empty_comment {
                EmptyFieldPolicy::Ignore => None,
                EmptyFieldPolicy::Import => Some(String::new()),
                EmptyFieldPolicy::Replace => Some(replacement_text.clone()),
            };
        }
        let comment = comment.map(|c| truncate_string(&c, MAX_FIELD_LEN));

        // Evaluate-STIG answer-file remarks are normalized to a fixed
        // literal in the engine record (the original text lives in the
        // review comment)
        let mut result_engine = result_engine;
        if self.engine_common.product.as_deref() == Some("evaluate-stig") {
            if let Some(overrides) = result_engine
                .as_mut()
                .and_then(|e| e.overrides.as_mut())
            {
                for o in overrides {
                    o.remark = Some("Evaluate-STIG Answer File".to_string());
                }
            }
        }

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

    /// Engine record for tool-produced documents: identity from the
    /// test-system, time from the rule result (or the document end time),
    /// check content and overrides from the rule result.
    fn synthesized_engine(&self, rule_result: &Element) -> ResultEngine {
        let mut engine = self.engine_common.clone();
        let time_raw = rule_result
            .attr("time")
            .map(str::to_string)
            .or_else(|| self.default_result_time.clone());
        engine.time = Some(match time_raw {
            Some(raw) => to_iso_utc(&raw),
            None => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });

        if let Some(ccr) = rule_result
            .child("check")
            .and_then(|c| c.child("check-content-ref"))
        {
            let href = ccr
                .attr("href")
                .map(|h| h.replacen(CHECK_CONTENT_HREF_PREFIX, "", 1));
            let name = ccr.attr("name").map(|n| {
                truncate_string(&n.replacen(CHECK_CONTENT_NAME_PREFIX, "", 1), MAX_STRING_LEN)
            });
            let href_present = href.as_deref().is_some_and(|h| !h.is_empty());
            let name_present = name.as_deref().is_some_and(|n| !n.is_empty());
            if href_present || name_present {
                engine.check_content = Some(CheckContent {
                    location: href,
                    component: name,
                });
            }
        }

        let overrides: Vec<Override> = rule_result
            .children("override")
            .map(|o| Override {
                authority: o
                    .attr("authority")
                    .map(|a| truncate_string(a, MAX_STRING_LEN)),
                old_result: o
                    .child_text("old-result")
                    .and_then(ReviewResult::from_str)
                    .unwrap_or(ReviewResult::Unknown),
                new_result: o
                    .child_text("new-result")
                    .and_then(ReviewResult::from_str)
                    .unwrap_or(ReviewResult::Unknown),
                remark: o
                    .child_text("remark")
                    .map(|r| truncate_string(r, MAX_STRING_LEN)),
                time: None,
            })
            .collect();
        if !overrides.is_empty() {
            engine.overrides = Some(overrides);
        }

        engine
    }
}

/// Re-assemble a pre-built `resultEngine` block from a self-produced
/// document.
fn embedded_result_engine(element: &Element) -> ResultEngine {
    let text = |name: &str| {
        element
            .child_text(name)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    let engine_type = match element.child_text("type") {
        Some("scap") => EngineType::Scap,
        Some("script") => EngineType::Script,
        _ => EngineType::Other,
    };
    let check_content = element.child("checkContent").map(|cc| CheckContent {
        location: cc.child_text("location").map(str::to_string),
        component: cc
            .child_text("component")
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    });
    let overrides: Vec<Override> = element
        .children("overrides")
        .map(|o| Override {
            authority: o
                .child_text("authority")
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            old_result: o
                .child_text("oldResult")
                .and_then(ReviewResult::from_str)
                .unwrap_or(ReviewResult::Unknown),
            new_result: o
                .child_text("newResult")
                .and_then(ReviewResult::from_str)
                .unwrap_or(ReviewResult::Unknown),
            remark: o
                .child_text("remark")
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            time: o
                .child_text("time")
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        })
        .collect();

    ResultEngine {
        engine_type,
        product: text("product"),
        version: text("version"),
        time: text("time"),
        check_content,
        overrides: if overrides.is_empty() {
            None
        } else {
            Some(overrides)
        },
    }
}

fn target_from_test_result(test_result: &Element) -> Target {
    let mut target = Target {
        name: test_result
            .child_text("target")
            .unwrap_or("")
            .to_string(),
        description: Some(String::new()),
        ip: Some(
            test_result
                .child_text("target-address")
                .unwrap_or("")
                .to_string(),
        ),
        fqdn: None,
        mac: None,
        noncomputing: false,
        metadata: Metadata::new(),
    };

    let Some(facts) = test_result.child("target-facts") else {
        return target;
    };

    let mut metadata = Metadata::new();
    for fact in facts.children("fact") {
        let Some(name) = fact.attr("name") else {
            continue;
        };
        let value = fact.text.as_str();
        let Some(property) = name.strip_prefix(ASSET_FACT_TAG) else {
            metadata.insert(name.to_string(), value.to_string());
            continue;
        };
        if let Some(key) = property.strip_prefix("metadata:") {
            metadata.insert(decode_uri(key), value.to_string());
        } else {
            match property {
                "name" => target.name = value.to_string(),
                "description" => target.description = Some(value.to_string()),
                "fqdn" => target.fqdn = Some(value.to_string()),
                "ip" => target.ip = Some(value.to_string()),
                "mac" => target.mac = Some(value.to_string()),
                "noncomputing" => target.noncomputing = value == "true",
                _ => {}
            }
        }
    }
    target.metadata = metadata;
    target
}

/// Normalize a result timestamp to UTC ISO-8601 with millisecond precision.
/// Strings chrono cannot interpret pass through unchanged.
fn to_iso_utc(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Utc
            .from_utc_datetime(&naive)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    raw.to_string()
}

/// Percent-decoding for metadata fact keys. Invalid escape sequences are
/// left as-is.
fn decode_uri(s: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::options::{
        AutoStatus, AutoStatusValue, EmptyFieldPolicy, FieldSetting, RequiredPolicy,
    };
    use crate::models::review::ReviewStatus;

    const BENCHMARK: &str = include_str!("../../tests/fixtures/xccdf_benchmark.xml");
    const TEST_RESULT: &str = include_str!("../../tests/fixtures/xccdf_testresult.xml");
    const EVAL_STIG: &str = include_str!("../../tests/fixtures/xccdf_eval_stig.xml");

    fn import_options() -> ImportOptions {
        ImportOptions {
            auto_status: AutoStatus::Scalar(AutoStatusValue::Saved),
            unreviewed: UnreviewedPolicy::Never,
            unreviewed_commented: ReviewResult::Informational,
            empty_detail: EmptyFieldPolicy::Ignore,
            empty_comment: EmptyFieldPolicy::Ignore,
            allow_custom: true,
        }
    }

    fn field_settings() -> FieldSettings {
        FieldSettings {
            detail: FieldSetting {
                required: RequiredPolicy::Optional,
            },
            comment: FieldSetting {
                required: RequiredPolicy::Optional,
            },
        }
    }

    fn parse(data: &str, opts: &ImportOptions) -> ParseResult {
        reviews_from_xccdf(
            data,
            &field_settings(),
            true,
            opts,
            &HashMap::new(),
            Value::Null,
        )
        .unwrap()
    }

    #[test]
    fn benchmark_root_resolves_benchmark_id() {
        let result = parse(BENCHMARK, &import_options());
        assert_eq!(result.checklists.len(), 1);
        assert_eq!(result.checklists[0].benchmark_id, "MS_Windows_10_STIG");
        assert!(result.checklists[0].revision_str.is_none());
    }

    #[test]
    fn bare_test_result_resolves_benchmark_from_href() {
        let result = parse(TEST_RESULT, &import_options());
        assert_eq!(result.checklists[0].benchmark_id, "RHEL_9_STIG");
        assert_eq!(result.target.name, "rhel9-app-01");
    }

    #[test]
    fn scap_benchmark_map_remaps_ids() {
        let mut map = HashMap::new();
        map.insert(
            "MS_Windows_10_STIG".to_string(),
            "Windows_10_Canonical".to_string(),
        );
        let result = reviews_from_xccdf(
            BENCHMARK,
            &field_settings(),
            true,
            &import_options(),
            &map,
            Value::Null,
        )
        .unwrap();
        assert_eq!(result.checklists[0].benchmark_id, "Windows_10_Canonical");
    }

    #[test]
    fn target_facts_populate_fields_and_metadata() {
        let result = parse(BENCHMARK, &import_options());
        let target = &result.target;
        assert_eq!(target.name, "WIN10-TEST-01");
        assert_eq!(target.fqdn.as_deref(), Some("win10-test-01.example.mil"));
        assert!(!target.noncomputing);
        assert_eq!(
            target.metadata.get("cklRole").map(String::as_str),
            Some("Member Server")
        );
        // non-reserved facts land in metadata verbatim
        assert_eq!(
            target
                .metadata
                .get("urn:scap:fact:asset:identifier:ipv4")
                .map(String::as_str),
            Some("10.20.30.40")
        );
    }

    #[test]
    fn cpe_test_system_yields_product_and_version() {
        let result = parse(BENCHMARK, &import_options());
        let engine = result.checklists[0].reviews[0]
            .result_engine
            .as_ref()
            .unwrap();
        assert_eq!(engine.engine_type, EngineType::Scap);
        assert_eq!(engine.product.as_deref(), Some("scc"));
        assert_eq!(engine.version.as_deref(), Some("5.5"));
    }

    #[test]
    fn plain_test_system_splits_on_colon() {
        let result = parse(TEST_RESULT, &import_options());
        let engine = result.checklists[0].reviews[0]
            .result_engine
            .as_ref()
            .unwrap();
        assert_eq!(engine.product.as_deref(), Some("PAAuditEngine"));
        assert_eq!(engine.version.as_deref(), Some("6.5.3"));
    }

    #[test]
    fn per_result_time_is_normalized_to_utc() {
        let result = parse(BENCHMARK, &import_options());
        let engine = result.checklists[0].reviews[0]
            .result_engine
            .as_ref()
            .unwrap();
        assert_eq!(engine.time.as_deref(), Some("2022-06-03T16:19:20.000Z"));
    }

    #[test]
    fn missing_result_time_falls_back_to_end_time() {
        let result = parse(BENCHMARK, &import_options());
        // second rule-result has no time attribute
        let engine = result.checklists[0].reviews[1]
            .result_engine
            .as_ref()
            .unwrap();
        assert_eq!(engine.time.as_deref(), Some("2022-06-03T16:19:27.000Z"));
    }

    #[test]
    fn check_content_ref_is_stripped_and_attached() {
        let result = parse(BENCHMARK, &import_options());
        let engine = result.checklists[0].reviews[0]
            .result_engine
            .as_ref()
            .unwrap();
        let cc = engine.check_content.as_ref().unwrap();
        assert_eq!(cc.location.as_deref(), Some("Windows_10_STIG"));
        assert_eq!(cc.component.as_deref(), Some("win10:def:42"));
    }

    #[test]
    fn overrides_are_collected_from_rule_results() {
        let result = parse(BENCHMARK, &import_options());
        let engine = result.checklists[0].reviews[1]
            .result_engine
            .as_ref()
            .unwrap();
        let overrides = engine.overrides.as_ref().unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].authority.as_deref(), Some("reviewer"));
        assert_eq!(overrides[0].old_result, ReviewResult::Fail);
        assert_eq!(overrides[0].new_result, ReviewResult::Pass);
        assert_eq!(overrides[0].remark.as_deref(), Some("Approved exception"));
    }

    #[test]
    fn message_text_becomes_detail() {
        let result = parse(BENCHMARK, &import_options());
        assert_eq!(
            result.checklists[0].reviews[1].detail.as_deref(),
            Some("Registry value missing")
        );
    }

    #[test]
    fn rule_ids_are_stripped_of_namespace_prefix() {
        let result = parse(BENCHMARK, &import_options());
        assert_eq!(
            result.checklists[0].reviews[0].rule_id,
            "SV-220697r569187_rule"
        );
    }

    #[test]
    fn unreviewed_never_drops_non_compliance_results() {
        let result = parse(BENCHMARK, &import_options());
        // notchecked rule-result dropped
        assert_eq!(result.checklists[0].stats.total(), 2);
        assert_eq!(result.checklists[0].stats.notchecked, 0);
    }

    #[test]
    fn unreviewed_always_relabels_to_notchecked() {
        let mut opts = import_options();
        opts.unreviewed = UnreviewedPolicy::Always;
        let result = parse(BENCHMARK, &opts);
        assert_eq!(result.checklists[0].stats.notchecked, 1);
        assert_eq!(result.checklists[0].stats.total(), 3);
        // relabeled reviews never reach submitted
        let nc = result.checklists[0]
            .reviews
            .iter()
            .find(|r| r.result == ReviewResult::Notchecked)
            .unwrap();
        assert_eq!(nc.status, Some(ReviewStatus::Saved));
    }

    #[test]
    fn replace_policy_synthesizes_provenance_text() {
        let mut opts = import_options();
        opts.empty_detail = EmptyFieldPolicy::Replace;
        let result = parse(BENCHMARK, &opts);
        let detail = result.checklists[0].reviews[0].detail.as_deref().unwrap();
        assert_eq!(
            detail,
            "Result was reported by product \"scc\" version 5.5 at \
             2022-06-03T16:19:20.000Z using check content \"Windows_10_STIG\""
        );
    }

    #[test]
    fn eval_stig_document_uses_embedded_engine() {
        let result = parse(EVAL_STIG, &import_options());
        let review = &result.checklists[0].reviews[0];
        let engine = review.result_engine.as_ref().unwrap();
        assert_eq!(engine.engine_type, EngineType::Script);
        assert_eq!(engine.product.as_deref(), Some("Evaluate-STIG"));
        assert_eq!(engine.version.as_deref(), Some("1.2310.1"));
        assert_eq!(
            engine.check_content.as_ref().unwrap().location.as_deref(),
            Some("Scan-RHEL9:1.2")
        );
    }

    #[test]
    fn eval_stig_override_remark_becomes_comment_and_is_normalized() {
        let result = parse(EVAL_STIG, &import_options());
        let review = &result.checklists[0].reviews[0];
        // the remark moves into the comment and is trimmed off the detail
        assert_eq!(review.comment.as_deref(), Some("Approved per answer file"));
        assert_eq!(review.detail.as_deref(), Some("Checked by module."));
        // the engine record gets the fixed literal
        let overrides = review
            .result_engine
            .as_ref()
            .unwrap()
            .overrides
            .as_ref()
            .unwrap();
        assert_eq!(
            overrides[0].remark.as_deref(),
            Some("Evaluate-STIG Answer File")
        );
        assert_eq!(overrides[0].old_result, ReviewResult::Fail);
        assert_eq!(overrides[0].new_result, ReviewResult::Notapplicable);
    }

    #[test]
    fn missing_root_is_fatal() {
        let err = reviews_from_xccdf(
            "<Other/>",
            &field_settings(),
            true,
            &import_options(),
            &HashMap::new(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No Benchmark or TestResult element");
    }

    #[test]
    fn benchmark_without_test_result_is_fatal() {
        let err = reviews_from_xccdf(
            "<Benchmark id=\"b\"/>",
            &field_settings(),
            true,
            &import_options(),
            &HashMap::new(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No Benchmark.TestResult element");
    }

    #[test]
    fn test_result_without_target_is_fatal() {
        let err = reviews_from_xccdf(
            "<Benchmark id=\"b\"><TestResult><rule-result/></TestResult></Benchmark>",
            &field_settings(),
            true,
            &import_options(),
            &HashMap::new(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No Benchmark.TestResult.target element");
    }

    #[test]
    fn bare_test_result_without_benchmark_is_fatal() {
        let err = reviews_from_xccdf(
            "<TestResult><target>t</target><rule-result/></TestResult>",
            &field_settings(),
            true,
            &import_options(),
            &HashMap::new(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No TestResult.benchmark element");
    }

    #[test]
    fn unresolvable_benchmark_reference_is_fatal() {
        let err = reviews_from_xccdf(
            "<TestResult><benchmark id=\"other\" href=\"other\"/>\
             <target>t</target><rule-result/></TestResult>",
            &field_settings(),
            true,
            &import_options(),
            &HashMap::new(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TestResult.benchmark has no attribute starting with xccdf_mil.disa.stig_benchmark_"
        );
    }

    #[test]
    fn empty_target_is_fatal() {
        let err = reviews_from_xccdf(
            "<Benchmark id=\"b\"><TestResult test-system=\"x:1\">\
             <target></target><rule-result/></TestResult></Benchmark>",
            &field_settings(),
            true,
            &import_options(),
            &HashMap::new(),
            Value::Null,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "No value for <target>");
    }

    #[test]
    fn scc_alias_matches_xccdf_parser() {
        let opts = import_options();
        let a = parse(BENCHMARK, &opts);
        let b = crate::parsers::reviews_from_scc(
            BENCHMARK,
            &field_settings(),
            true,
            &opts,
            &HashMap::new(),
            Value::Null,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn time_normalization_handles_offsets_and_naive_times() {
        assert_eq!(
            to_iso_utc("2022-06-03T12:19:27-04:00"),
            "2022-06-03T16:19:27.000Z"
        );
        assert_eq!(to_iso_utc("2022-06-03T16:19:27"), "2022-06-03T16:19:27.000Z");
        assert_eq!(to_iso_utc("not a date"), "not a date");
    }

    #[test]
    fn decode_uri_unescapes_percent_sequences() {
        assert_eq!(decode_uri("ckl%20Role"), "ckl Role");
        assert_eq!(decode_uri("plain"), "plain");
        assert_eq!(decode_uri("bad%2"), "bad%2");
    }
}
