//! Fatal parse errors shared by the three document parsers.
//!
//! Each variant's `Display` text is part of the public contract: callers
//! historically branch on these exact strings, so they are reproduced
//! verbatim. Soft (accumulated) errors are plain strings carried on
//! `ParseResult::errors` and `TaskObject::errors` instead.

/// Structural violation that makes a whole document unusable.
///
/// Returned by `reviews_from_ckl`, `reviews_from_cklb` and
/// `reviews_from_xccdf`; any one of these aborts the entire parse of the
/// offending document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A mandatory element is absent. The payload is the dotted path used
    /// in the message, e.g. `CHECKLIST` or `Benchmark.TestResult.target`.
    #[error("No {0} element")]
    MissingElement(&'static str),

    /// The document has no resolvable host name.
    #[error("No host_name in {0}")]
    MissingHostName(&'static str),

    #[error("Asset hostname cannot be more than 255 characters")]
    HostNameTooLong,

    /// No iSTIG block yielded a benchmark identifier.
    #[error("STIG_INFO element has no SI_DATA for SID_NAME == stigId")]
    MissingStigId,

    /// CKLB text was not valid JSON.
    #[error("Cannot parse as JSON")]
    Json(#[source] serde_json::Error),

    /// CKLB document failed shape validation.
    #[error("Invalid CKLB object: {0}")]
    InvalidCklb(&'static str),

    /// CKLB `stigs` array produced no checklists.
    #[error("stigs array is empty")]
    EmptyStigs,

    /// XCCDF `<target>` element carried no value.
    #[error("No value for <target>")]
    EmptyTarget,

    /// Standalone `<TestResult>` whose `<benchmark>` reference cannot be
    /// resolved to the expected namespaced form.
    #[error("TestResult.benchmark has no attribute starting with xccdf_mil.disa.stig_benchmark_")]
    UnresolvableBenchmark,

    /// The XML tokenizer rejected the document.
    #[error("Invalid XML: {0}")]
    Xml(String),
}
