//! Workflow-status derivation shared by all three parsers.

use crate::models::options::{
    AutoStatusValue, FieldSettings, ImportOptions, RequiredPolicy,
};
use crate::models::review::{Review, ReviewResult, ReviewStatus};

/// Compute the workflow status for a parsed review from the import policy
/// and the field-requirement policy. Pure function.
///
/// `None` means "assign no status at all": the review keeps whatever status
/// the destination system already has.
pub fn best_status_for_review(
    review: &Review,
    import_options: &ImportOptions,
    field_settings: &FieldSettings,
    allow_accept: bool,
) -> Option<ReviewStatus> {
    let setting = import_options.auto_status.resolve(review.result);

    match setting {
        AutoStatusValue::Null => return None,
        AutoStatusValue::Saved => return Some(ReviewStatus::Saved),
        AutoStatusValue::Submitted | AutoStatusValue::Accepted => {}
    }

    let detail_submittable = field_submittable(
        field_settings.detail.required,
        review.result,
        review.detail.as_deref(),
    );
    let comment_submittable = field_submittable(
        field_settings.comment.required,
        review.result,
        review.comment.as_deref(),
    );
    let result_submittable = matches!(
        review.result,
        ReviewResult::Pass | ReviewResult::Fail | ReviewResult::Notapplicable
    );

    let status = if detail_submittable && comment_submittable && result_submittable {
        match setting {
            AutoStatusValue::Accepted if allow_accept => ReviewStatus::Accepted,
            _ => ReviewStatus::Submitted,
        }
    } else {
        ReviewStatus::Saved
    };
    Some(status)
}

fn field_submittable(policy: RequiredPolicy, result: ReviewResult, value: Option<&str>) -> bool {
    let populated = value.is_some_and(|v| !v.is_empty());
    match policy {
        RequiredPolicy::Optional => true,
        RequiredPolicy::Findings => result != ReviewResult::Fail || populated,
        RequiredPolicy::Always => populated,
    }
}
