use super::types::{SafetyInputs, SafetyStatus};

/// Each condition blocks deletion of the source branch on its own
pub fn evaluate_safety(inputs: &SafetyInputs) -> SafetyStatus {
    let mut blocking_reasons = Vec::new();
    if inputs.open_pull_requests > 0 {
        blocking_reasons.push(format!(
            "{} open pull request(s) still target the source branch",
            inputs.open_pull_requests
        ));
    }
    if inputs.branch_protected {
        blocking_reasons.push("source branch is protected or protection is unknown".to_string());
    }
    if inputs.workflow_mentions_remain {
        blocking_reasons.push("workflow files still reference the source branch".to_string());
    }
    SafetyStatus {
        safe_to_delete: blocking_reasons.is_empty(),
        blocking_reasons,
    }
}
