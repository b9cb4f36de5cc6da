//! Alternative-policy combinator (OR with first-reason semantics)

use super::{DenyReason, Policy, PolicyOutcome};
use crate::error::Result;
use std::future::Future;

/// Fold a raised denial signal into an ordinary denial. Faults pass through.
pub fn capture(result: Result<PolicyOutcome>) -> Result<PolicyOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(err) => match DenyReason::from_denial(&err) {
            Some(reason) => {
                tracing::debug!(code = err.code(), error = %err, "captured raised denial");
                Ok(PolicyOutcome::deny(reason))
            }
            None => Err(err),
        },
    }
}

/// Try `policies` in declaration order and allow on the first that passes.
///
/// Denials, returned or raised, are captured and the next policy is tried.
/// When all of them deny, the earliest supplied reason is reported, or
/// [`DenyReason::Denied`] if none supplied one. Faults abort immediately.
pub async fn evaluate_any<'p, F, Fut>(policies: &'p [Policy], mut check: F) -> Result<PolicyOutcome>
where
    F: FnMut(&'p Policy) -> Fut,
    Fut: Future<Output = Result<PolicyOutcome>>,
{
    let mut first_reason: Option<DenyReason> = None;

    for policy in policies {
        match capture(check(policy).await)? {
            PolicyOutcome::Allow => return Ok(PolicyOutcome::Allow),
            PolicyOutcome::Deny(reason) => {
                if first_reason.is_none() {
                    first_reason = reason;
                }
            }
        }
    }

    Ok(PolicyOutcome::deny(first_reason.unwrap_or(DenyReason::Denied)))
}
