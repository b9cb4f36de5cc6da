//! Policy evaluation engine

use super::any::{capture, evaluate_any};
use super::args::{extract, extract_id};
use super::redact::Redactor;
use super::registry::{validate_policies, OperationRegistry};
use super::{
    CommunityScope, Decision, DenyReason, OwnerTarget, OwnershipBranch, Policy, PolicyContext,
    PolicyOutcome,
};
use crate::config::PolicyConfig;
use crate::domain::{CommunityPermission, EntityRef, OwnershipRef, Principal, ReferenceMatch};
use crate::error::{AppError, Result};
use crate::repository::{EntityRepository, MembershipRepository};
use crate::service::{
    has_global_permission, CommunityResolution, CommunityResolver, Ownership, OwnershipResolver,
    PermissionAggregator,
};
use crate::telemetry::metrics::{self, Gate};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Label used for policy lists evaluated outside the registry.
const AD_HOC_OPERATION: &str = "adHoc";

/// Evaluates declared policies against the read-only stores.
///
/// Holds no mutable state: every call reads roles, chains and owners fresh.
pub struct PolicyEngine<M: MembershipRepository, E: EntityRepository> {
    permissions: PermissionAggregator<M>,
    communities: CommunityResolver<E>,
    owners: OwnershipResolver<E>,
    registry: Arc<OperationRegistry>,
    config: PolicyConfig,
}

impl<M: MembershipRepository, E: EntityRepository> PolicyEngine<M, E> {
    pub fn new(
        memberships: Arc<M>,
        entities: Arc<E>,
        registry: Arc<OperationRegistry>,
        config: PolicyConfig,
    ) -> Self {
        Self {
            permissions: PermissionAggregator::new(memberships),
            communities: CommunityResolver::new(entities.clone()),
            owners: OwnershipResolver::new(entities),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn permissions(&self) -> &PermissionAggregator<M> {
        &self.permissions
    }

    pub fn communities(&self) -> &CommunityResolver<E> {
        &self.communities
    }

    pub fn owners(&self) -> &OwnershipResolver<E> {
        &self.owners
    }

    pub fn redactor(&self) -> Redactor<'_, M, E> {
        Redactor::new(self)
    }

    /// Require every policy in `policies` to pass.
    ///
    /// An empty list allows anyone. Otherwise a missing principal is denied
    /// before any policy runs. Store faults are logged and denied;
    /// misconfiguration is raised when strict and denied otherwise.
    pub async fn evaluate(
        &self,
        principal: Option<&Principal>,
        policies: &[Policy],
        args: &Value,
    ) -> Result<Decision> {
        self.decide_ad_hoc(principal, policies, args).await
    }

    /// OR over `policies`; see [`evaluate_any`].
    pub async fn evaluate_any(
        &self,
        principal: Option<&Principal>,
        policies: &[Policy],
        args: &Value,
    ) -> Result<Decision> {
        let combined = [Policy::Any(policies.to_vec())];
        self.decide_ad_hoc(principal, &combined, args).await
    }

    /// Evaluate the policies registered for `operation`.
    pub async fn evaluate_operation(
        &self,
        operation: &str,
        principal: Option<&Principal>,
        args: &Value,
    ) -> Result<Decision> {
        match self.registry.policies(operation) {
            Some(policies) => {
                self.decide(Gate::Operation, operation, principal, policies, args)
                    .await
            }
            None => self.misconfigured(
                Gate::Operation,
                operation,
                format!("Unknown operation '{}'", operation),
            ),
        }
    }

    /// Abort with `Unauthorized`/`Forbidden` unless `operation` is allowed.
    pub async fn enforce(
        &self,
        operation: &str,
        principal: Option<&Principal>,
        args: &Value,
    ) -> Result<()> {
        self.evaluate_operation(operation, principal, args)
            .await?
            .into_result()
    }

    /// Policy lists built outside the registry get the same checks it applies.
    async fn decide_ad_hoc(
        &self,
        principal: Option<&Principal>,
        policies: &[Policy],
        args: &Value,
    ) -> Result<Decision> {
        match validate_policies(AD_HOC_OPERATION, policies) {
            Ok(()) => {}
            Err(AppError::Misconfigured(message)) => {
                return self.misconfigured(Gate::Operation, AD_HOC_OPERATION, message)
            }
            Err(err) => return Err(err),
        }
        self.decide(Gate::Operation, AD_HOC_OPERATION, principal, policies, args)
            .await
    }

    pub(crate) async fn decide(
        &self,
        gate: Gate,
        operation: &str,
        principal: Option<&Principal>,
        policies: &[Policy],
        args: &Value,
    ) -> Result<Decision> {
        let start = Instant::now();
        let principal_id = principal.map(|p| p.id.to_string()).unwrap_or_default();

        let decision = match self.require_all(principal, policies, args).await {
            Ok(decision) => decision,
            Err(AppError::Misconfigured(message)) => {
                return self.misconfigured(gate, operation, message);
            }
            Err(err) => {
                tracing::error!(
                    operation,
                    principal_id = %principal_id,
                    code = err.code(),
                    error = %err,
                    "Policy evaluation failed, denying"
                );
                metrics::record_decision(gate, operation, "error", start.elapsed());
                return Ok(Decision::Deny(DenyReason::Denied));
            }
        };

        metrics::record_decision(gate, operation, decision.label(), start.elapsed());
        match &decision {
            Decision::Allow => {
                tracing::debug!(operation, principal_id = %principal_id, "allowed");
            }
            Decision::Deny(reason) => {
                tracing::info!(operation, principal_id = %principal_id, reason = %reason, "denied");
            }
        }
        Ok(decision)
    }

    fn misconfigured(&self, gate: Gate, operation: &str, message: String) -> Result<Decision> {
        tracing::error!(operation, %message, "Authorization misconfigured");
        metrics::record_decision(gate, operation, "error", std::time::Duration::ZERO);
        if self.config.strict_misconfiguration {
            Err(AppError::Misconfigured(message))
        } else {
            Ok(Decision::Deny(DenyReason::Denied))
        }
    }

    async fn require_all(
        &self,
        principal: Option<&Principal>,
        policies: &[Policy],
        args: &Value,
    ) -> Result<Decision> {
        if policies.is_empty() {
            return Ok(Decision::Allow);
        }
        let Some(principal) = principal else {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        };

        for policy in policies {
            let outcome = capture(self.check(principal, policy, args).await)?;
            if !outcome.is_allow() {
                return Ok(outcome.into());
            }
        }
        Ok(Decision::Allow)
    }

    /// Evaluate a single policy. Raised denials surface as `Err` here and
    /// are captured by the caller.
    pub fn check<'a>(
        &'a self,
        principal: &'a Principal,
        policy: &'a Policy,
        args: &'a Value,
    ) -> BoxFuture<'a, Result<PolicyOutcome>> {
        Box::pin(async move {
            if principal.is_admin() {
                return Ok(PolicyOutcome::Allow);
            }

            match policy {
                Policy::Authenticated => Ok(PolicyOutcome::Allow),
                Policy::Global(flag) => Ok(PolicyOutcome::allow_if(
                    has_global_permission(principal, *flag),
                    DenyReason::MissingGlobalPermission(*flag),
                )),
                Policy::Community { permission, scope } => {
                    self.check_community(principal, *permission, scope, args)
                        .await
                }
                Policy::Owner(target) => self.check_owner(principal, target, args).await,
                Policy::OwnOrAny(branch) => self.check_branch(principal, branch, args).await,
                Policy::Any(members) => {
                    evaluate_any(members, |member| self.check(principal, member, args)).await
                }
                Policy::All(members) => {
                    for member in members {
                        let outcome = capture(self.check(principal, member, args).await)?;
                        if !outcome.is_allow() {
                            return Ok(outcome);
                        }
                    }
                    Ok(PolicyOutcome::Allow)
                }
                Policy::Custom(custom) => {
                    let ctx = PolicyContext { principal, args };
                    custom.check(&ctx).await
                }
            }
        })
    }

    async fn check_community(
        &self,
        principal: &Principal,
        permission: CommunityPermission,
        scope: &CommunityScope,
        args: &Value,
    ) -> Result<PolicyOutcome> {
        let Some(id) = extract_id(args, &scope.path) else {
            return Ok(missing_argument(&scope.path));
        };

        match self
            .communities
            .resolve_community(EntityRef::new(scope.kind, id))
            .await?
        {
            CommunityResolution::Scoped(community_id) => {
                let granted = self
                    .permissions
                    .has_community_permission(principal.id, community_id, permission)
                    .await?;
                Ok(PolicyOutcome::allow_if(
                    granted,
                    DenyReason::MissingCommunityPermission(permission),
                ))
            }
            CommunityResolution::Unscoped => Ok(PolicyOutcome::deny(DenyReason::NoCommunityScope)),
            CommunityResolution::NotFound => Ok(PolicyOutcome::deny(DenyReason::TargetNotFound)),
        }
    }

    async fn check_owner(
        &self,
        principal: &Principal,
        target: &OwnerTarget,
        args: &Value,
    ) -> Result<PolicyOutcome> {
        let reference = match target {
            OwnerTarget::Entity { kind, path } => match extract_id(args, path) {
                Some(id) => OwnershipRef::new(*kind, id),
                None => return Ok(missing_argument(path)),
            },
            OwnerTarget::Reference { path, kinds } => {
                let found = extract(args, path)
                    .map(|object| OwnershipRef::from_reference(object, kinds))
                    .unwrap_or(ReferenceMatch::Missing);
                match found {
                    ReferenceMatch::Found(reference) => reference,
                    ReferenceMatch::Missing => return Ok(missing_argument(path)),
                    ReferenceMatch::Ambiguous => {
                        return Ok(PolicyOutcome::deny(DenyReason::AmbiguousReference(
                            path.to_string(),
                        )))
                    }
                }
            }
        };

        let owned = self.owners.is_owner(reference, principal.id).await?;
        Ok(PolicyOutcome::allow_if(owned, DenyReason::NotOwner))
    }

    /// Own/any/orphaned branching.
    ///
    /// Without a community only literal ownership counts. Inside one, the
    /// owner needs `own`, everyone else `any`, and an orphaned target takes
    /// `orphaned` or `any`.
    async fn check_branch(
        &self,
        principal: &Principal,
        branch: &OwnershipBranch,
        args: &Value,
    ) -> Result<PolicyOutcome> {
        let Some(id) = extract_id(args, &branch.path) else {
            return Ok(missing_argument(&branch.path));
        };
        let entity = EntityRef::new(branch.kind, id);

        let community_id = match self.communities.resolve_community(entity).await? {
            CommunityResolution::NotFound => {
                return Ok(PolicyOutcome::deny(DenyReason::TargetNotFound))
            }
            CommunityResolution::Unscoped => {
                let owned = matches!(
                    self.owners.owner_of(entity).await?,
                    Ownership::Owned(owner) if owner == principal.id
                );
                return Ok(PolicyOutcome::allow_if(owned, DenyReason::NotOwner));
            }
            CommunityResolution::Scoped(community_id) => community_id,
        };

        let (required, alternative) = match self.owners.owner_of(entity).await? {
            Ownership::NotFound => return Ok(PolicyOutcome::deny(DenyReason::TargetNotFound)),
            Ownership::Owned(owner) if owner == principal.id => (branch.own, None),
            Ownership::Owned(_) => (branch.any, None),
            Ownership::Orphaned => match branch.orphaned {
                Some(orphaned) => (orphaned, Some(branch.any)),
                None => (branch.any, None),
            },
        };

        let aggregate = self
            .permissions
            .aggregate_community_permissions(principal.id, community_id)
            .await?;
        let granted =
            aggregate.has(required) || alternative.is_some_and(|flag| aggregate.has(flag));

        Ok(PolicyOutcome::allow_if(
            granted,
            DenyReason::MissingCommunityPermission(required),
        ))
    }
}

fn missing_argument(path: &super::ArgPath) -> PolicyOutcome {
    PolicyOutcome::deny(DenyReason::MissingArgument(path.to_string()))
}
