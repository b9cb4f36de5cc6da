//! Declarative operation table: operation name -> ordered policies

use super::redact::FieldKind;
use super::{OwnerTarget, Policy};
use crate::error::{AppError, Result};
use crate::service::has_single_owner;
use std::collections::BTreeMap;

/// Policies gating one field of an otherwise visible object
#[derive(Debug, Clone)]
pub struct FieldPolicy {
    pub kind: FieldKind,
    pub policies: Vec<Policy>,
}

/// Immutable lookup table built once at startup
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, Vec<Policy>>,
    fields: BTreeMap<String, BTreeMap<String, FieldPolicy>>,
}

impl OperationRegistry {
    pub fn builder() -> OperationRegistryBuilder {
        OperationRegistryBuilder::default()
    }

    pub fn policies(&self, operation: &str) -> Option<&[Policy]> {
        self.operations.get(operation).map(Vec::as_slice)
    }

    /// Operations in name order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, &[Policy])> {
        self.operations
            .iter()
            .map(|(name, policies)| (name.as_str(), policies.as_slice()))
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldPolicy> {
        self.fields.get(type_name)?.get(field)
    }

    /// Gated fields of `type_name` in name order.
    pub fn fields_of(&self, type_name: &str) -> impl Iterator<Item = (&str, &FieldPolicy)> {
        self.fields
            .get(type_name)
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(name, policy)| (name.as_str(), policy)))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[derive(Default)]
pub struct OperationRegistryBuilder {
    operations: Vec<(String, Vec<Policy>)>,
    fields: Vec<(String, String, FieldPolicy)>,
}

impl OperationRegistryBuilder {
    pub fn operation(mut self, name: impl Into<String>, policies: Vec<Policy>) -> Self {
        self.operations.push((name.into(), policies));
        self
    }

    pub fn field(
        mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        kind: FieldKind,
        policies: Vec<Policy>,
    ) -> Self {
        self.fields
            .push((type_name.into(), field.into(), FieldPolicy { kind, policies }));
        self
    }

    /// Validate and freeze the table.
    ///
    /// Rejects duplicate registrations, malformed or missing argument paths
    /// and ownership branches on kinds without a single owner.
    pub fn build(self) -> Result<OperationRegistry> {
        let mut registry = OperationRegistry::default();

        for (name, policies) in self.operations {
            validate_policies(&name, &policies)?;
            if registry.operations.contains_key(&name) {
                return Err(AppError::Misconfigured(format!(
                    "Operation '{}' registered twice",
                    name
                )));
            }
            registry.operations.insert(name, policies);
        }

        for (type_name, field, policy) in self.fields {
            let label = format!("{}.{}", type_name, field);
            validate_policies(&label, &policy.policies)?;
            let fields = registry.fields.entry(type_name).or_default();
            if fields.contains_key(&field) {
                return Err(AppError::Misconfigured(format!(
                    "Field '{}' registered twice",
                    label
                )));
            }
            fields.insert(field, policy);
        }

        Ok(registry)
    }
}

pub(crate) fn validate_policies(label: &str, policies: &[Policy]) -> Result<()> {
    for policy in policies {
        for path in policy.arg_paths() {
            path.validate()
                .map_err(|e| AppError::Misconfigured(format!("{}: {}", label, e)))?;
        }
        validate_targets(label, policy)?;
    }
    Ok(())
}

/// Id-bearing policies need a non-root path. Only a reference object may sit
/// at the root, and it must accept at least one kind.
fn validate_targets(label: &str, policy: &Policy) -> Result<()> {
    let misconfigured = |problem: String| -> Result<()> {
        Err(AppError::Misconfigured(format!("{}: {}", label, problem)))
    };

    match policy {
        Policy::Community { scope, .. } if scope.path.is_root() => {
            misconfigured(format!("{} scope needs an argument path", scope.kind))
        }
        Policy::Owner(OwnerTarget::Entity { kind, path }) if path.is_root() => {
            misconfigured(format!("{:?} owner check needs an argument path", kind))
        }
        Policy::Owner(OwnerTarget::Reference { kinds, .. }) if kinds.is_empty() => {
            misconfigured("reference accepts no ownership kind".to_string())
        }
        Policy::OwnOrAny(branch) if branch.path.is_root() => {
            misconfigured(format!("{} branch needs an argument path", branch.kind))
        }
        Policy::OwnOrAny(branch) if !has_single_owner(branch.kind) => {
            misconfigured(format!("{} has no single owner", branch.kind))
        }
        Policy::Any(members) | Policy::All(members) => members
            .iter()
            .try_for_each(|member| validate_targets(label, member)),
        _ => Ok(()),
    }
}
