//! Declarative authorization policies and their evaluation.
//!
//! Operations declare an ordered list of [`Policy`] values in the
//! [`OperationRegistry`]; [`PolicyEngine`] requires every one of them to pass.
//! Policies are plain data so the table can be inspected, listed and tested
//! without running any handler code.

pub mod any;
pub mod args;
pub mod catalog;
pub mod engine;
pub mod redact;
pub mod registry;

pub use args::{extract, extract_id, ArgPath};
pub use engine::PolicyEngine;
pub use redact::{FieldKind, FieldValue, Redactor};
pub use registry::{FieldPolicy, OperationRegistry, OperationRegistryBuilder};

use crate::domain::{
    CommunityPermission, EntityKind, GlobalPermission, OwnershipKind, Principal,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub type PolicyResult<T> = std::result::Result<T, AppError>;

/// Why a policy denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "camelCase")]
pub enum DenyReason {
    Unauthenticated,
    MissingGlobalPermission(GlobalPermission),
    MissingCommunityPermission(CommunityPermission),
    /// Ownership was the only applicable check and the principal is not the owner.
    NotOwner,
    /// The policy's argument path held no usable id.
    MissingArgument(String),
    /// The reference object at this path named more than one target.
    AmbiguousReference(String),
    /// The target, or a row on its chain, does not exist.
    TargetNotFound,
    /// The target sits outside any community, so community grants cannot apply.
    NoCommunityScope,
    /// Reason supplied by a custom policy, or the message of a raised denial.
    Custom(String),
    /// No reason was supplied.
    Denied,
}

impl DenyReason {
    /// Caller-facing message. Never reveals whether a target exists.
    pub fn message(&self) -> String {
        match self {
            DenyReason::Unauthenticated => "Authentication required".to_string(),
            DenyReason::MissingGlobalPermission(flag) => {
                format!("Missing global permission: {}", flag)
            }
            DenyReason::MissingCommunityPermission(flag) => {
                format!("Missing community permission: {}", flag)
            }
            DenyReason::NotOwner => "Only the owner may perform this action".to_string(),
            DenyReason::Custom(message) => message.clone(),
            DenyReason::MissingArgument(_)
            | DenyReason::AmbiguousReference(_)
            | DenyReason::TargetNotFound
            | DenyReason::NoCommunityScope
            | DenyReason::Denied => "Access denied".to_string(),
        }
    }

    /// Translate a raised denial signal into a reason. Faults yield `None`.
    pub fn from_denial(error: &AppError) -> Option<Self> {
        if !error.is_denial() {
            return None;
        }
        let reason = match error {
            AppError::Unauthorized(_) => DenyReason::Unauthenticated,
            AppError::NotFound(_) => DenyReason::TargetNotFound,
            AppError::Forbidden(message) => DenyReason::Custom(message.clone()),
            _ => DenyReason::Denied,
        };
        Some(reason)
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::MissingArgument(path) => write!(f, "missing argument at {}", path),
            DenyReason::AmbiguousReference(path) => write!(f, "ambiguous reference at {}", path),
            DenyReason::TargetNotFound => f.write_str("target not found"),
            DenyReason::NoCommunityScope => f.write_str("target has no community scope"),
            other => f.write_str(&other.message()),
        }
    }
}

/// Result of a single policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    Allow,
    Deny(Option<DenyReason>),
}

impl PolicyOutcome {
    pub fn deny(reason: DenyReason) -> Self {
        PolicyOutcome::Deny(Some(reason))
    }

    pub fn allow_if(condition: bool, reason: DenyReason) -> Self {
        if condition {
            PolicyOutcome::Allow
        } else {
            PolicyOutcome::deny(reason)
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyOutcome::Allow)
    }
}

/// Final answer of [`PolicyEngine::evaluate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny(_) => "deny",
        }
    }

    /// `?`-friendly form for handlers that abort on denial.
    pub fn into_result(self) -> PolicyResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(AppError::Unauthorized(
                DenyReason::Unauthenticated.message(),
            )),
            Decision::Deny(reason) => Err(AppError::Forbidden(reason.message())),
        }
    }
}

impl From<PolicyOutcome> for Decision {
    fn from(outcome: PolicyOutcome) -> Self {
        match outcome {
            PolicyOutcome::Allow => Decision::Allow,
            PolicyOutcome::Deny(reason) => Decision::Deny(reason.unwrap_or(DenyReason::Denied)),
        }
    }
}

/// Where a community-scoped policy finds its community
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunityScope {
    pub kind: EntityKind,
    pub path: ArgPath,
}

impl CommunityScope {
    pub fn new(kind: EntityKind, path: impl Into<ArgPath>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Target of a plain ownership policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OwnerTarget {
    /// A fixed ownership predicate applied to the id at `path`.
    Entity { kind: OwnershipKind, path: ArgPath },
    /// An object at `path` carrying the reference key of exactly one of
    /// `kinds` (`invitationId`, `receivedInvitationId`, ...). The populated
    /// key picks the predicate.
    Reference {
        path: ArgPath,
        kinds: Vec<OwnershipKind>,
    },
}

impl OwnerTarget {
    pub fn path(&self) -> &ArgPath {
        match self {
            OwnerTarget::Entity { path, .. } | OwnerTarget::Reference { path, .. } => path,
        }
    }
}

/// "Own vs any vs orphaned" permission branch on a single-owner entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipBranch {
    pub kind: EntityKind,
    pub path: ArgPath,
    /// Required when the principal owns the target.
    pub own: CommunityPermission,
    /// Required when someone else owns the target.
    pub any: CommunityPermission,
    /// Alternative to `any` when the target has no owner.
    pub orphaned: Option<CommunityPermission>,
}

impl OwnershipBranch {
    pub fn new(
        kind: EntityKind,
        path: impl Into<ArgPath>,
        own: CommunityPermission,
        any: CommunityPermission,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            own,
            any,
            orphaned: None,
        }
    }

    pub fn with_orphaned(mut self, permission: CommunityPermission) -> Self {
        self.orphaned = Some(permission);
        self
    }
}

/// What a custom policy sees
pub struct PolicyContext<'a> {
    pub principal: &'a Principal,
    pub args: &'a Value,
}

/// Escape hatch for checks the built-in vocabulary cannot express.
///
/// Implementations may either return [`PolicyOutcome::Deny`] or raise
/// `AppError::Forbidden`; both are treated as a denial.
#[async_trait]
pub trait CustomPolicy: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, ctx: &PolicyContext<'_>) -> Result<PolicyOutcome>;
}

/// A single authorization predicate
#[derive(Clone)]
pub enum Policy {
    /// Any authenticated principal.
    Authenticated,
    Global(GlobalPermission),
    Community {
        permission: CommunityPermission,
        scope: CommunityScope,
    },
    Owner(OwnerTarget),
    OwnOrAny(OwnershipBranch),
    /// Passes if any member passes, tried in order.
    Any(Vec<Policy>),
    /// Passes if every member passes.
    All(Vec<Policy>),
    Custom(Arc<dyn CustomPolicy>),
}

impl Policy {
    pub fn global(flag: GlobalPermission) -> Self {
        Policy::Global(flag)
    }

    pub fn community(
        permission: CommunityPermission,
        kind: EntityKind,
        path: impl Into<ArgPath>,
    ) -> Self {
        Policy::Community {
            permission,
            scope: CommunityScope::new(kind, path),
        }
    }

    pub fn member(kind: EntityKind, path: impl Into<ArgPath>) -> Self {
        Policy::community(CommunityPermission::AnyMembership, kind, path)
    }

    pub fn owner(kind: OwnershipKind, path: impl Into<ArgPath>) -> Self {
        Policy::Owner(OwnerTarget::Entity {
            kind,
            path: path.into(),
        })
    }

    pub fn owner_by_reference(
        path: impl Into<ArgPath>,
        kinds: impl IntoIterator<Item = OwnershipKind>,
    ) -> Self {
        Policy::Owner(OwnerTarget::Reference {
            path: path.into(),
            kinds: kinds.into_iter().collect(),
        })
    }

    pub fn own_or_any(branch: OwnershipBranch) -> Self {
        Policy::OwnOrAny(branch)
    }

    pub fn any(policies: impl IntoIterator<Item = Policy>) -> Self {
        Policy::Any(policies.into_iter().collect())
    }

    pub fn all(policies: impl IntoIterator<Item = Policy>) -> Self {
        Policy::All(policies.into_iter().collect())
    }

    pub fn custom(policy: impl CustomPolicy + 'static) -> Self {
        Policy::Custom(Arc::new(policy))
    }

    /// Every argument path this policy reads, nested members included.
    pub fn arg_paths(&self) -> Vec<&ArgPath> {
        match self {
            Policy::Authenticated | Policy::Global(_) | Policy::Custom(_) => Vec::new(),
            Policy::Community { scope, .. } => vec![&scope.path],
            Policy::Owner(target) => vec![target.path()],
            Policy::OwnOrAny(branch) => vec![&branch.path],
            Policy::Any(members) | Policy::All(members) => {
                members.iter().flat_map(Policy::arg_paths).collect()
            }
        }
    }
}

impl std::fmt::Debug for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Authenticated => f.write_str("Authenticated"),
            Policy::Global(flag) => f.debug_tuple("Global").field(flag).finish(),
            Policy::Community { permission, scope } => f
                .debug_struct("Community")
                .field("permission", permission)
                .field("scope", scope)
                .finish(),
            Policy::Owner(target) => f.debug_tuple("Owner").field(target).finish(),
            Policy::OwnOrAny(branch) => f.debug_tuple("OwnOrAny").field(branch).finish(),
            Policy::Any(members) => f.debug_tuple("Any").field(members).finish(),
            Policy::All(members) => f.debug_tuple("All").field(members).finish(),
            Policy::Custom(policy) => f.debug_tuple("Custom").field(&policy.name()).finish(),
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Authenticated => f.write_str("authenticated"),
            Policy::Global(flag) => write!(f, "global({})", flag),
            Policy::Community { permission, scope } => {
                write!(f, "{}({} @ {})", permission, scope.kind, scope.path)
            }
            Policy::Owner(OwnerTarget::Entity { kind, path }) => {
                write!(f, "owner({:?} @ {})", kind, path)
            }
            Policy::Owner(OwnerTarget::Reference { path, kinds }) => {
                write!(f, "owner(ref {:?} @ {})", kinds, path)
            }
            Policy::OwnOrAny(branch) => {
                write!(
                    f,
                    "ownOrAny({} @ {}: own={}, any={}",
                    branch.kind, branch.path, branch.own, branch.any
                )?;
                if let Some(orphaned) = branch.orphaned {
                    write!(f, ", orphaned={}", orphaned)?;
                }
                f.write_str(")")
            }
            Policy::Any(members) => write_members(f, "any", members),
            Policy::All(members) => write_members(f, "all", members),
            Policy::Custom(policy) => write!(f, "custom({})", policy.name()),
        }
    }
}

fn write_members(f: &mut std::fmt::Formatter<'_>, name: &str, members: &[Policy]) -> std::fmt::Result {
    write!(f, "{}[", name)?;
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", member)?;
    }
    f.write_str("]")
}
