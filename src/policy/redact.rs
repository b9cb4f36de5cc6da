//! Field-level redaction.
//!
//! A denied field read does not abort the surrounding read. The field
//! resolves to [`FieldValue::Redacted`], which can only leave this module as
//! the field's natural empty value.

use super::engine::PolicyEngine;
use super::Decision;
use crate::domain::Principal;
use crate::error::Result;
use crate::repository::{EntityRepository, MembershipRepository};
use crate::telemetry::metrics::{self, Gate};
use serde::Serialize;
use serde_json::Value;

/// Declared type of a gated field, which fixes its empty value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// `null`
    Nullable,
    /// `""`
    String,
    /// `false`
    Boolean,
    /// `[]`
    List,
}

impl FieldKind {
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Nullable => Value::Null,
            FieldKind::String => Value::String(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::List => Value::Array(Vec::new()),
        }
    }
}

/// A resolved field before it crosses the response boundary
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Visible(Value),
    Redacted(FieldKind),
}

impl FieldValue {
    pub fn is_redacted(&self) -> bool {
        matches!(self, FieldValue::Redacted(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            FieldValue::Visible(value) => value,
            FieldValue::Redacted(kind) => kind.empty_value(),
        }
    }
}

pub struct Redactor<'a, M: MembershipRepository, E: EntityRepository> {
    engine: &'a PolicyEngine<M, E>,
}

impl<'a, M: MembershipRepository, E: EntityRepository> Redactor<'a, M, E> {
    pub(crate) fn new(engine: &'a PolicyEngine<M, E>) -> Self {
        Self { engine }
    }

    /// Resolve one field of `parent`. Ungated fields are always visible.
    ///
    /// The field's policies read their argument paths from `parent`.
    pub async fn resolve_field(
        &self,
        principal: Option<&Principal>,
        type_name: &str,
        field: &str,
        parent: &Value,
        value: Value,
    ) -> Result<FieldValue> {
        let Some(field_policy) = self.engine.registry().field(type_name, field) else {
            return Ok(FieldValue::Visible(value));
        };

        let label = format!("{}.{}", type_name, field);
        let decision = self
            .engine
            .decide(Gate::Field, &label, principal, &field_policy.policies, parent)
            .await?;

        match decision {
            Decision::Allow => Ok(FieldValue::Visible(value)),
            Decision::Deny(reason) => {
                tracing::debug!(field = %label, reason = %reason, "field redacted");
                metrics::record_redaction(type_name, field);
                Ok(FieldValue::Redacted(field_policy.kind))
            }
        }
    }

    /// Apply every gated field of `type_name` to `object`.
    ///
    /// Fields absent from `object` stay absent. Non-object values pass
    /// through unchanged.
    pub async fn redact_object(
        &self,
        principal: Option<&Principal>,
        type_name: &str,
        object: &Value,
    ) -> Result<Value> {
        let Some(source) = object.as_object() else {
            return Ok(object.clone());
        };

        let mut redacted = source.clone();
        for (field, _) in self.engine.registry().fields_of(type_name) {
            let Some(value) = source.get(field) else {
                continue;
            };
            let resolved = self
                .resolve_field(principal, type_name, field, object, value.clone())
                .await?;
            redacted.insert(field.to_string(), resolved.into_value());
        }

        Ok(Value::Object(redacted))
    }
}
