//! # Record-Level Access
//!
//! Evaluation of a rule set against a principal and, for owner rules, the
//! record being accessed. Rules are unioned: any granting rule allows the
//! operation, and the absence of one denies it.

use serde_json::Value;

use super::errors::{AuthError, AuthResult};
use super::principal::Principal;
use super::rules::{AuthRule, Operation};

/// How a list query over an entity must be restricted for a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Every record is visible
    All,
    /// Only records where at least one of `fields` equals `owner` are visible
    OwnedBy { fields: Vec<String>, owner: String },
    /// No record is visible
    Denied,
}

impl ListScope {
    pub fn is_denied(&self) -> bool {
        matches!(self, ListScope::Denied)
    }

    /// Whether a stored record falls inside this scope
    pub fn includes(&self, record: &Value) -> bool {
        match self {
            ListScope::All => true,
            ListScope::OwnedBy { fields, owner } => fields
                .iter()
                .any(|field| record.get(field).and_then(Value::as_str) == Some(owner.as_str())),
            ListScope::Denied => false,
        }
    }
}

/// Returns true iff some rule grants `op` to `principal` for `record`.
pub fn evaluate(rules: &[AuthRule], op: Operation, principal: &Principal, record: Option<&Value>) -> bool {
    rules.iter().any(|rule| rule.grants(op, principal, record))
}

/// Resolves the list scope of a rule set.
///
/// A non-owner rule granting list opens the whole collection. Owner rules
/// restrict the listing to the caller's own records, through any of the owner
/// fields they name.
pub fn list_scope(rules: &[AuthRule], principal: &Principal) -> ListScope {
    let mut fields: Vec<String> = Vec::new();

    for rule in rules.iter().filter(|rule| rule.allows(Operation::List)) {
        match rule.owner_field() {
            Some(field) => {
                if !fields.iter().any(|f| f == field) {
                    fields.push(field.to_string());
                }
            }
            None if rule.matches(principal, None) => return ListScope::All,
            None => {}
        }
    }

    match principal.identity() {
        Some(identity) if !fields.is_empty() => ListScope::OwnedBy {
            fields,
            owner: identity.to_string(),
        },
        _ => ListScope::Denied,
    }
}

/// Stamps the principal's identity into every owner field of a new record.
pub fn stamp_owner(
    entity: &str,
    owner_fields: &[&str],
    record: &mut Value,
    principal: &Principal,
) -> AuthResult<()> {
    if owner_fields.is_empty() {
        return Ok(());
    }

    let identity = principal.require_identity()?;
    let obj = record
        .as_object_mut()
        .ok_or_else(|| AuthError::InvalidRecord(entity.to_string()))?;

    for field in owner_fields {
        obj.insert(field.to_string(), Value::String(identity.to_string()));
    }

    Ok(())
}
