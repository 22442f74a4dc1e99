//! Authorization rules: who may perform which operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::principal::Principal;

/// Owner field used when an owner rule does not name one
pub const DEFAULT_OWNER_FIELD: &str = "owner";

/// Data operations a rule can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::List,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Operation::Create => 1 << 0,
            Operation::Read => 1 << 1,
            Operation::Update => 1 << 2,
            Operation::Delete => 1 << 3,
            Operation::List => 1 << 4,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of operations, stored as a bitmask.
///
/// Serialized as a list of operation names, e.g. `["read", "list"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct OperationSet(u8);

impl OperationSet {
    pub const EMPTY: OperationSet = OperationSet(0);
    pub const ALL: OperationSet = OperationSet(0b1_1111);

    pub fn of(ops: &[Operation]) -> Self {
        ops.iter().fold(Self::EMPTY, |set, op| set.with(*op))
    }

    #[must_use]
    pub const fn with(self, op: Operation) -> Self {
        OperationSet(self.0 | op.bit())
    }

    pub const fn contains(self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }

    #[must_use]
    pub const fn union(self, other: OperationSet) -> Self {
        OperationSet(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Expands the set with implied operations: read implies list.
    #[must_use]
    pub const fn expand_implied(self) -> Self {
        if self.contains(Operation::Read) {
            self.with(Operation::List)
        } else {
            self
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Operation> {
        Operation::ALL.into_iter().filter(move |op| self.contains(*op))
    }
}

impl From<Vec<Operation>> for OperationSet {
    fn from(ops: Vec<Operation>) -> Self {
        Self::of(&ops)
    }
}

impl From<OperationSet> for Vec<Operation> {
    fn from(set: OperationSet) -> Self {
        set.iter().collect()
    }
}

fn default_owner_field() -> String {
    DEFAULT_OWNER_FIELD.to_string()
}

fn all_operations() -> OperationSet {
    OperationSet::ALL
}

/// Which callers a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "allow", rename_all = "camelCase")]
pub enum PrincipalSelector {
    /// Any caller presenting an unexpired API key
    PublicApiKey,
    /// Callers belonging to the named group
    Group { group: String },
    /// The caller whose identity is stored in the record's owner field
    Owner {
        #[serde(rename = "ownerField", default = "default_owner_field")]
        owner_field: String,
    },
}

impl PrincipalSelector {
    fn matches(&self, principal: &Principal, record: Option<&Value>) -> bool {
        match self {
            PrincipalSelector::PublicApiKey => principal.has_valid_api_key(),
            PrincipalSelector::Group { group } => principal.in_group(group),
            PrincipalSelector::Owner { owner_field } => {
                let stored = record
                    .and_then(|r| r.get(owner_field))
                    .and_then(Value::as_str);
                matches!((principal.identity(), stored), (Some(id), Some(owner)) if id == owner)
            }
        }
    }
}

/// A principal selector paired with the operations it grants.
///
/// A rule deserialized without `operations` grants every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRule {
    #[serde(flatten)]
    pub principal: PrincipalSelector,
    #[serde(default = "all_operations")]
    pub operations: OperationSet,
}

impl AuthRule {
    pub fn public_api_key() -> Self {
        Self {
            principal: PrincipalSelector::PublicApiKey,
            operations: OperationSet::ALL,
        }
    }

    pub fn group(group: impl Into<String>) -> Self {
        Self {
            principal: PrincipalSelector::Group { group: group.into() },
            operations: OperationSet::ALL,
        }
    }

    /// Owner rule using the default `owner` field
    pub fn owner() -> Self {
        Self::owner_defined_in(DEFAULT_OWNER_FIELD)
    }

    pub fn owner_defined_in(owner_field: impl Into<String>) -> Self {
        Self {
            principal: PrincipalSelector::Owner {
                owner_field: owner_field.into(),
            },
            operations: OperationSet::ALL,
        }
    }

    /// Restricts the rule to exactly `ops`.
    #[must_use]
    pub fn to(mut self, ops: &[Operation]) -> Self {
        self.operations = OperationSet::of(ops);
        self
    }

    /// Returns the owner field when this is an owner rule
    pub fn owner_field(&self) -> Option<&str> {
        match &self.principal {
            PrincipalSelector::Owner { owner_field } => Some(owner_field),
            _ => None,
        }
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.expand_implied().contains(op)
    }

    pub fn matches(&self, principal: &Principal, record: Option<&Value>) -> bool {
        self.principal.matches(principal, record)
    }

    pub fn grants(&self, op: Operation, principal: &Principal, record: Option<&Value>) -> bool {
        self.allows(op) && self.matches(principal, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_operation_set_membership() {
        let set = OperationSet::of(&[Operation::Read, Operation::Update]);
        assert!(set.contains(Operation::Read));
        assert!(set.contains(Operation::Update));
        assert!(!set.contains(Operation::Delete));
        assert!(OperationSet::EMPTY.is_empty());
        assert_eq!(OperationSet::ALL.iter().count(), 5);
    }

    #[test]
    fn test_read_implies_list() {
        let set = OperationSet::of(&[Operation::Read]).expand_implied();
        assert!(set.contains(Operation::List));

        let set = OperationSet::of(&[Operation::List]).expand_implied();
        assert!(!set.contains(Operation::Read));
    }

    #[test]
    fn test_operation_set_serializes_as_names() {
        let set = OperationSet::of(&[Operation::List, Operation::Create]);
        assert_eq!(serde_json::to_value(set).unwrap(), json!(["create", "list"]));

        let parsed: OperationSet = serde_json::from_value(json!(["delete"])).unwrap();
        assert_eq!(parsed, OperationSet::of(&[Operation::Delete]));
    }

    #[test]
    fn test_rule_deserialization_defaults() {
        let rule: AuthRule = serde_json::from_value(json!({ "allow": "owner" })).unwrap();
        assert_eq!(rule, AuthRule::owner());
        assert_eq!(rule.owner_field(), Some("owner"));

        let rule: AuthRule = serde_json::from_value(json!({
            "allow": "group",
            "group": "ADMINS",
            "operations": ["read"]
        }))
        .unwrap();
        assert_eq!(rule, AuthRule::group("ADMINS").to(&[Operation::Read]));
    }

    #[test]
    fn test_group_rule_matching() {
        let rule = AuthRule::group("ADMINS").to(&[Operation::Read]);
        let admin = Principal::user("u1", now()).with_groups(["ADMINS"]);
        let shopper = Principal::user("u2", now());

        assert!(rule.grants(Operation::Read, &admin, None));
        assert!(!rule.grants(Operation::Update, &admin, None));
        assert!(!rule.grants(Operation::Read, &shopper, None));
    }

    #[test]
    fn test_owner_rule_needs_record() {
        let rule = AuthRule::owner_defined_in("author");
        let caller = Principal::user("u1", now());

        assert!(rule.grants(Operation::Update, &caller, Some(&json!({ "author": "u1" }))));
        assert!(!rule.grants(Operation::Update, &caller, Some(&json!({ "author": "u2" }))));
        assert!(!rule.grants(Operation::Update, &caller, Some(&json!({ "owner": "u1" }))));
        assert!(!rule.grants(Operation::Update, &caller, None));
    }
}
