//! ACE record and permission tuple types.
//!
//! Two shapes exist for an access control entry. [`Ace`] is the canonical
//! record with plain string fields; it is the only form that is stored,
//! indexed, or sent over the wire. [`AceTuple`] is the in-memory form used by
//! authorization policies, where the action, the reserved principals, and the
//! wildcard permission are tokens rather than strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTION_ALLOW, ACTION_DENY, PERMISSION_ALL, PRINCIPAL_AUTHENTICATED, PRINCIPAL_EVERYONE,
};

/// Canonical stored form of one access control entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ace {
    pub action: String,
    pub principal: String,
    pub permission: String,
}

impl Ace {
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        principal: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            principal: principal.into(),
            permission: permission.into(),
        }
    }
}

impl fmt::Display for Ace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{action: {}, principal: {}, permission: {}}}",
            self.action, self.principal, self.permission
        )
    }
}

/// Action token of a permission tuple.
///
/// `Other` keeps free-form input (for example a default ACL read from a
/// config file as `" Allow "`); the codec lower-cases and trims it on encode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Allow,
    Deny,
    Other(String),
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        match value.as_str() {
            ACTION_ALLOW => Self::Allow,
            ACTION_DENY => Self::Deny,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Action> for String {
    fn from(value: Action) -> Self {
        match value {
            Action::Allow => ACTION_ALLOW.to_string(),
            Action::Deny => ACTION_DENY.to_string(),
            Action::Other(raw) => raw,
        }
    }
}

/// Principal identifier of a permission tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Principal {
    /// Matches any requester.
    Everyone,
    /// Matches any requester with a verified identity.
    Authenticated,
    /// Application-defined principal (user id, group id, role name).
    Id(String),
}

impl Principal {
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }
}

impl From<String> for Principal {
    fn from(value: String) -> Self {
        match value.as_str() {
            PRINCIPAL_EVERYONE => Self::Everyone,
            PRINCIPAL_AUTHENTICATED => Self::Authenticated,
            _ => Self::Id(value),
        }
    }
}

impl From<&str> for Principal {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        match value {
            Principal::Everyone => PRINCIPAL_EVERYONE.to_string(),
            Principal::Authenticated => PRINCIPAL_AUTHENTICATED.to_string(),
            Principal::Id(id) => id,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Everyone => f.write_str(PRINCIPAL_EVERYONE),
            Self::Authenticated => f.write_str(PRINCIPAL_AUTHENTICATED),
            Self::Id(id) => f.write_str(id),
        }
    }
}

/// Single permission of a permission tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Permission {
    /// Sentinel covering every operation.
    All,
    Name(String),
}

impl Permission {
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    /// Whether this permission grants or denies `requested`.
    #[must_use]
    pub fn covers(&self, requested: &str) -> bool {
        match self {
            Self::All => true,
            Self::Name(name) => name == requested,
        }
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        if value == PERMISSION_ALL {
            Self::All
        } else {
            Self::Name(value)
        }
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        match value {
            Permission::All => PERMISSION_ALL.to_string(),
            Permission::Name(name) => name,
        }
    }
}

/// Permission slot of a tuple: a scalar or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionSpec {
    One(Permission),
    Many(Vec<Permission>),
}

impl PermissionSpec {
    /// Permissions in input order; a scalar becomes a one-element list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Permission> {
        match self {
            Self::One(permission) => vec![permission.clone()],
            Self::Many(permissions) => permissions.clone(),
        }
    }
}

impl From<Permission> for PermissionSpec {
    fn from(value: Permission) -> Self {
        Self::One(value)
    }
}

impl From<Vec<Permission>> for PermissionSpec {
    fn from(value: Vec<Permission>) -> Self {
        Self::Many(value)
    }
}

impl From<&str> for PermissionSpec {
    fn from(value: &str) -> Self {
        Self::One(Permission::from(value))
    }
}

/// In-memory `(action, principal, permission)` form of an ACE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(Action, Principal, PermissionSpec)",
    into = "(Action, Principal, PermissionSpec)"
)]
pub struct AceTuple {
    pub action: Action,
    pub principal: Principal,
    pub permission: PermissionSpec,
}

impl AceTuple {
    #[must_use]
    pub fn new(
        action: Action,
        principal: impl Into<Principal>,
        permission: impl Into<PermissionSpec>,
    ) -> Self {
        Self {
            action,
            principal: principal.into(),
            permission: permission.into(),
        }
    }

    #[must_use]
    pub fn allow(principal: impl Into<Principal>, permission: impl Into<PermissionSpec>) -> Self {
        Self::new(Action::Allow, principal, permission)
    }

    #[must_use]
    pub fn deny(principal: impl Into<Principal>, permission: impl Into<PermissionSpec>) -> Self {
        Self::new(Action::Deny, principal, permission)
    }
}

impl From<(Action, Principal, PermissionSpec)> for AceTuple {
    fn from((action, principal, permission): (Action, Principal, PermissionSpec)) -> Self {
        Self {
            action,
            principal,
            permission,
        }
    }
}

impl From<AceTuple> for (Action, Principal, PermissionSpec) {
    fn from(value: AceTuple) -> Self {
        (value.action, value.principal, value.permission)
    }
}

/// One element of an ACL handed to the encoder: a record that is already
/// canonical, or a tuple that still needs encoding.
///
/// Tuples are tried first when deserializing: a derived struct also accepts a
/// JSON array, which would otherwise read `["allow", "u1", "view"]` as a
/// record and skip encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AclEntry {
    Tuple(AceTuple),
    Record(Ace),
}

impl From<Ace> for AclEntry {
    fn from(value: Ace) -> Self {
        Self::Record(value)
    }
}

impl From<AceTuple> for AclEntry {
    fn from(value: AceTuple) -> Self {
        Self::Tuple(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_entry_deserializes_records_and_tuples() {
        let raw = r#"[
            {"action": "allow", "principal": "user1", "permission": "view"},
            ["deny", "everyone", ["view", "all"]],
            ["allow", "user2", "update"]
        ]"#;
        let entries: Vec<AclEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            entries[0],
            AclEntry::Record(Ace::new("allow", "user1", "view"))
        );
        assert_eq!(
            entries[1],
            AclEntry::Tuple(AceTuple::deny(
                Principal::Everyone,
                vec![Permission::name("view"), Permission::All]
            ))
        );
        assert_eq!(
            entries[2],
            AclEntry::Tuple(AceTuple::allow("user2", "update"))
        );
    }

    #[test]
    fn free_form_action_is_kept_verbatim() {
        let tuple: AceTuple = serde_json::from_str(r#"[" Allow ", "user1", "view"]"#).unwrap();
        assert_eq!(tuple.action, Action::Other(" Allow ".to_string()));
    }

    #[test]
    fn permission_covers_wildcard() {
        assert!(Permission::All.covers("delete"));
        assert!(Permission::name("view").covers("view"));
        assert!(!Permission::name("view").covers("update"));
    }
}
