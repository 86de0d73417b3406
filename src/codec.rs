//! ACE codec: permission tuples to canonical records and back.
//!
//! Encoding normalizes tuples into one record per permission; records that
//! are already canonical pass through untouched, so encoding is idempotent.
//! Decoding never rejects unknown principals or permissions, only actions
//! outside `allow`/`deny`.

use std::collections::BTreeSet;

use crate::constants::{
    ACTION_ALLOW, ACTION_DENY, PERMISSION_ALL, PRINCIPAL_AUTHENTICATED, PRINCIPAL_EVERYONE,
};
use crate::types::{Ace, AceTuple, AclEntry, Action, GuardConfig, Permission, PermissionSpec, Principal};
use crate::{AclGuardError, Result};

const VALID_ACTIONS: [&str; 2] = [ACTION_ALLOW, ACTION_DENY];

/// String form of an action token. Unknown tokens are trimmed and lower-cased.
#[must_use]
pub fn stringify_action(action: &Action) -> String {
    let raw = match action {
        Action::Allow => ACTION_ALLOW,
        Action::Deny => ACTION_DENY,
        Action::Other(raw) => raw.as_str(),
    };
    raw.trim().to_lowercase()
}

#[must_use]
pub fn stringify_principal(principal: &Principal) -> String {
    match principal {
        Principal::Everyone => PRINCIPAL_EVERYONE.to_string(),
        Principal::Authenticated => PRINCIPAL_AUTHENTICATED.to_string(),
        Principal::Id(id) => id.clone(),
    }
}

/// Flatten a permission slot into cleaned permission strings, in input order.
#[must_use]
pub fn stringify_permissions(permissions: &PermissionSpec) -> Vec<String> {
    permissions
        .to_vec()
        .into_iter()
        .map(|permission| match permission {
            Permission::All => PERMISSION_ALL.to_string(),
            Permission::Name(name) => name.trim().to_lowercase(),
        })
        .collect()
}

/// Encode one tuple into canonical records, one per permission.
#[must_use]
pub fn stringify_tuple(tuple: &AceTuple) -> Vec<Ace> {
    let action = stringify_action(&tuple.action);
    let principal = stringify_principal(&tuple.principal);
    stringify_permissions(&tuple.permission)
        .into_iter()
        .map(|permission| Ace {
            action: action.clone(),
            principal: principal.clone(),
            permission,
        })
        .collect()
}

/// Encode a possibly mixed ACL into canonical records.
#[must_use]
pub fn stringify_acl(acl: &[AclEntry]) -> Vec<Ace> {
    let mut string_acl = Vec::with_capacity(acl.len());
    for entry in acl {
        match entry {
            AclEntry::Record(ace) => string_acl.push(ace.clone()),
            AclEntry::Tuple(tuple) => string_acl.extend(stringify_tuple(tuple)),
        }
    }
    string_acl
}

/// Encode an ACL made only of tuples.
#[must_use]
pub fn stringify_tuples(acl: &[AceTuple]) -> Vec<Ace> {
    acl.iter().flat_map(stringify_tuple).collect()
}

pub fn objectify_action(action: &str) -> Result<Action> {
    match action {
        ACTION_ALLOW => Ok(Action::Allow),
        ACTION_DENY => Ok(Action::Deny),
        other => Err(AclGuardError::invalid_value("action", other, VALID_ACTIONS)),
    }
}

#[must_use]
pub fn objectify_principal(principal: &str) -> Principal {
    match principal {
        PRINCIPAL_EVERYONE => Principal::Everyone,
        PRINCIPAL_AUTHENTICATED => Principal::Authenticated,
        other => Principal::Id(other.to_string()),
    }
}

#[must_use]
pub fn objectify_permission(permission: &str) -> Permission {
    if permission == PERMISSION_ALL {
        Permission::All
    } else {
        Permission::Name(permission.to_string())
    }
}

/// Decode stored records into tuples carrying a single permission each.
pub fn objectify_acl(acl: &[Ace]) -> Result<Vec<AceTuple>> {
    acl.iter()
        .map(|ace| {
            Ok(AceTuple {
                action: objectify_action(&ace.action)?,
                principal: objectify_principal(&ace.principal),
                permission: PermissionSpec::One(objectify_permission(&ace.permission)),
            })
        })
        .collect()
}

/// Checks canonical records against the action set and the permission vocabulary.
#[derive(Debug, Clone)]
pub struct AclValidator {
    permissions: BTreeSet<String>,
}

impl Default for AclValidator {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

impl AclValidator {
    #[must_use]
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut permissions: BTreeSet<String> = permissions.into_iter().map(Into::into).collect();
        permissions.insert(PERMISSION_ALL.to_string());
        Self { permissions }
    }

    #[must_use]
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.permissions.iter().cloned())
    }

    /// Legal permission values, `all` included.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn validate_action(&self, action: &str) -> Result<()> {
        if VALID_ACTIONS.contains(&action) {
            Ok(())
        } else {
            Err(AclGuardError::invalid_value("action", action, VALID_ACTIONS))
        }
    }

    pub fn validate_permission(&self, permission: &str) -> Result<()> {
        if self.permissions.contains(permission) {
            Ok(())
        } else {
            Err(AclGuardError::invalid_value(
                "permission",
                permission,
                &self.permissions,
            ))
        }
    }

    /// Fails on the first invalid record. Principals are never checked.
    pub fn validate_acl(&self, acl: &[Ace]) -> Result<()> {
        for ace in acl {
            self.validate_action(&ace.action)?;
            self.validate_permission(&ace.permission)?;
        }
        Ok(())
    }

    /// Encode and validate an ACL destined for storage.
    pub fn encode_acl(&self, acl: &[AclEntry]) -> Result<Vec<Ace>> {
        let encoded = stringify_acl(acl);
        self.validate_acl(&encoded)?;
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_expands_permission_lists_in_order() {
        let acl = vec![AclEntry::Tuple(AceTuple::allow(
            "user1",
            vec![Permission::name("View"), Permission::All],
        ))];
        assert_eq!(
            stringify_acl(&acl),
            vec![
                Ace::new("allow", "user1", "view"),
                Ace::new("allow", "user1", "all"),
            ]
        );
    }

    #[test]
    fn stringify_maps_reserved_principals_and_cleans_actions() {
        let acl = vec![
            AclEntry::Tuple(AceTuple::deny(Principal::Everyone, " Update ")),
            AclEntry::Tuple(AceTuple::new(
                Action::Other(" ALLOW ".into()),
                Principal::Authenticated,
                Permission::All,
            )),
        ];
        assert_eq!(
            stringify_acl(&acl),
            vec![
                Ace::new("deny", "everyone", "update"),
                Ace::new("allow", "authenticated", "all"),
            ]
        );
    }

    #[test]
    fn stringify_passes_records_through_and_is_idempotent() {
        let acl = vec![
            AclEntry::Record(Ace::new("allow", "admin", "all")),
            AclEntry::Tuple(AceTuple::allow("user1", "view")),
        ];
        let once = stringify_acl(&acl);
        let again: Vec<AclEntry> = once.iter().cloned().map(AclEntry::Record).collect();
        assert_eq!(stringify_acl(&again), once);
        assert_eq!(once[0], Ace::new("allow", "admin", "all"));
    }

    #[test]
    fn records_are_never_reprocessed() {
        let raw = Ace::new(" Allow ", "user1", "VIEW");
        assert_eq!(stringify_acl(&[AclEntry::Record(raw.clone())]), vec![raw]);
    }

    #[test]
    fn objectify_inverts_special_tokens() {
        let decoded = objectify_acl(&[
            Ace::new("allow", "everyone", "all"),
            Ace::new("deny", "user7", "view"),
        ])
        .unwrap();
        assert_eq!(
            decoded,
            vec![
                AceTuple::allow(Principal::Everyone, Permission::All),
                AceTuple::deny("user7", "view"),
            ]
        );
        assert!(objectify_acl(&[]).unwrap().is_empty());
    }

    #[test]
    fn objectify_rejects_unknown_actions() {
        let err = objectify_acl(&[Ace::new("grant", "user1", "view")]).unwrap_err();
        assert!(err.to_string().contains("grant"));
    }

    #[test]
    fn round_trip_preserves_scalar_tuples() {
        let tuple = AceTuple::allow(Principal::Authenticated, " Delete ");
        let decoded = objectify_acl(&stringify_tuple(&tuple)).unwrap();
        assert_eq!(decoded, vec![AceTuple::allow(Principal::Authenticated, "delete")]);
    }

    #[test]
    fn validate_rejects_bad_action_and_names_it() {
        let validator = AclValidator::default();
        let err = validator
            .validate_acl(&[Ace::new("foo", "user1", "view")])
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("foo"));
        assert!(message.contains("allow, deny"));
        assert!(matches!(
            err,
            AclGuardError::InvalidAceValue { field: "action", .. }
        ));
    }

    #[test]
    fn validate_rejects_unknown_permission() {
        let validator = AclValidator::new(["view"]);
        let err = validator
            .validate_acl(&[Ace::new("allow", "user1", "publish")])
            .unwrap_err();
        assert!(matches!(
            err,
            AclGuardError::InvalidAceValue { field: "permission", ref value, ref valid }
                if value == "publish" && valid == "all, view"
        ));
    }

    #[test]
    fn validate_accepts_wildcard_and_arbitrary_principals() {
        let validator = AclValidator::default();
        validator
            .validate_acl(&[
                Ace::new("allow", "all", "all"),
                Ace::new("deny", "any:thing at all", "options"),
            ])
            .unwrap();
    }
}
