use crate::backend::AuthorizationPolicy;
use crate::types::{AceTuple, Action, Principal};

/// First-match ACL evaluation.
///
/// ACEs are walked in order; the first one naming a caller principal and
/// covering the requested permission decides. No match denies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AclAuthorizationPolicy {
    /// Grant access to documents that carry no ACL.
    pub permit_unprotected: bool,
}

impl AclAuthorizationPolicy {
    #[must_use]
    pub fn permit_unprotected() -> Self {
        Self {
            permit_unprotected: true,
        }
    }
}

impl AuthorizationPolicy for AclAuthorizationPolicy {
    fn permits(
        &self,
        acl: Option<&[AceTuple]>,
        principals: &[Principal],
        permission: &str,
    ) -> bool {
        let Some(acl) = acl else {
            return self.permit_unprotected;
        };
        for ace in acl {
            if !principals.contains(&ace.principal) {
                continue;
            }
            if !ace
                .permission
                .to_vec()
                .iter()
                .any(|granted| granted.covers(permission))
            {
                continue;
            }
            return match ace.action {
                Action::Allow => true,
                Action::Deny | Action::Other(_) => false,
            };
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Permission;

    fn principals() -> Vec<Principal> {
        vec![Principal::Everyone, Principal::Authenticated, Principal::id("user1")]
    }

    #[test]
    fn first_matching_ace_decides() {
        let policy = AclAuthorizationPolicy::default();
        let acl = vec![
            AceTuple::deny("user1", "view"),
            AceTuple::allow(Principal::Everyone, Permission::All),
        ];
        assert!(!policy.permits(Some(&acl), &principals(), "view"));
        assert!(policy.permits(Some(&acl), &principals(), "update"));
    }

    #[test]
    fn foreign_principals_do_not_match() {
        let policy = AclAuthorizationPolicy::default();
        let acl = vec![AceTuple::allow("user2", "view")];
        assert!(!policy.permits(Some(&acl), &principals(), "view"));
    }

    #[test]
    fn unprotected_documents_follow_the_flag() {
        assert!(!AclAuthorizationPolicy::default().permits(None, &principals(), "view"));
        assert!(AclAuthorizationPolicy::permit_unprotected().permits(None, &principals(), "view"));
    }
}
