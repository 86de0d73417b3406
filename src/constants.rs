//! Field names, reserved tokens, and defaults shared across the crate.

/// Document field holding the stored ACL.
pub const ACL_FIELD: &str = "_acl";
/// Document field holding the type tag that marks a value as a document.
pub const TYPE_FIELD: &str = "_type";

/// Stored form of the allow action.
pub const ACTION_ALLOW: &str = "allow";
/// Stored form of the deny action.
pub const ACTION_DENY: &str = "deny";

/// Stored form of the principal matching any requester.
pub const PRINCIPAL_EVERYONE: &str = "everyone";
/// Stored form of the principal matching any requester with a verified identity.
pub const PRINCIPAL_AUTHENTICATED: &str = "authenticated";

/// Stored form of the wildcard permission.
pub const PERMISSION_ALL: &str = "all";
/// Permission checked against embedded documents and used for collection filtering.
pub const PERMISSION_VIEW: &str = "view";

/// Permission names exposed by the default application vocabulary.
pub const DEFAULT_PERMISSIONS: &[&str] = &["view", "create", "update", "delete", "options"];

/// Default primary key field of a document type.
pub const DEFAULT_PK_FIELD: &str = "id";

/// Maximum nesting depth descended by the relationship filter.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 32;
