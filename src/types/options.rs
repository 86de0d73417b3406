//! Guard configuration.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_RELATION_DEPTH, DEFAULT_PERMISSIONS, PERMISSION_ALL, PERMISSION_VIEW,
};
use crate::{AclGuardError, Result};

fn default_permissions() -> BTreeSet<String> {
    DEFAULT_PERMISSIONS
        .iter()
        .map(|permission| (*permission).to_string())
        .collect()
}

fn default_view_permission() -> String {
    PERMISSION_VIEW.to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_relation_depth() -> usize {
    DEFAULT_MAX_RELATION_DEPTH
}

/// Tunable behaviour of an [`crate::AclGuard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Application permission vocabulary; `all` is always accepted on top.
    #[serde(default = "default_permissions")]
    pub permissions: BTreeSet<String>,
    /// Permission the relationship filter checks on embedded documents.
    #[serde(default = "default_view_permission")]
    pub view_permission: String,
    /// When false, collection and item reads skip ACL filtering entirely.
    #[serde(default = "default_true")]
    pub auth_enabled: bool,
    /// Embedded documents deeper than this are checked but not descended.
    #[serde(default = "default_max_relation_depth")]
    pub max_relation_depth: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            permissions: default_permissions(),
            view_permission: default_view_permission(),
            auth_enabled: true,
            max_relation_depth: default_max_relation_depth(),
        }
    }
}

impl GuardConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs_err::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.permissions.is_empty() {
            return Err(AclGuardError::InvalidConfig {
                reason: "permission vocabulary must not be empty".into(),
            });
        }
        if self.permissions.contains(PERMISSION_ALL) {
            return Err(AclGuardError::InvalidConfig {
                reason: format!("`{PERMISSION_ALL}` is implicit and must not be listed"),
            });
        }
        if !self.permissions.contains(&self.view_permission) {
            return Err(AclGuardError::InvalidConfig {
                reason: format!(
                    "view permission `{}` is not in the permission vocabulary",
                    self.view_permission
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }
}
