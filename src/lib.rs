#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::too_many_lines
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal helpers are self-describing; public entry
// points still carry docs.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Counts reported through `u64` come from in-memory collections.
#![allow(clippy::cast_possible_truncation)]
//
// Pattern matching: these pedantic lints often reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::collapsible_if)]
//
// Builders take owned values; backends are trait objects at the call site.
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::new_without_default)]
#![allow(clippy::unnecessary_wraps)]

//! ACL encoding and filtering for document stores backed by a search index.
//!
//! - [`codec`] converts ACLs between the stored record form and the
//!   in-memory tuple form and validates them against a permission vocabulary.
//! - [`query`] builds the allow/deny filter restricting searches to what a
//!   principal set may view.
//! - [`guard::RelationFilter`] strips embedded documents the caller may not view.
//! - [`AclGuard`] ties these to injected backends and adds bulk ACE counting
//!   and replacement.

/// The aclguard-core crate version (matches `Cargo.toml`).
pub const ACLGUARD_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod codec;
pub mod constants;
pub mod error;
pub mod guard;
pub mod query;
pub mod types;

pub use backend::{
    AclAuthorizationPolicy, AuthorizationPolicy, DocumentStore, MemoryIndex, MemoryStore,
    SearchIndex, StoreSnapshot,
};
pub use codec::{AclValidator, objectify_acl, stringify_acl};
pub use constants::*;
pub use error::{AclGuardError, Result};
pub use guard::{AclGuard, RelationFilter, RelationStats};
pub use query::{AclQuery, ace_match_body, apply_acl_filter, build_acl_query};
pub use types::{
    Ace, AceCount, AceTuple, AceUpdateReport, AclEntry, Action, Document, DocumentKey,
    DocumentType, DocumentValue, GuardConfig, Permission, PermissionSpec, Principal,
    SearchRequest, SearchResponse, is_document,
};
