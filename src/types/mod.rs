//! Public types exposed by the `aclguard-core` crate.

pub mod acl;
pub mod document;
pub mod options;
pub mod search;

pub use acl::{Ace, AceTuple, AclEntry, Action, Permission, PermissionSpec, Principal};
pub use document::{Document, DocumentKey, DocumentType, DocumentValue, is_document};
pub use options::GuardConfig;
pub use search::{AceCount, AceUpdateReport, SearchRequest, SearchResponse};
