//! Collaborator seams: document store, search index, and authorization policy.
//!
//! Backends are handed to [`crate::AclGuard`] at construction; nothing is
//! resolved from process-wide state.

mod memory;
mod policy;

use serde_json::Value;

use crate::types::{AceTuple, Document, DocumentType, Principal};
use crate::Result;

pub use memory::{MemoryIndex, MemoryStore, StoreSnapshot};
pub use policy::AclAuthorizationPolicy;

/// Authoritative owner of documents.
pub trait DocumentStore {
    /// Every registered document type.
    fn document_types(&self) -> Vec<DocumentType>;

    fn document_type(&self, name: &str) -> Result<DocumentType>;

    /// Fetch documents of one type by primary key. Missing keys are skipped.
    fn get_by_ids(&self, doc_type: &DocumentType, ids: &[String]) -> Result<Vec<Document>>;

    /// Persist a document, replacing the stored copy with the same key.
    fn save(&mut self, document: &Document) -> Result<()>;
}

/// Search index holding (possibly stale) copies of indexed documents.
pub trait SearchIndex {
    /// Run `body` against the given index type names and return the hits.
    fn search(&self, index_types: &[String], body: &Value) -> Result<Vec<Document>>;

    fn count(&self, index_types: &[String], body: &Value) -> Result<u64>;
}

/// Decides whether a principal set holds a permission under a decoded ACL.
pub trait AuthorizationPolicy {
    /// `acl` is `None` when the document carries no ACL at all.
    fn permits(&self, acl: Option<&[AceTuple]>, principals: &[Principal], permission: &str)
    -> bool;
}
