//! Search request/response types and bulk ACE reports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::acl::Principal;
use super::document::Document;

/// Collection search routed through the ACL filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Document type names to search; empty means every indexed type.
    #[serde(default)]
    pub types: Vec<String>,
    /// Search body (`{"query": ...}`); `None` matches everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Effective principals of the caller. ACL filtering applies only when
    /// these are present and auth is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principals: Option<Vec<Principal>>,
}

/// Documents returned by a collection search.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: Vec<Document>,
    /// Hits dropped by the relationship filter after the index query.
    pub denied_count: usize,
    /// Embedded documents replaced with the absence marker.
    pub relations_removed: usize,
}

/// Per-type outcome of counting documents that hold an ACE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AceCount {
    Matched(u64),
    /// The type is not search-indexed, so it cannot be counted.
    NotApplicable,
}

/// Summary of one bulk ACE replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AceUpdateReport {
    /// Documents the index reported as holding the ACE.
    pub matched: usize,
    /// Documents rewritten and saved.
    pub updated: usize,
    /// Documents whose stored ACL no longer held the ACE.
    pub skipped: usize,
}
