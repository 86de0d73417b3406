//! Read paths: collection search and single-item fetch under the caller's
//! principals.

use std::slice;

use serde_json::{Value, json};

use super::{AclGuard, RelationFilter, indexed_type_names};
use crate::backend::{AuthorizationPolicy, DocumentStore, SearchIndex};
use crate::query::{apply_acl_filter, build_acl_query};
use crate::types::{Document, Principal, SearchRequest, SearchResponse};
use crate::Result;

impl<S, I, P> AclGuard<S, I, P>
where
    S: DocumentStore,
    I: SearchIndex,
    P: AuthorizationPolicy,
{
    /// Search the index, restricted to what the caller may view.
    ///
    /// The ACL filter is applied only when auth is enabled and a non-empty
    /// principal set was supplied. Hits then pass through the relationship
    /// filter, which also drops hits whose stored ACL denies the caller.
    pub fn search_collection(&self, request: SearchRequest) -> Result<SearchResponse> {
        let names = (!request.types.is_empty()).then_some(request.types.as_slice());
        let doc_types = self.resolve_types(names)?;
        let index_types = indexed_type_names(&doc_types)?;

        let principals = match request.principals.as_deref() {
            Some(principals) if self.filters_for(principals) => principals,
            _ => {
                let body = request.body.unwrap_or_else(match_all);
                let hits = self.index.search(&index_types, &body)?;
                return Ok(SearchResponse {
                    hits,
                    ..SearchResponse::default()
                });
            }
        };

        let acl_query = build_acl_query(principals, &self.config.view_permission);
        let body = apply_acl_filter(request.body, &acl_query);
        let hits = self.index.search(&index_types, &body)?;
        let found = hits.len();

        let (hits, stats) = self.relation_filter(principals).filter_collection(hits);
        let denied_count = found - hits.len();
        tracing::debug!(
            target: "aclguard::relations",
            found,
            returned = hits.len(),
            denied = stats.denied,
            pruned = stats.pruned,
            "filtered collection"
        );
        Ok(SearchResponse {
            denied_count,
            relations_removed: stats.removed() - denied_count,
            hits,
        })
    }

    /// Fetch one document from the store.
    ///
    /// With non-empty principals and auth enabled, a document the caller may
    /// not view is reported as missing and its relations are filtered.
    pub fn get_item(
        &self,
        doc_type: &str,
        id: &str,
        principals: Option<&[Principal]>,
    ) -> Result<Option<Document>> {
        let doc_type = self.store.document_type(doc_type)?;
        let Some(document) = self
            .store
            .get_by_ids(&doc_type, slice::from_ref(&id.to_string()))?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        match principals {
            Some(principals) if self.filters_for(principals) => {
                let (document, _) = self.relation_filter(principals).filter_item(document);
                Ok(document)
            }
            _ => Ok(Some(document)),
        }
    }

    /// ACL filtering applies only with auth enabled and a non-empty principal
    /// set; an empty set means no caller identity was resolved.
    fn filters_for(&self, principals: &[Principal]) -> bool {
        self.config.auth_enabled && !principals.is_empty()
    }

    fn relation_filter<'a>(&'a self, principals: &'a [Principal]) -> RelationFilter<'a, P> {
        RelationFilter::new(&self.policy, principals)
            .with_permission(&self.config.view_permission)
            .with_pk_fields(self.pk_fields())
            .with_max_depth(self.config.max_relation_depth)
    }
}

fn match_all() -> Value {
    json!({"query": {"match_all": {}}})
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{MemoryIndex, MemoryStore};
    use crate::types::{Ace, DocumentType, GuardConfig};

    fn story(id: &str, acl: Vec<Ace>) -> Document {
        Document::new("Story").with_field("id", json!(id)).with_acl(acl)
    }

    fn fixture() -> AclGuard<MemoryStore, MemoryIndex> {
        let mut store = MemoryStore::new()
            .with_type(DocumentType::new("Story"))
            .with_type(DocumentType::new("User"));
        let author = Document::new("User")
            .with_field("id", json!("u2"))
            .with_acl(vec![Ace::new("deny", "user1", "view")]);
        store
            .insert(story("s1", vec![Ace::new("allow", "everyone", "view")]).with_field("author", author))
            .unwrap();
        store
            .insert(story("s2", vec![Ace::new("allow", "user2", "all")]))
            .unwrap();
        let index = MemoryIndex::from_store(&store);
        AclGuard::new(store, index)
    }

    fn caller() -> Vec<Principal> {
        vec![Principal::Everyone, Principal::Authenticated, Principal::id("user1")]
    }

    #[test]
    fn search_applies_the_acl_query_and_relation_filter() {
        let guard = fixture();
        let response = guard
            .search_collection(SearchRequest {
                types: vec!["Story".into()],
                body: None,
                principals: Some(caller()),
            })
            .unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].pk_value("id"), Some("s1".into()));
        assert!(response.hits[0].field("author").unwrap().is_absent());
        assert_eq!(response.relations_removed, 1);
        assert_eq!(response.denied_count, 0);
    }

    #[test]
    fn search_without_principals_is_unfiltered() {
        let guard = fixture();
        let response = guard
            .search_collection(SearchRequest {
                types: vec!["Story".into()],
                ..SearchRequest::default()
            })
            .unwrap();
        assert_eq!(response.hits.len(), 2);
    }

    #[test]
    fn empty_principal_set_is_unfiltered() {
        let guard = fixture();
        let response = guard
            .search_collection(SearchRequest {
                types: vec!["Story".into()],
                body: None,
                principals: Some(Vec::new()),
            })
            .unwrap();
        assert_eq!(response.hits.len(), 2);
        assert!(guard.get_item("Story", "s2", Some(&[])).unwrap().is_some());
    }

    #[test]
    fn disabled_auth_skips_filtering() {
        let guard = fixture()
            .with_config(GuardConfig::default().with_auth_enabled(false))
            .unwrap();
        let item = guard.get_item("Story", "s2", Some(&caller())).unwrap();
        assert!(item.is_some());
    }

    #[test]
    fn denied_items_read_as_missing() {
        let guard = fixture();
        assert!(guard.get_item("Story", "s2", Some(&caller())).unwrap().is_none());
        assert!(guard.get_item("Story", "nope", Some(&caller())).unwrap().is_none());

        let item = guard.get_item("Story", "s1", Some(&caller())).unwrap().unwrap();
        assert!(item.field("author").unwrap().is_absent());
    }
}
