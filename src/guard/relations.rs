//! Relationship permission filter.
//!
//! Walks a retrieved document and removes every embedded document the caller
//! may not view. Sequence fields drop denied elements; scalar fields are
//! nulled. Visible embedded documents are filtered the same way, recursively.
//!
//! Traversal stops at a document already on the ancestor path and at the
//! depth cap. Such a document is still checked itself, but its embedded
//! descendants are not authorized and are removed unseen.

use std::collections::BTreeMap;

use crate::backend::AuthorizationPolicy;
use crate::codec::objectify_acl;
use crate::constants::{DEFAULT_MAX_RELATION_DEPTH, DEFAULT_PK_FIELD, PERMISSION_VIEW};
use crate::types::{Document, DocumentKey, DocumentValue, Principal};

/// Counters collected while filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationStats {
    /// Documents that failed the permission check.
    pub denied: usize,
    /// Documents reached again below a copy of themselves.
    pub cycles: usize,
    /// Embedded documents removed without a check, below a repeated
    /// document or past the depth cap.
    pub pruned: usize,
}

impl RelationStats {
    /// Documents removed from the output for any reason.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.denied + self.pruned
    }

    fn absorb(&mut self, other: Self) {
        self.denied += other.denied;
        self.cycles += other.cycles;
        self.pruned += other.pruned;
    }
}

pub struct RelationFilter<'a, P: ?Sized> {
    policy: &'a P,
    principals: &'a [Principal],
    permission: &'a str,
    pk_fields: BTreeMap<String, String>,
    max_depth: usize,
}

impl<'a, P> RelationFilter<'a, P>
where
    P: AuthorizationPolicy + ?Sized,
{
    #[must_use]
    pub fn new(policy: &'a P, principals: &'a [Principal]) -> Self {
        Self {
            policy,
            principals,
            permission: PERMISSION_VIEW,
            pk_fields: BTreeMap::new(),
            max_depth: DEFAULT_MAX_RELATION_DEPTH,
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: &'a str) -> Self {
        self.permission = permission;
        self
    }

    /// Primary key field per type name; unlisted types use `id`.
    #[must_use]
    pub fn with_pk_fields(mut self, pk_fields: BTreeMap<String, String>) -> Self {
        self.pk_fields = pk_fields;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether the caller holds the permission on `document` itself.
    #[must_use]
    pub fn is_visible(&self, document: &Document) -> bool {
        let decoded = match document.acl.as_deref().map(objectify_acl).transpose() {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(
                    target: "aclguard::relations",
                    doc_type = %document.doc_type,
                    error = %err,
                    "undecodable ACL; treating document as not visible"
                );
                return false;
            }
        };
        self.policy
            .permits(decoded.as_deref(), self.principals, self.permission)
    }

    /// Single-value filter: `None` when `value` is a document the caller may
    /// not view. Sequences are filtered element-wise; scalars pass through.
    #[must_use]
    pub fn filter_value(&self, value: DocumentValue) -> (Option<DocumentValue>, RelationStats) {
        let mut stats = RelationStats::default();
        let filtered = self.check_value(value, &mut Vec::new(), 0, &mut stats);
        (filtered, stats)
    }

    /// Filter only the relations of an already authorized document.
    #[must_use]
    pub fn filter_relations(&self, document: Document) -> (Document, RelationStats) {
        let mut stats = RelationStats::default();
        let filtered = self.descend(document, &mut Vec::new(), 0, &mut stats);
        (filtered, stats)
    }

    /// Check the document itself, then filter its relations.
    #[must_use]
    pub fn filter_item(&self, document: Document) -> (Option<Document>, RelationStats) {
        let (filtered, stats) = self.filter_value(DocumentValue::from(document));
        let document = match filtered {
            Some(DocumentValue::Embedded(document)) => Some(*document),
            _ => None,
        };
        (document, stats)
    }

    /// Filter each document of a collection, dropping denied ones.
    #[must_use]
    pub fn filter_collection(&self, documents: Vec<Document>) -> (Vec<Document>, RelationStats) {
        let mut totals = RelationStats::default();
        let mut visible = Vec::with_capacity(documents.len());
        for document in documents {
            let (filtered, stats) = self.filter_item(document);
            totals.absorb(stats);
            visible.extend(filtered);
        }
        (visible, totals)
    }

    fn key_of(&self, document: &Document) -> Option<DocumentKey> {
        let pk_field = self
            .pk_fields
            .get(&document.doc_type)
            .map_or(DEFAULT_PK_FIELD, String::as_str);
        document.pk_value(pk_field).map(|id| DocumentKey {
            doc_type: document.doc_type.clone(),
            id,
        })
    }

    fn check_value(
        &self,
        value: DocumentValue,
        path: &mut Vec<DocumentKey>,
        depth: usize,
        stats: &mut RelationStats,
    ) -> Option<DocumentValue> {
        match value {
            DocumentValue::Embedded(document) => {
                if !self.is_visible(&document) {
                    stats.denied += 1;
                    return None;
                }
                let document = self.descend(*document, path, depth, stats);
                Some(DocumentValue::Embedded(Box::new(document)))
            }
            DocumentValue::Sequence(items) => Some(DocumentValue::Sequence(
                items
                    .into_iter()
                    .filter_map(|item| self.check_value(item, path, depth, stats))
                    .collect(),
            )),
            scalar => Some(scalar),
        }
    }

    fn descend(
        &self,
        mut document: Document,
        path: &mut Vec<DocumentKey>,
        depth: usize,
        stats: &mut RelationStats,
    ) -> Document {
        let key = self.key_of(&document);
        let repeated = key.as_ref().is_some_and(|key| path.contains(key));
        if repeated || depth >= self.max_depth {
            if repeated {
                stats.cycles += 1;
            }
            tracing::debug!(
                target: "aclguard::relations",
                doc_type = %document.doc_type,
                depth,
                repeated,
                "not descending; removing embedded documents"
            );
            prune_fields(&mut document, stats);
            return document;
        }

        path.extend(key.clone());
        let fields = std::mem::take(&mut document.fields);
        for (name, value) in fields {
            let filtered = self
                .check_value(value, path, depth + 1, stats)
                .unwrap_or_else(DocumentValue::absent);
            document.fields.insert(name, filtered);
        }
        if key.is_some() {
            path.pop();
        }
        document
    }
}

/// Remove every embedded document below `document` without checking it.
fn prune_fields(document: &mut Document, stats: &mut RelationStats) {
    let fields = std::mem::take(&mut document.fields);
    document.fields = fields
        .into_iter()
        .map(|(name, value)| {
            let value = prune_value(value, stats).unwrap_or_else(DocumentValue::absent);
            (name, value)
        })
        .collect();
}

fn prune_value(value: DocumentValue, stats: &mut RelationStats) -> Option<DocumentValue> {
    match value {
        DocumentValue::Embedded(_) => {
            stats.pruned += 1;
            None
        }
        DocumentValue::Sequence(items) => Some(DocumentValue::Sequence(
            items
                .into_iter()
                .filter_map(|item| prune_value(item, stats))
                .collect(),
        )),
        scalar => Some(scalar),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::AclAuthorizationPolicy;
    use crate::types::Ace;

    fn user(id: &str, acl: Vec<Ace>) -> Document {
        Document::new("User").with_field("id", json!(id)).with_acl(acl)
    }

    fn public() -> Vec<Ace> {
        vec![Ace::new("allow", "everyone", "view")]
    }

    fn principals() -> Vec<Principal> {
        vec![Principal::Everyone, Principal::id("user1")]
    }

    #[test]
    fn denied_relation_becomes_absent() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let hidden = user("2", vec![Ace::new("deny", "user1", "view")]);

        let (value, stats) = filter.filter_value(DocumentValue::from(hidden));
        assert!(value.is_none());
        assert_eq!(stats.denied, 1);

        let (value, _) = filter.filter_value(DocumentValue::Scalar(json!("plain")));
        assert_eq!(value, Some(DocumentValue::Scalar(json!("plain"))));
    }

    #[test]
    fn sequences_drop_and_scalars_null_denied_relations() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let story = Document::new("Story")
            .with_field("id", json!("s1"))
            .with_acl(public())
            .with_field("author", user("2", vec![]))
            .with_field(
                "readers",
                DocumentValue::Sequence(vec![
                    user("3", public()).into(),
                    user("4", vec![Ace::new("allow", "user9", "view")]).into(),
                    DocumentValue::Scalar(json!(17)),
                ]),
            );

        let (filtered, stats) = filter.filter_relations(story);
        assert_eq!(filtered.field("author"), Some(&DocumentValue::absent()));
        let Some(DocumentValue::Sequence(readers)) = filtered.field("readers") else {
            panic!("readers should stay a sequence");
        };
        assert_eq!(readers.len(), 2);
        assert_eq!(
            readers[0].as_document().and_then(|doc| doc.pk_value("id")),
            Some("3".to_string())
        );
        assert_eq!(readers[1], DocumentValue::Scalar(json!(17)));
        assert_eq!(stats.denied, 2);
    }

    #[test]
    fn filtering_is_transitive() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let friend = user("3", public()).with_field("secret", user("4", vec![]));
        let root = user("1", public()).with_field("friend", friend);

        let (filtered, _) = filter.filter_item(root);
        let filtered = filtered.unwrap();
        let friend = filtered
            .field("friend")
            .and_then(DocumentValue::as_document)
            .unwrap();
        assert!(friend.field("secret").unwrap().is_absent());
    }

    #[test]
    fn outer_denial_hides_the_whole_item() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let (filtered, stats) = filter.filter_item(user("1", vec![]));
        assert!(filtered.is_none());
        assert_eq!(stats.denied, 1);
    }

    #[test]
    fn repeated_identity_keeps_no_unchecked_relations() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let secret = user("9", vec![Ace::new("deny", "everyone", "view")])
            .with_field("ssn", json!("123-45"));
        let inner_self = user("1", public()).with_field("hidden", secret);
        let root = user("1", public()).with_field("me", inner_self);

        let (filtered, stats) = filter.filter_item(root);
        let filtered = filtered.unwrap();
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.pruned, 1);
        let me = filtered.field("me").and_then(DocumentValue::as_document).unwrap();
        assert!(me.field("hidden").unwrap().is_absent());
        assert!(!filtered.to_json().to_string().contains("123-45"));
    }

    #[test]
    fn repeated_identity_is_still_checked_itself() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let denied_copy = user("1", vec![Ace::new("deny", "user1", "view")]);
        let root = user("1", public()).with_field("me", denied_copy);

        let (filtered, stats) = filter.filter_relations(root);
        assert!(filtered.field("me").unwrap().is_absent());
        assert_eq!(stats.denied, 1);
    }

    #[test]
    fn max_depth_removes_relations_below_the_cap() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals).with_max_depth(1);
        let child = user("2", public())
            .with_field("hidden", user("9", public()))
            .with_field(
                "crowd",
                DocumentValue::Sequence(vec![user("10", public()).into(), json!("x").into()]),
            );
        let root = user("1", public()).with_field("child", child);

        let (filtered, stats) = filter.filter_relations(root);
        let child = filtered.field("child").and_then(DocumentValue::as_document).unwrap();
        assert!(child.field("hidden").unwrap().is_absent());
        assert_eq!(
            child.field("crowd"),
            Some(&DocumentValue::Sequence(vec![DocumentValue::Scalar(json!("x"))]))
        );
        assert_eq!(stats.pruned, 2);
        assert_eq!(stats.removed(), 2);
    }

    #[test]
    fn nested_sequences_are_filtered() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let root = user("1", public()).with_field(
            "groups",
            DocumentValue::Sequence(vec![DocumentValue::Sequence(vec![
                user("2", vec![]).into(),
                user("3", public()).into(),
            ])]),
        );

        let (filtered, stats) = filter.filter_relations(root);
        let Some(DocumentValue::Sequence(groups)) = filtered.field("groups") else {
            panic!("groups should stay a sequence");
        };
        let DocumentValue::Sequence(members) = &groups[0] else {
            panic!("inner group should stay a sequence");
        };
        assert_eq!(members.len(), 1);
        assert_eq!(stats.denied, 1);
    }

    #[test]
    fn embedded_document_with_unreadable_acl_is_removed() {
        let policy = AclAuthorizationPolicy::default();
        let principals = principals();
        let filter = RelationFilter::new(&policy, &principals);
        let author = user("2", vec![Ace::new("grant", "everyone", "view")])
            .with_field("ssn", json!("123-45"));
        let root = user("1", public()).with_field("author", author);

        let (filtered, stats) = filter.filter_item(root);
        assert!(filtered.unwrap().field("author").unwrap().is_absent());
        assert_eq!(stats.denied, 1);
    }
}
