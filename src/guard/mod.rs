//! Core `AclGuard` type tying the codec and query builder to injected backends.

mod bulk;
mod documents;
pub mod relations;
mod search;

use std::collections::BTreeMap;

use crate::backend::{AclAuthorizationPolicy, AuthorizationPolicy, DocumentStore, SearchIndex};
use crate::codec::AclValidator;
use crate::types::{DocumentType, GuardConfig};
use crate::{AclGuardError, Result};

pub use bulk::{extract_ids, replace_ace};
pub use relations::{RelationFilter, RelationStats};

/// ACL engine over a document store, a search index, and an authorization policy.
pub struct AclGuard<S, I, P = AclAuthorizationPolicy> {
    store: S,
    index: I,
    policy: P,
    config: GuardConfig,
    validator: AclValidator,
}

impl<S, I> AclGuard<S, I, AclAuthorizationPolicy>
where
    S: DocumentStore,
    I: SearchIndex,
{
    #[must_use]
    pub fn new(store: S, index: I) -> Self {
        let config = GuardConfig::default();
        Self {
            store,
            index,
            policy: AclAuthorizationPolicy::default(),
            validator: AclValidator::from_config(&config),
            config,
        }
    }
}

impl<S, I, P> AclGuard<S, I, P>
where
    S: DocumentStore,
    I: SearchIndex,
    P: AuthorizationPolicy,
{
    /// Replace the authorization policy.
    #[must_use]
    pub fn with_policy<Q: AuthorizationPolicy>(self, policy: Q) -> AclGuard<S, I, Q> {
        AclGuard {
            store: self.store,
            index: self.index,
            policy,
            config: self.config,
            validator: self.validator,
        }
    }

    pub fn with_config(mut self, config: GuardConfig) -> Result<Self> {
        config.validate()?;
        self.validator = AclValidator::from_config(&config);
        self.config = config;
        Ok(self)
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[must_use]
    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut I {
        &mut self.index
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    #[must_use]
    pub fn validator(&self) -> &AclValidator {
        &self.validator
    }

    #[must_use]
    pub fn into_parts(self) -> (S, I) {
        (self.store, self.index)
    }

    /// Resolve type names against the store; `None` means every registered type.
    fn resolve_types(&self, names: Option<&[String]>) -> Result<Vec<DocumentType>> {
        match names {
            None => Ok(self.store.document_types()),
            Some(names) => names
                .iter()
                .map(|name| self.store.document_type(name))
                .collect(),
        }
    }

    /// Primary key field per registered type, used to identify embedded documents.
    fn pk_fields(&self) -> BTreeMap<String, String> {
        self.store
            .document_types()
            .into_iter()
            .map(|doc_type| (doc_type.name, doc_type.pk_field))
            .collect()
    }
}

/// Index type names of the indexed types; errors when there are none.
fn indexed_type_names(doc_types: &[DocumentType]) -> Result<Vec<String>> {
    let names: Vec<String> = doc_types
        .iter()
        .filter(|doc_type| doc_type.indexed)
        .map(DocumentType::index_name)
        .collect();
    if names.is_empty() {
        return Err(AclGuardError::NoIndexedTypes {
            types: doc_types
                .iter()
                .map(|doc_type| doc_type.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        });
    }
    Ok(names)
}
