//! Document writes that go through the ACL codec.

use std::slice;

use super::AclGuard;
use crate::backend::{AuthorizationPolicy, DocumentStore, SearchIndex};
use crate::types::{AceTuple, AclEntry, Document, DocumentType};
use crate::{AclGuardError, Result};

impl<S, I, P> AclGuard<S, I, P>
where
    S: DocumentStore,
    I: SearchIndex,
    P: AuthorizationPolicy,
{
    /// Save `document`, assigning its type's default ACL when it is new and
    /// carries none. An ACL already present is validated, never replaced.
    pub fn save_document(&mut self, mut document: Document) -> Result<Document> {
        let doc_type = self.store.document_type(&document.doc_type)?;
        let has_acl = document.acl.as_ref().is_some_and(|acl| !acl.is_empty());

        if has_acl {
            if let Some(acl) = &document.acl {
                self.validator.validate_acl(acl)?;
            }
        } else if let Some(default_acl) = &doc_type.default_acl {
            if self.is_new(&doc_type, &document)? {
                let acl = self.validator.encode_acl(default_acl)?;
                tracing::debug!(
                    target: "aclguard::store",
                    doc_type = %doc_type.name,
                    entries = acl.len(),
                    "assigned default ACL"
                );
                document.acl = Some(acl);
            }
        }

        self.store.save(&document)?;
        Ok(document)
    }

    /// Encode `acl`, validate it, and store it on an existing document.
    pub fn set_acl(&mut self, doc_type: &str, id: &str, acl: &[AclEntry]) -> Result<Document> {
        let mut document = self.fetch(doc_type, id)?;
        document.acl = Some(self.validator.encode_acl(acl)?);
        self.store.save(&document)?;
        Ok(document)
    }

    /// Decoded ACL of a stored document.
    pub fn get_acl(&self, doc_type: &str, id: &str) -> Result<Option<Vec<AceTuple>>> {
        let document = self.fetch(doc_type, id)?;
        let pk_field = self.store.document_type(doc_type)?.pk_field;
        document.acl_tuples(&pk_field)
    }

    pub(super) fn fetch(&self, doc_type: &str, id: &str) -> Result<Document> {
        let doc_type = self.store.document_type(doc_type)?;
        self.store
            .get_by_ids(&doc_type, slice::from_ref(&id.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| AclGuardError::Store {
                reason: format!("{}({id}) does not exist", doc_type.name),
            })
    }

    fn is_new(&self, doc_type: &DocumentType, document: &Document) -> Result<bool> {
        let Some(id) = document.pk_value(&doc_type.pk_field) else {
            return Ok(true);
        };
        Ok(self.store.get_by_ids(doc_type, &[id])?.is_empty())
    }
}
