//! Bulk ACE lookup and replacement across document types.
//!
//! The index is only used to locate candidates. Documents are re-fetched from
//! the store before mutation, and a document whose stored ACL no longer holds
//! the ACE is skipped with a warning rather than failing the batch.

use std::collections::BTreeMap;
use std::slice;

use tracing::instrument;

use super::{AclGuard, indexed_type_names};
use crate::backend::{AuthorizationPolicy, DocumentStore, SearchIndex};
use crate::query::ace_match_body;
use crate::types::{Ace, AceCount, AceUpdateReport, Document, DocumentType};
use crate::{AclGuardError, Result};

impl<S, I, P> AclGuard<S, I, P>
where
    S: DocumentStore,
    I: SearchIndex,
    P: AuthorizationPolicy,
{
    /// Count documents holding `ace`, per resolved type.
    ///
    /// Types that are not search-indexed report [`AceCount::NotApplicable`];
    /// a type set without any indexed type is an error.
    pub fn count_ace(&self, ace: &Ace, types: Option<&[String]>) -> Result<Vec<(String, AceCount)>> {
        let doc_types = self.resolve_types(types)?;
        indexed_type_names(&doc_types)?;
        let body = ace_match_body(ace);

        let mut counts = Vec::with_capacity(doc_types.len());
        for doc_type in doc_types {
            let count = if doc_type.indexed {
                AceCount::Matched(self.index.count(&[doc_type.index_name()], &body)?)
            } else {
                AceCount::NotApplicable
            };
            counts.push((doc_type.name, count));
        }
        tracing::debug!(target: "aclguard::bulk", %ace, types = counts.len(), "counted ACE");
        Ok(counts)
    }

    /// Index hits holding exactly `ace` across the resolved types.
    pub fn find_by_ace(&self, ace: &Ace, types: Option<&[String]>) -> Result<Vec<Document>> {
        let doc_types = self.resolve_types(types)?;
        self.find_in(ace, &doc_types)
    }

    /// Replace every occurrence of `from_ace` with `to_ace` in the ACLs of
    /// matching documents. `to_ace` is validated before anything is read.
    #[instrument(target = "aclguard::bulk", skip_all, fields(from = %from_ace, to = %to_ace))]
    pub fn update_ace(
        &mut self,
        from_ace: &Ace,
        to_ace: &Ace,
        types: Option<&[String]>,
    ) -> Result<AceUpdateReport> {
        self.validator.validate_acl(slice::from_ref(to_ace))?;

        let doc_types = self.resolve_types(types)?;
        let documents = self.find_in(from_ace, &doc_types)?;
        let mut report = AceUpdateReport {
            matched: documents.len(),
            ..AceUpdateReport::default()
        };

        let grouped = self.group_by_type(documents, &doc_types)?;
        for (doc_type, ids) in extract_ids(grouped)? {
            let items = self.store.get_by_ids(&doc_type, &ids)?;
            for mut item in items {
                let id = item.pk_value(&doc_type.pk_field).unwrap_or_default();
                tracing::debug!(
                    target: "aclguard::bulk",
                    doc_type = %doc_type.name,
                    %id,
                    "updating ACE"
                );
                let mut acl = item.acl.clone().unwrap_or_default();
                if replace_ace(&mut acl, from_ace, to_ace) == 0 {
                    tracing::warn!(
                        target: "aclguard::bulk",
                        ace = %from_ace,
                        doc_type = %doc_type.name,
                        %id,
                        "ACE not found in document"
                    );
                    report.skipped += 1;
                    continue;
                }
                item.acl = Some(acl);
                self.store.save(&item)?;
                report.updated += 1;
            }
        }
        Ok(report)
    }

    fn find_in(&self, ace: &Ace, doc_types: &[DocumentType]) -> Result<Vec<Document>> {
        let index_types = indexed_type_names(doc_types)?;
        let documents = self.index.search(&index_types, &ace_match_body(ace))?;
        tracing::debug!(
            target: "aclguard::bulk",
            %ace,
            found = documents.len(),
            "found documents that match ACE"
        );
        Ok(documents)
    }

    /// Group documents by their type tag, resolving tags outside `known`
    /// through the store.
    fn group_by_type(
        &self,
        documents: Vec<Document>,
        known: &[DocumentType],
    ) -> Result<Vec<(DocumentType, Vec<Document>)>> {
        let mut types: BTreeMap<String, DocumentType> = known
            .iter()
            .map(|doc_type| (doc_type.name.clone(), doc_type.clone()))
            .collect();
        let mut grouped: BTreeMap<String, Vec<Document>> = BTreeMap::new();
        for document in documents {
            if !types.contains_key(&document.doc_type) {
                let doc_type = self.store.document_type(&document.doc_type)?;
                types.insert(doc_type.name.clone(), doc_type);
            }
            grouped
                .entry(document.doc_type.clone())
                .or_default()
                .push(document);
        }
        Ok(grouped
            .into_iter()
            .filter_map(|(name, documents)| {
                types.remove(&name).map(|doc_type| (doc_type, documents))
            })
            .collect())
    }
}

/// Replace grouped documents by their primary keys.
pub fn extract_ids(
    grouped: Vec<(DocumentType, Vec<Document>)>,
) -> Result<Vec<(DocumentType, Vec<String>)>> {
    grouped
        .into_iter()
        .map(|(doc_type, documents)| {
            let ids = documents
                .iter()
                .map(|document| {
                    document.pk_value(&doc_type.pk_field).ok_or_else(|| {
                        AclGuardError::InvalidDocument {
                            reason: format!(
                                "{} hit has no `{}` primary key",
                                doc_type.name, doc_type.pk_field
                            ),
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((doc_type, ids))
        })
        .collect()
}

/// Replace every occurrence of `from` in `acl` in place; returns how many.
pub fn replace_ace(acl: &mut [Ace], from: &Ace, to: &Ace) -> usize {
    let mut replaced = 0;
    for ace in acl.iter_mut().filter(|ace| **ace == *from) {
        *ace = to.clone();
        replaced += 1;
    }
    replaced
}
