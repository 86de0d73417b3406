//! In-memory document store and search index.
//!
//! The index is a snapshot of the store taken by [`MemoryIndex::from_store`];
//! later writes to the store are not visible until the index is rebuilt,
//! which mirrors an index that lags its store. The index evaluates the query
//! shapes this crate emits: `filtered`, `bool`, `nested`, `term`, `terms`,
//! and `match_all`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{DocumentStore, SearchIndex};
use crate::types::{Document, DocumentKey, DocumentType};
use crate::{AclGuardError, Result};

/// Serialized form of a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub types: Vec<DocumentType>,
    #[serde(default)]
    pub documents: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    types: BTreeMap<String, DocumentType>,
    documents: BTreeMap<DocumentKey, Document>,
    writes: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(&mut self, doc_type: DocumentType) {
        self.types.insert(doc_type.name.clone(), doc_type);
    }

    #[must_use]
    pub fn with_type(mut self, doc_type: DocumentType) -> Self {
        self.register_type(doc_type);
        self
    }

    /// Insert a document without counting it as a write.
    pub fn insert(&mut self, document: Document) -> Result<()> {
        let key = self.key_for(&document)?;
        self.documents.insert(key, document);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, doc_type: &str, id: &str) -> Option<&Document> {
        self.documents.get(&DocumentKey {
            doc_type: doc_type.to_string(),
            id: id.to_string(),
        })
    }

    #[must_use]
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Number of `save` calls that reached the store.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut store = Self::new();
        for doc_type in snapshot.types {
            store.register_type(doc_type);
        }
        for raw in snapshot.documents {
            store.insert(Document::from_json(raw)?)?;
        }
        Ok(store)
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            types: self.types.values().cloned().collect(),
            documents: self.documents.values().map(Document::to_json).collect(),
        }
    }

    /// Load a store from a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs_err::read_to_string(path.as_ref())?;
        Self::from_snapshot(serde_json::from_str(&raw)?)
    }

    /// Write the store back as JSON, replacing the file atomically.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.snapshot())?;
        let mut file = AtomicWriteFile::open(path.as_ref())?;
        file.write_all(&bytes)?;
        file.commit()?;
        Ok(())
    }

    fn key_for(&self, document: &Document) -> Result<DocumentKey> {
        let doc_type = self.document_type(&document.doc_type)?;
        doc_type
            .key_of(document)
            .ok_or_else(|| AclGuardError::InvalidDocument {
                reason: format!(
                    "{} document has no `{}` primary key",
                    doc_type.name, doc_type.pk_field
                ),
            })
    }
}

impl DocumentStore for MemoryStore {
    fn document_types(&self) -> Vec<DocumentType> {
        self.types.values().cloned().collect()
    }

    fn document_type(&self, name: &str) -> Result<DocumentType> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| AclGuardError::UnknownDocumentType {
                name: name.to_string(),
            })
    }

    fn get_by_ids(&self, doc_type: &DocumentType, ids: &[String]) -> Result<Vec<Document>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.get(&doc_type.name, id).cloned())
            .collect())
    }

    fn save(&mut self, document: &Document) -> Result<()> {
        let key = self.key_for(document)?;
        tracing::debug!(target: "aclguard::store", document = %key, "saving document");
        self.documents.insert(key, document.clone());
        self.writes += 1;
        Ok(())
    }
}

/// Snapshot index over indexed document types, keyed by index type name.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    documents: BTreeMap<String, Vec<Value>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every document of every indexed type currently in `store`.
    #[must_use]
    pub fn from_store(store: &MemoryStore) -> Self {
        let mut index = Self::new();
        for document in store.documents() {
            if let Some(doc_type) = store.types.get(&document.doc_type) {
                if doc_type.indexed {
                    index.insert(&doc_type.index_name(), document);
                }
            }
        }
        index
    }

    pub fn insert(&mut self, index_type: &str, document: &Document) {
        self.documents
            .entry(index_type.to_string())
            .or_default()
            .push(document.to_json());
    }
}

impl SearchIndex for MemoryIndex {
    fn search(&self, index_types: &[String], body: &Value) -> Result<Vec<Document>> {
        let mut hits = Vec::new();
        for index_type in index_types {
            let Some(documents) = self.documents.get(index_type) else {
                continue;
            };
            for raw in documents {
                if body_matches(raw, body)? {
                    hits.push(Document::from_json(raw.clone())?);
                }
            }
        }
        Ok(hits)
    }

    fn count(&self, index_types: &[String], body: &Value) -> Result<u64> {
        Ok(self.search(index_types, body)?.len() as u64)
    }
}

fn invalid_query(reason: impl Into<String>) -> AclGuardError {
    AclGuardError::InvalidQuery {
        reason: reason.into(),
    }
}

fn body_matches(document: &Value, body: &Value) -> Result<bool> {
    match body.get("query") {
        Some(query) => clause_matches(document, query, None),
        None => Ok(true),
    }
}

/// Evaluate one query/filter clause against `scope`, which is either the
/// document or, inside `nested`, one element of the nested array.
fn clause_matches(scope: &Value, clause: &Value, nested_path: Option<&str>) -> Result<bool> {
    let Some(object) = clause.as_object() else {
        return Err(invalid_query(format!("clause must be an object: {clause}")));
    };
    let mut entries = object.iter();
    let (Some((kind, spec)), None) = (entries.next(), entries.next()) else {
        return Err(invalid_query(format!(
            "clause must have exactly one key: {clause}"
        )));
    };

    match kind.as_str() {
        "match_all" => Ok(true),
        "filtered" => {
            for part in ["query", "filter"] {
                if let Some(inner) = spec.get(part) {
                    if !clause_matches(scope, inner, nested_path)? {
                        return Ok(false);
                    }
                }
            }
            Ok(true)
        }
        "bool" => {
            for inner in clause_list(spec.get("must")) {
                if !clause_matches(scope, inner, nested_path)? {
                    return Ok(false);
                }
            }
            for inner in clause_list(spec.get("must_not")) {
                if clause_matches(scope, inner, nested_path)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "nested" => {
            let path = spec
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid_query("nested clause requires a string `path`"))?;
            let inner = spec
                .get("filter")
                .or_else(|| spec.get("query"))
                .ok_or_else(|| invalid_query("nested clause requires `filter` or `query`"))?;
            let Some(Value::Array(elements)) = resolve_field(scope, path, nested_path) else {
                return Ok(false);
            };
            for element in elements {
                if clause_matches(element, inner, Some(path))? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        "term" => {
            let (field, expected) = single_field(spec, kind)?;
            Ok(field_holds(scope, field, nested_path, |value| value == expected))
        }
        "terms" => {
            let (field, expected) = single_field(spec, kind)?;
            let Some(candidates) = expected.as_array() else {
                return Err(invalid_query(format!("`terms` on {field} needs an array")));
            };
            Ok(field_holds(scope, field, nested_path, |value| {
                candidates.contains(value)
            }))
        }
        other => Err(invalid_query(format!("unsupported clause `{other}`"))),
    }
}

fn clause_list(spec: Option<&Value>) -> Vec<&Value> {
    match spec {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

fn single_field<'a>(spec: &'a Value, kind: &str) -> Result<(&'a str, &'a Value)> {
    let object = spec
        .as_object()
        .filter(|object| object.len() == 1)
        .ok_or_else(|| invalid_query(format!("`{kind}` needs exactly one field")))?;
    object
        .iter()
        .next()
        .map(|(field, value)| (field.as_str(), value))
        .ok_or_else(|| invalid_query(format!("`{kind}` needs exactly one field")))
}

/// Whether the field (or any element of an array field) satisfies `predicate`.
fn field_holds(
    scope: &Value,
    field: &str,
    nested_path: Option<&str>,
    predicate: impl Fn(&Value) -> bool,
) -> bool {
    match resolve_field(scope, field, nested_path) {
        Some(Value::Array(values)) => values.iter().any(&predicate),
        Some(value) => predicate(value),
        None => false,
    }
}

fn resolve_field<'a>(scope: &'a Value, field: &str, nested_path: Option<&str>) -> Option<&'a Value> {
    let relative = nested_path
        .and_then(|path| field.strip_prefix(path))
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(field);
    relative
        .split('.')
        .try_fold(scope, |value, segment| value.get(segment))
}
