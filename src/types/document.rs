//! Document model shared by the store, the index, and the relationship filter.
//!
//! A value is a document only when it is a JSON object carrying a string
//! `_type` tag. Everything else is a scalar or a sequence and never takes part
//! in authorization.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::acl::{Ace, AceTuple, AclEntry};
use crate::codec::objectify_acl;
use crate::constants::{ACL_FIELD, DEFAULT_PK_FIELD, TYPE_FIELD};
use crate::{AclGuardError, Result};

/// Pure predicate deciding whether a JSON value is document-shaped.
#[must_use]
pub fn is_document(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|object| object.get(TYPE_FIELD))
        .is_some_and(Value::is_string)
}

/// A typed document with its stored ACL split out of the field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub doc_type: String,
    /// Stored ACL; `None` when the document has no ACL yet.
    pub acl: Option<Vec<Ace>>,
    pub fields: BTreeMap<String, DocumentValue>,
}

/// Field value of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    Scalar(Value),
    Sequence(Vec<DocumentValue>),
    Embedded(Box<Document>),
}

impl DocumentValue {
    /// Marker left in place of an embedded document the caller may not view.
    #[must_use]
    pub fn absent() -> Self {
        Self::Scalar(Value::Null)
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Embedded(document) => Some(document),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Embedded(document) => document.to_json(),
        }
    }
}

impl DocumentValue {
    /// Strict conversion: a tagged object anywhere in `value` must parse as a
    /// document.
    pub fn parse(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(Self::parse)
                .collect::<Result<_>>()
                .map(Self::Sequence),
            value if is_document(&value) => {
                Document::from_json(value).map(|document| Self::Embedded(Box::new(document)))
            }
            value => Ok(Self::Scalar(value)),
        }
    }
}

impl From<Value> for DocumentValue {
    /// Lenient conversion for builders. A tagged object that fails to parse
    /// (for example a malformed `_acl`) cannot be authorized, so it becomes
    /// [`DocumentValue::absent`].
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            value if is_document(&value) => match Document::from_json(value) {
                Ok(document) => Self::Embedded(Box::new(document)),
                Err(err) => {
                    tracing::warn!(
                        target: "aclguard::documents",
                        error = %err,
                        "dropping unreadable embedded document"
                    );
                    Self::absent()
                }
            },
            value => Self::Scalar(value),
        }
    }
}

impl From<Document> for DocumentValue {
    fn from(value: Document) -> Self {
        Self::Embedded(Box::new(value))
    }
}

impl Document {
    #[must_use]
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            acl: None,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<DocumentValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_acl(mut self, acl: Vec<Ace>) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Parse a document from its JSON form.
    ///
    /// Embedded documents are parsed the same way; a malformed `_acl` at any
    /// depth is an error.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(AclGuardError::InvalidDocument {
                reason: "document must be a JSON object".into(),
            });
        };
        let doc_type = match object.remove(TYPE_FIELD) {
            Some(Value::String(doc_type)) => doc_type,
            _ => {
                return Err(AclGuardError::InvalidDocument {
                    reason: format!("document is missing a string `{TYPE_FIELD}` tag"),
                });
            }
        };
        let acl = match object.remove(ACL_FIELD) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value::<Vec<Ace>>(raw).map_err(|err| {
                AclGuardError::InvalidDocument {
                    reason: format!("{doc_type} has a malformed `{ACL_FIELD}` field: {err}"),
                }
            })?),
        };
        let fields = object
            .into_iter()
            .map(|(name, value)| Ok((name, DocumentValue::parse(value)?)))
            .collect::<Result<_>>()?;
        Ok(Self {
            doc_type,
            acl,
            fields,
        })
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(TYPE_FIELD.to_string(), Value::String(self.doc_type.clone()));
        if let Some(acl) = &self.acl {
            if let Ok(entries) = serde_json::to_value(acl) {
                object.insert(ACL_FIELD.to_string(), entries);
            }
        }
        for (name, value) in &self.fields {
            object.insert(name.clone(), value.to_json());
        }
        Value::Object(object)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&DocumentValue> {
        self.fields.get(name)
    }

    /// Primary key rendered as a string; numbers are accepted as keys.
    #[must_use]
    pub fn pk_value(&self, pk_field: &str) -> Option<String> {
        match self.fields.get(pk_field)? {
            DocumentValue::Scalar(Value::String(id)) => Some(id.clone()),
            DocumentValue::Scalar(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Stored ACL decoded into tuples; `None` when the document has no ACL.
    pub fn acl_tuples(&self, pk_field: &str) -> Result<Option<Vec<AceTuple>>> {
        let Some(acl) = self.acl.as_deref() else {
            return Ok(None);
        };
        let tuples = objectify_acl(acl)?;
        log::info!(
            "Loaded ACL from database for {}({}={}): {}",
            self.doc_type,
            pk_field,
            self.pk_value(pk_field).unwrap_or_default(),
            acl.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Some(tuples))
    }
}

/// Identity of a document used to detect cycles in relation graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub doc_type: String,
    pub id: String,
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.doc_type, self.id)
    }
}

fn default_pk_field() -> String {
    DEFAULT_PK_FIELD.to_string()
}

fn default_true() -> bool {
    true
}

/// Registered document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub name: String,
    #[serde(default = "default_pk_field")]
    pub pk_field: String,
    /// Whether documents of this type are mirrored into the search index.
    #[serde(default = "default_true")]
    pub indexed: bool,
    /// ACL assigned on first save when a document carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_acl: Option<Vec<AclEntry>>,
}

impl DocumentType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pk_field: default_pk_field(),
            indexed: true,
            default_acl: None,
        }
    }

    #[must_use]
    pub fn not_indexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    #[must_use]
    pub fn with_pk_field(mut self, pk_field: impl Into<String>) -> Self {
        self.pk_field = pk_field.into();
        self
    }

    #[must_use]
    pub fn with_default_acl(mut self, acl: Vec<AclEntry>) -> Self {
        self.default_acl = Some(acl);
        self
    }

    /// Name of the index type this document type is stored under.
    #[must_use]
    pub fn index_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    #[must_use]
    pub fn key_of(&self, document: &Document) -> Option<DocumentKey> {
        document.pk_value(&self.pk_field).map(|id| DocumentKey {
            doc_type: document.doc_type.clone(),
            id,
        })
    }
}
