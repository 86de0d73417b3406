//! Index query construction for ACL filtering.
//!
//! A document is visible when its ACL allows the requested permission (or
//! `all`) to any caller principal and denies it to none. Allow and deny are
//! expressed as two independent `nested` predicates; a single nested clause
//! mixing both would let one ACE satisfy conditions meant for another.

use std::collections::BTreeSet;

use serde_json::{Value, json};

use crate::codec::{stringify_action, stringify_tuples};
use crate::constants::ACL_FIELD;
use crate::types::{Ace, AceTuple, Action, Permission, Principal};

fn acl_path(field: &str) -> String {
    format!("{ACL_FIELD}.{field}")
}

/// Must/must-not fragments produced for one principal set.
#[derive(Debug, Clone, PartialEq)]
pub struct AclQuery {
    pub must: Value,
    pub must_not: Value,
}

impl AclQuery {
    /// Filter clause ready to be merged into a `filtered` query.
    #[must_use]
    pub fn to_filter(&self) -> Value {
        json!({
            "filter": {
                "bool": {
                    "must": self.must,
                    "must_not": self.must_not,
                }
            }
        })
    }
}

/// Synthesize an ACL granting (or denying) `all` and `permission` to every principal.
#[must_use]
pub fn build_acl_from_principals(
    principals: &[Principal],
    action: &Action,
    permission: &str,
) -> Vec<AceTuple> {
    let mut acl = Vec::with_capacity(principals.len() * 2);
    for principal in principals {
        acl.push(AceTuple::new(action.clone(), principal.clone(), Permission::All));
        acl.push(AceTuple::new(
            action.clone(),
            principal.clone(),
            Permission::name(permission),
        ));
    }
    acl
}

/// Bool terms over one stringified ACL: the action, plus the distinct
/// principals and permissions it mentions, sorted.
#[must_use]
pub fn build_acl_bool_terms(acl: &[Ace], action: &Action) -> Vec<Value> {
    let principals: BTreeSet<&str> = acl.iter().map(|ace| ace.principal.as_str()).collect();
    let permissions: BTreeSet<&str> = acl.iter().map(|ace| ace.permission.as_str()).collect();
    vec![
        json!({"term": {acl_path("action"): stringify_action(action)}}),
        json!({"terms": {acl_path("principal"): principals.into_iter().collect::<Vec<_>>()}}),
        json!({"terms": {acl_path("permission"): permissions.into_iter().collect::<Vec<_>>()}}),
    ]
}

fn nested_bool_filter(terms: Vec<Value>) -> Value {
    json!({
        "nested": {
            "path": ACL_FIELD,
            "filter": {"bool": {"must": terms}},
        }
    })
}

/// Build the allow/deny filter for `principals` requesting `permission`.
#[must_use]
pub fn build_acl_query(principals: &[Principal], permission: &str) -> AclQuery {
    let allowed_acl = stringify_tuples(&build_acl_from_principals(
        principals,
        &Action::Allow,
        permission,
    ));
    let denied_acl = stringify_tuples(&build_acl_from_principals(
        principals,
        &Action::Deny,
        permission,
    ));

    AclQuery {
        must: nested_bool_filter(build_acl_bool_terms(&allowed_acl, &Action::Allow)),
        must_not: nested_bool_filter(build_acl_bool_terms(&denied_acl, &Action::Deny)),
    }
}

/// Search body matching documents whose ACL holds exactly `ace`.
#[must_use]
pub fn ace_match_body(ace: &Ace) -> Value {
    let must = vec![
        json!({"term": {acl_path("action"): ace.action}}),
        json!({"term": {acl_path("principal"): ace.principal}}),
        json!({"term": {acl_path("permission"): ace.permission}}),
    ];
    json!({
        "query": {
            "filtered": {
                "filter": nested_bool_filter(must),
            }
        }
    })
}

/// Wrap an existing search body so its query runs under the ACL filter.
///
/// `{"query": Q}` becomes `{"query": {"filtered": {"query": Q, "filter": F}}}`;
/// a body without a query gets only the filter.
#[must_use]
pub fn apply_acl_filter(body: Option<Value>, acl_query: &AclQuery) -> Value {
    let mut filtered = serde_json::Map::new();
    if let Some(query) = body.and_then(|mut body| body.get_mut("query").map(Value::take)) {
        filtered.insert("query".to_string(), query);
    }
    if let Value::Object(filter) = acl_query.to_filter() {
        filtered.extend(filter);
    }
    json!({"query": {"filtered": Value::Object(filtered)}})
}

/// Index mapping for the ACL field.
#[must_use]
pub fn acl_index_mapping() -> Value {
    json!({
        "type": "nested",
        "properties": {
            "action": {"type": "string"},
            "principal": {"type": "string", "index": "not_analyzed"},
            "permission": {"type": "string"},
        }
    })
}
