//! Request and response shapes exchanged with the store and request cache.

use crate::{
    hash::Blake2b256,
    intention::Intention,
    matching::{CheckQuery, ExactQuery, MatchQuery},
};
use blake2::Digest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The kind of write an `IntentionRequest` performs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionOp {
    Create,
    Update,
    Delete,
}

/// Creates, updates or deletes an intention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntentionRequest {
    #[serde(default)]
    pub datacenter: String,
    pub op: IntentionOp,
    pub intention: Intention,
    #[serde(default)]
    pub token: String,
}

/// Options shared by all read requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub token: String,

    /// Blocks until the store index exceeds this value.
    #[serde(default)]
    pub min_query_index: u64,

    /// Bounds how long a blocking query may wait.
    #[serde(default)]
    pub max_query_time: Duration,
}

/// Reads intentions.
///
/// Exactly one of `intention_id`, `match_query`, `check` and `exact` is expected to be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntentionQueryRequest {
    #[serde(default)]
    pub datacenter: String,

    #[serde(rename = "IntentionID", default, skip_serializing_if = "Option::is_none")]
    pub intention_id: Option<String>,

    /// Finds intentions that apply to services, resolving wildcards.
    #[serde(rename = "Match", default, skip_serializing_if = "Option::is_none")]
    pub match_query: Option<MatchQuery>,

    /// Decides whether a connection is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckQuery>,

    /// Looks an intention up by its tuples instead of its ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<ExactQuery>,

    #[serde(flatten)]
    pub options: QueryOptions,
}

/// Describes how a request may be cached.
///
/// A request without a key is never cached and is always forwarded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub token: String,
    pub datacenter: String,
    pub key: Option<String>,
    pub min_index: u64,
    pub timeout: Duration,
}

/// Intentions returned by a read, with the store index they were read at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexedIntentions {
    pub intentions: Vec<Intention>,
    pub index: u64,
}

/// One list of intentions per match entry, with the store index they were read at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexedIntentionMatches {
    pub matches: Vec<Vec<Intention>>,
    pub index: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckResponse {
    pub allowed: bool,
}

// === impl IntentionOp ===

impl IntentionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for IntentionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl IntentionRequest ===

impl IntentionRequest {
    pub fn new(op: IntentionOp, intention: Intention) -> Self {
        Self {
            datacenter: String::new(),
            op,
            intention,
            token: String::new(),
        }
    }
}

// === impl IntentionQueryRequest ===

impl IntentionQueryRequest {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            intention_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn matching(query: MatchQuery) -> Self {
        Self {
            match_query: Some(query),
            ..Default::default()
        }
    }

    pub fn checking(query: CheckQuery) -> Self {
        Self {
            check: Some(query),
            ..Default::default()
        }
    }

    pub fn exact(query: ExactQuery) -> Self {
        Self {
            exact: Some(query),
            ..Default::default()
        }
    }

    /// Describes how the request may be cached. Only match queries are cacheable.
    pub fn cache_info(&self) -> RequestInfo {
        let Some(query) = self.match_query.as_ref() else {
            return RequestInfo::default();
        };

        RequestInfo {
            token: self.options.token.clone(),
            datacenter: self.datacenter.clone(),
            key: Some(query.cache_key()),
            min_index: self.options.min_query_index,
            timeout: self.options.max_query_time,
        }
    }
}

// === impl MatchQuery ===

impl MatchQuery {
    /// Derives a stable key from the query's shape.
    ///
    /// The query is written in a fixed canonical encoding (type tag, then each entry's
    /// length-prefixed namespace and name in order) before hashing, so the key does not depend
    /// on how any particular encoder lays out the struct.
    pub fn cache_key(&self) -> String {
        fn put(hasher: &mut Blake2b256, value: &str) {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }

        let mut hasher = Blake2b256::new();
        put(&mut hasher, self.match_type.as_str());
        hasher.update((self.entries.len() as u64).to_le_bytes());
        for entry in &self.entries {
            put(&mut hasher, &entry.namespace);
            put(&mut hasher, &entry.name);
        }

        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        format!("{:x}", u64::from_le_bytes(head))
    }
}
