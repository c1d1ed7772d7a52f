use crate::{hash::ContentHash, identifier::ServiceName};
use ahash::AHashMap as HashMap;
use chrono::{offset::Utc, DateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Allows or denies connections from a source service to a destination service.
///
/// `precedence` and `hash` are derived from the other fields: every change must be followed by
/// `update_precedence` and `set_hash` before the record is compared or stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Intention {
    /// Generated by the controller when the intention is created.
    #[serde(rename = "ID", default)]
    pub id: String,

    /// Opaque, human-friendly description.
    #[serde(default)]
    pub description: String,

    #[serde(rename = "SourceNS", default)]
    pub source_ns: String,
    #[serde(default)]
    pub source_name: String,

    #[serde(rename = "DestinationNS", default)]
    pub destination_ns: String,
    #[serde(default)]
    pub destination_name: String,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_type: Option<SourceType>,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub action: Option<Action>,

    /// Opaque metadata served back to clients.
    #[serde(default)]
    pub meta: HashMap<String, String>,

    /// Larger values are applied first. Never set by callers; see `update_precedence`.
    #[serde(default)]
    pub precedence: u32,

    /// Set by the store. Never read from the wire.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Set by the store. Never read from the wire.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Digest of the content fields, used to detect changes during replication.
    #[serde(
        default,
        with = "crate::hash::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub hash: Option<ContentHash>,

    #[serde(flatten)]
    pub log_index: LogIndex,
}

/// Log positions assigned by the store that owns the intention.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogIndex {
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
}

/// Whether matching connections are allowed or denied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Deny,
}

/// Where the source of an intention is defined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SourceType {
    /// A service known to the service registry.
    Registry,
}

// === impl Intention ===

impl Intention {
    pub fn source(&self) -> ServiceName {
        ServiceName::new(&self.source_ns, &self.source_name)
    }

    pub fn destination(&self) -> ServiceName {
        ServiceName::new(&self.destination_ns, &self.destination_name)
    }

    /// Copies the intention without its hash.
    ///
    /// The copy is a new record: its hash must be recomputed before it is compared.
    pub fn clone_unhashed(&self) -> Self {
        Self {
            hash: None,
            ..self.clone()
        }
    }

    /// Estimates the encoded size of the intention in bytes.
    pub fn estimate_size(&self) -> usize {
        // A UUID, the log index and the precedence.
        const FIXED: usize = 36 + 16 + 4;

        let meta = self
            .meta
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>();

        FIXED
            + self.description.len()
            + self.source_ns.len()
            + self.source_name.len()
            + self.destination_ns.len()
            + self.destination_name.len()
            + self.source_type.map(SourceType::as_str).unwrap_or("").len()
            + self.action.map(Action::as_str).unwrap_or("").len()
            + meta
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = self
            .action
            .map(|a| a.as_str().to_ascii_uppercase())
            .unwrap_or_default();
        write!(
            f,
            "{} {}/{} => {}/{} (ID: {}, Precedence: {})",
            action,
            self.source_ns,
            self.source_name,
            self.destination_ns,
            self.destination_name,
            self.id,
            self.precedence
        )
    }
}

// === impl Action ===

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            s => Err(format!("invalid action: {s:?}")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl SourceType ===

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registry => "registry",
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(Self::Registry),
            s => Err(format!("invalid source type: {s:?}")),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Decodes an enum field that older encoders write as an empty string when unset.
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
