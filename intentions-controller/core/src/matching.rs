//! Resolves which intentions apply to a query and in what order.
//!
//! All queries run over a snapshot of intentions supplied by the caller; the snapshot must not
//! change while a query runs.

use crate::{
    identifier::ServiceName,
    intention::{Action, Intention, SourceType},
    validation::Field,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A service to match intentions against.
pub type MatchEntry = ServiceName;

/// Which side of an intention a match query is resolved against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Source,
    Destination,
}

/// Finds, for each entry, every intention that applies to it on one side.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatchQuery {
    #[serde(rename = "Type")]
    pub match_type: MatchType,
    pub entries: Vec<MatchEntry>,
}

/// Decides whether a source may connect to a destination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckQuery {
    #[serde(rename = "SourceNS")]
    pub source_ns: String,
    pub source_name: String,
    #[serde(rename = "DestinationNS")]
    pub destination_ns: String,
    pub destination_name: String,
    #[serde(
        default,
        deserialize_with = "crate::intention::empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_type: Option<SourceType>,
}

/// Looks up the intention with exactly these tuples, compared literally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExactQuery {
    #[serde(rename = "SourceNS")]
    pub source_ns: String,
    pub source_name: String,
    #[serde(rename = "DestinationNS")]
    pub destination_ns: String,
    pub destination_name: String,
}

/// A malformed query, reported before any intention is examined.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("missing {}", fmt_fields(.0))]
    Missing(Vec<Field>),

    #[error("match query must include at least one entry")]
    NoEntries,

    #[error("match entry {index} must set a namespace and a name")]
    InvalidEntry { index: usize },

    #[error("unsupported source type")]
    UnsupportedSourceType,
}

/// Orders intentions canonically: highest precedence first.
///
/// Ties are broken by the `(source_ns, source_name, destination_ns, destination_name)` tuple in
/// ascending order. This tie-break is arbitrary, but every node must produce the same total order
/// for the same set of intentions. Callers must not infer priority from it: all intentions at one
/// precedence level apply equally.
pub fn precedence_cmp(a: &Intention, b: &Intention) -> Ordering {
    b.precedence
        .cmp(&a.precedence)
        .then_with(|| a.source_ns.cmp(&b.source_ns))
        .then_with(|| a.source_name.cmp(&b.source_name))
        .then_with(|| a.destination_ns.cmp(&b.destination_ns))
        .then_with(|| a.destination_name.cmp(&b.destination_name))
}

/// Sorts intentions in canonical order.
pub fn sort_by_precedence(intentions: &mut [Intention]) {
    intentions.sort_by(precedence_cmp);
}

fn fmt_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn missing<'a>(fields: impl IntoIterator<Item = (Field, &'a str)>) -> Result<(), QueryError> {
    let missing = fields
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(f, _)| f)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        return Ok(());
    }
    Err(QueryError::Missing(missing))
}

// === impl MatchType ===

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }

    /// Returns the `(namespace, name)` of the intention's side this match type refers to.
    pub fn side(self, intention: &Intention) -> (&str, &str) {
        match self {
            Self::Source => (&intention.source_ns, &intention.source_name),
            Self::Destination => (&intention.destination_ns, &intention.destination_name),
        }
    }
}

// === impl MatchQuery ===

impl MatchQuery {
    pub fn new(match_type: MatchType, entries: impl IntoIterator<Item = MatchEntry>) -> Self {
        Self {
            match_type,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.entries.is_empty() {
            return Err(QueryError::NoEntries);
        }
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.namespace.is_empty() || e.name.is_empty())
        {
            return Err(QueryError::InvalidEntry { index });
        }
        Ok(())
    }

    /// Returns, for each entry in order, every intention that applies to it.
    ///
    /// An entry `ns/name` is matched by intentions naming `ns/name`, `ns/*` or `*/*` on the
    /// queried side. Each list is in canonical order.
    pub fn evaluate(&self, intentions: &[Intention]) -> Result<Vec<Vec<Intention>>, QueryError> {
        self.validate()?;

        let matches = self
            .entries
            .iter()
            .map(|entry| {
                let mut matched = intentions
                    .iter()
                    .filter(|ixn| {
                        let (ns, name) = self.match_type.side(ixn);
                        entry.is_covered_by(ns, name)
                    })
                    .cloned()
                    .collect::<Vec<_>>();
                sort_by_precedence(&mut matched);
                matched
            })
            .collect();
        Ok(matches)
    }
}

// === impl CheckQuery ===

impl CheckQuery {
    pub fn source(&self) -> ServiceName {
        ServiceName::new(&self.source_ns, &self.source_name)
    }

    pub fn destination(&self) -> ServiceName {
        ServiceName::new(&self.destination_ns, &self.destination_name)
    }

    /// Returns the name an authorizer must grant read access to, if any.
    pub fn acl_prefix(&self) -> Option<&str> {
        if self.destination_name.is_empty() {
            return None;
        }
        Some(&self.destination_name)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        missing([
            (Field::SourceNs, self.source_ns.as_str()),
            (Field::SourceName, self.source_name.as_str()),
            (Field::DestinationNs, self.destination_ns.as_str()),
            (Field::DestinationName, self.destination_name.as_str()),
        ])?;
        if self.source_type != Some(SourceType::Registry) {
            return Err(QueryError::UnsupportedSourceType);
        }
        Ok(())
    }

    /// Returns the highest-precedence intention that applies to the connection, if any.
    pub fn evaluate<'i>(
        &self,
        intentions: &'i [Intention],
    ) -> Result<Option<&'i Intention>, QueryError> {
        self.validate()?;

        let source = self.source();
        let destination = self.destination();
        let winner = intentions
            .iter()
            .filter(|ixn| {
                destination.is_covered_by(&ixn.destination_ns, &ixn.destination_name)
                    && source.is_covered_by(&ixn.source_ns, &ixn.source_name)
            })
            .min_by(|a, b| precedence_cmp(a, b));
        Ok(winner)
    }

    /// Returns the action of the winning intention, or `None` when nothing applies and the
    /// caller's default must be used.
    pub fn decide(&self, intentions: &[Intention]) -> Result<Option<Action>, QueryError> {
        Ok(self.evaluate(intentions)?.and_then(|ixn| ixn.action))
    }
}

// === impl ExactQuery ===

impl ExactQuery {
    pub fn validate(&self) -> Result<(), QueryError> {
        missing([
            (Field::SourceNs, self.source_ns.as_str()),
            (Field::SourceName, self.source_name.as_str()),
            (Field::DestinationNs, self.destination_ns.as_str()),
            (Field::DestinationName, self.destination_name.as_str()),
        ])
    }

    pub fn matches(&self, intention: &Intention) -> bool {
        intention.source_ns == self.source_ns
            && intention.source_name == self.source_name
            && intention.destination_ns == self.destination_ns
            && intention.destination_name == self.destination_name
    }

    pub fn find<'i>(
        &self,
        intentions: &'i [Intention],
    ) -> Result<Option<&'i Intention>, QueryError> {
        self.validate()?;
        Ok(intentions.iter().find(|ixn| self.matches(ixn)))
    }
}

impl From<&Intention> for ExactQuery {
    fn from(ixn: &Intention) -> Self {
        Self {
            source_ns: ixn.source_ns.clone(),
            source_name: ixn.source_name.clone(),
            destination_ns: ixn.destination_ns.clone(),
            destination_name: ixn.destination_name.clone(),
        }
    }
}
