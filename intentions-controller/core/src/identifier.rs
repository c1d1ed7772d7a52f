use serde::{Deserialize, Serialize};
use std::fmt;

/// The token matching any namespace or name.
pub const WILDCARD: &str = "*";

/// The namespace assumed when a caller does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Returns true if the value is the full wildcard.
#[inline]
pub fn is_wildcard(value: &str) -> bool {
    value == WILDCARD
}

/// Returns true if the value embeds the wildcard character without being the wildcard itself.
///
/// Partial wildcards such as `web-*` are never legal.
#[inline]
pub fn contains_partial_wildcard(value: &str) -> bool {
    !is_wildcard(value) && value.contains(WILDCARD)
}

/// Identifies a service, or a set of services when either part is a wildcard.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceName {
    pub namespace: String,
    pub name: String,
}

/// The number of exact parts in a `(namespace, name)` tuple.
///
/// A wildcard namespace implies a wildcard name, so only three shapes exist.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exactness {
    /// `*/*`
    None,
    /// `ns/*`
    Namespace,
    /// `ns/name`
    Full,
}

// === impl ServiceName ===

impl ServiceName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Names the service in the default namespace.
    pub fn in_default_namespace(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_NAMESPACE, name)
    }

    pub fn exactness(&self) -> Exactness {
        Exactness::of(&self.namespace, &self.name)
    }

    /// Lists the tuples an intention may use to cover this service, most specific first.
    ///
    /// `ns/name` is covered by `ns/name`, `ns/*` and `*/*`; wildcarded entries collapse onto the
    /// broader tuples only.
    pub fn covering(&self) -> Vec<(&str, &str)> {
        match self.exactness() {
            Exactness::Full => vec![
                (self.namespace.as_str(), self.name.as_str()),
                (self.namespace.as_str(), WILDCARD),
                (WILDCARD, WILDCARD),
            ],
            Exactness::Namespace => vec![(self.namespace.as_str(), WILDCARD), (WILDCARD, WILDCARD)],
            Exactness::None => vec![(WILDCARD, WILDCARD)],
        }
    }

    /// Returns true if an intention naming `(namespace, name)` covers this service.
    pub fn is_covered_by(&self, namespace: &str, name: &str) -> bool {
        self.covering()
            .into_iter()
            .any(|(ns, n)| ns == namespace && n == name)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl Exactness ===

impl Exactness {
    pub fn of(namespace: &str, name: &str) -> Self {
        // A wildcard may only follow an exact value, so a wildcard namespace leaves nothing exact.
        if is_wildcard(namespace) {
            return Self::None;
        }

        if is_wildcard(name) {
            return Self::Namespace;
        }

        Self::Full
    }

    pub fn count(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Namespace => 1,
            Self::Full => 2,
        }
    }
}
