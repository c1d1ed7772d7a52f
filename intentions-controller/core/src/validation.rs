use crate::{
    identifier::{contains_partial_wildcard, is_wildcard},
    intention::Intention,
};
use std::fmt;

/// The maximum number of meta entries.
pub const META_MAX_KEY_PAIRS: usize = 64;

/// The maximum length of a meta key.
pub const META_KEY_MAX_LENGTH: usize = 128;

/// The maximum length of a meta value or a description.
pub const META_VALUE_MAX_LENGTH: usize = 512;

/// One of the four tuple fields of an intention or query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    SourceNs,
    SourceName,
    DestinationNs,
    DestinationName,
}

/// A single rule an intention breaks.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("{0} must be set")]
    Missing(Field),

    #[error("{0}: wildcard character '*' cannot be used with partial values")]
    PartialWildcard(Field),

    #[error("{0}: exact value cannot follow wildcard namespace")]
    ExactAfterWildcard(Field),

    #[error("Description exceeds maximum length {max}")]
    DescriptionTooLong { max: usize },

    #[error("Meta exceeds maximum element count {max}")]
    TooManyMeta { max: usize },

    #[error("Meta key {key:?} exceeds maximum length {max}")]
    MetaKeyTooLong { key: String, max: usize },

    #[error("Meta value for key {key:?} exceeds maximum length {max}")]
    MetaValueTooLong { key: String, max: usize },

    #[error("Action must be set to 'allow' or 'deny'")]
    InvalidAction,

    #[error("SourceType must be set to 'registry'")]
    InvalidSourceType,
}

/// Every rule an intention breaks, in the order they were checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

// === impl Field ===

impl Field {
    pub const ALL: [Field; 4] = [
        Self::SourceNs,
        Self::SourceName,
        Self::DestinationNs,
        Self::DestinationName,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceNs => "SourceNS",
            Self::SourceName => "SourceName",
            Self::DestinationNs => "DestinationNS",
            Self::DestinationName => "DestinationName",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl Intention ===

impl Intention {
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::SourceNs => &self.source_ns,
            Field::SourceName => &self.source_name,
            Field::DestinationNs => &self.destination_ns,
            Field::DestinationName => &self.destination_name,
        }
    }

    /// Checks that the intention may be inserted or updated.
    ///
    /// All rules are checked so that callers see every problem at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        for field in Field::ALL {
            if self.field(field).is_empty() {
                errors.push(Violation::Missing(field));
            }
        }

        for (ns, name) in [
            (Field::SourceNs, Field::SourceName),
            (Field::DestinationNs, Field::DestinationName),
        ] {
            if contains_partial_wildcard(self.field(ns)) {
                errors.push(Violation::PartialWildcard(ns));
            }

            if !is_wildcard(self.field(name)) {
                if contains_partial_wildcard(self.field(name)) {
                    errors.push(Violation::PartialWildcard(name));
                }
                if is_wildcard(self.field(ns)) {
                    errors.push(Violation::ExactAfterWildcard(name));
                }
            }
        }

        if self.description.len() > META_VALUE_MAX_LENGTH {
            errors.push(Violation::DescriptionTooLong {
                max: META_VALUE_MAX_LENGTH,
            });
        }

        if self.meta.len() > META_MAX_KEY_PAIRS {
            errors.push(Violation::TooManyMeta {
                max: META_MAX_KEY_PAIRS,
            });
        }

        let mut meta = self.meta.iter().collect::<Vec<_>>();
        meta.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        for (k, v) in meta {
            if k.len() > META_KEY_MAX_LENGTH {
                errors.push(Violation::MetaKeyTooLong {
                    key: k.clone(),
                    max: META_KEY_MAX_LENGTH,
                });
            }
            if v.len() > META_VALUE_MAX_LENGTH {
                errors.push(Violation::MetaValueTooLong {
                    key: k.clone(),
                    max: META_VALUE_MAX_LENGTH,
                });
            }
        }

        if self.action.is_none() {
            errors.push(Violation::InvalidAction);
        }

        if self.source_type.is_none() {
            errors.push(Violation::InvalidSourceType);
        }

        errors.into_result()
    }
}

// === impl ValidationErrors ===

impl ValidationErrors {
    fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.0.contains(violation)
    }
}

impl From<Violation> for ValidationErrors {
    fn from(violation: Violation) -> Self {
        Self(vec![violation])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [one] => write!(f, "1 error occurred: {one}"),
            all => {
                write!(f, "{} errors occurred:", all.len())?;
                for (i, v) in all.iter().enumerate() {
                    let sep = if i == 0 { " " } else { "; " };
                    write!(f, "{sep}{v}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}
