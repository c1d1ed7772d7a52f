use crate::intention::{Action, Intention, SourceType};
use blake2::{digest::consts::U32, Blake2b, Digest};
use std::{fmt, str::FromStr};

pub(crate) type Blake2b256 = Blake2b<U32>;

/// A BLAKE2b-256 digest of an intention's content fields.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

#[derive(Debug, thiserror::Error)]
pub enum InvalidHash {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected a 32-byte digest, got {0} bytes")]
    Length(usize),
}

// === impl Intention ===

impl Intention {
    /// Computes the digest of the content fields.
    ///
    /// Timestamps, log indexes and any previous hash are not content. Every string is written
    /// with its length so that moving bytes between adjacent fields changes the digest. Meta
    /// entries are written in key order so the digest does not depend on map iteration order.
    pub fn compute_hash(&self) -> ContentHash {
        fn put(hasher: &mut Blake2b256, s: &str) {
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }

        let mut hasher = Blake2b256::new();
        put(&mut hasher, &self.id);
        put(&mut hasher, &self.description);
        put(&mut hasher, &self.source_ns);
        put(&mut hasher, &self.source_name);
        put(&mut hasher, &self.destination_ns);
        put(&mut hasher, &self.destination_name);
        put(&mut hasher, self.source_type.map(SourceType::as_str).unwrap_or(""));
        put(&mut hasher, self.action.map(Action::as_str).unwrap_or(""));
        hasher.update(u64::from(self.precedence).to_le_bytes());

        let mut meta = self.meta.iter().collect::<Vec<_>>();
        meta.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        hasher.update((meta.len() as u64).to_le_bytes());
        for (k, v) in meta {
            put(&mut hasher, k);
            put(&mut hasher, v);
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        ContentHash(digest)
    }

    /// Stamps the intention with the digest of its current content.
    pub fn set_hash(&mut self) {
        self.hash = Some(self.compute_hash());
    }

    /// Returns true if content has changed since the hash was last set.
    pub fn is_dirty(&self) -> bool {
        self.hash != Some(self.compute_hash())
    }
}

// === impl ContentHash ===

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(digest: [u8; 32]) -> Self {
        Self(digest)
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = InvalidHash;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let digest = <[u8; 32]>::try_from(bytes).map_err(|_| InvalidHash::Length(bytes.len()))?;
        Ok(Self(digest))
    }
}

impl FromStr for ContentHash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex::encode(self.0).fmt(f)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

/// Serde adapter for `Option<ContentHash>`.
///
/// An absent, null or empty hash decodes to `None` rather than to an empty digest.
pub(crate) mod optional {
    use super::ContentHash;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(hash: &Option<ContentHash>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match hash {
            Some(hash) => serializer.collect_str(hash),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ContentHash>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => s.parse().map(Some).map_err(de::Error::custom),
        }
    }
}
