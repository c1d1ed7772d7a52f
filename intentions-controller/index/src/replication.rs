//! Converges a secondary datacenter's intentions on the primary's.

use ahash::AHashMap as HashMap;
use intentions_controller_core::{ContentHash, Intention};

/// The writes needed to make a local set of intentions match a remote one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diff {
    /// Local intentions whose IDs no longer exist remotely.
    pub deletes: Vec<Intention>,

    /// Remote intentions that are missing locally or whose content hash differs.
    pub updates: Vec<Intention>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty()
    }
}

/// Compares intentions by ID and content hash.
///
/// Only the hash is compared, so bookkeeping such as timestamps and log indexes never causes an
/// update. Output preserves the order of the inputs.
pub fn diff(local: &[Intention], remote: &[Intention]) -> Diff {
    let local_hashes = local
        .iter()
        .map(|ixn| (ixn.id.as_str(), ixn.hash))
        .collect::<HashMap<&str, Option<ContentHash>>>();
    let remote_ids = remote
        .iter()
        .map(|ixn| ixn.id.as_str())
        .collect::<ahash::AHashSet<&str>>();

    let deletes = local
        .iter()
        .filter(|ixn| !remote_ids.contains(ixn.id.as_str()))
        .cloned()
        .collect();

    let updates = remote
        .iter()
        .filter(|ixn| match local_hashes.get(ixn.id.as_str()) {
            Some(hash) => *hash != ixn.hash,
            None => true,
        })
        .cloned()
        .collect();

    Diff { deletes, updates }
}
