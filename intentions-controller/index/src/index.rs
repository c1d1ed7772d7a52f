use crate::{replication::Diff, Error, IndexMetrics, IntentionOp};
use ahash::AHashMap as HashMap;
use chrono::Utc;
use intentions_controller_core::{
    request::{IndexedIntentionMatches, IndexedIntentions},
    sort_by_precedence, Action, CheckQuery, ExactQuery, Intention, LogIndex, MatchQuery,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

pub type SharedIndex = Arc<RwLock<Index>>;

/// Holds all intentions keyed by ID.
pub struct Index {
    by_id: HashMap<String, Intention>,

    /// Rebuilt on every write so that readers never observe a partial update.
    snapshot: Arc<[Intention]>,

    index: u64,
    index_tx: watch::Sender<u64>,

    metrics: IndexMetrics,
}

/// An immutable, canonically ordered view of the index at a point in time.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub intentions: Arc<[Intention]>,
    pub index: u64,
}

// === impl Index ===

impl Index {
    pub fn new(metrics: IndexMetrics) -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            by_id: HashMap::default(),
            snapshot: Arc::from(Vec::new()),
            index: 0,
            index_tx,
            metrics,
        }
    }

    pub fn shared(metrics: IndexMetrics) -> SharedIndex {
        Arc::new(RwLock::new(Self::new(metrics)))
    }

    /// Applies a single write, returning the index at which it was applied.
    ///
    /// Creates and updates are validated and have their precedence and hash recomputed; any
    /// precedence or hash carried by the caller is overwritten. Deletes only consult the ID.
    pub fn apply(&mut self, op: IntentionOp, intention: Intention) -> Result<u64, Error> {
        let index = self.index + 1;
        let id = intention.id.clone();
        let by_id = match self.stage(vec![(op, intention)], index) {
            Ok(by_id) => by_id,
            Err((op, error)) => {
                tracing::info!(%op, %id, %error, "Rejected intention");
                self.metrics.rejected(op, &error);
                return Err(error);
            }
        };

        tracing::debug!(%op, %id, index, "Applied intention");
        self.metrics.applied(op);
        self.commit(by_id, index);
        Ok(index)
    }

    /// Applies the writes needed to converge on a remote set of intentions.
    ///
    /// The diff is applied as a single write: either every delete and update takes effect at
    /// the same index or none does. Uniqueness is checked against the resulting set, so tuples
    /// may move between IDs within one diff.
    pub fn apply_diff(&mut self, diff: Diff) -> Result<u64, Error> {
        if diff.is_empty() {
            return Ok(self.index);
        }

        let Diff { deletes, updates } = diff;
        tracing::debug!(
            deletes = deletes.len(),
            updates = updates.len(),
            "Applying replicated intentions"
        );

        let writes = deletes
            .into_iter()
            .map(|ixn| (IntentionOp::Delete, ixn))
            .chain(updates.into_iter().map(|ixn| {
                let op = if self.by_id.contains_key(&ixn.id) {
                    IntentionOp::Update
                } else {
                    IntentionOp::Create
                };
                (op, ixn)
            }))
            .collect::<Vec<_>>();
        let ops = writes.iter().map(|(op, _)| *op).collect::<Vec<_>>();

        let index = self.index + 1;
        let by_id = match self.stage(writes, index) {
            Ok(by_id) => by_id,
            Err((op, error)) => {
                tracing::info!(%op, %error, "Rejected replicated intentions");
                self.metrics.rejected(op, &error);
                return Err(error);
            }
        };

        tracing::debug!(writes = ops.len(), index, "Applied replicated intentions");
        for op in ops {
            self.metrics.applied(op);
        }
        self.commit(by_id, index);
        Ok(index)
    }

    pub fn get(&self, id: &str) -> Option<Intention> {
        self.by_id.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The index of the most recent write.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Lists every intention in canonical order.
    pub fn list(&self) -> IndexedIntentions {
        IndexedIntentions {
            intentions: self.snapshot.to_vec(),
            index: self.index,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            intentions: self.snapshot.clone(),
            index: self.index,
        }
    }

    /// Watches the index of the most recent write.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.index_tx.subscribe()
    }

    pub fn exact(&self, query: &ExactQuery) -> Result<Option<Intention>, Error> {
        self.snapshot().exact(query)
    }

    pub fn matches(&self, query: &MatchQuery) -> Result<IndexedIntentionMatches, Error> {
        self.snapshot().matches(query)
    }

    pub fn check(&self, query: &CheckQuery) -> Result<Option<Action>, Error> {
        self.snapshot().check(query)
    }

    /// Applies writes to a copy of the intentions, all at the same index.
    ///
    /// Fails with the op of the offending write if any write is rejected or if the resulting set
    /// holds two intentions with the same tuples. The live index is never modified.
    fn stage(
        &self,
        writes: Vec<(IntentionOp, Intention)>,
        index: u64,
    ) -> Result<HashMap<String, Intention>, (IntentionOp, Error)> {
        let mut by_id = self.by_id.clone();
        let mut written = HashMap::with_capacity(writes.len());
        for (op, intention) in writes {
            let id = intention.id.clone();
            let res = match op {
                IntentionOp::Create => create(&mut by_id, intention, index),
                IntentionOp::Update => update(&mut by_id, intention, index),
                IntentionOp::Delete => delete(&mut by_id, &intention.id),
            };
            res.map_err(|error| (op, error))?;
            if op != IntentionOp::Delete {
                written.insert(id, op);
            }
        }

        ensure_unique(&by_id, &written)?;
        Ok(by_id)
    }

    fn commit(&mut self, by_id: HashMap<String, Intention>, index: u64) {
        let mut intentions = by_id.values().cloned().collect::<Vec<_>>();
        sort_by_precedence(&mut intentions);
        self.by_id = by_id;
        self.snapshot = intentions.into();
        self.index = index;
        self.metrics.set_size(self.by_id.len());
        self.index_tx.send_replace(index);
    }
}

fn create(
    by_id: &mut HashMap<String, Intention>,
    mut intention: Intention,
    index: u64,
) -> Result<(), Error> {
    if intention.id.is_empty() {
        return Err(Error::MissingId);
    }
    if by_id.contains_key(&intention.id) {
        return Err(Error::AlreadyExists(intention.id));
    }
    prepare(&mut intention)?;

    let now = Utc::now();
    intention.created_at = Some(now);
    intention.updated_at = Some(now);
    intention.log_index = LogIndex {
        create_index: index,
        modify_index: index,
    };
    by_id.insert(intention.id.clone(), intention);
    Ok(())
}

fn update(
    by_id: &mut HashMap<String, Intention>,
    mut intention: Intention,
    index: u64,
) -> Result<(), Error> {
    if intention.id.is_empty() {
        return Err(Error::MissingId);
    }
    let (created_at, create_index) = match by_id.get(&intention.id) {
        Some(existing) => (existing.created_at, existing.log_index.create_index),
        None => return Err(Error::NotFound(intention.id)),
    };
    prepare(&mut intention)?;

    intention.created_at = created_at;
    intention.updated_at = Some(Utc::now());
    intention.log_index = LogIndex {
        create_index,
        modify_index: index,
    };
    by_id.insert(intention.id.clone(), intention);
    Ok(())
}

fn delete(by_id: &mut HashMap<String, Intention>, id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::MissingId);
    }
    match by_id.remove(id) {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(id.to_string())),
    }
}

/// Validates the intention and derives its precedence and hash.
fn prepare(intention: &mut Intention) -> Result<(), Error> {
    intention.validate()?;
    intention.update_precedence();
    intention.set_hash();
    Ok(())
}

/// Ensures that no two intentions cover the same pair of tuples.
///
/// A collision is reported against the write that caused it, naming the other intention.
fn ensure_unique(
    by_id: &HashMap<String, Intention>,
    written: &HashMap<String, IntentionOp>,
) -> Result<(), (IntentionOp, Error)> {
    let mut by_tuple = HashMap::with_capacity(by_id.len());
    for ixn in by_id.values() {
        let key = (
            ixn.source_ns.as_str(),
            ixn.source_name.as_str(),
            ixn.destination_ns.as_str(),
            ixn.destination_name.as_str(),
        );
        let Some(other) = by_tuple.insert(key, ixn) else {
            continue;
        };
        let (op, existing) = match (written.get(&ixn.id), written.get(&other.id)) {
            (Some(op), _) => (*op, other),
            (None, Some(op)) => (*op, ixn),
            (None, None) => continue,
        };
        return Err((op, Error::Duplicate(existing.to_string())));
    }
    Ok(())
}

// === impl Snapshot ===

impl Snapshot {
    /// Finds the intention with exactly the queried tuples.
    pub fn exact(&self, query: &ExactQuery) -> Result<Option<Intention>, Error> {
        Ok(query.find(&self.intentions)?.cloned())
    }

    pub fn matches(&self, query: &MatchQuery) -> Result<IndexedIntentionMatches, Error> {
        Ok(IndexedIntentionMatches {
            matches: query.evaluate(&self.intentions)?,
            index: self.index,
        })
    }

    /// Returns the action of the highest-precedence intention covering the connection, if any.
    pub fn check(&self, query: &CheckQuery) -> Result<Option<Action>, Error> {
        Ok(query.decide(&self.intentions)?)
    }
}
