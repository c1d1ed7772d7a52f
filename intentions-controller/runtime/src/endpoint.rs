use crate::{
    core::{
        request::{
            CheckResponse, IndexedIntentionMatches, IndexedIntentions, IntentionOp,
            IntentionQueryRequest, IntentionRequest,
        },
        Authorizer, AuthorizerContext, Intention,
    },
    index::{self, blocking, SharedIndex},
    DefaultDecision, Error,
};
use std::path::Path;

/// Serves intention writes and queries against a shared index.
///
/// Writes are authorized against the destination's owner; reads filter or reject intentions that
/// the caller may not see.
#[derive(Clone)]
pub struct Endpoint {
    index: SharedIndex,
    datacenter: String,
    default_decision: DefaultDecision,
}

impl Endpoint {
    pub fn new(index: SharedIndex, datacenter: String, default_decision: DefaultDecision) -> Self {
        Self {
            index,
            datacenter,
            default_decision,
        }
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    /// Creates, updates or deletes an intention, returning its ID.
    ///
    /// Creates are assigned a fresh ID. Updates and deletes must be writable by the caller both
    /// as stored and, for updates, as requested, so that an intention cannot be moved away from a
    /// destination the caller does not own.
    pub fn apply(
        &self,
        req: IntentionRequest,
        authz: Option<&dyn Authorizer>,
    ) -> Result<String, Error> {
        self.check_datacenter(&req.datacenter)?;
        let IntentionRequest {
            op, mut intention, ..
        } = req;

        let mut index = self.index.write();
        match op {
            IntentionOp::Create => {
                if !intention.id.is_empty() {
                    return Err(Error::IdOnCreate);
                }
                if !intention.can_write(authz) {
                    tracing::warn!(
                        %op,
                        destination = %intention.destination(),
                        "Permission denied"
                    );
                    return Err(Error::PermissionDenied);
                }
                intention.id = uuid::Uuid::new_v4().to_string();
            }

            IntentionOp::Update | IntentionOp::Delete => {
                if intention.id.is_empty() {
                    return Err(index::Error::MissingId.into());
                }
                let existing = index
                    .get(&intention.id)
                    .ok_or_else(|| index::Error::NotFound(intention.id.clone()))?;
                if !existing.can_write(authz)
                    || (op == IntentionOp::Update && !intention.can_write(authz))
                {
                    tracing::warn!(%op, id = %intention.id, "Permission denied");
                    return Err(Error::PermissionDenied);
                }
            }
        }

        let id = intention.id.clone();
        let applied = index.apply(op, intention)?;
        tracing::info!(%op, %id, index = applied, "Applied intention");
        Ok(id)
    }

    /// Reads a single intention by ID or by its exact tuples.
    pub fn get(
        &self,
        req: IntentionQueryRequest,
        authz: Option<&dyn Authorizer>,
    ) -> Result<IndexedIntentions, Error> {
        self.check_datacenter(&req.datacenter)?;

        let index = self.index.read();
        let intention = match (req.intention_id, req.exact) {
            (Some(id), _) => index.get(&id).ok_or(index::Error::NotFound(id))?,
            (None, Some(exact)) => index.exact(&exact)?.ok_or_else(|| {
                index::Error::NotFound(format!(
                    "{}/{} => {}/{}",
                    exact.source_ns, exact.source_name, exact.destination_ns, exact.destination_name
                ))
            })?,
            (None, None) => return Err(Error::MissingQuery("ID or exact")),
        };

        if !intention.can_read(authz) {
            tracing::warn!(id = %intention.id, "Permission denied");
            return Err(Error::PermissionDenied);
        }

        Ok(IndexedIntentions {
            intentions: vec![intention],
            index: index.index(),
        })
    }

    /// Lists the intentions the caller may read, in canonical order.
    pub fn list(&self, authz: Option<&dyn Authorizer>) -> IndexedIntentions {
        let snapshot = self.index.read().snapshot();
        let intentions = snapshot
            .intentions
            .iter()
            .filter(|ixn| ixn.can_read(authz))
            .cloned()
            .collect::<Vec<_>>();
        tracing::debug!(
            total = snapshot.intentions.len(),
            readable = intentions.len(),
            "Listed intentions"
        );
        IndexedIntentions {
            intentions,
            index: snapshot.index,
        }
    }

    /// Finds the intentions that apply to each entry of a match query.
    ///
    /// When the request sets a minimum index, waits for the index to move past it (bounded by
    /// the request's maximum query time) before evaluating.
    pub async fn match_intentions(
        &self,
        req: IntentionQueryRequest,
        authz: Option<&dyn Authorizer>,
    ) -> Result<IndexedIntentionMatches, Error> {
        self.check_datacenter(&req.datacenter)?;
        let query = req.match_query.ok_or(Error::MissingQuery("match"))?;
        query.validate()?;

        if let Some(authz) = authz {
            for entry in &query.entries {
                let ctx = AuthorizerContext {
                    namespace: entry.namespace.clone(),
                };
                if !authz.intention_read(&entry.name, &ctx).is_allow() {
                    tracing::warn!(%entry, "Permission denied");
                    return Err(Error::PermissionDenied);
                }
            }
        }

        let options = req.options;
        if options.min_query_index > 0 {
            let rx = self.index.read().watch();
            let observed = blocking::wait_for_index(
                rx,
                options.min_query_index,
                blocking::query_time(options.max_query_time),
            )
            .await;
            tracing::trace!(min = options.min_query_index, observed, "Unblocked match query");
        }

        let snapshot = self.index.read().snapshot();
        Ok(snapshot.matches(&query)?)
    }

    /// Decides whether a connection from the query's source to its destination is allowed.
    ///
    /// The highest-precedence intention covering the pair decides. When none does, the
    /// configured default applies.
    pub fn check(
        &self,
        req: IntentionQueryRequest,
        authz: Option<&dyn Authorizer>,
    ) -> Result<CheckResponse, Error> {
        self.check_datacenter(&req.datacenter)?;
        let query = req.check.ok_or(Error::MissingQuery("check"))?;
        query.validate()?;

        if let (Some(authz), Some(prefix)) = (authz, query.acl_prefix()) {
            let ctx = AuthorizerContext {
                namespace: query.destination_ns.clone(),
            };
            if !authz.intention_read(prefix, &ctx).is_allow() {
                tracing::warn!(destination = %query.destination(), "Permission denied");
                return Err(Error::PermissionDenied);
            }
        }

        let snapshot = self.index.read().snapshot();
        let allowed = match snapshot.check(&query)? {
            Some(action) => action.is_allow(),
            None => self.default_decision.is_allow(),
        };
        tracing::debug!(
            source = %query.source(),
            destination = %query.destination(),
            allowed,
            "Checked connection"
        );
        Ok(CheckResponse { allowed })
    }

    /// Creates every intention in a JSON array, bypassing authorization.
    ///
    /// Intentions without an ID are assigned one. Returns the number of intentions created.
    pub fn load_seed(&self, path: &Path) -> Result<usize, Error> {
        let seed_error = |source: Box<dyn std::error::Error + Send + Sync>| Error::Seed {
            path: path.to_path_buf(),
            source,
        };
        let data = std::fs::read_to_string(path).map_err(|e| seed_error(e.into()))?;
        let intentions =
            serde_json::from_str::<Vec<Intention>>(&data).map_err(|e| seed_error(e.into()))?;

        let mut index = self.index.write();
        let count = intentions.len();
        for mut intention in intentions {
            if intention.id.is_empty() {
                intention.id = uuid::Uuid::new_v4().to_string();
            }
            index.apply(IntentionOp::Create, intention)?;
        }
        tracing::info!(path = %path.display(), count, "Loaded seed intentions");
        Ok(count)
    }

    fn check_datacenter(&self, datacenter: &str) -> Result<(), Error> {
        if datacenter.is_empty() || datacenter == self.datacenter {
            return Ok(());
        }
        Err(Error::UnknownDatacenter(datacenter.to_string()))
    }
}
