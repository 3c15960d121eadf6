use crate::{
    ledger::Ledger,
    metrics::{Lookup, Metrics},
    state,
    store::{self, Evaluations, Processes},
    validator, Checkpoint, Context, Error, Outcome, ProcessMetadata, Request, SortKey,
};
use commonware_runtime::Metrics as RuntimeMetrics;
use cu_gateway::Tag;
use futures::{join, try_join};
use serde_json::Value;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Configuration for the [Resolver].
pub struct Config<P: Processes, V: Evaluations, L: Ledger> {
    /// Cache of process metadata
    pub processes: P,

    /// Cache of evaluation checkpoints
    pub evaluations: V,

    /// Ledger consulted when process metadata is not cached
    pub ledger: L,
}

/// The evaluation fields of a [Context], all taken from a single checkpoint or all from genesis.
struct Evaluation {
    state: Value,
    result: Outcome,
    from: Option<SortKey>,
    evaluated_at: Option<SystemTime>,
}

impl Evaluation {
    fn genesis(tags: &[Tag]) -> Self {
        Self {
            state: state::synthesize(tags),
            result: Outcome::default(),
            from: None,
            evaluated_at: None,
        }
    }
}

impl From<Checkpoint> for Evaluation {
    fn from(checkpoint: Checkpoint) -> Self {
        Self {
            state: checkpoint.output.state,
            result: checkpoint.output.result,
            from: Some(checkpoint.sort_key),
            evaluated_at: Some(checkpoint.evaluated_at),
        }
    }
}

/// Resolves the [Context] of a process from its caches and the ledger.
///
/// The resolver holds no state of its own between calls. Callers that want to collapse
/// concurrent requests for the same `(id, to)` should do so above it.
pub struct Resolver<P: Processes, V: Evaluations, L: Ledger> {
    processes: P,
    evaluations: V,
    ledger: L,

    metrics: Metrics,
}

impl<P: Processes, V: Evaluations, L: Ledger> Resolver<P, V, L> {
    /// Create a new resolver, registering its metrics with `context`.
    pub fn new<E: RuntimeMetrics>(context: E, cfg: Config<P, V, L>) -> Self {
        Self {
            processes: cfg.processes,
            evaluations: cfg.evaluations,
            ledger: cfg.ledger,
            metrics: Metrics::init(context),
        }
    }

    /// Resolve the context from which to evaluate the process `request.id`, as of the latest
    /// checkpoint at or before `request.to`.
    pub async fn resolve(&self, request: Request) -> Result<Context, Error> {
        if request.id.is_empty() {
            return Err(Error::InvalidRequest);
        }
        let id = request.id.as_str();

        // The checkpoint lookup does not depend on the process metadata, so start both
        let (metadata, checkpoint) =
            join!(self.metadata(id), self.checkpoint(id, request.to.as_ref()));

        // Without a checkpoint, evaluation starts from the state encoded in the (validated) tags
        let metadata = metadata?;
        let evaluation = match checkpoint? {
            Some(checkpoint) => Evaluation::from(checkpoint),
            None => Evaluation::genesis(&metadata.tags),
        };

        Ok(Context {
            id: metadata.id,
            owner: metadata.owner,
            tags: metadata.tags,
            block: metadata.block,
            state: evaluation.state,
            result: evaluation.result,
            from: evaluation.from,
            evaluated_at: evaluation.evaluated_at,
        })
    }

    /// Find the metadata of process `id`, loading (and caching) it from the ledger if it is not
    /// already cached.
    async fn metadata(&self, id: &str) -> Result<ProcessMetadata, Error> {
        match self.processes.find(id).await {
            Ok(process) => {
                self.metrics.metadata_lookups.get_or_create(&Lookup::HIT).inc();
                debug!(id, "found cached process");
                return Ok(process);
            }
            Err(store::Error::NotFound) => {
                self.metrics.metadata_lookups.get_or_create(&Lookup::MISS).inc();
            }
            Err(err) => return Err(Error::Store(err)),
        }

        // Load from the ledger
        let (meta, block) = try_join!(
            self.ledger.transaction_meta(id),
            self.ledger.transaction_block(id)
        )
        .map_err(|err| match err {
            cu_gateway::Error::NotFound(_) => Error::NotFound(id.to_string()),
            err => Error::Gateway(err),
        })?;
        if let Err(err) = validator::validate(&meta.tags) {
            self.metrics.validation_failures.inc();
            warn!(id, %err, "invalid process");
            return Err(err.into());
        }
        let process = ProcessMetadata {
            id: id.to_string(),
            owner: meta.owner,
            tags: meta.tags,
            block,
        };

        // Caching is best-effort
        match self.processes.save(process.clone()).await {
            Ok(_) => debug!(id, height = block.height, "cached process"),
            Err(err) => {
                self.metrics.save_failures.inc();
                warn!(id, ?err, "failed to cache process");
            }
        }
        Ok(process)
    }

    /// Find the latest checkpoint of process `id` at or before `to`, if any.
    async fn checkpoint(
        &self,
        id: &str,
        to: Option<&SortKey>,
    ) -> Result<Option<Checkpoint>, Error> {
        match self.evaluations.find_latest(id, to).await {
            Ok(checkpoint) => {
                self.metrics.checkpoint_lookups.get_or_create(&Lookup::HIT).inc();
                debug!(
                    id,
                    sort_key = checkpoint.sort_key.as_str(),
                    "found checkpoint"
                );
                Ok(Some(checkpoint))
            }
            Err(store::Error::NotFound) => {
                self.metrics.checkpoint_lookups.get_or_create(&Lookup::MISS).inc();
                debug!(id, "no checkpoint found");
                Ok(None)
            }
            Err(err) => Err(Error::Store(err)),
        }
    }
}
