use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family},
};

/// Whether a lookup was served by its cache.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Status {
    Hit,
    Miss,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Lookup {
    pub status: Status,
}

impl Lookup {
    pub const HIT: Self = Self {
        status: Status::Hit,
    };
    pub const MISS: Self = Self {
        status: Status::Miss,
    };
}

/// Metrics for the [crate::Resolver].
#[derive(Clone, Default)]
pub struct Metrics {
    /// Number of process lookups by status (misses fall back to the ledger)
    pub metadata_lookups: Family<Lookup, Counter>,
    /// Number of checkpoint lookups by status (misses fall back to the genesis state)
    pub checkpoint_lookups: Family<Lookup, Counter>,
    /// Number of processes loaded from the ledger that could not be cached
    pub save_failures: Counter,
    /// Number of processes loaded from the ledger with invalid tags
    pub validation_failures: Counter,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: E) -> Self {
        let metrics = Self::default();
        context.register(
            "metadata_lookups",
            "Number of process lookups by status",
            metrics.metadata_lookups.clone(),
        );
        context.register(
            "checkpoint_lookups",
            "Number of checkpoint lookups by status",
            metrics.checkpoint_lookups.clone(),
        );
        context.register(
            "save_failures",
            "Number of processes loaded from the ledger that could not be cached",
            metrics.save_failures.clone(),
        );
        context.register(
            "validation_failures",
            "Number of processes loaded from the ledger with invalid tags",
            metrics.validation_failures.clone(),
        );
        metrics
    }
}
