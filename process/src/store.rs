//! Interfaces to the local caches of process metadata and evaluation checkpoints.

use crate::{Checkpoint, ProcessMetadata, SortKey};
use std::future::Future;
use thiserror::Error;

/// Errors that can occur when interacting with a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Cache of [ProcessMetadata], keyed by process id.
pub trait Processes: Clone + Send + Sync + 'static {
    /// Find the metadata of process `id` (or [Error::NotFound]).
    fn find(&self, id: &str) -> impl Future<Output = Result<ProcessMetadata, Error>> + Send;

    /// Persist `process`, returning its id.
    fn save(&self, process: ProcessMetadata) -> impl Future<Output = Result<String, Error>> + Send;
}

/// Append-only log of [Checkpoint]s, written by the evaluator.
pub trait Evaluations: Clone + Send + Sync + 'static {
    /// Find the checkpoint of `process_id` with the greatest sort key at or before `to` (or the
    /// greatest overall if `to` is `None`).
    fn find_latest(
        &self,
        process_id: &str,
        to: Option<&SortKey>,
    ) -> impl Future<Output = Result<Checkpoint, Error>> + Send;
}
