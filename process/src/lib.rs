//! Resolve the context needed to begin or resume evaluating a process.
//!
//! A process is identified by the ledger transaction that created it. Before any message can be
//! evaluated against a process, the evaluator needs its owner, tags, and originating block (which
//! never change once the process exists) and the state and result from which to continue (which
//! advance with every message evaluated). [Resolver] assembles both into a single [Context].
//!
//! # Sources
//!
//! Process metadata is read from a local cache ([store::Processes]) and, on a miss, from the ledger
//! ([ledger::Ledger]). Metadata fetched from the ledger is validated with [validator::validate]
//! and then written back to the cache. A failed write is logged and otherwise ignored.
//!
//! The evaluation checkpoint is read from a local cache ([store::Evaluations]) only. If no
//! checkpoint exists at or before the requested sort key, evaluation begins from the genesis
//! state encoded in the process tags ([state::synthesize]).
//!
//! # Concurrency
//!
//! The metadata and checkpoint lookups run concurrently. The only point at which one waits on
//! the other is a checkpoint miss: the genesis state is derived from the validated tags, so it is
//! computed after both lookups have completed. Resolution is all-or-nothing; dropping the future
//! returned by [Resolver::resolve] cancels both lookups.

use cu_gateway::{Block, Tag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, time::SystemTime};
use thiserror::Error;

pub mod ledger;
mod metrics;
mod resolver;
pub use resolver::{Config, Resolver};
pub mod state;
pub mod store;
pub mod validator;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

/// Errors that can occur when resolving a [Context].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("process id is required")]
    InvalidRequest,
    #[error(transparent)]
    Validation(#[from] validator::Error),
    #[error("process not found: {0}")]
    NotFound(String),
    #[error("gateway error: {0}")]
    Gateway(cu_gateway::Error),
    #[error("store error: {0}")]
    Store(store::Error),
}

/// An opaque, totally ordered position in the message history of a process.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey(String);

impl SortKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SortKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The immutable description of a process, sourced from its genesis transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    pub id: String,
    pub owner: String,
    pub tags: Vec<Tag>,
    pub block: Block,
}

/// The messages, output, and spawns produced by evaluating a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub messages: Vec<Value>,
    pub output: Vec<Value>,
    pub spawns: Vec<Value>,
}

/// The message a [Checkpoint] was produced by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub tags: Vec<Tag>,
}

/// State and result after evaluating a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub state: Value,
    pub result: Outcome,
}

/// A snapshot of a process persisted after evaluating the message at `sort_key`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub process_id: String,
    pub sort_key: SortKey,
    pub evaluated_at: SystemTime,
    pub message: Message,
    pub output: Output,
}

/// A request to resolve the [Context] of a process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// The process to resolve.
    pub id: String,

    /// Resolve the latest checkpoint at or before this sort key (or the latest checkpoint if
    /// absent).
    pub to: Option<SortKey>,
}

impl Request {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            to: None,
        }
    }

    pub fn to(mut self, to: impl Into<SortKey>) -> Self {
        self.to = Some(to.into());
        self
    }
}

/// Everything needed to begin or resume evaluating a process.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    pub id: String,
    pub owner: String,
    pub tags: Vec<Tag>,
    pub block: Block,
    pub state: Value,
    pub result: Outcome,

    /// The sort key of the checkpoint evaluation resumes from (`None` when starting from genesis).
    pub from: Option<SortKey>,

    /// When the checkpoint evaluation resumes from was produced (`None` when starting from
    /// genesis).
    pub evaluated_at: Option<SystemTime>,
}
