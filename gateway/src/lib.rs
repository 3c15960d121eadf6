//! Query transaction metadata, block windows, and raw payloads from a ledger gateway.
//!
//! A gateway fronts an append-only ledger with two surfaces: a GraphQL endpoint (transactions
//! and blocks, the latter paginated by cursor) and a raw-content endpoint serving the bytes
//! attached to a transaction. [Client] wraps both behind a [Transport] so the same logic can run
//! over HTTP ([http::Http]) or against an in-memory gateway in tests.
//!
//! # Block Windows
//!
//! [Client::blocks_meta] walks the block index from a minimum height, one page at a time, until
//! either the gateway reports no further pages or the last block fetched is at or past the
//! requested upper timestamp. Pages may overlap (a gateway is free to re-deliver records it has
//! already served) and the final page may overshoot the window, so the accumulated blocks are
//! deduplicated by height, sorted, and trimmed to the timestamp boundary before being returned.
//! The result is the same regardless of the page size used to fetch it.
//!
//! # Timestamps
//!
//! Ledger block timestamps are expressed in seconds. Every [Block] returned by this crate carries
//! its timestamp in milliseconds.
//!
//! # Example
//!
//! ```rust,no_run
//! use cu_gateway::{http::Http, BlocksQuery, Client, Config};
//!
//! # async fn run() -> Result<(), cu_gateway::Error> {
//! let cfg = Config::default();
//! let client = Client::new(Http::new(cfg.request_timeout)?, cfg);
//!
//! let meta = client.transaction_meta("zc24Wpv_i6NNCEdxeKt7dcNrqL5w0hrShtSCcFGGL24").await?;
//! let blocks = client
//!     .blocks_meta(BlocksQuery {
//!         min_height: 1_276_343,
//!         max_timestamp: 1_696_633_559_000,
//!         page_size: None,
//!     })
//!     .await?;
//! # let _ = (meta, blocks);
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

mod blocks;
mod client;
pub use client::{BlocksQuery, Client, Config};
pub mod http;
mod payload;
pub use payload::Payload;
mod wire;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

/// Errors that can occur when interacting with a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("transaction not found: {0}")]
    NotFound(String),
    #[error("transaction not yet mined: {0}")]
    Pending(String),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("unable to decode response: {0}")]
    Decode(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("conflicting records for block {height}")]
    ConflictingBlock { height: u64 },
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

/// A name/value pair attached to a transaction.
///
/// Tags are kept in the order the ledger reports them and names are not unique.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Height and timestamp (in milliseconds) of a ledger block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub timestamp: u64,
}

/// Owner and tags of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionMeta {
    /// Address of the wallet that signed the transaction.
    pub owner: String,
    pub tags: Vec<Tag>,
}

/// A response returned by a [Transport].
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    /// Returns true if the status is in the `2xx` range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The interface responsible for moving requests to and from a gateway.
///
/// Implementations are expected to enforce their own timeouts and report them (like any other
/// failure to complete a request) as [Error::Transport].
pub trait Transport: Clone + Send + Sync + 'static {
    /// Send `body` (JSON) to `url`.
    fn post(
        &self,
        url: String,
        body: Bytes,
    ) -> impl Future<Output = Result<Response, Error>> + Send;

    /// Fetch `url`.
    fn get(&self, url: String) -> impl Future<Output = Result<Response, Error>> + Send;
}
