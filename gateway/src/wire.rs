//! GraphQL request and response shapes exchanged with a gateway.

use crate::{Block, Error, Tag};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

pub(crate) const TRANSACTION_META: &str = r#"query GetTransactions($processIds: [ID!]!) {
  transactions(ids: $processIds) {
    edges {
      node {
        owner { address }
        tags { name value }
      }
    }
  }
}"#;

pub(crate) const TRANSACTION_BLOCK: &str = r#"query GetTransactionBlock($processIds: [ID!]!) {
  transactions(ids: $processIds) {
    edges {
      node {
        block { height timestamp }
      }
    }
  }
}"#;

pub(crate) const BLOCKS: &str = r#"query GetBlocks($min: Int!, $limit: Int!, $cursor: String) {
  blocks(height: { min: $min }, first: $limit, after: $cursor, sort: HEIGHT_ASC) {
    pageInfo { hasNextPage }
    edges {
      cursor
      node { height timestamp }
    }
  }
}"#;

#[derive(Serialize)]
pub(crate) struct Request<'a> {
    pub query: &'a str,
    pub variables: Value,
}

impl Request<'_> {
    pub fn encode(&self) -> Result<Bytes, Error> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|err| Error::Decode(err.to_string()))
    }
}

#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<QueryError>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode a response body, surfacing any GraphQL errors.
    pub fn decode(body: &[u8]) -> Result<T, Error> {
        let envelope: Self =
            serde_json::from_slice(body).map_err(|err| Error::Decode(err.to_string()))?;
        if let Some(error) = envelope.errors.into_iter().next() {
            return Err(Error::Query(error.message));
        }
        envelope
            .data
            .ok_or_else(|| Error::Decode("missing data".to_string()))
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryError {
    pub message: String,
}

#[derive(Deserialize)]
pub(crate) struct Transactions {
    pub transactions: Connection<TransactionNode>,
}

#[derive(Deserialize)]
pub(crate) struct Blocks {
    pub blocks: Connection<BlockNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<N> {
    #[serde(default)]
    pub page_info: PageInfo,
    pub edges: Vec<Edge<N>>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
}

#[derive(Deserialize)]
pub(crate) struct Edge<N> {
    #[serde(default)]
    pub cursor: Option<String>,
    pub node: N,
}

#[derive(Deserialize)]
pub(crate) struct TransactionNode {
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub block: Option<BlockNode>,
}

#[derive(Deserialize)]
pub(crate) struct Owner {
    pub address: String,
}

#[derive(Clone, Copy, Deserialize)]
pub(crate) struct BlockNode {
    pub height: u64,
    pub timestamp: u64,
}

impl From<BlockNode> for Block {
    fn from(node: BlockNode) -> Self {
        Self {
            height: node.height,
            timestamp: node.timestamp.saturating_mul(1_000),
        }
    }
}
