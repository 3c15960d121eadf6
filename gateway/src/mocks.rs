//! An in-memory gateway for testing.

use crate::{Block, Error, Response, Tag, Transport};
use bytes::Bytes;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// A request received by the [Gateway].
#[derive(Clone, Debug)]
pub struct Request {
    pub url: String,

    /// GraphQL variables (`Value::Null` for content requests)
    pub variables: Value,
}

/// A transaction known to the [Gateway].
#[derive(Clone, Debug)]
pub struct Transaction {
    pub owner: String,
    pub tags: Vec<Tag>,

    /// The block containing the transaction (timestamp in seconds), if mined
    pub block: Option<Block>,
}

#[derive(Default)]
struct State {
    transactions: HashMap<String, Transaction>,
    data: HashMap<String, Bytes>,

    /// Blocks ordered by height (timestamps in seconds)
    blocks: Vec<Block>,

    /// Number of records each block page re-delivers from the previous page
    overlap: usize,

    /// Number of queries to serve before failing every subsequent one
    fail_after: Option<usize>,

    /// Status returned for every query instead of a result
    status: Option<u16>,

    queries: usize,
    requests: Vec<Request>,
}

impl State {
    fn transactions(&self, ids: &Value) -> Value {
        let edges: Vec<Value> = ids
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter_map(|id| self.transactions.get(id))
            .map(|transaction| {
                let block = transaction.block.map(|block| {
                    json!({ "height": block.height, "timestamp": block.timestamp })
                });
                json!({
                    "node": {
                        "owner": { "address": transaction.owner },
                        "tags": transaction.tags,
                        "block": block,
                    }
                })
            })
            .collect();
        json!({ "data": { "transactions": { "edges": edges } } })
    }

    fn blocks(&self, variables: &Value) -> Value {
        let min = variables["min"].as_u64().unwrap_or(0);
        let limit = variables["limit"].as_u64().unwrap_or(0) as usize;
        let start = match variables["cursor"].as_str() {
            Some(cursor) => cursor.parse::<usize>().expect("invalid cursor"),
            None => self
                .blocks
                .iter()
                .position(|block| block.height >= min)
                .unwrap_or(self.blocks.len()),
        };
        let end = (start + limit).min(self.blocks.len());
        let edges: Vec<Value> = self.blocks[start..end]
            .iter()
            .enumerate()
            .map(|(offset, block)| {
                let next = (start + offset + 1)
                    .saturating_sub(self.overlap)
                    .max(start + 1);
                json!({
                    "cursor": next.to_string(),
                    "node": { "height": block.height, "timestamp": block.timestamp },
                })
            })
            .collect();
        json!({
            "data": {
                "blocks": {
                    "pageInfo": { "hasNextPage": end < self.blocks.len() },
                    "edges": edges,
                }
            }
        })
    }
}

/// A gateway serving transactions, raw content, and a block index from memory.
#[derive(Clone, Default)]
pub struct Gateway {
    state: Arc<Mutex<State>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transaction.
    pub fn add_transaction(&self, id: &str, transaction: Transaction) {
        let mut state = self.state.lock().unwrap();
        state.transactions.insert(id.to_string(), transaction);
    }

    /// Register the raw content of a transaction.
    pub fn add_data(&self, id: &str, data: impl Into<Bytes>) {
        let mut state = self.state.lock().unwrap();
        state.data.insert(id.to_string(), data.into());
    }

    /// Append blocks (timestamps in seconds) to the block index.
    pub fn add_blocks(&self, blocks: impl IntoIterator<Item = Block>) {
        let mut state = self.state.lock().unwrap();
        state.blocks.extend(blocks);
        state.blocks.sort_by_key(|block| block.height);
    }

    /// Re-deliver the last `overlap` records of each block page at the start of the next.
    pub fn set_overlap(&self, overlap: usize) {
        self.state.lock().unwrap().overlap = overlap;
    }

    /// Fail every query after the first `queries`.
    pub fn fail_after(&self, queries: usize) {
        self.state.lock().unwrap().fail_after = Some(queries);
    }

    /// Respond to every query with `status`.
    pub fn respond_with(&self, status: u16) {
        self.state.lock().unwrap().status = Some(status);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Transport for Gateway {
    async fn post(&self, url: String, body: Bytes) -> Result<Response, Error> {
        let mut state = self.state.lock().unwrap();
        let request: Value =
            serde_json::from_slice(&body).map_err(|err| Error::Decode(err.to_string()))?;
        let variables = request["variables"].clone();
        state.requests.push(Request {
            url,
            variables: variables.clone(),
        });

        state.queries += 1;
        if state.fail_after.is_some_and(|limit| state.queries > limit) {
            return Err(Error::Transport("connection reset".to_string()));
        }
        if let Some(status) = state.status {
            return Ok(Response {
                status,
                body: Bytes::new(),
            });
        }

        let response = if let Some(ids) = variables.get("processIds") {
            state.transactions(ids)
        } else if variables.get("min").is_some() {
            state.blocks(&variables)
        } else {
            json!({ "errors": [{ "message": "unsupported query" }] })
        };
        Ok(Response {
            status: 200,
            body: Bytes::from(serde_json::to_vec(&response).unwrap()),
        })
    }

    async fn get(&self, url: String) -> Result<Response, Error> {
        let mut state = self.state.lock().unwrap();
        let id = url.rsplit('/').next().unwrap_or_default().to_string();
        state.requests.push(Request {
            url,
            variables: Value::Null,
        });
        Ok(match state.data.get(&id) {
            Some(data) => Response {
                status: 200,
                body: data.clone(),
            },
            None => Response {
                status: 404,
                body: Bytes::from_static(b"Not Found"),
            },
        })
    }
}
