use crate::{blocks, wire, Block, Error, Payload, TransactionMeta, Transport};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Configuration for [Client].
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the gateway.
    pub url: String,

    /// Number of blocks requested per page when a [BlocksQuery] does not specify one.
    pub page_size: usize,

    /// How long a single request may take before it is abandoned.
    ///
    /// Enforced by the [Transport].
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "https://arweave.net".to_string(),
            page_size: 100,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A window of blocks to load with [Client::blocks_meta].
#[derive(Clone, Copy, Debug)]
pub struct BlocksQuery {
    /// Lowest height (inclusive) to return.
    pub min_height: u64,

    /// Latest timestamp (inclusive, in milliseconds) to return.
    pub max_timestamp: u64,

    /// Number of blocks to request per page (defaults to [Config::page_size]).
    pub page_size: Option<usize>,
}

/// Loads ledger data from a gateway.
#[derive(Clone)]
pub struct Client<T: Transport> {
    transport: T,
    url: String,
    page_size: usize,
}

impl<T: Transport> Client<T> {
    /// Create a new client that sends requests over `transport`.
    pub fn new(transport: T, cfg: Config) -> Self {
        Self {
            transport,
            url: cfg.url.trim_end_matches('/').to_string(),
            page_size: cfg.page_size,
        }
    }

    async fn query<D: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<D, Error> {
        let body = wire::Request { query, variables }.encode()?;
        let response = self
            .transport
            .post(format!("{}/graphql", self.url), body)
            .await?;
        if !response.ok() {
            return Err(Error::Status(response.status));
        }
        wire::Envelope::decode(&response.body)
    }

    async fn transaction(&self, query: &str, id: &str) -> Result<wire::TransactionNode, Error> {
        let result: wire::Transactions = self.query(query, json!({ "processIds": [id] })).await?;
        result
            .transactions
            .edges
            .into_iter()
            .next()
            .map(|edge| edge.node)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Load the owner and tags of the transaction `id`.
    pub async fn transaction_meta(&self, id: &str) -> Result<TransactionMeta, Error> {
        let node = self.transaction(wire::TRANSACTION_META, id).await?;
        let owner = node
            .owner
            .ok_or_else(|| Error::Decode(format!("missing owner for {id}")))?;
        debug!(
            id,
            owner = owner.address.as_str(),
            tags = node.tags.len(),
            "loaded transaction meta"
        );
        Ok(TransactionMeta {
            owner: owner.address,
            tags: node.tags,
        })
    }

    /// Load the block that contains the transaction `id`.
    pub async fn transaction_block(&self, id: &str) -> Result<Block, Error> {
        let node = self.transaction(wire::TRANSACTION_BLOCK, id).await?;
        let block: Block = node
            .block
            .ok_or_else(|| Error::Pending(id.to_string()))?
            .into();
        debug!(id, height = block.height, "loaded transaction block");
        Ok(block)
    }

    /// Load the raw content of the transaction `id`.
    ///
    /// A response with a non-success status is still returned (see [Payload::ok]).
    pub async fn transaction_data(&self, id: &str) -> Result<Payload, Error> {
        let response = self.transport.get(format!("{}/raw/{id}", self.url)).await?;
        debug!(
            id,
            status = response.status,
            len = response.body.len(),
            "loaded transaction data"
        );
        Ok(Payload::new(response.status, response.body))
    }

    /// Load all blocks at or above `min_height` with a timestamp no later than `max_timestamp`,
    /// ordered by height.
    ///
    /// Pages are requested sequentially until the gateway has no further pages or the last block
    /// received is at or past `max_timestamp`. If any page cannot be fetched, nothing is returned.
    pub async fn blocks_meta(&self, query: BlocksQuery) -> Result<Vec<Block>, Error> {
        let limit = query.page_size.unwrap_or(self.page_size);
        if limit == 0 {
            return Err(Error::InvalidPageSize);
        }

        let mut accumulated = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let variables = json!({
                "min": query.min_height,
                "limit": limit,
                "cursor": cursor,
            });
            let page: wire::Blocks = self.query(wire::BLOCKS, variables).await?;
            pages += 1;

            // Collect the page
            let has_next = page.blocks.page_info.has_next_page;
            let mut next = None;
            let mut last = None;
            for edge in page.blocks.edges {
                let block = Block::from(edge.node);
                next = edge.cursor;
                last = Some(block);
                accumulated.push(block);
            }
            let Some(last) = last else {
                break;
            };
            debug!(
                pages,
                height = last.height,
                timestamp = last.timestamp,
                "fetched block page"
            );

            // Stop once we've reached the end of the window (or the ledger)
            if !has_next || last.timestamp >= query.max_timestamp {
                break;
            }
            match next {
                Some(next) => cursor = Some(next),
                None => return Err(Error::Decode("missing page cursor".to_string())),
            }
        }

        let blocks = blocks::finalize(accumulated, query.min_height, query.max_timestamp)?;
        debug!(
            pages,
            min_height = query.min_height,
            max_timestamp = query.max_timestamp,
            blocks = blocks.len(),
            "loaded blocks"
        );
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{Gateway, Transaction},
        Tag,
    };
    use commonware_macros::test_traced;
    use commonware_runtime::{deterministic, Runner};

    const GATEWAY_URL: &str = "https://gateway.test";
    const PROCESS: &str = "zc24Wpv_i6NNCEdxeKt7dcNrqL5w0hrShtSCcFGGL24";
    const MIN_HEIGHT: u64 = 1_276_343;
    const START_TIMESTAMP: u64 = 1_696_627_369;
    const WINDOW: u64 = 51;

    fn client(gateway: &Gateway) -> Client<Gateway> {
        Client::new(
            gateway.clone(),
            Config {
                url: GATEWAY_URL.to_string(),
                ..Config::default()
            },
        )
    }

    /// Blocks (timestamps in seconds) around [MIN_HEIGHT], with irregular spacing.
    fn chain(after: u64) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut timestamp = START_TIMESTAMP - 1_500;
        for height in MIN_HEIGHT - 10..MIN_HEIGHT + after {
            if height == MIN_HEIGHT {
                timestamp = START_TIMESTAMP;
            }
            blocks.push(Block { height, timestamp });
            timestamp += 120 + (height % 5) * 7;
        }
        blocks
    }

    /// One second (in milliseconds) after the last block of the window.
    fn window_end(blocks: &[Block]) -> u64 {
        let last = blocks
            .iter()
            .find(|block| block.height == MIN_HEIGHT + WINDOW - 1)
            .unwrap();
        (last.timestamp + 1) * 1_000
    }

    fn process_tags() -> Vec<Tag> {
        vec![
            Tag::new("App-Name", "SmartWeaveContract"),
            Tag::new("App-Version", "0.3.0"),
            Tag::new("Contract-Src", "gnVg6A6S8lfB10P38V7vOia52lEhTX3Uol8kbTGUT8w"),
            Tag::new("SDK", "Warp"),
            Tag::new("Nonce", "1693579974165"),
            Tag::new("Content-Type", "application/json"),
            Tag::new("Nonce", "1693579974166"),
        ]
    }

    #[test_traced]
    fn test_transaction_meta() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            gateway.add_transaction(
                PROCESS,
                Transaction {
                    owner: "owner-123".to_string(),
                    tags: process_tags(),
                    block: None,
                },
            );
            let client = Client::new(
                gateway.clone(),
                Config {
                    url: format!("{GATEWAY_URL}/"),
                    ..Config::default()
                },
            );

            let meta = client.transaction_meta(PROCESS).await.unwrap();
            assert_eq!(meta.owner, "owner-123");
            assert_eq!(meta.tags, process_tags());

            // Ensure the correct variables were sent
            let requests = gateway.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].url, format!("{GATEWAY_URL}/graphql"));
            assert_eq!(requests[0].variables, json!({ "processIds": [PROCESS] }));
        });
    }

    #[test_traced]
    fn test_transaction_meta_not_found() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            let client = client(&gateway);
            let result = client.transaction_meta(PROCESS).await;
            assert_eq!(result, Err(Error::NotFound(PROCESS.to_string())));
        });
    }

    #[test_traced]
    fn test_transaction_meta_status() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            gateway.respond_with(502);
            let client = client(&gateway);
            let result = client.transaction_meta(PROCESS).await;
            assert_eq!(result, Err(Error::Status(502)));
        });
    }

    #[test_traced]
    fn test_transaction_block() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            gateway.add_transaction(
                PROCESS,
                Transaction {
                    owner: "owner-123".to_string(),
                    tags: process_tags(),
                    block: Some(Block {
                        height: 123,
                        timestamp: 1_697_574_792,
                    }),
                },
            );
            gateway.add_transaction(
                "pending",
                Transaction {
                    owner: "owner-123".to_string(),
                    tags: Vec::new(),
                    block: None,
                },
            );
            let client = client(&gateway);

            // Timestamps are converted to milliseconds
            let block = client.transaction_block(PROCESS).await.unwrap();
            assert_eq!(
                block,
                Block {
                    height: 123,
                    timestamp: 1_697_574_792_000,
                }
            );

            let result = client.transaction_block("pending").await;
            assert_eq!(result, Err(Error::Pending("pending".to_string())));
        });
    }

    #[test_traced]
    fn test_blocks_meta_across_pages() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let blocks = chain(200);
            let gateway = Gateway::new();
            gateway.add_blocks(blocks.clone());
            let client = client(&gateway);

            let result = client
                .blocks_meta(BlocksQuery {
                    min_height: MIN_HEIGHT,
                    max_timestamp: window_end(&blocks),
                    page_size: Some(17),
                })
                .await
                .unwrap();
            assert_eq!(result.len(), WINDOW as usize);
            assert_eq!(result[0].timestamp, START_TIMESTAMP * 1_000);

            // Three pages cover the window, a fourth overshoots it
            let requests = gateway.requests();
            assert_eq!(requests.len(), 4);
            assert_eq!(
                requests[0].variables,
                json!({ "min": MIN_HEIGHT, "limit": 17, "cursor": null })
            );
            assert_eq!(requests[1].variables["cursor"], json!("27"));
        });
    }

    #[test_traced]
    fn test_blocks_meta_independent_of_page_size() {
        let blocks = chain(200);
        let max_timestamp = window_end(&blocks);
        let expected: Vec<Block> = blocks
            .iter()
            .filter(|block| block.height >= MIN_HEIGHT && block.height < MIN_HEIGHT + WINDOW)
            .map(|block| Block {
                height: block.height,
                timestamp: block.timestamp * 1_000,
            })
            .collect();
        assert_eq!(expected.len(), WINDOW as usize);

        for overlap in [0, 3] {
            for page_size in [5, 17, 20, 50, 51, 52, 500] {
                let blocks = blocks.clone();
                let expected = expected.clone();
                let executor = deterministic::Runner::default();
                executor.start(|_| async move {
                    let gateway = Gateway::new();
                    gateway.add_blocks(blocks);
                    gateway.set_overlap(overlap);
                    let client = client(&gateway);

                    let result = client
                        .blocks_meta(BlocksQuery {
                            min_height: MIN_HEIGHT,
                            max_timestamp,
                            page_size: Some(page_size),
                        })
                        .await
                        .unwrap();
                    assert_eq!(result, expected, "page_size={page_size} overlap={overlap}");
                    assert!(result
                        .windows(2)
                        .all(|pair| pair[0].height < pair[1].height));
                    assert!(result
                        .iter()
                        .all(|block| block.timestamp <= max_timestamp));
                });
            }
        }
    }

    #[test_traced]
    fn test_blocks_meta_default_page_size() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let blocks = chain(200);
            let gateway = Gateway::new();
            gateway.add_blocks(blocks.clone());
            let client = client(&gateway);

            let result = client
                .blocks_meta(BlocksQuery {
                    min_height: MIN_HEIGHT,
                    max_timestamp: window_end(&blocks),
                    page_size: None,
                })
                .await
                .unwrap();
            assert_eq!(result.len(), WINDOW as usize);

            // A single page of 100 spans the window
            let requests = gateway.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].variables["limit"], json!(100));
        });
    }

    #[test_traced]
    fn test_blocks_meta_exhausted() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            gateway.add_blocks(chain(20));
            let client = client(&gateway);

            let result = client
                .blocks_meta(BlocksQuery {
                    min_height: MIN_HEIGHT,
                    max_timestamp: u64::MAX,
                    page_size: Some(17),
                })
                .await
                .unwrap();
            assert_eq!(result.len(), 20);
            assert_eq!(result.last().unwrap().height, MIN_HEIGHT + 19);
            assert_eq!(gateway.requests().len(), 2);
        });
    }

    #[test_traced]
    fn test_blocks_meta_empty() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            let client = client(&gateway);

            let result = client
                .blocks_meta(BlocksQuery {
                    min_height: MIN_HEIGHT,
                    max_timestamp: u64::MAX,
                    page_size: Some(17),
                })
                .await
                .unwrap();
            assert!(result.is_empty());
            assert_eq!(gateway.requests().len(), 1);
        });
    }

    #[test_traced]
    fn test_blocks_meta_page_failure() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let blocks = chain(200);
            let gateway = Gateway::new();
            gateway.add_blocks(blocks.clone());
            gateway.fail_after(2);
            let client = client(&gateway);

            let result = client
                .blocks_meta(BlocksQuery {
                    min_height: MIN_HEIGHT,
                    max_timestamp: window_end(&blocks),
                    page_size: Some(17),
                })
                .await;
            assert!(matches!(result, Err(Error::Transport(_))));
        });
    }

    #[test_traced]
    fn test_blocks_meta_invalid_page_size() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            let client = client(&gateway);

            let result = client
                .blocks_meta(BlocksQuery {
                    min_height: MIN_HEIGHT,
                    max_timestamp: u64::MAX,
                    page_size: Some(0),
                })
                .await;
            assert_eq!(result, Err(Error::InvalidPageSize));
            assert!(gateway.requests().is_empty());
        });
    }

    #[test_traced]
    fn test_transaction_data() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            gateway.add_data(PROCESS, &br#"{"balances":{"alice":1000}}"#[..]);
            let client = client(&gateway);

            let payload = client.transaction_data(PROCESS).await.unwrap();
            assert!(payload.ok());
            assert_eq!(payload.text().unwrap(), r#"{"balances":{"alice":1000}}"#);
            let value: Value = payload.json().unwrap();
            assert_eq!(value["balances"]["alice"], json!(1000));
            assert_eq!(payload.bytes().len(), 27);

            let requests = gateway.requests();
            assert_eq!(requests[0].url, format!("{GATEWAY_URL}/raw/{PROCESS}"));
        });
    }

    #[test_traced]
    fn test_transaction_data_missing() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let gateway = Gateway::new();
            let client = client(&gateway);

            let payload = client.transaction_data(PROCESS).await.unwrap();
            assert!(!payload.ok());
            assert_eq!(payload.status(), 404);
            assert!(payload.json::<Value>().is_err());
        });
    }
}
