//! Interface to the ledger a process is created on.

use cu_gateway::{Block, Client, Error, TransactionMeta, Transport};
use std::future::Future;

/// Source of record for the transactions that create processes.
pub trait Ledger: Clone + Send + Sync + 'static {
    /// Load the owner and tags of transaction `id`.
    fn transaction_meta(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<TransactionMeta, Error>> + Send;

    /// Load the block containing transaction `id`.
    fn transaction_block(&self, id: &str) -> impl Future<Output = Result<Block, Error>> + Send;
}

impl<T: Transport> Ledger for Client<T> {
    async fn transaction_meta(&self, id: &str) -> Result<TransactionMeta, Error> {
        Client::transaction_meta(self, id).await
    }

    async fn transaction_block(&self, id: &str) -> Result<Block, Error> {
        Client::transaction_block(self, id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        mocks::{Evaluations, Processes},
        Config, Outcome, Request, Resolver,
    };
    use commonware_macros::test_traced;
    use commonware_runtime::{deterministic, Metrics, Runner};
    use cu_gateway::{
        mocks::{Gateway, Transaction},
        Block, Client, Tag,
    };
    use serde_json::json;

    const PROCESS: &str = "zc24Wpv_i6NNCEdxeKt7dcNrqL5w0hrShtSCcFGGL24";

    #[test_traced]
    fn test_resolve_from_gateway() {
        let executor = deterministic::Runner::default();
        executor.start(|context| async move {
            let tags = vec![
                Tag::new("Contract-Src", "foobar"),
                Tag::new("Data-Protocol", "ao"),
                Tag::new("ao-type", "process"),
            ];
            let gateway = Gateway::new();
            gateway.add_transaction(
                PROCESS,
                Transaction {
                    owner: "owner-123".to_string(),
                    tags: tags.clone(),
                    block: Some(Block {
                        height: 1_276_343,
                        timestamp: 1_696_627_369,
                    }),
                },
            );
            let processes = Processes::new();
            let resolver = Resolver::new(
                context.with_label("resolver"),
                Config {
                    processes: processes.clone(),
                    evaluations: Evaluations::new(),
                    ledger: Client::new(gateway.clone(), cu_gateway::Config::default()),
                },
            );

            let resolved = resolver.resolve(Request::new(PROCESS)).await.unwrap();
            assert_eq!(resolved.owner, "owner-123");
            assert_eq!(resolved.tags, tags);
            assert_eq!(
                resolved.block,
                Block {
                    height: 1_276_343,
                    timestamp: 1_696_627_369_000,
                }
            );
            assert_eq!(
                resolved.state,
                json!({
                    "Contract-Src": "foobar",
                    "Data-Protocol": "ao",
                    "ao-type": "process",
                })
            );
            assert_eq!(resolved.result, Outcome::default());
            assert!(resolved.from.is_none());
            assert!(resolved.evaluated_at.is_none());

            // Owner/tags and block were requested from the gateway once each
            let requests = gateway.requests();
            assert_eq!(requests.len(), 2);
            assert!(requests
                .iter()
                .all(|request| request.variables == json!({ "processIds": [PROCESS] })));
            assert_eq!(processes.saves().len(), 1);

            // A second resolution never reaches the gateway
            let again = resolver.resolve(Request::new(PROCESS)).await.unwrap();
            assert_eq!(again, resolved);
            assert_eq!(gateway.requests().len(), 2);
        });
    }

    #[test_traced]
    fn test_resolve_unknown_process() {
        let executor = deterministic::Runner::default();
        executor.start(|context| async move {
            let resolver = Resolver::new(
                context.with_label("resolver"),
                Config {
                    processes: Processes::new(),
                    evaluations: Evaluations::new(),
                    ledger: Client::new(Gateway::new(), cu_gateway::Config::default()),
                },
            );
            let result = resolver.resolve(Request::new(PROCESS)).await;
            assert_eq!(result, Err(crate::Error::NotFound(PROCESS.to_string())));
        });
    }
}
