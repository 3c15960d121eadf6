//! In-memory caches and ledger for testing.

use crate::{
    ledger,
    store::{self, Error},
    Checkpoint, ProcessMetadata, SortKey,
};
use cu_gateway::{Block, TransactionMeta};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Default)]
struct ProcessesState {
    records: HashMap<String, ProcessMetadata>,
    find_error: Option<Error>,
    save_error: Option<Error>,
    finds: usize,
    saves: Vec<ProcessMetadata>,
}

/// A metadata cache backed by a map.
#[derive(Clone, Default)]
pub struct Processes {
    state: Arc<Mutex<ProcessesState>>,
}

impl Processes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache `process`.
    pub fn insert(&self, process: ProcessMetadata) {
        let mut state = self.state.lock().unwrap();
        state.records.insert(process.id.clone(), process);
    }

    /// Fail every lookup with `error`.
    pub fn fail_find(&self, error: Error) {
        self.state.lock().unwrap().find_error = Some(error);
    }

    /// Fail every save with `error`.
    pub fn fail_save(&self, error: Error) {
        self.state.lock().unwrap().save_error = Some(error);
    }

    /// Number of lookups received.
    pub fn finds(&self) -> usize {
        self.state.lock().unwrap().finds
    }

    /// Every process a save was attempted for (including failed attempts).
    pub fn saves(&self) -> Vec<ProcessMetadata> {
        self.state.lock().unwrap().saves.clone()
    }
}

impl store::Processes for Processes {
    async fn find(&self, id: &str) -> Result<ProcessMetadata, Error> {
        let mut state = self.state.lock().unwrap();
        state.finds += 1;
        if let Some(error) = &state.find_error {
            return Err(error.clone());
        }
        state.records.get(id).cloned().ok_or(Error::NotFound)
    }

    async fn save(&self, process: ProcessMetadata) -> Result<String, Error> {
        let mut state = self.state.lock().unwrap();
        state.saves.push(process.clone());
        if let Some(error) = &state.save_error {
            return Err(error.clone());
        }
        let id = process.id.clone();
        if state.records.contains_key(&id) {
            return Err(Error::Conflict(id));
        }
        state.records.insert(id.clone(), process);
        Ok(id)
    }
}

#[derive(Default)]
struct EvaluationsState {
    checkpoints: HashMap<String, Vec<Checkpoint>>,
    error: Option<Error>,
    lookups: Vec<(String, Option<SortKey>)>,
}

/// A checkpoint cache backed by a map of checkpoint logs.
#[derive(Clone, Default)]
pub struct Evaluations {
    state: Arc<Mutex<EvaluationsState>>,
}

impl Evaluations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `checkpoint` to the log of its process.
    pub fn append(&self, checkpoint: Checkpoint) {
        let mut state = self.state.lock().unwrap();
        state
            .checkpoints
            .entry(checkpoint.process_id.clone())
            .or_default()
            .push(checkpoint);
    }

    /// Fail every lookup with `error`.
    pub fn fail(&self, error: Error) {
        self.state.lock().unwrap().error = Some(error);
    }

    /// Every `(process_id, to)` lookup received.
    pub fn lookups(&self) -> Vec<(String, Option<SortKey>)> {
        self.state.lock().unwrap().lookups.clone()
    }
}

impl store::Evaluations for Evaluations {
    async fn find_latest(
        &self,
        process_id: &str,
        to: Option<&SortKey>,
    ) -> Result<Checkpoint, Error> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push((process_id.to_string(), to.cloned()));
        if let Some(error) = &state.error {
            return Err(error.clone());
        }
        state
            .checkpoints
            .get(process_id)
            .into_iter()
            .flatten()
            .filter(|checkpoint| to.is_none_or(|to| &checkpoint.sort_key <= to))
            .max_by(|a, b| a.sort_key.cmp(&b.sort_key))
            .cloned()
            .ok_or(Error::NotFound)
    }
}

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<String, (TransactionMeta, Block)>,
    error: Option<cu_gateway::Error>,
    meta_loads: usize,
    block_loads: usize,
}

/// A ledger backed by a map of transactions.
#[derive(Clone, Default)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register transaction `id`.
    pub fn insert(&self, id: &str, meta: TransactionMeta, block: Block) {
        let mut state = self.state.lock().unwrap();
        state.transactions.insert(id.to_string(), (meta, block));
    }

    /// Fail every request with `error`.
    pub fn fail(&self, error: cu_gateway::Error) {
        self.state.lock().unwrap().error = Some(error);
    }

    /// Number of `(transaction_meta, transaction_block)` requests received.
    pub fn loads(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.meta_loads, state.block_loads)
    }
}

impl ledger::Ledger for Ledger {
    async fn transaction_meta(&self, id: &str) -> Result<TransactionMeta, cu_gateway::Error> {
        let mut state = self.state.lock().unwrap();
        state.meta_loads += 1;
        if let Some(error) = &state.error {
            return Err(error.clone());
        }
        state
            .transactions
            .get(id)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| cu_gateway::Error::NotFound(id.to_string()))
    }

    async fn transaction_block(&self, id: &str) -> Result<Block, cu_gateway::Error> {
        let mut state = self.state.lock().unwrap();
        state.block_loads += 1;
        if let Some(error) = &state.error {
            return Err(error.clone());
        }
        state
            .transactions
            .get(id)
            .map(|(_, block)| *block)
            .ok_or_else(|| cu_gateway::Error::NotFound(id.to_string()))
    }
}
