use std::sync::{
    Arc,
    Mutex,
};

use crate::{
    errors::{
        ClientError,
        ClientResult,
    },
    ledger_client::{
        LedgerApi,
        MineOutcome,
    },
    snapshot::{
        Block,
        Snapshot,
        TransactionRequest,
    },
};

/// In-memory stand-in for the ledger service that records every call.
#[derive(Clone)]
pub struct FakeLedgerApi {
    state: Arc<Mutex<FakeState>>,
}

struct FakeState {
    snapshot: ClientResult<Snapshot>,
    mine: ClientResult<MineOutcome>,
    fetch_calls: usize,
    mine_requests: Vec<TransactionRequest>,
}

impl Default for FakeLedgerApi {
    fn default() -> Self {
        Self::with_snapshot(Snapshot::default())
    }
}

impl FakeLedgerApi {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                snapshot: Ok(snapshot),
                mine: Ok(MineOutcome::Accepted),
                fetch_calls: 0,
                mine_requests: Vec::new(),
            })),
        }
    }

    /// Every call fails as if the server were down.
    pub fn unreachable() -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            state.snapshot = Err(ClientError::Connectivity("connection refused".into()));
            state.mine = Err(ClientError::Connectivity("connection refused".into()));
        }
        api
    }

    pub fn mining(self, outcome: ClientResult<MineOutcome>) -> Self {
        self.state.lock().unwrap().mine = outcome;
        self
    }

    pub fn set_snapshot(&self, snapshot: Snapshot) {
        self.state.lock().unwrap().snapshot = Ok(snapshot);
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().unwrap().fetch_calls
    }

    pub fn mine_requests(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().mine_requests.clone()
    }
}

impl LedgerApi for FakeLedgerApi {
    async fn fetch_snapshot(&self) -> ClientResult<Snapshot> {
        let mut state = self.state.lock().unwrap();
        state.fetch_calls += 1;
        state.snapshot.clone()
    }

    async fn mine(&self, request: &TransactionRequest) -> ClientResult<MineOutcome> {
        let mut state = self.state.lock().unwrap();
        state.mine_requests.push(request.clone());
        state.mine.clone()
    }
}

pub fn block(index: u64, sender: &str, receiver: &str, amount: i64) -> Block {
    Block {
        index,
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        amount,
        nonce: 4096 + index,
        hash: format!("000{:x}", 0xabc000 + index),
    }
}

/// A snapshot whose chain is a genesis block followed by `len - 1` transfers.
pub fn snapshot_with_chain_len(len: u64) -> Snapshot {
    Snapshot {
        scores: [("alice".to_string(), 2), ("bob".to_string(), 1)]
            .into_iter()
            .collect(),
        chain: (0..len)
            .map(|index| {
                if index == 0 {
                    block(0, "System", "System", 0)
                } else {
                    block(index, "alice", "bob", 1)
                }
            })
            .collect(),
        difficulty: Some(3),
    }
}
