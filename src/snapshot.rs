//! Wire types shared with the ledger service.
//!
//! A [`Snapshot`] is the complete authoritative state returned by
//! `GET /api/chain`. It is never patched in place: every successful fetch
//! produces a fresh value that replaces the previous one wholesale.

use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};

/// User identifier to trust score, in the order the server listed them.
///
/// Insertion order matters: it is the tie-break for equal scores when the
/// ranking is rendered.
pub type Scores = IndexMap<String, i64>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub scores: Scores,
    /// Oldest block first.
    pub chain: Vec<Block>,
    /// Proof-of-work difficulty the server mines at, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Body of `POST /api/mine`.
///
/// `amount` is sent exactly as typed; the server decides whether it is a
/// number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn snapshot__deserialize__keeps_score_order_from_payload() {
        // given
        let json = r#"{
            "chain": [
                {"index": 0, "sender": "System", "receiver": "System", "amount": 0, "hash": "000abc", "nonce": 0}
            ],
            "scores": {"zed": 1, "amy": 1, "bob": -6},
            "difficulty": 3
        }"#;

        // when
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        // then
        let users: Vec<&str> = snapshot.scores.keys().map(String::as_str).collect();
        assert_eq!(users, vec!["zed", "amy", "bob"]);
        assert_eq!(snapshot.difficulty, Some(3));
        assert!(snapshot.chain[0].is_genesis());
    }

    #[test]
    fn snapshot__deserialize__difficulty_is_optional() {
        let json = r#"{"scores": {}, "chain": []}"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn snapshot__deserialize__rejects_missing_chain() {
        let json = r#"{"scores": {"A": 5}}"#;

        let result = serde_json::from_str::<Snapshot>(json);

        assert!(result.is_err());
    }

    #[test]
    fn transaction_request__serialize__sends_amount_as_raw_text() {
        // given
        let request = TransactionRequest {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: "-3".to_string(),
        };

        // when
        let value = serde_json::to_value(&request).unwrap();

        // then
        assert_eq!(
            value,
            serde_json::json!({"sender": "alice", "receiver": "bob", "amount": "-3"})
        );
    }
}
