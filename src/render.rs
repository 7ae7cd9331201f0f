//! Pure mapping from a [`Snapshot`] to what the screen shows.
//!
//! Nothing here touches the terminal. The UI layer turns the style classes
//! into colours and markers, so the ordering and classification rules can be
//! tested without a backend.

use crate::{
    config::RenderPolicy,
    snapshot::{
        Block,
        Snapshot,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    /// Highest score first. Equal scores keep snapshot order.
    pub scores: Vec<ScoreRow>,
    /// Newest block first.
    pub chain: Vec<BlockRow>,
    pub difficulty: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub user: String,
    pub score: i64,
    pub banned: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockClass {
    Genesis,
    Regular,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AmountClass {
    Positive,
    NonPositive,
}

impl AmountClass {
    pub fn of(amount: i64) -> Self {
        if amount > 0 {
            AmountClass::Positive
        } else {
            AmountClass::NonPositive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRow {
    pub index: u64,
    pub class: BlockClass,
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
    pub amount_class: AmountClass,
    pub nonce: String,
    pub hash: String,
}

impl From<&Block> for BlockRow {
    fn from(block: &Block) -> Self {
        BlockRow {
            index: block.index,
            class: if block.is_genesis() {
                BlockClass::Genesis
            } else {
                BlockClass::Regular
            },
            sender: block.sender.clone(),
            receiver: block.receiver.clone(),
            amount: block.amount,
            amount_class: AmountClass::of(block.amount),
            nonce: block.nonce.to_string(),
            hash: block.hash.clone(),
        }
    }
}

pub fn render(snapshot: &Snapshot, policy: &RenderPolicy) -> RenderedView {
    RenderedView {
        scores: rank_scores(snapshot, policy),
        chain: snapshot.chain.iter().rev().map(BlockRow::from).collect(),
        difficulty: snapshot.difficulty,
    }
}

fn rank_scores(snapshot: &Snapshot, policy: &RenderPolicy) -> Vec<ScoreRow> {
    let mut rows: Vec<ScoreRow> = snapshot
        .scores
        .iter()
        .map(|(user, score)| ScoreRow {
            user: user.clone(),
            score: *score,
            banned: *score < policy.ban_threshold,
        })
        .collect();
    // `sort_by` is stable, so ties stay in snapshot order.
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    rows
}
