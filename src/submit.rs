//! Mining requests and the busy state around them.
//!
//! A submission goes through three steps:
//!
//! 1. the form is validated locally; an empty field stops here with
//!    [`ClientError::Validation`] and nothing is sent,
//! 2. the busy state is taken, which disables the submit control,
//! 3. the request is posted and the outcome returned.
//!
//! Step 2 hands out a [`BusyGuard`]. Dropping it, whatever the outcome and
//! even if the task is torn down, clears the busy state and asks the sync
//! loop for a fresh snapshot, so the screen always converges on what the
//! server actually holds.

use std::sync::{
    Arc,
    atomic::{
        AtomicBool,
        Ordering,
    },
};

use crate::{
    errors::{
        ClientError,
        ClientResult,
        FormField,
    },
    ledger_client::{
        LedgerApi,
        MineOutcome,
    },
    snapshot::TransactionRequest,
    sync::SyncHandle,
};

/// The text currently typed into the three form fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionForm {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
}

impl TransactionForm {
    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Sender => &self.sender,
            FormField::Receiver => &self.receiver,
            FormField::Amount => &self.amount,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Sender => &mut self.sender,
            FormField::Receiver => &mut self.receiver,
            FormField::Amount => &mut self.amount,
        }
    }

    pub fn missing_fields(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| self.field(*field).is_empty())
            .collect()
    }

    pub fn to_request(&self) -> ClientResult<TransactionRequest> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ClientError::Validation(missing));
        }
        Ok(TransactionRequest {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            amount: self.amount.clone(),
        })
    }
}

/// True exactly while a submission is outstanding.
#[derive(Clone, Debug, Default)]
pub struct BusyState {
    busy: Arc<AtomicBool>,
}

impl BusyState {
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Takes the busy state, or returns `None` if a submission already holds it.
    pub fn acquire(&self, refresh: SyncHandle) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                busy: self.clone(),
                refresh,
            })
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    busy: BusyState,
    refresh: SyncHandle,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.busy.store(false, Ordering::SeqCst);
        self.refresh.request_fetch();
    }
}

#[derive(Clone)]
pub struct Submitter<A> {
    api: A,
    busy: BusyState,
    refresh: SyncHandle,
}

impl<A: LedgerApi> Submitter<A> {
    pub fn new(api: A, busy: BusyState, refresh: SyncHandle) -> Self {
        Self { api, busy, refresh }
    }

    pub fn busy(&self) -> &BusyState {
        &self.busy
    }

    /// Validates the form and takes the busy state. No network call happens
    /// here; the returned submission is sent with [`PendingSubmission::send`].
    pub fn begin(&self, form: &TransactionForm) -> ClientResult<PendingSubmission<A>> {
        let request = form.to_request()?;
        let guard = self
            .busy
            .acquire(self.refresh.clone())
            .ok_or(ClientError::Busy)?;
        Ok(PendingSubmission {
            api: self.api.clone(),
            request,
            guard,
        })
    }

    pub async fn submit(&self, form: &TransactionForm) -> ClientResult<MineOutcome> {
        self.begin(form)?.send().await
    }
}

/// A validated request holding the busy state until it completes.
pub struct PendingSubmission<A> {
    api: A,
    request: TransactionRequest,
    guard: BusyGuard,
}

impl<A: LedgerApi> PendingSubmission<A> {
    pub fn request(&self) -> &TransactionRequest {
        &self.request
    }

    pub async fn send(self) -> ClientResult<MineOutcome> {
        let (outcome, guard) = self.send_holding_busy().await;
        drop(guard);
        outcome
    }

    /// Like [`send`](Self::send), but hands the busy guard back so the caller
    /// can keep the submit control disabled until the outcome is applied.
    pub async fn send_holding_busy(self) -> (ClientResult<MineOutcome>, BusyGuard) {
        let PendingSubmission {
            api,
            request,
            guard,
        } = self;
        let outcome = api.mine(&request).await;
        (outcome, guard)
    }
}
