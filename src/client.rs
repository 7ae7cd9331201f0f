use crate::{
    config::{
        AppConfig,
        RenderPolicy,
    },
    errors::{
        ClientError,
        ClientResult,
        FormField,
    },
    ledger_client::{
        HttpLedgerClient,
        LedgerApi,
        MineOutcome,
    },
    render::{
        RenderedView,
        render,
    },
    snapshot::Snapshot,
    submit::{
        BusyGuard,
        BusyState,
        Submitter,
        TransactionForm,
    },
    sync::{
        FetchGenerations,
        SyncEvent,
        SyncHandle,
        snapshot_worker,
    },
    ui,
};
use chrono::{
    DateTime,
    Local,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

const SPINNER_TICK: Duration = Duration::from_millis(120);
const READY_STATUS: &str = "Ready";

/// A blocking notification. The UI shows it as a modal until dismissed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Everything the UI needs for one frame.
#[derive(Clone, Debug)]
pub struct Screen {
    pub server_url: String,
    pub view: Option<RenderedView>,
    pub last_synced: Option<DateTime<Local>>,
    pub form: TransactionForm,
    pub focus: FormField,
    pub busy: bool,
    pub status: String,
    pub notice: Option<Notice>,
}

pub struct AppController {
    server_url: String,
    render_policy: RenderPolicy,
    generations: FetchGenerations,
    busy: BusyState,
    form: TransactionForm,
    focus: FormField,
    view: Option<RenderedView>,
    last_synced: Option<DateTime<Local>>,
    status: String,
    notice: Option<Notice>,
}

impl AppController {
    pub fn new(config: &AppConfig, busy: BusyState, generations: FetchGenerations) -> Self {
        Self {
            server_url: config.server_url.clone(),
            render_policy: config.render,
            generations,
            busy,
            form: TransactionForm::default(),
            focus: FormField::Sender,
            view: None,
            last_synced: None,
            status: String::from(READY_STATUS),
            notice: None,
        }
    }

    pub fn form(&self) -> &TransactionForm {
        &self.form
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn view(&self) -> Option<&RenderedView> {
        self.view.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Replaces the displayed view if `generation` is the latest fetch issued.
    /// Returns whether the snapshot was applied.
    pub fn apply_snapshot(&mut self, generation: u64, snapshot: Snapshot) -> bool {
        if !self.generations.is_latest(generation) {
            debug!(
                generation,
                latest = self.generations.latest(),
                "discarding stale snapshot"
            );
            return false;
        }
        self.view = Some(render(&snapshot, &self.render_policy));
        self.last_synced = Some(Local::now());
        true
    }

    pub fn mark_submitting(&mut self) {
        self.status = format!(
            "Mining {} -> {} ({})...",
            self.form.sender, self.form.receiver, self.form.amount
        );
    }

    /// Reconciles the form and notifications with how a submission ended.
    pub fn apply_outcome(&mut self, outcome: ClientResult<MineOutcome>) {
        match outcome {
            Ok(MineOutcome::Accepted) => {
                info!(
                    sender = %self.form.sender,
                    receiver = %self.form.receiver,
                    amount = %self.form.amount,
                    "transaction mined"
                );
                self.form.amount.clear();
                self.focus = FormField::Amount;
                self.status = String::from("Block mined");
            }
            Ok(MineOutcome::Rejected(reason)) | Err(ClientError::Rejected(reason)) => {
                self.status = String::from("Transaction rejected");
                self.notice = Some(Notice::new(
                    "⛔ TRANSACTION REJECTED",
                    ClientError::Rejected(reason).to_string(),
                ));
            }
            Ok(MineOutcome::Unknown(status)) => {
                warn!(status, "mine request answered with an unexpected status");
                self.form.amount.clear();
                self.status = format!("Server answered {status}");
                self.notice = Some(Notice::new(
                    "Unexpected response",
                    format!(
                        "Server answered with status {status}; the transaction may not have been mined."
                    ),
                ));
            }
            Err(err @ ClientError::Validation(_)) => {
                self.status = String::from(READY_STATUS);
                self.notice = Some(Notice::new("Missing fields", err.to_string()));
            }
            Err(ClientError::Connectivity(reason)) => {
                error!(%reason, "mine request failed");
                self.status = String::from("Server unreachable");
                self.notice = Some(Notice::new(
                    "Server error",
                    "The ledger service is unreachable. Check that it is running.",
                ));
            }
            Err(ClientError::Busy) => {
                debug!("submit ignored while a transaction is being mined");
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn type_char(&mut self, c: char) {
        self.form.field_mut(self.focus).push(c);
    }

    pub fn backspace(&mut self) {
        self.form.field_mut(self.focus).pop();
    }

    pub fn focus_next(&mut self) {
        self.focus = next_field(self.focus);
    }

    pub fn focus_prev(&mut self) {
        self.focus = prev_field(self.focus);
    }

    pub fn screen(&self) -> Screen {
        Screen {
            server_url: self.server_url.clone(),
            view: self.view.clone(),
            last_synced: self.last_synced,
            form: self.form.clone(),
            focus: self.focus,
            busy: self.is_busy(),
            status: self.status.clone(),
            notice: self.notice.clone(),
        }
    }
}

fn next_field(field: FormField) -> FormField {
    let fields = FormField::ALL;
    let idx = fields.iter().position(|f| *f == field).unwrap_or(0);
    fields[(idx + 1) % fields.len()]
}

fn prev_field(field: FormField) -> FormField {
    let fields = FormField::ALL;
    let idx = fields.iter().position(|f| *f == field).unwrap_or(0);
    fields[(idx + fields.len() - 1) % fields.len()]
}

/// What changed after [`Session::next_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    Snapshot { applied: bool },
    Submission,
    WorkerStopped,
}

/// The controller wired to a running sync loop and a submitter.
pub struct Session<A> {
    pub controller: AppController,
    submitter: Submitter<A>,
    sync: SyncHandle,
    worker: JoinHandle<()>,
    sync_events: mpsc::UnboundedReceiver<SyncEvent>,
    outcome_tx: mpsc::UnboundedSender<Completed>,
    outcome_rx: mpsc::UnboundedReceiver<Completed>,
}

/// A finished submission. The guard keeps the form busy until the outcome
/// has been applied.
struct Completed {
    outcome: ClientResult<MineOutcome>,
    guard: BusyGuard,
}

impl<A: LedgerApi> Session<A> {
    /// Spawns the sync loop. Must be called inside a Tokio runtime.
    pub fn start(api: A, config: &AppConfig) -> Self {
        let generations = FetchGenerations::new();
        let (sync_cmd_tx, sync_cmd_rx) = mpsc::unbounded_channel();
        let (sync_event_tx, sync_events) = mpsc::unbounded_channel();
        let sync = SyncHandle::new(sync_cmd_tx);
        let worker = tokio::spawn(snapshot_worker(
            config.poll_interval,
            api.clone(),
            generations.clone(),
            sync_cmd_rx,
            sync_event_tx,
        ));
        let busy = BusyState::default();
        let submitter = Submitter::new(api, busy.clone(), sync.clone());
        let controller = AppController::new(config, busy, generations);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            submitter,
            sync,
            worker,
            sync_events,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Starts mining the current form contents in the background. Validation
    /// failures are surfaced straight away without touching the network.
    pub fn submit(&mut self) {
        match self.submitter.begin(self.controller.form()) {
            Ok(pending) => {
                self.controller.mark_submitting();
                let outcome_tx = self.outcome_tx.clone();
                tokio::spawn(async move {
                    let (outcome, guard) = pending.send_holding_busy().await;
                    let _ = outcome_tx.send(Completed { outcome, guard });
                });
            }
            Err(err) => self.controller.apply_outcome(Err(err)),
        }
    }

    /// Waits for the next snapshot or submission result and applies it.
    pub async fn next_update(&mut self) -> Update {
        tokio::select! {
            event = self.sync_events.recv() => match event {
                Some(SyncEvent::Snapshot { generation, snapshot }) => Update::Snapshot {
                    applied: self.controller.apply_snapshot(generation, snapshot),
                },
                None => Update::WorkerStopped,
            },
            Some(Completed { outcome, guard }) = self.outcome_rx.recv() => {
                self.controller.apply_outcome(outcome);
                // Releases busy and requests the reconciling fetch.
                drop(guard);
                Update::Submission
            }
        }
    }

    pub async fn shutdown(self) -> Result<()> {
        self.sync.shutdown();
        self.worker.await.wrap_err("snapshot worker panicked")
    }
}

// The spinner branch is only polled while busy; idle ticks must not burst.
fn spinner_interval() -> time::Interval {
    let mut spinner = time::interval(SPINNER_TICK);
    spinner.set_missed_tick_behavior(MissedTickBehavior::Skip);
    spinner
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let api = HttpLedgerClient::new(config.server_url.clone())?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!(server = %api, "starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(api, &config, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    info!("UI stopped");
    res
}

async fn run_loop<A: LedgerApi>(
    api: A,
    config: &AppConfig,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let mut session = Session::start(api, config);
    let mut spinner = spinner_interval();
    ui::draw(ui_state, &session.controller.screen()).wrap_err("initial draw failed")?;

    loop {
        let busy = session.controller.is_busy();
        tokio::select! {
            update = session.next_update() => {
                match update {
                    Update::Snapshot { applied: false } => continue,
                    Update::WorkerStopped => {
                        warn!("snapshot worker channel closed");
                        break;
                    }
                    Update::Snapshot { applied: true } | Update::Submission => {}
                }
                ui::draw(ui_state, &session.controller.screen())
                    .wrap_err("draw after update failed")?;
            }
            _ = spinner.tick(), if busy => {
                ui_state.advance_spinner();
                ui::draw(ui_state, &session.controller.screen())
                    .wrap_err("draw for busy indicator failed")?;
            }
            _ = tokio::signal::ctrl_c() => break,
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    // A submit while busy comes back as `ClientError::Busy` and is ignored.
                    ui::UserEvent::Submit => session.submit(),
                    ui::UserEvent::Input(c) => session.controller.type_char(c),
                    ui::UserEvent::Backspace => session.controller.backspace(),
                    ui::UserEvent::NextField => session.controller.focus_next(),
                    ui::UserEvent::PrevField => session.controller.focus_prev(),
                    ui::UserEvent::DismissNotice => session.controller.dismiss_notice(),
                    ui::UserEvent::Redraw => {}
                }
                ui::draw(ui_state, &session.controller.screen())
                    .wrap_err("draw after input failed")?;
            }
        }
    }
    session.shutdown().await
}
