use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{ExecutionMode, ReaderConfig};
use crate::error::{ReaderError, Result};
use crate::formats::IndexRecord;
use crate::index::{IndexMemo, RESULT_CAP, filter};
use crate::source::SharedSource;
use crate::worker::{self, WorkerClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Debouncing,
    AwaitingIndex,
    Querying,
}

/// What the UI shows for search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub state: SearchState,
    /// Query the results belong to.
    pub query: String,
    /// Sequence number of the query the results belong to; `0` before any.
    pub seq: u64,
    pub results: Vec<IndexRecord>,
    pub error: Option<String>,
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            state: SearchState::Idle,
            query: String::new(),
            seq: 0,
            results: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTimings {
    pub debounce: Duration,
    pub ready_poll: Duration,
}

impl SearchTimings {
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            debounce: config.debounce(),
            ready_poll: config.ready_poll_interval(),
        }
    }
}

impl Default for SearchTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            ready_poll: Duration::from_millis(80),
        }
    }
}

/// Runs queries on the worker when there is one, inline otherwise.
///
/// Once the worker path fails the engine stays inline for the rest of the
/// session.
pub struct SearchEngine {
    source: SharedSource,
    manifest_locator: String,
    cap: usize,
    ready_poll: Duration,
    worker: Option<WorkerClient>,
    inline_index: IndexMemo,
}

impl SearchEngine {
    pub fn new(
        source: SharedSource,
        manifest_locator: impl Into<String>,
        mode: ExecutionMode,
    ) -> Self {
        Self::build(
            source,
            manifest_locator.into(),
            mode,
            RESULT_CAP,
            SearchTimings::default().ready_poll,
        )
    }

    pub fn from_config(source: SharedSource, config: &ReaderConfig) -> Self {
        Self::build(
            source,
            config.manifest.clone(),
            config.search_mode,
            config.result_cap,
            config.ready_poll_interval(),
        )
    }

    fn build(
        source: SharedSource,
        manifest_locator: String,
        mode: ExecutionMode,
        cap: usize,
        ready_poll: Duration,
    ) -> Self {
        let worker = match mode {
            ExecutionMode::Worker => Some(worker::spawn(
                Arc::clone(&source),
                manifest_locator.clone(),
                cap,
            )),
            ExecutionMode::Inline => None,
        };
        Self {
            source,
            manifest_locator,
            cap,
            ready_poll,
            worker,
            inline_index: IndexMemo::new(),
        }
    }

    /// Uses an already connected worker instead of spawning one.
    pub fn with_worker(mut self, worker: WorkerClient) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn with_ready_poll(mut self, ready_poll: Duration) -> Self {
        self.ready_poll = ready_poll;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        if self.worker.is_some() {
            ExecutionMode::Worker
        } else {
            ExecutionMode::Inline
        }
    }

    /// Runs one query. `on_state` hears about waiting for the worker index.
    pub async fn run(
        &mut self,
        seq: u64,
        query: &str,
        on_state: &(dyn Fn(SearchState) + Send + Sync),
    ) -> Result<Vec<IndexRecord>> {
        if let Some(worker) = self.worker.as_mut() {
            match run_on_worker(worker, seq, query, self.ready_poll, on_state).await {
                Ok(results) => return Ok(results),
                Err(ReaderError::WorkerReported(message)) if worker.is_ready() => {
                    tracing::error!(seq, text = message, "worker search failed");
                    return Err(ReaderError::WorkerReported(message));
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        "worker search unavailable; using inline search for this session"
                    );
                    self.worker = None;
                }
            }
        }

        on_state(SearchState::Querying);
        let records = self
            .inline_index
            .get_or_build(self.source.as_ref(), &self.manifest_locator)
            .await?;
        Ok(filter(records, query, self.cap))
    }
}

async fn run_on_worker(
    worker: &mut WorkerClient,
    seq: u64,
    query: &str,
    ready_poll: Duration,
    on_state: &(dyn Fn(SearchState) + Send + Sync),
) -> Result<Vec<IndexRecord>> {
    if !worker.poll_ready()? {
        on_state(SearchState::AwaitingIndex);
        while !worker.poll_ready()? {
            tokio::time::sleep(ready_poll).await;
        }
    }
    on_state(SearchState::Querying);
    worker.search(seq, query).await
}

struct Completed {
    seq: u64,
    query: String,
    outcome: Result<Vec<IndexRecord>>,
}

/// Handle to the debounced search loop.
pub struct SearchHandle {
    inputs: mpsc::UnboundedSender<String>,
    view: Arc<watch::Sender<SearchView>>,
    task: JoinHandle<()>,
}

impl SearchHandle {
    pub fn spawn(engine: SearchEngine, timings: SearchTimings) -> Self {
        let (inputs, input_rx) = mpsc::unbounded_channel();
        let (view, _) = watch::channel(SearchView::default());
        let view = Arc::new(view);

        let coordinator = Coordinator {
            engine: Arc::new(Mutex::new(engine)),
            timings,
            view: Arc::clone(&view),
            current: String::new(),
            deadline: None,
            in_flight: None,
            last_seq: 0,
        };
        let task = tokio::spawn(coordinator.run(input_rx));
        Self { inputs, view, task }
    }

    /// One keystroke: the full current text of the search field.
    ///
    /// Blank text clears the results right away.
    pub fn input(&self, text: &str) {
        if text.trim().is_empty() {
            self.view.send_modify(clear);
        }
        if self.inputs.send(text.to_owned()).is_err() {
            tracing::warn!("search loop stopped; ignoring input");
        }
    }

    pub fn view(&self) -> SearchView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view.subscribe()
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn clear(view: &mut SearchView) {
    view.state = SearchState::Idle;
    view.query.clear();
    view.results.clear();
    view.error = None;
}

struct Coordinator {
    engine: Arc<Mutex<SearchEngine>>,
    timings: SearchTimings,
    view: Arc<watch::Sender<SearchView>>,
    /// Trimmed text of the search field.
    current: String,
    deadline: Option<Instant>,
    in_flight: Option<u64>,
    last_seq: u64,
}

impl Coordinator {
    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<String>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completed>();

        loop {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                input = inputs.recv() => match input {
                    Some(text) => self.on_input(&text),
                    None => break,
                },
                () = timer => self.on_timer(&done_tx),
                Some(completed) = done_rx.recv() => self.on_completed(completed),
            }
        }
        tracing::debug!("search loop stopped");
    }

    fn on_input(&mut self, text: &str) {
        self.current = text.trim().to_owned();
        if self.current.is_empty() {
            self.deadline = None;
            self.view.send_modify(clear);
            return;
        }

        self.deadline = Some(Instant::now() + self.timings.debounce);
        if self.in_flight.is_none() {
            self.set_state(SearchState::Debouncing);
        }
    }

    fn on_timer(&mut self, done_tx: &mpsc::UnboundedSender<Completed>) {
        self.deadline = None;
        if let Some(seq) = self.in_flight {
            tracing::debug!(in_flight = seq, "query already running; dropping debounced query");
            return;
        }

        self.last_seq += 1;
        let seq = self.last_seq;
        let query = self.current.clone();
        self.in_flight = Some(seq);
        self.set_state(SearchState::Querying);
        tracing::debug!(seq, query, "dispatching search");

        let engine = Arc::clone(&self.engine);
        let view = Arc::clone(&self.view);
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let on_state = move |state: SearchState| {
                view.send_modify(|v| v.state = state);
            };
            let outcome = engine.lock().await.run(seq, &query, &on_state).await;
            let _ = done_tx.send(Completed {
                seq,
                query,
                outcome,
            });
        });
    }

    fn on_completed(&mut self, completed: Completed) {
        if self.in_flight == Some(completed.seq) {
            self.in_flight = None;
        }
        if completed.seq != self.last_seq {
            tracing::debug!(
                seq = completed.seq,
                latest = self.last_seq,
                "discarding superseded results"
            );
            return;
        }

        if completed.query != self.current {
            tracing::debug!(
                seq = completed.seq,
                "results no longer match the input; searching again"
            );
            if self.current.is_empty() {
                self.view.send_modify(clear);
            } else {
                self.deadline = Some(Instant::now() + self.timings.debounce);
                self.set_state(SearchState::Debouncing);
            }
            return;
        }

        let Completed {
            seq,
            query,
            outcome,
        } = completed;
        self.view.send_modify(|view| {
            view.state = SearchState::Idle;
            view.query = query;
            view.seq = seq;
            match outcome {
                Ok(results) => {
                    view.results = results;
                    view.error = None;
                }
                Err(err) => {
                    tracing::error!(seq, %err, "search failed");
                    view.results.clear();
                    view.error = Some(err.to_string());
                }
            }
        });
    }

    fn set_state(&self, state: SearchState) {
        self.view.send_modify(|view| view.state = state);
    }
}
