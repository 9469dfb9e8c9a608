//! Isolated index worker.
//!
//! The worker owns its own index memo and talks to its client only through
//! JSON strings on two channels, so nothing is shared between the contexts.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::{ReaderError, Result};
use crate::formats::IndexRecord;
use crate::index::{IndexMemo, filter};
use crate::source::SharedSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    Init,
    Search {
        q: String,
        #[serde(default)]
        seq: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    Ready,
    Results {
        q: String,
        #[serde(default)]
        seq: u64,
        results: Vec<IndexRecord>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
}

/// Spawns the worker task and returns the client end, already initializing.
pub fn spawn(source: SharedSource, manifest_locator: String, cap: usize) -> WorkerClient {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_worker(
        source,
        manifest_locator,
        cap,
        request_rx,
        response_tx,
    ));
    let mut client = WorkerClient::from_channels(request_tx, response_rx);
    client.handle = Some(handle);
    if let Err(err) = client.send(&WorkerRequest::Init) {
        tracing::warn!(%err, "could not start worker index build");
    }
    client
}

async fn run_worker(
    source: SharedSource,
    manifest_locator: String,
    cap: usize,
    mut requests: UnboundedReceiver<String>,
    responses: UnboundedSender<String>,
) {
    let memo = IndexMemo::new();

    while let Some(raw) = requests.recv().await {
        let reply = match serde_json::from_str::<WorkerRequest>(&raw) {
            Ok(WorkerRequest::Init) => {
                match memo.get_or_build(source.as_ref(), &manifest_locator).await {
                    Ok(_) => WorkerResponse::Ready,
                    Err(err) => WorkerResponse::Error {
                        message: err.to_string(),
                        seq: None,
                    },
                }
            }
            Ok(WorkerRequest::Search { q, seq }) => {
                let q = q.trim().to_owned();
                if q.is_empty() {
                    WorkerResponse::Results {
                        q,
                        seq,
                        results: Vec::new(),
                    }
                } else {
                    match memo.get_or_build(source.as_ref(), &manifest_locator).await {
                        Ok(records) => WorkerResponse::Results {
                            results: filter(records, &q, cap),
                            q,
                            seq,
                        },
                        Err(err) => WorkerResponse::Error {
                            message: err.to_string(),
                            seq: Some(seq),
                        },
                    }
                }
            }
            Err(err) => WorkerResponse::Error {
                message: format!("unreadable request: {err}"),
                seq: None,
            },
        };

        let Ok(raw_reply) = serde_json::to_string(&reply) else {
            break;
        };
        if responses.send(raw_reply).is_err() {
            break;
        }
    }
    tracing::debug!("search worker stopped");
}

/// Client end of the worker channels.
#[derive(Debug)]
pub struct WorkerClient {
    requests: UnboundedSender<String>,
    responses: UnboundedReceiver<String>,
    ready: bool,
    handle: Option<JoinHandle<()>>,
}

impl WorkerClient {
    /// Wraps existing channels. The peer must speak the worker protocol.
    pub fn from_channels(
        requests: UnboundedSender<String>,
        responses: UnboundedReceiver<String>,
    ) -> Self {
        Self {
            requests,
            responses,
            ready: false,
            handle: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn send(&self, request: &WorkerRequest) -> Result<()> {
        let raw = serde_json::to_string(request)
            .map_err(|err| ReaderError::WorkerTransport(format!("encode request: {err}")))?;
        self.requests
            .send(raw)
            .map_err(|_| ReaderError::WorkerTransport("worker channel closed".to_owned()))
    }

    fn decode(raw: &str) -> Result<WorkerResponse> {
        serde_json::from_str(raw)
            .map_err(|err| ReaderError::WorkerTransport(format!("malformed reply: {err}")))
    }

    /// Drains pending replies without waiting and reports readiness.
    pub fn poll_ready(&mut self) -> Result<bool> {
        while !self.ready {
            let raw = match self.responses.try_recv() {
                Ok(raw) => raw,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(ReaderError::WorkerTransport(
                        "worker channel closed".to_owned(),
                    ));
                }
            };
            match Self::decode(&raw)? {
                WorkerResponse::Ready => self.ready = true,
                WorkerResponse::Error { message, .. } => {
                    return Err(ReaderError::WorkerReported(message));
                }
                WorkerResponse::Results { seq, .. } => {
                    tracing::debug!(seq, "discarding results received before ready");
                }
            }
        }
        Ok(self.ready)
    }

    /// Sends one query and waits for its reply. Replies tagged with an older
    /// sequence number are discarded.
    pub async fn search(&mut self, seq: u64, q: &str) -> Result<Vec<IndexRecord>> {
        self.send(&WorkerRequest::Search {
            q: q.to_owned(),
            seq,
        })?;

        loop {
            let raw = self.responses.recv().await.ok_or_else(|| {
                ReaderError::WorkerTransport("worker channel closed".to_owned())
            })?;
            match Self::decode(&raw)? {
                WorkerResponse::Results {
                    seq: reply_seq,
                    results,
                    ..
                } if reply_seq == seq => return Ok(results),
                WorkerResponse::Results { seq: reply_seq, .. } => {
                    tracing::debug!(reply_seq, seq, "discarding stale worker results");
                }
                WorkerResponse::Ready => self.ready = true,
                WorkerResponse::Error {
                    message,
                    seq: reply_seq,
                } => {
                    if reply_seq.is_none_or(|s| s == seq) {
                        return Err(ReaderError::WorkerReported(message));
                    }
                    tracing::debug!(?reply_seq, seq, "discarding stale worker error");
                }
            }
        }
    }
}

impl Drop for WorkerClient {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
