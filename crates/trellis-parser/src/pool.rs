//! Thread-based pool of diagram parsing workers
//!
//! Each worker is long-lived and owns its own grammar table, so there is
//! no shared mutable parser state. Requests go through a shared queue and
//! are picked up by the first free worker; each request carries its own
//! response channel, so replies cannot cross between callers even when
//! completions arrive out of order.

use crate::grammars::{GrammarTable, RawAst};
use crate::mapper::IntentMapper;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use trellis_core::{DiagramKind, ParseIssue, Relationship};

/// Mapper output plus the kind-specific raw structure, pre-normalization.
#[derive(Debug)]
pub struct ParsedDiagram {
    pub kind: DiagramKind,
    pub nodes: Vec<String>,
    pub defined_nodes: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub aux_mappings: BTreeMap<String, String>,
    pub raw: RawAst,
}

struct WorkerRequest {
    kind: DiagramKind,
    text: String,
    response_sender: mpsc::Sender<Result<ParsedDiagram, ParseIssue>>,
}

pub struct ParserPool {
    sender: Option<mpsc::Sender<WorkerRequest>>,
    handles: Vec<JoinHandle<()>>,
}

impl ParserPool {
    /// Pool sized to the available cores minus one, minimum one worker.
    pub fn with_default_size() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1);
        Self::new(workers)
    }

    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let receiver = Arc::clone(&receiver);
            handles.push(std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            }));
        }

        ParserPool {
            sender: Some(sender),
            handles,
        }
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);
        let grammars = GrammarTable::new();

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let WorkerRequest {
                kind,
                text,
                response_sender,
            } = request;

            let result = Self::run_grammar(&grammars, kind, &text);
            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Run the automaton with a fresh mapper. A grammar panic is contained
    /// and surfaces as a single parse issue instead of poisoning the
    /// worker.
    fn run_grammar(
        grammars: &GrammarTable,
        kind: DiagramKind,
        text: &str,
    ) -> Result<ParsedDiagram, ParseIssue> {
        let grammar = grammars.grammar_for(kind);
        let mut mapper = IntentMapper::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| grammar.parse(text, &mut mapper)));
        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(issue)) => return Err(issue),
            Err(_) => {
                return Err(ParseIssue {
                    line: 0,
                    message: "internal grammar failure".to_string(),
                })
            }
        };
        let (nodes, defined_nodes, relationships, aux_mappings) = mapper.into_parts();
        Ok(ParsedDiagram {
            kind,
            nodes,
            defined_nodes,
            relationships,
            aux_mappings,
            raw,
        })
    }

    /// Parse synchronously, blocking the current thread until a worker
    /// replies.
    pub fn parse_blocking(
        &self,
        kind: DiagramKind,
        text: String,
    ) -> anyhow::Result<Result<ParsedDiagram, ParseIssue>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Parser pool is shut down"))?;
        let (response_sender, response_receiver) = mpsc::channel();
        sender
            .send(WorkerRequest {
                kind,
                text,
                response_sender,
            })
            .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;
        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("Parser worker died"))
    }

    /// Parse on the pool from async context.
    pub async fn parse(
        &self,
        kind: DiagramKind,
        text: String,
    ) -> anyhow::Result<Result<ParsedDiagram, ParseIssue>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Parser pool is shut down"))?
            .clone();
        tokio::task::spawn_blocking(move || {
            let (response_sender, response_receiver) = mpsc::channel();
            sender
                .send(WorkerRequest {
                    kind,
                    text,
                    response_sender,
                })
                .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;
            response_receiver
                .recv()
                .map_err(|_| anyhow::anyhow!("Parser worker died"))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Stop all workers and clear pending-request bookkeeping. Must run
    /// before process exit so no worker handles dangle.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for ParserPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
