//! Common utilities for rdfxa integration tests.
#![allow(dead_code)]

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use rdfxa::prelude::*;
use std::sync::{Arc, Once};

// --- MockClient ---

/// Everything a [`MockClient`] was asked to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Disconnect,
    Commit,
    Rollback,
    Flush,
    Invalidate,
    AddRdfData {
        url: String,
        base_uri: String,
        context: String,
    },
    AddTriple(RdfTriple, String),
    RemoveTriple(RdfTriple, String),
    ClearContext(String),
    Select(String),
    Ask(String),
    Update(String),
}

/// Calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    Commit,
    Flush,
    Rollback,
    Write,
    Select,
    ShutDown,
}

/// State shared by a mock client and the test inspecting it.
#[derive(Default)]
pub struct MockState {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<Failure>>,
    selects: Mutex<HashMap<String, Vec<SparqlSelectTuple>>>,
    asks: Mutex<HashMap<String, bool>>,
    shut_downs: Mutex<usize>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn commits(&self) -> usize {
        self.count(|c| *c == Call::Commit)
    }

    pub fn flushes(&self) -> usize {
        self.count(|c| *c == Call::Flush)
    }

    pub fn rollbacks(&self) -> usize {
        self.count(|c| *c == Call::Rollback)
    }

    pub fn shut_downs(&self) -> usize {
        *self.shut_downs.lock()
    }

    /// Triples added, with their context.
    pub fn added_triples(&self) -> Vec<(RdfTriple, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::AddTriple(t, ctx) => Some((t.clone(), ctx.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn fail(&self, failure: Failure) {
        self.failures.lock().insert(failure);
    }

    pub fn heal(&self, failure: Failure) {
        self.failures.lock().remove(&failure);
    }

    /// Scripts the rows returned for exactly `query`. Other queries return
    /// no rows.
    pub fn respond(&self, query: impl Into<String>, rows: Vec<SparqlSelectTuple>) {
        self.selects.lock().insert(query.into(), rows);
    }

    /// Scripts the answer to exactly `query`. Other ASK queries are true.
    pub fn answer(&self, query: impl Into<String>, answer: bool) {
        self.asks.lock().insert(query.into(), answer);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check(&self, failure: Failure) -> Result<()> {
        if self.failures.lock().contains(&failure) {
            let message = format!("injected {:?} failure", failure);
            return Err(match failure {
                Failure::Commit => RdfXaError::Commit(message),
                Failure::Flush => RdfXaError::Flush(message),
                Failure::Rollback => RdfXaError::Rollback(message),
                _ => RdfXaError::Connection(message),
            });
        }
        Ok(())
    }
}

/// A recording [`TripleStoreClient`].
///
/// Contexts and triple components must contain a `:` to count as URIs.
pub struct MockClient {
    state: Arc<MockState>,
    policy: DurabilityPolicy,
}

impl MockClient {
    pub fn new(state: Arc<MockState>, policy: DurabilityPolicy) -> Self {
        Self { state, policy }
    }

    fn check_context(context: &str) -> Result<()> {
        if context.contains(':') {
            Ok(())
        } else {
            Err(RdfXaError::ContextNameSyntax(context.to_string()))
        }
    }

    fn check_triple(triple: &RdfTriple) -> Result<()> {
        for component in [triple.subject(), triple.predicate(), triple.object()] {
            if !component.contains(':') {
                return Err(RdfXaError::RdfTripleSyntax(component.to_string()));
            }
        }
        Ok(())
    }
}

impl TripleStoreClient for MockClient {
    fn connect(&mut self) -> Result<()> {
        self.state.record(Call::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.state.record(Call::Disconnect);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.state.record(Call::Commit);
        self.state.check(Failure::Commit)
    }

    fn rollback(&mut self) -> Result<()> {
        self.state.record(Call::Rollback);
        self.state.check(Failure::Rollback)
    }

    fn durability_policy(&self) -> DurabilityPolicy {
        self.policy
    }

    fn flush(&mut self) -> Result<()> {
        self.state.record(Call::Flush);
        self.state.check(Failure::Flush)
    }

    fn add_rdf_data(&mut self, url: &str, base_uri: &str, context: &str) -> Result<()> {
        Self::check_context(context)?;
        self.state.check(Failure::Write)?;
        self.state.record(Call::AddRdfData {
            url: url.to_string(),
            base_uri: base_uri.to_string(),
            context: context.to_string(),
        });
        Ok(())
    }

    fn add_rdf_triple(&mut self, triple: &RdfTriple, context: &str) -> Result<()> {
        Self::check_context(context)?;
        Self::check_triple(triple)?;
        self.state.check(Failure::Write)?;
        self.state
            .record(Call::AddTriple(triple.clone(), context.to_string()));
        Ok(())
    }

    fn remove_rdf_triple(&mut self, triple: &RdfTriple, context: &str) -> Result<()> {
        Self::check_context(context)?;
        Self::check_triple(triple)?;
        self.state.check(Failure::Write)?;
        self.state
            .record(Call::RemoveTriple(triple.clone(), context.to_string()));
        Ok(())
    }

    fn clear_context(&mut self, context: &str) -> Result<()> {
        Self::check_context(context)?;
        self.state.check(Failure::Write)?;
        self.state.record(Call::ClearContext(context.to_string()));
        Ok(())
    }

    fn execute_sparql_select_query(&mut self, query: &str) -> Result<Vec<SparqlSelectTuple>> {
        self.state.record(Call::Select(query.to_string()));
        self.state.check(Failure::Select)?;
        Ok(self
            .state
            .selects
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    fn execute_sparql_ask_query(&mut self, query: &str) -> Result<bool> {
        self.state.record(Call::Ask(query.to_string()));
        self.state.check(Failure::Select)?;
        Ok(self.state.asks.lock().get(query).copied().unwrap_or(true))
    }

    fn execute_sparql_update_data(&mut self, update: &str) -> Result<()> {
        self.state.record(Call::Update(update.to_string()));
        self.state.check(Failure::Write)
    }

    fn invalidate(&mut self) -> Result<()> {
        self.state.record(Call::Invalidate);
        Ok(())
    }
}

// --- MockScratch ---

/// A working repository handing out [`MockClient`]s over one state.
pub struct MockScratch {
    pub state: Arc<MockState>,
    opened: Mutex<usize>,
}

impl MockScratch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: MockState::new(),
            opened: Mutex::new(0),
        })
    }

    pub fn opened(&self) -> usize {
        *self.opened.lock()
    }
}

impl ScratchRepository for MockScratch {
    fn open(&self) -> Result<Box<dyn TripleStoreClient>> {
        *self.opened.lock() += 1;
        Ok(Box::new(MockClient::new(
            self.state.clone(),
            DurabilityPolicy::OnCommit,
        )))
    }

    fn shut_down(&self) -> Result<()> {
        *self.state.shut_downs.lock() += 1;
        self.state.check(Failure::ShutDown)
    }
}

// --- RecordingListener ---

#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingListener {
    pub fn kinds(&self) -> Vec<ConnectionEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }
}

impl ConnectionEventListener for RecordingListener {
    fn connection_closed(&self, event: &ConnectionEvent) {
        self.events.lock().push(event.clone());
    }

    fn connection_error_occurred(&self, event: &ConnectionEvent) {
        self.events.lock().push(event.clone());
    }
}

// --- Helper Functions ---

/// A managed connection over a fresh mock client and its own lock manager.
pub fn setup_connection(
    policy: DurabilityPolicy,
) -> (Arc<ManagedConnection>, Arc<MockState>, Arc<LockManager>) {
    let state = MockState::new();
    let locks = Arc::new(LockManager::new());
    let managed = ManagedConnection::new(
        Box::new(MockClient::new(state.clone(), policy)),
        locks.clone(),
        None,
    );
    (managed, state, locks)
}

/// Like [`setup_connection`], with a mock working repository.
pub fn setup_materializing_connection() -> (Arc<ManagedConnection>, Arc<MockState>, Arc<MockScratch>) {
    let state = MockState::new();
    let scratch = MockScratch::new();
    let managed = ManagedConnection::new(
        Box::new(MockClient::new(state.clone(), DurabilityPolicy::OnCommit)),
        Arc::new(LockManager::new()),
        Some(scratch.clone() as Arc<dyn ScratchRepository>),
    );
    (managed, state, scratch)
}

pub fn xid(n: u8) -> Xid {
    Xid::new(4711, vec![n; 4], vec![1])
}

pub fn triple(n: usize) -> RdfTriple {
    RdfTriple::new(
        format!("http://example.org/svc{}", n),
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
        "http://example.org/Service",
    )
}

// --- CapturingLogger ---

/// A record seen by the capturing logger.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct CapturingLogger {
    lines: Mutex<Vec<LogLine>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.lines.lock().push(LogLine {
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    lines: parking_lot::const_mutex(Vec::new()),
};

/// Routes `log` output of this test binary into memory. Idempotent.
pub fn capture_logs() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("a logger is already installed");
        log::set_max_level(LevelFilter::Info);
    });
}

/// Captured lines of `target` whose message mentions `needle`. Tests of one
/// binary share the logger, so filter by something unique to the test.
pub fn captured_logs(target: &str, needle: &str) -> Vec<LogLine> {
    LOGGER
        .lines
        .lock()
        .iter()
        .filter(|line| line.target == target && line.message.contains(needle))
        .cloned()
        .collect()
}
