use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::client::{shared, ScratchRepository, SharedClient, TripleStoreClient};
use crate::commit_strategy::CommitStrategy;
use crate::connection::ConnectionHandle;
use crate::connector::AUDIT_TARGET;
use crate::data_store::journal::Journal;
use crate::data_store::operation::Operation;
use crate::errors::{RdfXaError, Result};
use crate::lock_manager::{HolderId, LockManager};
use crate::materializer::{MaterializationReport, Materializer};
use crate::model::{RdfTriple, SparqlSelectTuple};
use crate::participant::ResourceParticipant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    /// The handle was closed normally.
    Closed,
    /// The handle was released because of an error.
    ErrorOccurred,
}

/// Notification sent to the owner of a managed connection.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub connection_id: HolderId,
    pub error: Option<String>,
}

/// Receives the events of managed connections, typically a pool.
pub trait ConnectionEventListener: Send + Sync {
    fn connection_closed(&self, event: &ConnectionEvent);

    fn connection_error_occurred(&self, event: &ConnectionEvent);
}

/// One physical connection to the main repository, with the journal and the
/// two-phase-commit participant of the branch it serves.
///
/// Writes take the repository write lock and keep it until
/// [`ManagedConnection::cleanup`]; reads take the read lock for the duration
/// of the query only. Every successful write is journaled before the call
/// returns, failed writes never are.
pub struct ManagedConnection {
    holder: HolderId,
    client: SharedClient,
    journal: Arc<Journal>,
    locks: Arc<LockManager>,
    participant: Arc<ResourceParticipant>,
    scratch: Option<Arc<dyn ScratchRepository>>,
    listeners: Mutex<Vec<Arc<dyn ConnectionEventListener>>>,
    handle_valid: Mutex<Option<Arc<AtomicBool>>>,
}

impl ManagedConnection {
    /// Creates a managed connection over `client`.
    ///
    /// With a `scratch` repository, closing a connection whose branch only
    /// registered one described service derives its transformations.
    pub fn new(
        client: Box<dyn TripleStoreClient>,
        locks: Arc<LockManager>,
        scratch: Option<Arc<dyn ScratchRepository>>,
    ) -> Arc<Self> {
        let client = shared(client);
        let journal = Arc::new(Journal::new());
        let participant = ResourceParticipant::for_client(client.clone(), journal.clone());
        Self::assemble(client, journal, participant, locks, scratch)
    }

    /// Like [`ManagedConnection::new`], with an explicit commit strategy.
    pub fn with_commit_strategy(
        client: Box<dyn TripleStoreClient>,
        locks: Arc<LockManager>,
        scratch: Option<Arc<dyn ScratchRepository>>,
        strategy: Box<dyn CommitStrategy>,
    ) -> Arc<Self> {
        let client = shared(client);
        let journal = Arc::new(Journal::new());
        let participant = ResourceParticipant::new(client.clone(), journal.clone(), strategy);
        Self::assemble(client, journal, participant, locks, scratch)
    }

    fn assemble(
        client: SharedClient,
        journal: Arc<Journal>,
        participant: ResourceParticipant,
        locks: Arc<LockManager>,
        scratch: Option<Arc<dyn ScratchRepository>>,
    ) -> Arc<Self> {
        let holder = locks.register_holder();
        debug!("created managed connection {}", holder);
        Arc::new(Self {
            holder,
            client,
            journal,
            locks,
            participant: Arc::new(participant),
            scratch,
            listeners: Mutex::new(Vec::new()),
            handle_valid: Mutex::new(None),
        })
    }

    pub fn id(&self) -> HolderId {
        self.holder
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// The two-phase-commit participant of this connection's branch.
    pub fn xa_resource(&self) -> Arc<ResourceParticipant> {
        self.participant.clone()
    }

    /// Returns the connection handle, creating it on first call or after a
    /// cleanup.
    pub fn get_connection(self: &Arc<Self>) -> ConnectionHandle {
        let mut handle = self.handle_valid.lock();
        let valid = match handle.as_ref() {
            Some(valid) if valid.load(Ordering::SeqCst) => valid.clone(),
            _ => {
                debug!("handing out a new connection handle of {}", self.holder);
                let valid = Arc::new(AtomicBool::new(true));
                *handle = Some(valid.clone());
                valid
            }
        };
        ConnectionHandle::new(self.clone(), valid)
    }

    pub fn add_connection_event_listener(&self, listener: Arc<dyn ConnectionEventListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn remove_connection_event_listener(&self, listener: &Arc<dyn ConnectionEventListener>) {
        self.listeners.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn add_rdf_data(&self, url: &str, base_uri: &str, context: &str) -> Result<()> {
        self.write(
            Operation::AddRdfData {
                url: url.to_string(),
                base_uri: base_uri.to_string(),
                context: context.to_string(),
            },
            |client| client.add_rdf_data(url, base_uri, context),
        )
    }

    pub fn add_rdf_triple(&self, triple: &RdfTriple, context: &str) -> Result<()> {
        self.write(
            Operation::AddTriple {
                triple: triple.clone(),
                context: context.to_string(),
            },
            |client| client.add_rdf_triple(triple, context),
        )
    }

    pub fn remove_rdf_triple(&self, triple: &RdfTriple, context: &str) -> Result<()> {
        self.write(
            Operation::RemoveTriple {
                triple: triple.clone(),
                context: context.to_string(),
            },
            |client| client.remove_rdf_triple(triple, context),
        )
    }

    pub fn clear_context(&self, context: &str) -> Result<()> {
        self.write(
            Operation::ClearContext {
                context: context.to_string(),
            },
            |client| client.clear_context(context),
        )
    }

    /// Runs a SELECT query under the read lock.
    pub fn execute_sparql_select_query(&self, query: &str) -> Result<Vec<SparqlSelectTuple>> {
        let _read = self.locks.read(self.holder)?;
        self.client.lock().execute_sparql_select_query(query)
    }

    fn write<F>(&self, operation: Operation, apply: F) -> Result<()>
    where
        F: FnOnce(&mut dyn TripleStoreClient) -> Result<()>,
    {
        self.locks.lock_to_write(self.holder)?;
        apply(&mut **self.client.lock())?;
        info!(target: AUDIT_TARGET, "operation added: {}", operation);
        self.journal.append(operation);
        Ok(())
    }

    /// Releases the connection after its handle was closed.
    ///
    /// Runs the materializer if the journal records exactly one service
    /// registration, then notifies the listeners. A failed materialization is
    /// returned, but the listeners are notified in any case.
    pub fn release(&self) -> Result<Option<MaterializationReport>> {
        debug!("releasing {}", self.holder);
        let outcome = self.materialize();
        if let Err(e) = &outcome {
            error!("cannot derive transformations on release of {}: {}", self.holder, e);
        }
        self.send_event(ConnectionEventKind::Closed, None);
        outcome
    }

    /// Releases the connection because of `error`.
    pub fn release_with_error(&self, error: &RdfXaError) {
        debug!("releasing {} with error: {}", self.holder, error);
        self.send_event(ConnectionEventKind::ErrorOccurred, Some(error.to_string()));
    }

    fn materialize(&self) -> Result<Option<MaterializationReport>> {
        let Some(context) = self.journal.single_service_context() else {
            return Ok(None);
        };
        let Some(scratch) = &self.scratch else {
            return Ok(None);
        };
        self.locks.lock_to_write(self.holder)?;
        let operations = self.journal.snapshot();
        let mut client = self.client.lock();
        Materializer::new(scratch.as_ref())
            .run(&mut **client, &context, &operations)
            .map(Some)
    }

    fn send_event(&self, kind: ConnectionEventKind, error: Option<String>) {
        let event = ConnectionEvent {
            kind,
            connection_id: self.holder,
            error,
        };
        let listeners: Vec<_> = self.listeners.lock().clone();
        for listener in listeners {
            match kind {
                ConnectionEventKind::Closed => listener.connection_closed(&event),
                ConnectionEventKind::ErrorOccurred => listener.connection_error_occurred(&event),
            }
        }
    }

    /// Returns the connection to its pristine state.
    ///
    /// Invalidates the handle, clears the journal, forgets the branch and
    /// releases every lock of this connection, also when invalidating the
    /// client fails.
    pub fn cleanup(&self) -> Result<()> {
        debug!("cleaning {}", self.holder);
        if let Some(valid) = self.handle_valid.lock().take() {
            valid.store(false, Ordering::SeqCst);
        }
        self.journal.clear();
        self.participant.reset();
        let invalidated = self.client.lock().invalidate();
        self.locks.unlock_all(self.holder);
        if let Err(e) = &invalidated {
            warn!("cannot invalidate the client of {}: {}", self.holder, e);
        }
        invalidated
    }

    /// Closes the physical connection for good.
    pub fn destroy(&self) -> Result<()> {
        debug!("destroying {}", self.holder);
        self.client.lock().disconnect()
    }
}
