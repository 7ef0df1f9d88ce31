use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::Result;
use crate::model::{RdfTriple, SparqlSelectTuple};

/// How a backend makes committed data survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityPolicy {
    /// Data is durable as soon as `commit` returns.
    OnCommit,
    /// Committed data only reaches disk when the store is shut down and
    /// initialized again; `flush` has to run after every commit that wrote.
    ShutdownReinitialize,
}

/// Primitive operations against one physical triple-store connection.
///
/// This is the narrow surface the connector needs from a semantic
/// repository. Implementations own every backend quirk: how URIs are
/// validated, how RDF documents are fetched and parsed, and what it takes to
/// make a commit durable (see [`TripleStoreClient::durability_policy`]).
///
/// Writes are not visible to other clients until `commit`; `rollback`
/// discards them. Implementations must be `Send` so that a connection can be
/// driven by the coordinator's threads.
pub trait TripleStoreClient: Send {
    /// Opens the backend connection.
    fn connect(&mut self) -> Result<()>;

    /// Closes the backend connection. Pending writes are discarded.
    fn disconnect(&mut self) -> Result<()>;

    /// Makes the pending writes visible.
    ///
    /// # Errors
    ///
    /// Returns `RdfXaError::Commit` if the backend rejects the commit.
    fn commit(&mut self) -> Result<()>;

    /// Discards the pending writes.
    fn rollback(&mut self) -> Result<()>;

    /// Declares what [`TripleStoreClient::flush`] is needed for.
    fn durability_policy(&self) -> DurabilityPolicy {
        DurabilityPolicy::OnCommit
    }

    /// Forces committed data to disk.
    ///
    /// For `ShutdownReinitialize` backends this shuts the store down and
    /// initializes it again.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Downloads the RDF document at `url` and loads it into `context`,
    /// resolving relative IRIs against `base_uri`.
    fn add_rdf_data(&mut self, url: &str, base_uri: &str, context: &str) -> Result<()>;

    fn add_rdf_triple(&mut self, triple: &RdfTriple, context: &str) -> Result<()>;

    fn remove_rdf_triple(&mut self, triple: &RdfTriple, context: &str) -> Result<()>;

    /// Removes every triple of `context`.
    fn clear_context(&mut self, context: &str) -> Result<()>;

    /// Evaluates a SPARQL SELECT query over the committed data.
    fn execute_sparql_select_query(&mut self, query: &str) -> Result<Vec<SparqlSelectTuple>>;

    /// Evaluates a SPARQL ASK query over the committed data.
    fn execute_sparql_ask_query(&mut self, query: &str) -> Result<bool>;

    /// Executes a SPARQL update request.
    fn execute_sparql_update_data(&mut self, update: &str) -> Result<()>;

    /// Drops the connection after its managed connection was cleaned up.
    fn invalidate(&mut self) -> Result<()> {
        self.disconnect()
    }
}

/// A client shared between a managed connection and its resource participant.
pub type SharedClient = Arc<Mutex<Box<dyn TripleStoreClient>>>;

/// Wraps a client so that it can be shared.
pub fn shared(client: Box<dyn TripleStoreClient>) -> SharedClient {
    Arc::new(Mutex::new(client))
}

/// Creates connected clients to the main repository.
pub trait ClientFactory: Send + Sync {
    fn create_client(&self) -> Result<Box<dyn TripleStoreClient>>;
}

impl<F> ClientFactory for F
where
    F: Fn() -> Result<Box<dyn TripleStoreClient>> + Send + Sync,
{
    fn create_client(&self) -> Result<Box<dyn TripleStoreClient>> {
        self()
    }
}

/// The isolated working repository the materializer replays into.
///
/// It never contends with the main repository's lock manager.
pub trait ScratchRepository: Send + Sync {
    /// Opens the repository and returns a connected client to it.
    fn open(&self) -> Result<Box<dyn TripleStoreClient>>;

    /// Shuts the repository down.
    fn shut_down(&self) -> Result<()>;
}
