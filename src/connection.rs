use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{RdfXaError, Result};
use crate::managed_connection::ManagedConnection;
use crate::model::{RdfTriple, SparqlSelectTuple};

/// The operations business code performs on the semantic repository.
///
/// Writes become part of the transaction branch the connection is enlisted
/// in; they are made permanent by the coordinator through the connection's
/// resource participant, never by the connection itself.
pub trait RepositoryConnection {
    /// Downloads the RDF document at `url` and adds it to `context`.
    ///
    /// # Errors
    ///
    /// `ContextNameSyntax` for a malformed context, `RdfDownload` or
    /// `RdfParse` when the document cannot be fetched or read.
    fn add_rdf_data(&self, url: &str, base_uri: &str, context: &str) -> Result<()>;

    fn add_rdf_triple(&self, triple: &RdfTriple, context: &str) -> Result<()>;

    fn remove_rdf_triple(&self, triple: &RdfTriple, context: &str) -> Result<()>;

    /// Removes every triple of `context`.
    fn clear_context(&self, context: &str) -> Result<()>;

    /// Evaluates a SELECT query; one tuple per solution, in backend order.
    fn execute_sparql_select_query(&self, query: &str) -> Result<Vec<SparqlSelectTuple>>;

    /// Hands the connection back to its owner.
    fn close(&self) -> Result<()>;
}

/// Handle through which callers use a [`ManagedConnection`].
///
/// Clones share validity: once the managed connection is cleaned up, or the
/// handle is closed, every clone fails with `ConnectionInvalidated`.
#[derive(Clone)]
pub struct ConnectionHandle {
    managed: Arc<ManagedConnection>,
    valid: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub(crate) fn new(managed: Arc<ManagedConnection>, valid: Arc<AtomicBool>) -> Self {
        Self { managed, valid }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    /// Detaches the handle from its managed connection.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    fn managed(&self) -> Result<&ManagedConnection> {
        if self.is_valid() {
            Ok(&self.managed)
        } else {
            Err(RdfXaError::ConnectionInvalidated)
        }
    }

    /// Forwards a failure the caller could not handle to the owner of the
    /// managed connection.
    pub fn report_error(&self, error: &RdfXaError) {
        self.managed.release_with_error(error);
    }
}

impl RepositoryConnection for ConnectionHandle {
    fn add_rdf_data(&self, url: &str, base_uri: &str, context: &str) -> Result<()> {
        self.managed()?.add_rdf_data(url, base_uri, context)
    }

    fn add_rdf_triple(&self, triple: &RdfTriple, context: &str) -> Result<()> {
        self.managed()?.add_rdf_triple(triple, context)
    }

    fn remove_rdf_triple(&self, triple: &RdfTriple, context: &str) -> Result<()> {
        self.managed()?.remove_rdf_triple(triple, context)
    }

    fn clear_context(&self, context: &str) -> Result<()> {
        self.managed()?.clear_context(context)
    }

    fn execute_sparql_select_query(&self, query: &str) -> Result<Vec<SparqlSelectTuple>> {
        self.managed()?.execute_sparql_select_query(query)
    }

    fn close(&self) -> Result<()> {
        if !self.valid.swap(false, Ordering::SeqCst) {
            return Err(RdfXaError::ConnectionInvalidated);
        }
        self.managed.release().map(|_| ())
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("connection", &self.managed.id())
            .field("valid", &self.is_valid())
            .finish()
    }
}
