use std::time::Duration;

use thiserror::Error;

use crate::twopc::XaError;

/// Coarse classification of an [`RdfXaError`].
///
/// Callers use it to tell apart "retry with different input", "abort the
/// branch" and "an operator has to reconcile the repository by hand". Nothing
/// in this crate retries on its own; the decision always belongs to the
/// coordinator or the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed context, triple component or query. Retry with different input.
    InvalidInput,
    /// Download, parse or connectivity failure. The branch stays active but
    /// unsuccessful, so the default rollback path applies.
    Backend,
    /// Coordinator/participant desynchronization. Fatal to the branch.
    Protocol,
    /// The branch was marked to roll back earlier.
    RollbackOnly,
    /// Commit or durability flush failed after writes reached the backend.
    OperatorIntervention,
    /// The connector was configured incorrectly.
    Configuration,
}

#[derive(Error, Debug)]
pub enum RdfXaError {
    #[error("Context `{0}` is not a valid URI")]
    ContextNameSyntax(String),

    #[error("RDF triple component `{0}` is not a valid URI")]
    RdfTripleSyntax(String),

    #[error("Malformed SPARQL query: {0}")]
    MalformedQuery(String),

    #[error("RDF data cannot be downloaded from {url}: {reason}")]
    RdfDownload { url: String, reason: String },

    #[error("RDF data from {url} cannot be parsed: {reason}")]
    RdfParse { url: String, reason: String },

    #[error("Semantic repository connection error: {0}")]
    Connection(String),

    #[error("Commit error: {0}")]
    Commit(String),

    #[error("Rollback error: {0}")]
    Rollback(String),

    #[error("Flush error: {0}")]
    Flush(String),

    #[error("Connection handle has been invalidated")]
    ConnectionInvalidated,

    #[error("Attempt to lock to write while holding the read lock")]
    LockUpgrade,

    #[error("Timed out after {0:?} waiting for the repository lock")]
    LockTimeout(Duration),

    #[error("Materialization error: {0}")]
    Materialization(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Xa(#[from] XaError),
}

impl RdfXaError {
    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RdfXaError::ContextNameSyntax(_)
            | RdfXaError::RdfTripleSyntax(_)
            | RdfXaError::MalformedQuery(_) => ErrorCategory::InvalidInput,
            RdfXaError::RdfDownload { .. }
            | RdfXaError::RdfParse { .. }
            | RdfXaError::Connection(_)
            | RdfXaError::Rollback(_)
            | RdfXaError::LockTimeout(_)
            | RdfXaError::Materialization(_) => ErrorCategory::Backend,
            RdfXaError::Commit(_) | RdfXaError::Flush(_) => ErrorCategory::OperatorIntervention,
            RdfXaError::ConnectionInvalidated | RdfXaError::LockUpgrade => ErrorCategory::Protocol,
            RdfXaError::Config(_) => ErrorCategory::Configuration,
            RdfXaError::Xa(xa) => xa.category(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RdfXaError>;
