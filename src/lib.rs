pub mod backend;
pub mod client;
pub mod commit_strategy;
pub mod config;
pub mod connection;
pub mod connector;
pub mod data_store;
pub mod errors;
pub mod lock_manager;
pub mod managed_connection;
pub mod materializer;
pub mod model;
pub mod participant;
pub mod twopc;

pub use connector::prelude;

// Re-export key types and structs for easier access
pub use client::{ClientFactory, DurabilityPolicy, ScratchRepository, TripleStoreClient};
pub use commit_strategy::{CommitStrategy, FlushingCommit, PlainCommit};
pub use config::ConnectorConfig;
pub use connection::{ConnectionHandle, RepositoryConnection};
pub use connector::{Connector, AUDIT_TARGET};
pub use data_store::journal::Journal;
pub use data_store::operation::Operation;
pub use errors::{ErrorCategory, RdfXaError, Result};
pub use lock_manager::{HolderId, LockManager};
pub use managed_connection::{
    ConnectionEvent, ConnectionEventKind, ConnectionEventListener, ManagedConnection,
};
pub use materializer::{MaterializationReport, Materializer};
pub use model::{RdfTriple, SparqlSelectTuple};
pub use participant::{BranchState, ResourceParticipant};
pub use twopc::{TwoPhaseCommitParticipant, Vote, XaError, XaFlags, Xid};

#[cfg(feature = "oxigraph")]
pub use backend::{OxigraphClient, OxigraphRepository};
