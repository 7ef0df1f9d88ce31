use log::debug;

use crate::client::{DurabilityPolicy, TripleStoreClient};
use crate::errors::{RdfXaError, Result};

/// The backend-specific part of the commit phase.
///
/// A [`ResourceParticipant`](crate::participant::ResourceParticipant) runs
/// the protocol checks and the audit trail itself and hands the client over
/// to its strategy for the actual commit.
pub trait CommitStrategy: Send + Sync {
    /// Commits the pending writes of `client`. `journal_len` is the number of
    /// journaled operations of the branch being committed.
    fn commit(&self, client: &mut dyn TripleStoreClient, journal_len: usize) -> Result<()>;
}

/// Commits and relies on the backend for durability.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCommit;

impl CommitStrategy for PlainCommit {
    fn commit(&self, client: &mut dyn TripleStoreClient, _journal_len: usize) -> Result<()> {
        client.commit()
    }
}

/// Commits, then flushes when anything was written.
///
/// A failing flush is reported as `RdfXaError::Flush` even though the
/// commit itself succeeded: the data is visible but not safely on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlushingCommit;

impl CommitStrategy for FlushingCommit {
    fn commit(&self, client: &mut dyn TripleStoreClient, journal_len: usize) -> Result<()> {
        client.commit()?;
        if journal_len > 0 {
            debug!("flushing repository after committing {} operations", journal_len);
            client.flush().map_err(|e| match e {
                RdfXaError::Flush(reason) => RdfXaError::Flush(reason),
                other => RdfXaError::Flush(other.to_string()),
            })?;
        }
        Ok(())
    }
}

/// Picks the strategy matching a client's durability policy.
pub fn strategy_for(policy: DurabilityPolicy) -> Box<dyn CommitStrategy> {
    match policy {
        DurabilityPolicy::OnCommit => Box::new(PlainCommit),
        DurabilityPolicy::ShutdownReinitialize => Box::new(FlushingCommit),
    }
}
