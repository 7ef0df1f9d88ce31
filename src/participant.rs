use std::sync::Arc;

use log::{debug, error, log_enabled, warn, Level};
use parking_lot::Mutex;

use crate::client::SharedClient;
use crate::commit_strategy::{strategy_for, CommitStrategy};
use crate::connector::AUDIT_TARGET;
use crate::data_store::journal::Journal;
use crate::materializer::queries;
use crate::twopc::{TwoPhaseCommitParticipant, Vote, XaError, XaFlags, Xid};

/// Where a branch is in the two-phase-commit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    Idle,
    Active,
    Suspended,
    Ended,
    Prepared,
    Committed,
    RolledBack,
}

#[derive(Debug)]
struct Branch {
    xid: Option<Xid>,
    success: bool,
    state: BranchState,
}

impl Branch {
    fn idle() -> Self {
        Branch {
            xid: None,
            success: false,
            state: BranchState::Idle,
        }
    }

    fn check(&self, xid: &Xid) -> Result<(), XaError> {
        match &self.xid {
            Some(current) if current == xid => Ok(()),
            current => Err(XaError::Protocol {
                managed: current.as_ref().map(ToString::to_string),
                requested: xid.to_string(),
            }),
        }
    }
}

/// Two-phase-commit participant for the one branch of a managed connection.
///
/// Votes from the connection's journal and completes the branch through the
/// shared client. The backend-specific part of committing, e.g. a durability
/// flush, is delegated to a [`CommitStrategy`].
pub struct ResourceParticipant {
    client: SharedClient,
    journal: Arc<Journal>,
    strategy: Box<dyn CommitStrategy>,
    branch: Mutex<Branch>,
}

impl ResourceParticipant {
    pub fn new(client: SharedClient, journal: Arc<Journal>, strategy: Box<dyn CommitStrategy>) -> Self {
        Self {
            client,
            journal,
            strategy,
            branch: Mutex::new(Branch::idle()),
        }
    }

    /// Creates a participant whose commit strategy follows the client's
    /// durability policy.
    pub fn for_client(client: SharedClient, journal: Arc<Journal>) -> Self {
        let policy = client.lock().durability_policy();
        Self::new(client, journal, strategy_for(policy))
    }

    pub fn state(&self) -> BranchState {
        self.branch.lock().state
    }

    /// The adopted branch, if any.
    pub fn xid(&self) -> Option<Xid> {
        self.branch.lock().xid.clone()
    }

    /// Whether the branch was ended with `SUCCESS`.
    pub fn is_marked_for_commit(&self) -> bool {
        self.branch.lock().success
    }

    /// Forgets the adopted branch. Called when the owning connection is
    /// cleaned up.
    pub fn reset(&self) {
        *self.branch.lock() = Branch::idle();
    }

    fn audit_not_committed(&self, xid: &Xid) {
        error!(
            target: AUDIT_TARGET,
            "TRANSACTION {} HAS NOT BEEN COMMITTED! THE FOLLOWING OPERATIONS MUST BE ROLLED BACK: {}",
            xid,
            self.journal.render()
        );
    }

    fn dump_transformations(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        match self
            .client
            .lock()
            .execute_sparql_select_query(&queries::all_transformations())
        {
            Ok(rows) => {
                debug!("repository holds {} transformations", rows.len());
                for row in rows {
                    debug!("  {}", row);
                }
            }
            Err(e) => warn!("cannot list transformations after commit: {}", e),
        }
    }
}

impl TwoPhaseCommitParticipant for ResourceParticipant {
    fn start(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError> {
        debug!("start transaction xid {} with flag {}", xid, flags);
        let mut branch = self.branch.lock();
        match flags {
            XaFlags::NOFLAGS => {
                // the journal and write lock of a finished branch live until cleanup
                if branch.state != BranchState::Idle {
                    return Err(XaError::Protocol {
                        managed: branch.xid.as_ref().map(ToString::to_string),
                        requested: xid.to_string(),
                    });
                }
                branch.xid = Some(xid.clone());
                branch.success = false;
                branch.state = BranchState::Active;
                Ok(())
            }
            XaFlags::RESUME | XaFlags::JOIN => {
                branch.check(xid)?;
                branch.state = BranchState::Active;
                Ok(())
            }
            other => Err(XaError::UnsupportedFlag(other)),
        }
    }

    fn end(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError> {
        debug!("end transaction xid {} with flag {}", xid, flags);
        let mut branch = self.branch.lock();
        branch.check(xid)?;
        match flags {
            XaFlags::SUCCESS => {
                branch.success = true;
                branch.state = BranchState::Ended;
            }
            XaFlags::FAIL => {
                branch.success = false;
                branch.state = BranchState::Ended;
            }
            XaFlags::SUSPEND => branch.state = BranchState::Suspended,
            other => return Err(XaError::UnsupportedFlag(other)),
        }
        Ok(())
    }

    fn prepare(&self, xid: &Xid) -> Result<Vote, XaError> {
        debug!("prepare transaction xid {}", xid);
        let mut branch = self.branch.lock();
        branch.check(xid)?;
        if !branch.success {
            return Err(XaError::RollbackOnly(xid.to_string()));
        }
        if self.journal.is_empty() {
            branch.state = BranchState::Committed;
            Ok(Vote::ReadOnly)
        } else {
            branch.state = BranchState::Prepared;
            Ok(Vote::Ok)
        }
    }

    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<(), XaError> {
        debug!("commit transaction xid {} (one phase: {})", xid, one_phase);
        let mut branch = self.branch.lock();
        branch.check(xid)?;
        if !branch.success {
            return Err(XaError::RollbackOnly(xid.to_string()));
        }
        let journal_len = self.journal.len();
        let committed = {
            let mut client = self.client.lock();
            self.strategy.commit(&mut **client, journal_len)
        };
        if let Err(e) = committed {
            self.audit_not_committed(xid);
            return Err(XaError::ResourceManager {
                xid: xid.to_string(),
                source: Box::new(e),
            });
        }
        branch.state = BranchState::Committed;
        drop(branch);
        if journal_len > 0 {
            self.dump_transformations();
        }
        Ok(())
    }

    fn rollback(&self, xid: &Xid) -> Result<(), XaError> {
        debug!("rollback transaction xid {}", xid);
        let mut branch = self.branch.lock();
        branch.check(xid)?;
        if let Err(e) = self.client.lock().rollback() {
            error!(
                target: AUDIT_TARGET,
                "rollback of transaction {} failed, nothing was committed: {}", xid, e
            );
        }
        branch.state = BranchState::RolledBack;
        Ok(())
    }

    fn is_same_rm(&self, _other: &dyn TwoPhaseCommitParticipant) -> bool {
        false
    }
}
