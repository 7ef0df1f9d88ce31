use std::fmt;

use crate::errors::{ErrorCategory, RdfXaError};

/// Identifier of one transaction branch.
///
/// An `Xid` is the pair of the global transaction id assigned by the
/// coordinator and the branch qualifier that distinguishes this participant's
/// slice of the global transaction. Two `Xid`s are the same branch iff all
/// three parts compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Creates a new branch identifier.
    ///
    /// # Arguments
    ///
    /// * `format_id` - Format identifier chosen by the coordinator.
    /// * `global_transaction_id` - Bytes of the global transaction id.
    /// * `branch_qualifier` - Bytes of the branch qualifier.
    pub fn new(
        format_id: i32,
        global_transaction_id: impl Into<Vec<u8>>,
        branch_qualifier: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            format_id,
            global_transaction_id: global_transaction_id.into(),
            branch_qualifier: branch_qualifier.into(),
        }
    }

    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

impl fmt::Display for Xid {
    /// Renders the branch as `GTID_BQUAL`, both parts in upper-case hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            hex::encode_upper(&self.global_transaction_id),
            hex::encode_upper(&self.branch_qualifier)
        )
    }
}

/// Flags passed by the coordinator to `start`, `end` and `recover`.
///
/// Values match the X/Open XA standard so that flags coming from a foreign
/// coordinator can be passed through unchanged. Unknown values are kept as
/// they are and rejected by the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XaFlags(u32);

impl XaFlags {
    pub const NOFLAGS: XaFlags = XaFlags(0);
    pub const JOIN: XaFlags = XaFlags(0x0020_0000);
    pub const ENDRSCAN: XaFlags = XaFlags(0x0080_0000);
    pub const STARTRSCAN: XaFlags = XaFlags(0x0100_0000);
    pub const SUSPEND: XaFlags = XaFlags(0x0200_0000);
    pub const SUCCESS: XaFlags = XaFlags(0x0400_0000);
    pub const RESUME: XaFlags = XaFlags(0x0800_0000);
    pub const FAIL: XaFlags = XaFlags(0x2000_0000);
    pub const ONEPHASE: XaFlags = XaFlags(0x4000_0000);

    pub const fn from_bits(bits: u32) -> Self {
        XaFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for XaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            XaFlags::NOFLAGS => f.write_str("TMNOFLAGS"),
            XaFlags::JOIN => f.write_str("TMJOIN"),
            XaFlags::ENDRSCAN => f.write_str("TMENDRSCAN"),
            XaFlags::STARTRSCAN => f.write_str("TMSTARTRSCAN"),
            XaFlags::SUSPEND => f.write_str("TMSUSPEND"),
            XaFlags::SUCCESS => f.write_str("TMSUCCESS"),
            XaFlags::RESUME => f.write_str("TMRESUME"),
            XaFlags::FAIL => f.write_str("TMFAIL"),
            XaFlags::ONEPHASE => f.write_str("TMONEPHASE"),
            XaFlags(other) => write!(f, "{}", other),
        }
    }
}

/// The participant's answer to `prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    /// Writes were performed; the coordinator must call `commit`.
    Ok,
    /// Nothing was written; no `commit` call is needed.
    ReadOnly,
}

impl Vote {
    /// The XA return code for this vote (`XA_OK` or `XA_RDONLY`).
    pub fn xa_code(self) -> i32 {
        match self {
            Vote::Ok => 0,
            Vote::ReadOnly => 3,
        }
    }
}

/// Error type for two-phase-commit participant operations.
///
/// Each variant maps onto one XA error code, see [`XaError::error_code`].
#[derive(Debug, thiserror::Error)]
pub enum XaError {
    /// The request names a branch other than the one this participant manages.
    #[error("Resource manager manages branch {}, request was for {requested}", managed.as_deref().unwrap_or("<none>"))]
    Protocol {
        managed: Option<String>,
        requested: String,
    },
    /// The flag is not valid for the called operation.
    #[error("Unsupported transaction flag: {0}")]
    UnsupportedFlag(XaFlags),
    /// The branch was not marked successful and must be rolled back.
    #[error("Transaction branch {0} is marked rollback-only")]
    RollbackOnly(String),
    /// The backend failed while completing the branch.
    #[error("Resource manager error in branch {xid}: {source}")]
    ResourceManager {
        xid: String,
        #[source]
        source: Box<RdfXaError>,
    },
}

impl XaError {
    pub const XA_RBROLLBACK: i32 = 100;
    pub const XAER_RMERR: i32 = -3;
    pub const XAER_INVAL: i32 = -5;
    pub const XAER_PROTO: i32 = -6;

    /// The XA error code a Java-style coordinator would expect.
    pub fn error_code(&self) -> i32 {
        match self {
            XaError::Protocol { .. } => Self::XAER_PROTO,
            XaError::UnsupportedFlag(_) => Self::XAER_INVAL,
            XaError::RollbackOnly(_) => Self::XA_RBROLLBACK,
            XaError::ResourceManager { .. } => Self::XAER_RMERR,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            XaError::Protocol { .. } | XaError::UnsupportedFlag(_) => ErrorCategory::Protocol,
            XaError::RollbackOnly(_) => ErrorCategory::RollbackOnly,
            XaError::ResourceManager { source, .. } => source.category(),
        }
    }
}

/// Trait for a participant in a two-phase commit protocol.
///
/// The coordinator associates a participant with one branch through `start`,
/// dissociates it with `end`, then drives `prepare` and `commit` or
/// `rollback`. Implementations manage exactly one branch at a time.
///
/// Implementations must be `Send` and `Sync`: the coordinator may call the
/// protocol methods from a different thread than the one issuing reads and
/// writes on the connection.
pub trait TwoPhaseCommitParticipant: Send + Sync {
    /// Starts, joins or resumes work on the branch `xid`.
    ///
    /// `flags` is one of `NOFLAGS`, `JOIN` or `RESUME`.
    fn start(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError>;

    /// Ends or suspends work on the branch `xid`.
    ///
    /// `flags` is one of `SUCCESS`, `FAIL` or `SUSPEND`.
    fn end(&self, xid: &Xid, flags: XaFlags) -> Result<(), XaError>;

    /// Phase 1: vote on the outcome of the branch.
    ///
    /// Returns `Ok(Vote::Ok)` when a commit call is required,
    /// `Ok(Vote::ReadOnly)` when there is nothing to commit, and
    /// `Err(XaError::RollbackOnly)` when the participant votes to roll back.
    fn prepare(&self, xid: &Xid) -> Result<Vote, XaError>;

    /// Phase 2: make the branch's work permanent.
    fn commit(&self, xid: &Xid, one_phase: bool) -> Result<(), XaError>;

    /// Phase 2: discard the branch's work.
    fn rollback(&self, xid: &Xid) -> Result<(), XaError>;

    /// Whether `other` is served by the same resource manager.
    fn is_same_rm(&self, other: &dyn TwoPhaseCommitParticipant) -> bool;

    /// Forgets a heuristically completed branch.
    fn forget(&self, xid: &Xid) -> Result<(), XaError> {
        log::debug!("forgetting transaction xid {}", xid);
        Ok(())
    }

    /// Lists branches that are prepared but not yet completed.
    fn recover(&self, flags: XaFlags) -> Result<Vec<Xid>, XaError> {
        log::debug!("recovering flag {}", flags);
        Ok(Vec::new())
    }

    /// Current transaction timeout in seconds, 0 meaning none.
    fn transaction_timeout(&self) -> u32 {
        0
    }

    /// Sets the transaction timeout. Returns `false` when unsupported.
    fn set_transaction_timeout(&self, seconds: u32) -> bool {
        log::debug!("setting timeout seconds {}", seconds);
        false
    }
}
