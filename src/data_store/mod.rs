/// The operation journal of one transaction branch.
pub mod journal;
/// Write operations recorded in the journal.
pub mod operation;
