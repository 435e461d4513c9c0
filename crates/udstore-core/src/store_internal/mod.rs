//! Implementation boundary for `store::MembershipStore`.
//!
//! `src/store.rs` is the facade; connection setup, batch execution, reads
//! and the transaction wrapper live here.

pub(crate) mod batch;
pub(crate) mod bootstrap;
pub(crate) mod read;
pub(crate) mod txn;
