//! Event deduplication and state reconciliation.
//!
//! The backend may deliver events out of order, more than once, or late.
//! A [`Reconciler`] folds them into one [`ReconciledState`] per scope where
//! the event with the greatest timestamp wins, not the last one to arrive:
//!
//! - snapshots replace the state and drop buffered incremental records
//! - heartbeats merge the fields they carry
//! - incremental updates are kept per logical key, newest timestamp only
//! - anything older than the last snapshot is discarded

mod update_log;
mod reconciler;
mod state;

pub use update_log::{IncrementalUpdate, UpdateKey, UpdateLog, Upsert};
pub use reconciler::{ApplyOutcome, DiscardReason, Reconciler};
pub use state::{BaseUnit, ReconciledState};
