//! The reconciliation engine: diff two snapshots and apply the result.

mod action_set;
mod cycle;
mod reconciler;

pub use action_set::{ActionSet, UpdateAction};
pub use cycle::{SyncError, sync_dirs};
pub use reconciler::{ReconcileError, ReconcileReport, Reconciler};
