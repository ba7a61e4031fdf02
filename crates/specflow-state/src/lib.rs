//! Coordination state for independent pipeline workers.
//!
//! Workers coordinate solely through small status records in a shared state
//! directory: one `<subject>.status` JSON file per named unit of work. There
//! is no central scheduler and no cross-process lock; every mutation goes
//! through atomic temp-then-rename, trading strict linearizability for
//! lock-freedom. Each subject has exactly one producing worker (a documented
//! caller contract, not enforced by locking).

pub mod manager;
pub mod record;
pub mod recovery;
pub mod resolver;
pub mod watcher;

pub use manager::{StateManager, WorkflowSnapshot};
pub use record::StatusRecord;
pub use recovery::{Anomaly, AnomalyKind, RecoveryManager, RepairOutcome};
pub use resolver::ReadinessPlan;
pub use watcher::{ChangeEvent, ChangeKind, ChangeWatcher};
