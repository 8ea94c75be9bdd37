//! Background sync: coordinator (single active task, observer fan-out) and worker

pub mod coordinator;
pub mod worker;

pub use coordinator::{Subscription, SyncCoordinator};
pub use worker::{SyncOutcome, SyncWorker};
