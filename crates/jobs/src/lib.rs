//! Background job scheduling: one ticker per `(target, type)` key, bounded
//! by `MAX_ACTIVE_JOBS` with FIFO overflow queueing, resumable at boot.
pub mod scheduler;

pub use scheduler::Scheduler;
