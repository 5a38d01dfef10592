//! Repositories over the shared ephemeral store.
//!
//! - [`waiting_queue`] - partitioned waiting pool with proportional polling
//! - [`sessions`] - ephemeral session registry with audit forwarding

pub mod sessions;
pub mod waiting_queue;

pub use sessions::SessionRepository;
pub use waiting_queue::WaitingQueueRepository;
