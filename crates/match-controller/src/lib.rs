//! Matchmaking core for anonymous real-time video chat.
//!
//! Pairs waiting users under soft constraints on region, language, and
//! gender, bounding wait time while supporting thousands of concurrent
//! waiters. The core is:
//!
//! - A partitioned waiting-queue store (buckets keyed
//!   `gender:language:region`, time-ordered, with proportional extraction
//!   and staleness eviction)
//! - A periodic multi-round pairing scheduler (exact-key round, then
//!   progressively coarser regrouping rounds)
//! - An ephemeral session registry that survives the match
//! - A point-to-point relay delivering match results and WebRTC signaling
//!   to the correct peer, with strict partner validation
//!
//! # Concurrency Model
//!
//! Many concurrent request handlers perform enqueue/dequeue/relay
//! operations against the shared store at any time; exactly one scheduler
//! task executes a matching cycle at a time. Multi-key writes within one
//! logical operation are issued as a single pipelined batch, but the store
//! provides no cross-key transactions - readers defend against the
//! resulting partial states, and TTLs reclaim anything explicit cleanup
//! misses.
//!
//! # Collaborators
//!
//! Identity, geolocation, durable audit storage, and the real-time push
//! gateway are external. The core reaches them only through the
//! [`transport::PushTransport`] and [`audit::AuditSink`] contracts plus
//! plain parameters (`external_id`, detected region).
//!
//! # Modules
//!
//! - [`config`] - service configuration from environment
//! - [`models`] - shared value types and attribute resolution
//! - [`keys`] - queue-key and store-key naming
//! - [`store`] - narrow ephemeral-store interface + Redis implementation
//! - [`repositories`] - Queue Store and Session Registry
//! - [`services`] - pairing rounds, signaling relay, the composed core
//! - [`tasks`] - the interval-driven scheduler task
//! - [`observability`] - Prometheus metrics and health endpoints

pub mod audit;
pub mod config;
pub mod errors;
pub mod keys;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;
pub mod store;
pub mod tasks;
pub mod transport;
