//! Redis-backed distributed leader election.
//!
//! [`LeaseStore`] abstracts the atomic primitives (conditional set,
//! fencing-by-participant renewal, fencing-by-participant release) a backing
//! store must provide; [`RedisLeaseStore`] implements it over `redis`,
//! [`InMemoryLeaseStore`] implements it in-process for tests.
//! [`LeaderElectionService`], built through [`ElectionProvider`], drives
//! acquisition and renewal — either explicitly or via a background loop —
//! and reports status changes through [`LeadershipChanged`] events.

#![forbid(unsafe_code)]

mod error;
mod lease;
mod options;
mod provider;
mod redis_store;
mod service;
mod store;

pub use error::{Error, Result};
pub use lease::LeaderInfo;
pub use options::RedisLeaderElectionOptions;
pub use provider::ElectionProvider;
pub use redis_store::RedisLeaseStore;
pub use service::{LeaderElectionService, LeadershipChanged, ServiceStatus};
pub use store::{InMemoryLeaseStore, LeaseStore};
