//! Talking to the running cluster over its REST API.

pub mod health;

pub use health::{ClusterHealth, HealthOutcome, HealthPolling, fetch_health, wait_for_status};
