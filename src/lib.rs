// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod api;
pub mod config;
pub mod metrics;
pub mod ratelimit;
pub mod retry;
pub mod scoring;
pub mod sources;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{AggregationManager, ProviderSnapshot};
pub use crate::api::{create_router, AppState};
pub use crate::config::{AggregatorConfig, ProviderConfig, ProviderEntry, RetryPolicy};
pub use crate::ratelimit::RateLimiter;
pub use crate::retry::{FetchError, RetryExecutor};
pub use crate::types::{AggregationResult, CanonicalJob, SearchCriteria};
