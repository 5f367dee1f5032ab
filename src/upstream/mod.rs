//! Upstream access subsystem.
//!
//! # Data Flow
//! ```text
//! Operation
//!     → request.rs (UpstreamRequest: method, url, query, body)
//!     → client.rs (cache lookup by request signature)
//!         hit  → cached JSON
//!         miss → reqwest call → status check → JSON parse → cache.rs store
//! ```
//!
//! # Design Decisions
//! - The cache is an explicit object owned by the client, not global state
//! - Time comes from an injected `Clock` so expiry is deterministic in tests
//! - No per-key locking; concurrent misses may both hit the upstream

pub mod cache;
pub mod client;
pub mod request;

pub use cache::{Clock, ManualClock, ResponseCache, SystemClock};
pub use client::UpstreamClient;
pub use request::UpstreamRequest;
