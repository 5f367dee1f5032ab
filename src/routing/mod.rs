//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (exact lookup under the base path)
//!     → Return: matched Endpoint or NoMatch
//!
//! Route Compilation (at startup):
//!     base_path + Endpoint::ALL
//!     → HashMap<path, Endpoint>
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact path match only; a trailing slash is ignored
//! - Explicit NoMatch rather than silent default

pub mod router;

pub use router::{Endpoint, RouteTable};
