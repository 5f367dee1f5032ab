//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → response.rs (CORS preflight short-circuit)
//!     → request.rs (request ID, decode ProxyRequest)
//!     → routing (path → Endpoint)
//!     → resources (Operation → upstream → normalized JSON)
//!     → response.rs (success body or error envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, ProxyRequest, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
