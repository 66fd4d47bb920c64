//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/squash.rs (pause request while a debugger attaches)
//!     → server.rs forward handler (rewrite URI, send to upstream)
//!     → response streamed back to client
//! ```

pub mod middleware;
pub mod server;

pub use server::HttpServer;
