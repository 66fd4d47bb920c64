//! Request-path middleware.

pub mod squash;

pub use squash::squash_middleware;
