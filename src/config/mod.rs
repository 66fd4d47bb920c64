//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → runtime snapshot built once per accepted config
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the active runtime snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults so a minimal config works
//! - The attachment descriptor is rendered when the config is accepted,
//!   never on the request path

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ForwardConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, SquashConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
