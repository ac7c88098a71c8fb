//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → routes compiled once into the RouteTable
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routes load once at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod route;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use route::{
    ApiKeyPolicy, AuthPolicy, BasicPolicy, BasicUser, CachePolicy, JwtPolicy, LoggingPolicy,
    RateLimitPolicy, ResponseFilterPolicy, RouteDefinition, Target, TimeoutPolicy,
};
pub use schema::{GatewayConfig, ObservabilityConfig, ServerConfig, StoreConfig};
