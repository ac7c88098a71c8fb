//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (raw path, query ignored)
//!     → router.rs (ordered route scan)
//!     → matcher.rs (anchored pattern match + variable capture)
//!     → Return: RouteMatch { route, variables } or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteDefinition[]
//!     → Compile path patterns into regexes
//!     → Normalize method sets
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)

pub mod matcher;
pub mod router;

pub use matcher::{substitute, PathPattern, PatternError};
pub use router::{CompiledRoute, RouteMatch, RouteTable};
