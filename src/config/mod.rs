//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RewriteConfig (validated, immutable)
//!     → loader.rs (compile rules into a RuleSet)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and compiles
//!     → atomic swap of the RuleSet behind the rewrite layer
//!     → in-flight requests finish on the old set
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A reload that fails anywhere keeps the current rules

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{build_route_rule, build_rule_set, load_config, parse_config, ConfigError};
pub use schema::{
    ListenerConfig, MatchingConfig, MethodsConfig, ObservabilityConfig, RewriteConfig, RouteConfig,
    RuleConfig, TimeoutConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
