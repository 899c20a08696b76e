//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server, watcher, signals:
//!     → global subscriber (logging.rs)
//!
//! Rewrite rules:
//!     → injected Dispatch, if any (cloned from the global one by main.rs)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every request span
//! - `RUST_LOG` overrides the configured level

pub mod logging;

pub use logging::{init_logging, LoggingError};
