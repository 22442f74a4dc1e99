//! Observability for the schema registry
//!
//! Structured JSON logging of build-phase lifecycle events. Authorization
//! checks never log; they stay pure reads.
//!
//! ```ignore
//! use storefront_schema::observability::Logger;
//!
//! Logger::info("SCHEMA_FINALIZED", &[("entities", "3")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};
