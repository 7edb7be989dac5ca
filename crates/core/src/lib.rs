//! Domain layer for the email memory service.
//!
//! Hosts the heuristic email advisor, its debounced wrapper, and the record
//! types shared by the storage crate and the HTTP application.
pub mod advisor;
pub mod debounce;
pub mod preference;
pub mod tables;
pub mod types;

pub use advisor::{summarize, EmailAdvisor, ValidationResult};
pub use debounce::DebouncedValidator;
pub use tables::ReferenceTables;
