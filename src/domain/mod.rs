//! Domain models and types for Caravel.
//!
//! This module contains the core domain models, types, and business rules for
//! the migration workflow.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Time windows** ([`TimeWindow`]), the half-open batch unit of work
//! - **Transfer models** ([`TransferJob`], [`BatchResult`])
//! - **Baseline models** ([`BaselineCandidate`], [`BaselineSource`])
//! - **Run outcomes** ([`MigrationOutcome`], [`AbortReason`])
//! - **Error types** ([`CaravelError`], [`ClusterError`], [`TransferError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, CaravelError>`]:
//!
//! ```rust
//! use caravel::domain::{CaravelError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = caravel::config::load_config("caravel.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! Expected failure conditions are data, not exceptions: a failed batch is a
//! [`BatchResult`] with a [`FailureKind`], and only the workflow engine turns
//! accumulated failures into an [`AbortReason`].

pub mod baseline;
pub mod batch;
pub mod errors;
pub mod result;
pub mod window;

// Re-export commonly used types for convenience
pub use baseline::{AbortReason, BaselineCandidate, BaselineSource, MigrationOutcome};
pub use batch::{BatchResult, TransferJob};
pub use errors::{CaravelError, ClusterError, FailureKind, TransferError};
pub use result::Result;
pub use window::TimeWindow;
