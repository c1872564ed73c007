//! Batch transfer abstraction
//!
//! This module defines the trait the engine uses to move one window of
//! documents from the source cluster to the target cluster.

use crate::domain::{BatchResult, Result, TransferJob};
use async_trait::async_trait;

/// Executor of one bounded transfer job
///
/// A transfer is synchronous from the engine's point of view: the call
/// returns only once the external tool has finished or failed. `Ok` means
/// the job ran to completion and the result reports what moved; `Err`
/// means the attempt itself broke (process spawn, timeout, rejected
/// setup) and is handed to the retry layer for classification.
#[async_trait]
pub trait TransferDriver: Send + Sync {
    /// Run one window's transfer to completion
    ///
    /// # Errors
    ///
    /// Returns an error when the attempt fails; the caller decides
    /// whether to retry based on the error's failure kind.
    async fn transfer(&self, job: &TransferJob) -> Result<BatchResult>;
}
