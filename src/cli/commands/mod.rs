//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod init;
pub mod reset;
pub mod run;
pub mod status;
pub mod validate;
