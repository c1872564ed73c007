// Caravel - Incremental Cluster Migration Tool
// Copyright (c) 2025 Caravel Contributors
// Licensed under the MIT License

//! # Caravel - Incremental Cluster-to-Cluster Migration
//!
//! Caravel moves time-series documents from one search cluster to another in
//! bounded time windows, so large migrations can run for days, survive
//! crashes, and finish with a short, operator-confirmed cutover.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Resolving** a baseline to start from (checkpoint, snapshot catalog,
//!   target data, or source data)
//! - **Sizing** transfer windows adaptively to the observed document density
//! - **Transferring** each window with an external pipeline process
//! - **Checkpointing** progress after every window for crash-safe resume
//!
//! ## Architecture
//!
//! Caravel follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (engine, window sizing, state, retries)
//! - [`adapters`] - External integrations (cluster HTTP API, transfer
//!   process, operator console)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caravel::adapters::cluster::HttpClusterQuery;
//! use caravel::adapters::operator::ConsolePrompt;
//! use caravel::adapters::transfer::LogstashDriver;
//! use caravel::config::load_config;
//! use caravel::core::engine::MigrationEngine;
//! use caravel::core::state::FileCheckpointStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("caravel.toml")?;
//!
//!     let source = Arc::new(HttpClusterQuery::new(
//!         "source",
//!         &config.source,
//!         &config.migration.index_pattern,
//!     )?);
//!     let target = Arc::new(HttpClusterQuery::new(
//!         "target",
//!         &config.target,
//!         &config.migration.index_pattern,
//!     )?);
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let mut engine = MigrationEngine::new(
//!         &config,
//!         source,
//!         target,
//!         Arc::new(LogstashDriver::new(&config)?),
//!         Arc::new(FileCheckpointStore::new(&config.checkpoint.path)),
//!         Arc::new(ConsolePrompt),
//!         shutdown_rx,
//!     );
//!
//!     let summary = engine.run().await?;
//!     println!("Migrated {} rows", summary.rows_this_run);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! ### Checkpoint and Resume
//!
//! Caravel records its resume point after every completed window, so a
//! crashed or stopped run picks up exactly where it left off:
//!
//! ```rust,no_run
//! use caravel::core::state::FileCheckpointStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileCheckpointStore::new("caravel.checkpoint.json");
//! if let Some(record) = store.load_record()? {
//!     println!("next run resumes from {}", record.state.resume_timestamp);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Contiguous Windows
//!
//! Windows are half-open and adjacent, so every document is covered exactly
//! once no matter how the run is sliced:
//!
//! ```rust
//! use caravel::domain::TimeWindow;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
//! let first = TimeWindow::starting_at(start, Duration::minutes(60))?;
//! let second = TimeWindow::starting_at(first.end(), Duration::minutes(60))?;
//! assert!(second.follows(&first));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Caravel uses the [`domain::CaravelError`] type for all errors:
//!
//! ```rust,no_run
//! use caravel::domain::CaravelError;
//!
//! fn example() -> Result<(), CaravelError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = caravel::config::load_config("caravel.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Caravel uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting migration");
//! warn!(window = "[2025-06-01T00:00:00Z, 2025-06-01T01:00:00Z)", "Window failed; will retry");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
