//! Core business logic for Caravel.
//!
//! This module contains the migration workflow and its supporting pieces.
//!
//! # Modules
//!
//! - [`engine`] - Baseline resolution, the window loop, and run summaries
//! - [`retry`] - Bounded retries with exponential backoff and jitter
//! - [`state`] - Checkpoint persistence and the per-window journal
//! - [`window`] - Adaptive sizing of transfer windows
//!
//! # Migration Workflow
//!
//! The typical run:
//!
//! 1. **Preflight**: Probe health of the source and target clusters
//! 2. **Baseline**: Resolve where to start (checkpoint, snapshot, target
//!    data, or source data) and get it confirmed by the operator
//! 3. **Window Loop**: Size a window to the observed density, hand it to
//!    the transfer driver, and checkpoint after every success
//! 4. **Cutover**: Once lag is inside the threshold, ask for a write stop
//!    and drain the remainder in a final pass
//! 5. **Report**: Summarize windows, rows, and the resume point
//!
//! # Example
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
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("caravel.toml")?;
//!
//! let source = Arc::new(HttpClusterQuery::new(
//!     "source",
//!     &config.source,
//!     &config.migration.index_pattern,
//! )?);
//! let target = Arc::new(HttpClusterQuery::new(
//!     "target",
//!     &config.target,
//!     &config.migration.index_pattern,
//! )?);
//! let driver = Arc::new(LogstashDriver::new(&config)?);
//! let store = Arc::new(FileCheckpointStore::new(&config.checkpoint.path));
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let mut engine = MigrationEngine::new(
//!     &config,
//!     source,
//!     target,
//!     driver,
//!     store,
//!     Arc::new(ConsolePrompt),
//!     shutdown_rx,
//! );
//!
//! let summary = engine.run().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod retry;
pub mod state;
pub mod window;
