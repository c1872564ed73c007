//! External system integrations for Caravel.
//!
//! This module provides adapters for the systems the workflow talks to:
//!
//! - [`cluster`] - Read-only query facade over the source and target clusters
//! - [`transfer`] - Batch transfer driver that shells out to Logstash
//! - [`operator`] - Confirmation prompts (console or scripted)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies
//! and enable testing with scripted implementations. The engine only ever
//! sees the traits ([`cluster::ClusterQuery`], [`transfer::TransferDriver`],
//! [`operator::OperatorPrompt`]), never the concrete clients.
//!
//! # Cluster Facade
//!
//! ```rust,no_run
//! use caravel::adapters::cluster::HttpClusterQuery;
//! use caravel::config::ClusterConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClusterConfig {
//!     url: "https://search.example.com:9200".to_string(),
//!     username: None,
//!     password: None,
//!     tls_verify: true,
//!     timeout_seconds: 60,
//! };
//!
//! let source = HttpClusterQuery::new("source", &config, "logs-*")?;
//! // Use the facade for baseline detection and density probes
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod operator;
pub mod transfer;

pub use cluster::{ClusterQuery, HttpClusterQuery};
pub use operator::{ConsolePrompt, OperatorPrompt, ScriptedPrompt};
pub use transfer::{LogstashDriver, TransferDriver};
