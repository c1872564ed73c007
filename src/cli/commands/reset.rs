//! Reset command implementation
//!
//! This module implements the `reset` command for discarding the saved
//! migration state. The engine never deletes its own checkpoint; starting
//! over or clearing a stale lock is always an explicit operator action.

use crate::config::load_config;
use crate::core::state::FileCheckpointStore;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the reset command
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Also remove the window journal
    #[arg(long)]
    pub journal: bool,
}

impl ResetArgs {
    /// Execute the reset command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Resetting migration state");

        // Load configuration
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(2); // Configuration error exit code
            }
        };

        println!("This will discard the saved migration state:");
        println!("  Checkpoint: {}", config.checkpoint.path);
        if self.journal {
            println!("  Journal: {}", config.checkpoint.journal_path());
        }
        println!();
        println!("The next run will detect its baseline from scratch.");
        println!();

        // Confirmation prompt (unless --yes)
        if !self.yes {
            print!("Proceed with reset? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Reset cancelled.");
                return Ok(0);
            }
        }

        let store = FileCheckpointStore::new(&config.checkpoint.path);
        let mut removed = match store.clear() {
            Ok(paths) => paths,
            Err(e) => {
                println!("❌ Failed to remove the checkpoint");
                println!("   Error: {}", e);
                return Ok(5); // Fatal error exit code
            }
        };

        if self.journal {
            let journal_path = config.checkpoint.journal_path();
            let journal = Path::new(&journal_path);
            if journal.exists() {
                match fs::remove_file(journal) {
                    Ok(_) => removed.push(journal.to_path_buf()),
                    Err(e) => {
                        println!("❌ Failed to remove the journal");
                        println!("   Error: {}", e);
                        return Ok(5);
                    }
                }
            }
        }

        if removed.is_empty() {
            println!("Nothing to reset; no state files were found.");
        } else {
            println!("✅ Migration state reset. Removed:");
            for path in &removed {
                println!("  - {}", path.display());
            }
        }
        println!();
        Ok(0)
    }
}
