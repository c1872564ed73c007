// Checkpoint persistence and per-window journaling

pub mod journal;
pub mod progress;
pub mod store;

pub use journal::{JournalEntry, WindowJournal};
pub use progress::{CheckpointRecord, MigrationState, CHECKPOINT_SCHEMA_VERSION};
pub use store::{CheckpointLock, CheckpointStore, FileCheckpointStore};
