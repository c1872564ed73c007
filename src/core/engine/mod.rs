// Workflow engine: baseline resolution, the window loop, run summaries

pub mod baseline;
pub mod summary;
pub mod workflow;

pub use baseline::BaselineResolver;
pub use summary::MigrationSummary;
pub use workflow::MigrationEngine;
