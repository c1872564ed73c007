// Cluster query facade and its HTTP implementation

pub mod http;
pub mod models;
pub mod traits;

pub use http::HttpClusterQuery;
pub use traits::{ClusterHealth, ClusterQuery, SnapshotInfo};
