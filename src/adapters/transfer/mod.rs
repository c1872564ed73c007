// Batch transfer driver backed by Logstash

pub mod logstash;
pub mod traits;

pub use logstash::LogstashDriver;
pub use traits::TransferDriver;
