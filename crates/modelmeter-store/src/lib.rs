//! Key-value store abstraction and the request telemetry store built on it

mod kv;
mod sqlite;
mod telemetry;
mod window;

pub use kv::{KvStore, MemoryKv, StoreError};
pub use sqlite::SqliteKv;
pub use telemetry::{RequestOutcome, Scan, TelemetryStore, INDEX_TTL, RECORD_TTL};
pub use window::Window;
