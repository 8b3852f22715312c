// Audit infra layer.
// - `sqlite_store.rs` persists the audit log to SQLite.
// - `in_memory.rs` keeps it in process memory (no-database setups, tests).

#[path = "sqlite_store.rs"]
pub mod sqlite_store;

#[path = "in_memory.rs"]
pub mod in_memory;

pub use in_memory::InMemoryAuditStore;
pub use sqlite_store::SqliteAuditStore;
