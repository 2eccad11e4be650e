pub mod in_memory;
pub mod queue;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod webhook;
