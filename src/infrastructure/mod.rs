//! Adapters for the domain ports: storage backends, code generators, the
//! notification hub and the system clock.

pub mod clock;
pub mod in_memory;
pub mod notification;
pub mod qr_code;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
