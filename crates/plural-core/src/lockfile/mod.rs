//! Lockfile types and persistence.
//!
//! Represents the applied fingerprint of every installed component.

pub mod store;
pub mod types;

pub use store::{LockfileStore, lock_path};
pub use types::Lockfile;
