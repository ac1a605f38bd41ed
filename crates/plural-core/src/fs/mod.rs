//! Filesystem primitives shared across features.

pub mod fingerprint;

pub use fingerprint::{fingerprint, fingerprint_dir};
