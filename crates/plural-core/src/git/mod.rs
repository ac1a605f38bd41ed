//! Git helpers.

mod root;

pub use root::repo_root;
