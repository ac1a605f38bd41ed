//! On-disk scaffolding for workspace directories.
//!
//! Layout inside `<repo_root>/<name>`:
//! - `.plural/ONCE`: marker, always `once`
//! - `.plural/NONCE`: 32-character token, rotated on every scaffold
//! - `.plural/deploy`, `.plural/diff`: execution and diff plans
//! - `.pluralignore`: transient paths excluded from deployable content

pub mod diff;
pub mod execution;
pub mod ignore;
pub mod nonce;
pub mod plan;

pub use diff::DiffScaffolder;
pub use execution::ExecutionScaffolder;
pub use plan::{Plan, PlanKind, Step};

pub const CONTROL_DIR: &str = ".plural";
pub const ONCE_FILE: &str = "ONCE";
pub const ONCE_CONTENT: &str = "once";
pub const NONCE_FILE: &str = "NONCE";
