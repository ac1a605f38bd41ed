//! Operator configuration.
//!
//! A single config.toml per user holds identity, endpoint and ledger
//! coordination options. The loaded value is passed explicitly to the
//! components that need it.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_config_toml, parse_config_toml_str, to_toml};
pub use schema::{DEFAULT_ENDPOINT, PluralConfig, RemoteFailurePolicy};
pub use store::ConfigStore;
