//! Random session tokens.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

pub const NONCE_LEN: usize = 32;

/// ASCII alphanumeric token of `len` characters drawn from the OS CSPRNG.
pub fn random_token(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
