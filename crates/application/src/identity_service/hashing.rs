//! Deterministic salted, keyed hashing of upstream identity claims.
//!
//! Claims are matched only by equality of their digests; the raw values are
//! never stored. The digest is an iterated HMAC-SHA256 keyed with a secret
//! pepper over the salted claim, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use carebridge_core::{AppError, AppResult};
use carebridge_domain::IdentityHash;

type HmacSha256 = Hmac<Sha256>;

/// Stateless identity-claim hasher.
#[derive(Clone)]
pub struct IdentityHasher {
    pepper: Vec<u8>,
    salt: String,
    iterations: u32,
}

impl IdentityHasher {
    /// Creates a hasher from the configured pepper, salt, and iteration
    /// count.
    pub fn new(
        pepper: impl Into<Vec<u8>>,
        salt: impl Into<String>,
        iterations: u32,
    ) -> AppResult<Self> {
        let pepper = pepper.into();
        let salt = salt.into();

        if pepper.is_empty() {
            return Err(AppError::Validation(
                "identity hash pepper must not be empty".to_owned(),
            ));
        }
        if salt.trim().is_empty() {
            return Err(AppError::Validation(
                "identity hash salt must not be empty".to_owned(),
            ));
        }
        if iterations == 0 {
            return Err(AppError::Validation(
                "identity hash iterations must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            pepper,
            salt,
            iterations,
        })
    }

    /// Hashes one normalized identity claim.
    pub fn hash_claim(&self, value: &str) -> AppResult<IdentityHash> {
        let mut material = format!("{}{value}", self.salt).into_bytes();

        for _ in 0..self.iterations {
            let mut mac = HmacSha256::new_from_slice(&self.pepper).map_err(|error| {
                AppError::Internal(format!("failed to key identity hash: {error}"))
            })?;
            mac.update(&material);
            material = mac.finalize().into_bytes().to_vec();
        }

        IdentityHash::from_hex(hex::encode(material))
    }
}

impl std::fmt::Debug for IdentityHasher {
    // Never expose the pepper, even in debug output.
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("IdentityHasher")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}
