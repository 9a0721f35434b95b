use sha2::{Digest, Sha256};

use crate::brute_force::PinGuard;

/// Hash a PIN with SHA-256 so comparisons run over fixed-length digests.
fn hash_pin(pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

/// Admin PIN, kept only as its digest.
#[derive(Clone)]
pub struct AdminPin {
    digest: String,
}

impl AdminPin {
    pub fn new(pin: &str) -> Self {
        Self {
            digest: hash_pin(pin),
        }
    }

    pub fn matches(&self, provided: &str) -> bool {
        hash_pin(provided) == self.digest
    }
}

impl std::fmt::Debug for AdminPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminPin(****)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    Invalid,
    Locked,
}

impl std::fmt::Display for PinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinError::Invalid => write!(f, "Invalid PIN"),
            PinError::Locked => write!(f, "Too many failed PIN attempts, try again later"),
        }
    }
}

impl std::error::Error for PinError {}

/// Check `provided` for `client`, going through the lockout guard.
pub fn check_pin(
    pin: &AdminPin,
    guard: &PinGuard,
    client: &str,
    provided: &str,
) -> Result<(), PinError> {
    if guard.is_locked(client) {
        tracing::warn!("Rejected PIN attempt from locked-out client {}", client);
        return Err(PinError::Locked);
    }

    if pin.matches(provided) {
        guard.record_success(client);
        Ok(())
    } else {
        tracing::warn!("Invalid admin PIN from {}", client);
        guard.record_failure(client);
        Err(PinError::Invalid)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;
