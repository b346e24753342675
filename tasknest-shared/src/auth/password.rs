//! Password hashing using Argon2id
//!
//! Passwords are hashed with Argon2id and a per-call random salt. The work
//! factor is tunable through [`HashingCost`] so production can use a
//! memory-hard setting while tests stay fast.
//!
//! # Security
//!
//! - **Algorithm**: Argon2id, version 0x13
//! - **Default cost**: 64 MB memory, 3 passes, 4 lanes
//! - **Output**: 32-byte hash in PHC string format (parameters and salt embedded)
//!
//! # Example
//!
//! ```
//! use tasknest_shared::auth::password::{hash_password, verify_password, HashingCost};
//!
//! let cost = HashingCost { memory_kib: 1024, iterations: 1, parallelism: 1 };
//! let hash = hash_password("abcdefg1", &cost).unwrap();
//!
//! assert!(verify_password("abcdefg1", &hash));
//! assert!(!verify_password("abcdefg2", &hash));
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Cost parameters rejected by argon2
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

/// Argon2id work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingCost {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HashingCost {
    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(self.memory_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes a plaintext password
///
/// A fresh 16-byte salt is drawn from the OS RNG on every call, so hashing
/// the same password twice yields different strings.
///
/// # Errors
///
/// Returns `PasswordError` if the cost parameters are invalid or hashing
/// fails. Callers abort the write that triggered the hash.
pub fn hash_password(password: &str, cost: &HashingCost) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = cost
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Parameters and salt are read back from the hash itself. Comparison is
/// constant-time. A malformed hash is logged and treated as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            return false;
        }
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => true,
        Err(argon2::password_hash::Error::Password) => false,
        Err(e) => {
            tracing::warn!(error = %e, "Password verification failed");
            false
        }
    }
}

/// Returns true if `value` looks like a PHC-encoded Argon2 hash
pub fn is_password_hash(value: &str) -> bool {
    value.starts_with("$argon2") && PasswordHash::new(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> HashingCost {
        HashingCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_default_cost() {
        let cost = HashingCost::default();
        assert_eq!(cost.memory_kib, 65536);
        assert_eq!(cost.iterations, 3);
        assert_eq!(cost.parallelism, 4);
    }

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("abcdefg1", &cheap()).expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=1024"));
        assert!(hash.contains("t=1"));
        assert!(hash.contains("p=1"));
        assert_ne!(hash, "abcdefg1");
        assert!(is_password_hash(&hash));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_secret", &cheap()).expect("Hash 1 should succeed");
        let hash2 = hash_password("same_secret", &cheap()).expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct horse", &cheap()).expect("Hash should succeed");

        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_verify_password_malformed_hash_is_false() {
        assert!(!verify_password("abcdefg1", "invalid_hash"));
        assert!(!verify_password("abcdefg1", "$argon2id$invalid"));
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        let cost = HashingCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };

        let result = hash_password("abcdefg1", &cost);
        assert!(matches!(result, Err(PasswordError::InvalidParams(_))));
    }

    #[test]
    fn test_plaintext_is_not_a_hash() {
        assert!(!is_password_hash("abcdefg1"));
        assert!(!is_password_hash("$argon2id$"));
    }

    #[test]
    fn test_unicode_roundtrip() {
        let hash = hash_password("unicode-密码-パスワード", &cheap()).unwrap();
        assert!(verify_password("unicode-密码-パスワード", &hash));
    }
}
