//! Credential hashing.
//!
//! Argon2id, PHC string output. The salt is generated per call and embedded in
//! the verifier, so a verifier is self-contained.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};

use crate::CredentialError;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// argon2 crate defaults (OWASP minimum for Argon2id).
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// One-way password transform and back-verification.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(params: HashingParams) -> Result<Self, CredentialError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC verifier string.
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a plaintext against a stored verifier.
    ///
    /// Malformed verifiers yield `false`. The digest comparison inside argon2 is
    /// constant-time. Cost parameters are read from the verifier itself, so
    /// verifiers produced under older parameters keep working.
    pub fn verify(&self, plaintext: &str, verifier: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(verifier) else {
            return false;
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl core::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cheap() -> CredentialHasher {
        CredentialHasher::new(HashingParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = cheap();
        let verifier = hasher.hash("TestPassword123!").unwrap();

        assert!(verifier.starts_with("$argon2id$"));
        assert!(hasher.verify("TestPassword123!", &verifier));
        assert!(!hasher.verify("WrongPassword123!", &verifier));
    }

    #[test]
    fn same_password_different_salts() {
        let hasher = cheap();
        let a = hasher.hash("Password1").unwrap();
        let b = hasher.hash("Password1").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify("Password1", &a));
        assert!(hasher.verify("Password1", &b));
    }

    #[test]
    fn malformed_verifier_is_false_not_error() {
        let hasher = cheap();
        assert!(!hasher.verify("password", "not-a-valid-hash"));
        assert!(!hasher.verify("password", ""));
        assert!(!hasher.verify("password", "$argon2id$v=19$m=1024,t=1,p=1$"));
    }

    #[test]
    fn verifier_from_other_params_still_verifies() {
        let strong = CredentialHasher::new(HashingParams {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let verifier = strong.hash("rotate-me").unwrap();

        assert!(cheap().verify("rotate-me", &verifier));
    }

    #[test]
    fn rejects_invalid_params() {
        let err = CredentialHasher::new(HashingParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidParams(_)));
    }

    #[test]
    fn unicode_password() {
        let hasher = cheap();
        let verifier = hasher.hash("пароль-密码-123").unwrap();
        assert!(hasher.verify("пароль-密码-123", &verifier));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn verify_accepts_only_the_hashed_plaintext(a in ".{0,32}", b in ".{0,32}") {
            let hasher = cheap();
            let verifier = hasher.hash(&a).unwrap();

            prop_assert!(hasher.verify(&a, &verifier));
            if a != b {
                prop_assert!(!hasher.verify(&b, &verifier));
            }
        }
    }
}
