//! PBKDF2-HMAC-SHA256 credential hashing.
//!
//! Hashes are stored as PHC strings (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`).
//! The round count travels with each hash, so it can be raised later without
//! invalidating old hashes.

use anyhow::{anyhow, bail, Result};
use pbkdf2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Params, Pbkdf2,
};
use rand::rngs::OsRng;

const OUTPUT_LEN: usize = 32;

/// Hashes and verifies credentials
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    rounds: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { rounds: 600_000 }
    }
}

impl PasswordHasher {
    /// A hasher using `rounds` iterations for new hashes
    pub fn new(rounds: u32) -> Result<Self> {
        if rounds == 0 {
            bail!("PBKDF2 iterations must be non-zero");
        }
        Ok(Self { rounds })
    }

    /// Hash a plaintext credential with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params {
            rounds: self.rounds,
            output_length: OUTPUT_LEN,
        };

        let hash = Pbkdf2
            .hash_password_customized(
                plaintext.as_bytes(),
                Some(Algorithm::Pbkdf2Sha256.ident()),
                None,
                params,
                &salt,
            )
            .map_err(|err| anyhow!("failed to hash credential: {err}"))?;

        Ok(hash.to_string())
    }

    /// Check a plaintext credential against a stored hash.
    ///
    /// Malformed hashes never verify.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let hash = match PasswordHash::new(stored) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!(%err, "Stored credential hash is malformed");
                return false;
            }
        };

        Pbkdf2.verify_password(plaintext.as_bytes(), &hash).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn test_hash_then_verify() -> TestResult {
        let hasher = PasswordHasher::new(1_000)?;
        let stored = hasher.hash("correct horse")?;

        assert!(stored.starts_with("$pbkdf2-sha256$i=1000,l=32$"));
        assert!(hasher.verify("correct horse", &stored));
        assert!(!hasher.verify("correct horse ", &stored));
        assert!(!hasher.verify("", &stored));

        Ok(())
    }

    #[test]
    fn test_salts_differ() -> TestResult {
        let hasher = PasswordHasher::new(1_000)?;
        assert_ne!(hasher.hash("same")?, hasher.hash("same")?);
        Ok(())
    }

    #[test]
    fn test_old_iteration_counts_still_verify() -> TestResult {
        let stored = PasswordHasher::new(1_000)?.hash("correct horse")?;
        assert!(PasswordHasher::new(2_000)?.verify("correct horse", &stored));
        Ok(())
    }

    #[test]
    fn test_malformed_hashes_never_verify() -> TestResult {
        let hasher = PasswordHasher::new(1_000)?;
        for stored in [
            "",
            "plaintext",
            "pbkdf2$1000$00$00",
            "$pbkdf2-sha256$i=1000,l=32$$",
            "$argon2id$v=19$m=16,t=2,p=1$c2FsdHNhbHQ$aGFzaA",
        ] {
            assert!(!hasher.verify("plaintext", stored), "{stored}");
        }
        assert!(PasswordHasher::new(0).is_err());
        Ok(())
    }
}
