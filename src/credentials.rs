/// Credential verifier
///
/// Argon2id password hashing. Hashing and verification are CPU-heavy, so both
/// run on the blocking thread pool instead of the request task.
use crate::{
    config::PasswordHashConfig,
    error::{ApiError, ApiResult},
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::RngCore;

#[derive(Clone)]
pub struct CredentialVerifier {
    params: Params,
}

impl CredentialVerifier {
    pub fn new(config: &PasswordHashConfig) -> ApiResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| ApiError::Validation(format!("Invalid password hash parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret into a PHC string with a fresh random salt
    pub async fn hash(&self, secret: &str) -> ApiResult<String> {
        let argon2 = self.argon2();
        let secret = secret.to_owned();

        tokio::task::spawn_blocking(move || {
            let mut salt_bytes = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut salt_bytes);
            let salt = SaltString::encode_b64(&salt_bytes)
                .map_err(|e| ApiError::Internal(format!("Salt encoding failed: {}", e)))?;

            argon2
                .hash_password(secret.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// Check a secret against a stored digest.
    ///
    /// A corrupt digest and a wrong secret are indistinguishable: both are `false`.
    pub async fn verify(&self, secret: &str, digest: &str) -> bool {
        let argon2 = self.argon2();
        let secret = secret.to_owned();
        let digest = digest.to_owned();

        tokio::task::spawn_blocking(move || match PasswordHash::new(&digest) {
            Ok(parsed) => argon2.verify_password(secret.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        })
        .await
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(&PasswordHashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let verifier = verifier();
        let digest = verifier.hash("hunter22").await.unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("hunter22"));
        assert!(verifier.verify("hunter22", &digest).await);
        assert!(!verifier.verify("hunter23", &digest).await);
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let verifier = verifier();
        let first = verifier.hash("same-secret").await.unwrap();
        let second = verifier.hash("same-secret").await.unwrap();

        assert_ne!(first, second);
        assert!(verifier.verify("same-secret", &first).await);
        assert!(verifier.verify("same-secret", &second).await);
    }

    #[tokio::test]
    async fn test_corrupt_digest_is_plain_mismatch() {
        let verifier = verifier();

        assert!(!verifier.verify("anything", "not-a-phc-string").await);
        assert!(!verifier.verify("anything", "").await);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = CredentialVerifier::new(&PasswordHashConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(result.is_err());
    }
}
