use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Hash a secret (password or refresh-token fingerprint) with a fresh
/// per-call salt, so identical inputs never share a digest.
pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(digest)
}

/// Verify a secret against a stored digest. A digest that fails to parse is
/// treated as a mismatch, not an error.
pub fn verify(plain: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Argon2 is CPU-bound; keep it off the async dispatch path.
pub async fn hash_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash(&plain)).await?
}

pub async fn verify_blocking(plain: String, digest: String) -> anyhow::Result<bool> {
    Ok(tokio::task::spawn_blocking(move || verify(&plain, &digest)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let digest = hash(password).expect("hashing should succeed");
        assert!(verify(password, &digest));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let password = "correct-horse-battery-staple";
        let digest = hash(password).expect("hashing should succeed");
        assert!(!verify("wrong-password", &digest));
    }

    #[test]
    fn malformed_digest_is_a_mismatch() {
        assert!(!verify("anything", "not-a-valid-digest"));
        assert!(!verify("anything", ""));
    }

    #[test]
    fn same_input_hashes_to_distinct_digests() {
        let digest_a = hash("repeated-input").expect("hashing should succeed");
        let digest_b = hash("repeated-input").expect("hashing should succeed");
        assert_ne!(digest_a, digest_b);
        assert!(verify("repeated-input", &digest_a));
        assert!(verify("repeated-input", &digest_b));
    }

    #[tokio::test]
    async fn blocking_wrappers_roundtrip() {
        let digest = hash_blocking("off-the-hot-path".into())
            .await
            .expect("hash_blocking should succeed");
        assert!(verify_blocking("off-the-hot-path".into(), digest)
            .await
            .expect("verify_blocking should succeed"));
    }
}
