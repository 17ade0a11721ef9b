// Password and session-token hashing helpers
use bcrypt::{DEFAULT_COST, hash, verify};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub struct AuthService;

impl AuthService {
    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        hash(password, DEFAULT_COST)
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        verify(password, hash)
    }

    /// Generate an opaque session token (UUID v4, 122 bits of randomness)
    pub fn generate_session_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Hash a session token with SHA-256 for storage. Tokens are already
    /// high-entropy, so a fast hash is appropriate here, unlike passwords.
    pub fn hash_session_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
