//! Password hashing and bearer token issuance.
//!
//! Passwords are stored as argon2 PHC strings. Tokens are JWTs whose subject
//! is the user's email and which expire after a fixed lifetime.

use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Unsupported signing algorithm: {0}")]
    Algorithm(String),
}

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User email.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// `false` for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Signing keys and token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenKeys {
    /// Keys for an HMAC algorithm (`HS256`, `HS384`, `HS512`).
    pub fn new(secret: &str, algorithm: Algorithm, ttl: Duration) -> Result<Self, AuthError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Algorithm(format!("{algorithm:?}")));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl,
        })
    }

    pub fn issue(&self, email: &str) -> Result<String, AuthError> {
        let exp = (Utc::now().timestamp().max(0) as u64).saturating_add(self.ttl.as_secs());
        let claims = Claims {
            sub: email.to_string(),
            exp,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding,
        )?)
    }

    /// Validate signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ttl: Duration) -> TokenKeys {
        TokenKeys::new("test-secret", Algorithm::HS256, ttl).unwrap()
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn issued_token_carries_email() {
        let keys = keys(Duration::from_secs(30 * 60));
        let token = keys.issue("a@example.com").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "a@example.com");
    }

    #[test]
    fn unbounded_ttl_saturates_expiry() {
        let keys = keys(Duration::MAX);
        let token = keys.issue("a@example.com").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp, u64::MAX);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys(Duration::ZERO);
        let claims = Claims {
            sub: "a@example.com".to_string(),
            exp: (Utc::now().timestamp() - 10) as u64,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenKeys::new("other", Algorithm::HS256, Duration::from_secs(60)).unwrap();
        let token = other.issue("a@example.com").unwrap();
        assert!(keys(Duration::from_secs(60)).verify(&token).is_err());
    }

    #[test]
    fn asymmetric_algorithms_are_refused() {
        assert!(TokenKeys::new("s", Algorithm::RS256, Duration::from_secs(60)).is_err());
    }
}
