use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use thiserror::Error;

use parley_types::api::Claims;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Sign a time-limited bearer token with the username as subject.
pub fn create_access_token(
    username: &str,
    secret: &str,
    algorithm: Algorithm,
    ttl_minutes: i64,
) -> Result<String, AuthError> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp() as usize,
    };

    let token = encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify signature and expiry and return the claims. Signature mismatch,
/// expiry, and malformed tokens all collapse to `None`.
pub fn decode_access_token(token: &str, secret: &str, algorithm: Algorithm) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(algorithm),
    )
    .map(|data| data.claims)
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-must-be-long-enough";

    #[test]
    fn issued_token_is_accepted_before_expiry() {
        let token = create_access_token("admin", SECRET, Algorithm::HS256, 60).unwrap();
        let claims = decode_access_token(&token, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn expired_token_is_rejected() {
        // -2 minutes keeps the expiry safely past the default 60s leeway
        let token = create_access_token("admin", SECRET, Algorithm::HS256, -2).unwrap();
        assert!(decode_access_token(&token, SECRET, Algorithm::HS256).is_none());
    }

    #[test]
    fn wrong_secret_or_algorithm_is_rejected() {
        let token = create_access_token("admin", SECRET, Algorithm::HS256, 60).unwrap();
        assert!(decode_access_token(&token, "another-secret", Algorithm::HS256).is_none());
        assert!(decode_access_token(&token, SECRET, Algorithm::HS384).is_none());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(decode_access_token("definitely-not-a-jwt", SECRET, Algorithm::HS256).is_none());
        assert!(decode_access_token("", SECRET, Algorithm::HS256).is_none());
    }
}
