//! Bearer-token verification (HS256).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed token, wrong algorithm, or bad signature.
    #[error("invalid token")]
    Invalid,

    /// Signature was fine but the claims are outside their validity window.
    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and yields its claims.
///
/// A trait so transports (HTTP middleware, the SSE gateway) can be tested
/// against a fake without minting real tokens.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// HS256 validator over a shared secret.
///
/// Signature verification is delegated to `jsonwebtoken`; the time-window
/// check runs through [`validate_claims`] with the caller's clock, so there
/// is no hidden leeway.
pub struct Hs256JwtValidator {
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time validation is done deterministically in validate_claims.
        validation.validate_exp = false;

        Self {
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerforge_core::UserId;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn fresh_claims() -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::new(),
            email: Some("dev@example.com".to_string()),
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn round_trips_a_valid_token() {
        let claims = fresh_claims();
        let token = mint("secret", &claims);

        let validator = Hs256JwtValidator::new("secret");
        let got = validator.validate(&token, Utc::now()).unwrap();
        assert_eq!(got, claims);
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let token = mint("other-secret", &fresh_claims());

        let validator = Hs256JwtValidator::new("secret");
        assert!(matches!(
            validator.validate(&token, Utc::now()),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn rejects_an_expired_token() {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(),
            email: None,
            issued_at: now - Duration::minutes(20),
            expires_at: now - Duration::minutes(10),
        };
        let token = mint("secret", &claims);

        let validator = Hs256JwtValidator::new("secret");
        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn rejects_garbage() {
        let validator = Hs256JwtValidator::new("secret");
        assert!(matches!(
            validator.validate("not.a.token", Utc::now()),
            Err(TokenError::Invalid)
        ));
    }
}
