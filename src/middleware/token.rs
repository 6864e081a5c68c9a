//! Short-lived role tokens: issuance and verification.
//!
//! Tokens are HS256 JWTs carrying a single `role` claim plus `iat` / `exp`.
//! Nothing is stored server-side: a token is valid exactly as long as its
//! signature checks out and `exp` has not passed.
//!
//! Verification re-checks the header algorithm before touching the
//! signature, so a token whose header claims a non-HMAC algorithm is
//! rejected outright instead of being handed to a different verifier.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rbac::Role;

/// Lifetime of every issued token.
pub const TOKEN_TTL_SECS: i64 = 120;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no signing secret configured")]
    MissingSecret,

    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("unexpected signing method: {0:?}")]
    UnexpectedAlgorithm(Algorithm),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(role: Role, issued_at: DateTime<Utc>) -> Self {
        Self {
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        }
    }
}

/// Signs and verifies role tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Issue a token for `role`, valid from now for [`TOKEN_TTL_SECS`].
    pub fn issue(&self, role: Role) -> Result<String, TokenError> {
        self.sign(&Claims::new(role, Utc::now()))
    }

    /// Sign arbitrary claims. `issue` is the normal entry point; this exists
    /// so callers can mint tokens with a chosen issue time.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        encode(
            &Header::new(SIGNING_ALGORITHM),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    /// Verify `token` and return the role it carries.
    pub fn verify(&self, token: &str) -> Result<Role, TokenError> {
        let header = decode_header(token).map_err(TokenError::InvalidToken)?;
        if !HMAC_FAMILY.contains(&header.alg) {
            return Err(TokenError::UnexpectedAlgorithm(header.alg));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = HMAC_FAMILY.to_vec();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(TokenError::InvalidToken)?;

        Ok(data.claims.role)
    }
}

// ── Tests ────────────────────────────────────────────────────
