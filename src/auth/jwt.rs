//! JWT Token Service
//!
//! Issues, validates and renews the bearer tokens that carry a user's
//! identity and admin flag. Tokens are short lived; a token may be renewed
//! without credentials until `max_refresh` has elapsed since the original
//! signin, after which the user has to sign in again.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// JWT Claims structure containing user information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Username of the authenticated user
    pub id: String,
    pub is_admin: bool,
    /// Token expiration timestamp
    pub exp: i64,
    /// Timestamp of the signin this token descends from
    pub orig_iat: i64,
    /// Token issuer (the configured realm)
    pub iss: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("token is expired")]
    Expired,

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("token is past its renewal window")]
    RenewalWindowExceeded,
}

/// A freshly signed token and the instant it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    realm: String,
    timeout: Duration,
    max_refresh: Duration,
}

impl TokenService {
    /// Create a new token service from the auth settings
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::Signing("signing key is not configured".to_string()));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is checked by hand so renewal can read expired tokens and
        // tests can pin the clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.realm.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            realm: config.realm.clone(),
            timeout: lifetime("token timeout", config.timeout_secs)?,
            max_refresh: lifetime("refresh window", config.max_refresh_secs)?,
        })
    }

    /// Issue a token for a freshly authenticated user
    pub fn issue(&self, username: &str, is_admin: bool) -> Result<IssuedToken, TokenError> {
        self.issue_at(username, is_admin, Utc::now())
    }

    pub fn issue_at(
        &self,
        username: &str,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            id: username.to_string(),
            is_admin,
            exp: 0,
            orig_iat: now.timestamp(),
            iss: self.realm.clone(),
        };
        self.sign(claims, now)
    }

    /// Validate signature, issuer and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if claims.exp < now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Re-sign a token with a fresh expiry, keeping its original issue time
    pub fn renew(&self, token: &str) -> Result<IssuedToken, TokenError> {
        self.renew_at(token, Utc::now())
    }

    pub fn renew_at(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = self.decode(token)?;
        let window_start = now
            .checked_sub_signed(self.max_refresh)
            .ok_or_else(|| TokenError::Signing("refresh window out of range".to_string()))?;
        if claims.orig_iat < window_start.timestamp() {
            return Err(TokenError::RenewalWindowExceeded);
        }
        self.sign(claims, now)
    }

    fn sign(&self, mut claims: Claims, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.timeout)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;
        claims.exp = expires_at.timestamp();

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

fn lifetime(what: &str, secs: i64) -> Result<Duration, TokenError> {
    if secs <= 0 {
        return Err(TokenError::Signing(format!("{} must be positive", what)));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| TokenError::Signing(format!("{} is out of range", what)))
}

#[cfg(test)]
pub(crate) fn test_auth_config() -> AuthConfig {
    AuthConfig {
        secret: "test_secret".to_string(),
        realm: "garden.io".to_string(),
        timeout_secs: 15,
        max_refresh_secs: 3600,
    }
}
