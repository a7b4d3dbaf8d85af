//! Bearer tokens (JWT, HS256).

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use readalong_core::{Role, UserId};

use crate::errors::AuthError;

/// Token lifetime.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried in every issued token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User rowid.
    pub sub: i64,
    pub email: String,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::from_raw(self.sub)
    }
}

/// Issues and validates bearer tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a user, expiring [`TOKEN_TTL_DAYS`] from now.
    pub fn issue(&self, user_id: UserId, email: &str, role: Role) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.as_i64(),
            email: email.to_owned(),
            role,
            exp: (Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Validate a token and return its claims. Expiry is enforced.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}
