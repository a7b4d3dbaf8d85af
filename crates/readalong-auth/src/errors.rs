/// Errors from credential operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Email/password pair did not match a stored credential.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bearer token failed signature or structural validation.
    #[error("invalid token: {0}")]
    TokenInvalid(String),

    /// Bearer token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Stored password digest could not be parsed.
    #[error("malformed password digest")]
    MalformedDigest,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::TokenInvalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_display() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "invalid credentials");
    }

    #[test]
    fn token_invalid_display_carries_detail() {
        let err = AuthError::TokenInvalid("InvalidSignature".to_string());
        assert!(err.to_string().contains("InvalidSignature"));
    }
}
