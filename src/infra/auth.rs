//! HS256 bearer tokens.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::UserId;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token rejected: {0}")]
    Invalid(String),
    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::Invalid(format!("subject `{}` is not a user id", self.sub)))
    }
}

pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl_seconds: i64,
}

impl JwtCodec {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_seconds: u64) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn issue(&self, user_id: UserId, name: &str) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn issued_token_verifies() {
        let codec = JwtCodec::new(SECRET, "postcache", 3600);
        let token = codec.issue(7, "Ada").expect("issue");
        let claims = codec.verify(&token).expect("verify");
        assert_eq!(claims.user_id().expect("id"), 7);
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtCodec::new(SECRET, "postcache", 3600);
        let verifier = JwtCodec::new("another-secret-another-secret-xx", "postcache", 3600);
        let token = issuer.issue(1, "Ada").expect("issue");
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let issuer = JwtCodec::new(SECRET, "elsewhere", 3600);
        let verifier = JwtCodec::new(SECRET, "postcache", 3600);
        let token = issuer.issue(1, "Ada").expect("issue");
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let codec = JwtCodec::new(SECRET, "postcache", 3600);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let token = codec
            .sign(&Claims {
                sub: "1".to_string(),
                name: "Ada".to_string(),
                iss: "postcache".to_string(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .expect("sign");
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = JwtCodec::new(SECRET, "postcache", 3600);
        assert!(matches!(codec.verify("not-a-jwt"), Err(TokenError::Invalid(_))));
    }
}
