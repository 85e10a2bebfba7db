use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// HS256 keys shorter than the digest size are rejected at startup.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Millisecond expiry; `exp` is this rounded up to whole seconds
    pub exp_ms: i64,
}

/// A freshly minted bearer token
#[derive(Debug, Clone)]
pub struct Token {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,

    #[error("token generation error: {0}")]
    Encoding(String),
}

/// Signs and verifies HS256 tokens. The secret is fixed for the codec's lifetime.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret);
        }

        // Expiry is checked against an explicit clock in parse_subject_at
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, TokenError> {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::hours(config.jwt_expiry_hours as i64),
        )
    }

    pub fn issue(&self, subject: &str, now: DateTime<Utc>, ttl: Duration) -> Result<Token, TokenError> {
        let iat_ms = now.timestamp_millis();
        let exp_ms = iat_ms + ttl.num_milliseconds();
        let claims = Claims {
            sub: subject.to_string(),
            iat: iat_ms.div_euclid(1000),
            exp: (exp_ms + 999).div_euclid(1000),
            exp_ms,
        };

        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(Token {
            value,
            issued_at: timestamp(iat_ms)?,
            expires_at: timestamp(exp_ms)?,
        })
    }

    pub fn issue_now(&self, subject: &str) -> Result<Token, TokenError> {
        self.issue(subject, Utc::now(), self.ttl)
    }

    pub fn parse_subject(&self, token: &str) -> Result<String, TokenError> {
        self.parse_subject_at(token, Utc::now())
    }

    /// Verify signature then expiry against `now`, returning the subject.
    pub fn parse_subject_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if now.timestamp_millis() >= data.claims.exp_ms {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.sub)
    }

    pub fn validate(&self, token: &str) -> bool {
        self.parse_subject(token).is_ok()
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.parse_subject_at(token, now).is_ok()
    }
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| TokenError::Encoding(format!("timestamp out of range: {}ms", millis)))
}
