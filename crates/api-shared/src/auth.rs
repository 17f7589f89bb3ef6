//! Identity verification for inbound calls.
//!
//! Credentials travel as `Authorization: <scheme> <token>`. The token is a compact three-part
//! string, `base64url(header).base64url(claims).base64url(signature)`, signed with HMAC-SHA256
//! over the first two segments using a server-held secret.
//!
//! Only the `sub` claim is trusted as identity; `exp` bounds the token lifetime. Verification is
//! stateless and never touches storage.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use odonto_types::SubjectId;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("ODONTO_TOKEN_SECRET is not set")]
    MissingSecret,
    #[error("token secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("missing credential")]
    MissingCredential,
    #[error("malformed credential: {0}")]
    Malformed(&'static str),
    #[error("credential signature does not verify")]
    BadSignature,
    #[error("credential has expired")]
    Expired,
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Expiry as Unix seconds.
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Parse the token secret from an optional string value.
///
/// # Errors
///
/// Returns `AuthError::MissingSecret` if the value is absent or blank and
/// `AuthError::WeakSecret` if it is shorter than [`MIN_SECRET_LEN`] bytes.
pub fn token_secret_from_env_value(value: Option<String>) -> AuthResult<String> {
    let secret = value
        .filter(|s| !s.trim().is_empty())
        .ok_or(AuthError::MissingSecret)?;
    if secret.len() < MIN_SECRET_LEN {
        return Err(AuthError::WeakSecret);
    }
    Ok(secret)
}

#[derive(Clone)]
struct SigningKey(Vec<u8>);

impl SigningKey {
    fn new(secret: impl AsRef<[u8]>) -> AuthResult<Self> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret);
        }
        Ok(Self(secret.to_vec()))
    }

    fn mac(&self, signing_input: &str) -> AuthResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.0).map_err(|_| AuthError::WeakSecret)?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

/// Validates bearer credentials and extracts the caller's [`SubjectId`].
#[derive(Clone)]
pub struct IdentityVerifier {
    key: SigningKey,
}

impl fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerifier").finish_non_exhaustive()
    }
}

impl IdentityVerifier {
    /// # Errors
    ///
    /// Returns `AuthError::WeakSecret` if the secret is shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> AuthResult<Self> {
        Ok(Self {
            key: SigningKey::new(secret)?,
        })
    }

    /// Verifies the raw `Authorization` header value.
    ///
    /// The header must hold exactly two whitespace-separated parts; the first (the scheme) is not
    /// interpreted and the second is verified as a token.
    ///
    /// The reason for a rejection is logged at debug level and never returned to the caller
    /// beyond the error variant.
    pub fn verify(&self, header: Option<&str>) -> AuthResult<SubjectId> {
        self.verify_at(header, Utc::now().timestamp())
            .inspect_err(|e| tracing::debug!("identity rejected: {}", e))
    }

    fn verify_at(&self, header: Option<&str>, now: i64) -> AuthResult<SubjectId> {
        let header = header.ok_or(AuthError::MissingCredential)?;
        let mut parts = header.split_whitespace();
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some(_scheme), Some(token), None) => token,
            (None, _, _) => return Err(AuthError::MissingCredential),
            _ => return Err(AuthError::Malformed("expected '<scheme> <token>'")),
        };

        let mut segments = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(AuthError::Malformed("token must have three segments")),
            };

        let token_header: TokenHeader = decode_segment(header_b64)?;
        if token_header.alg != ALGORITHM {
            return Err(AuthError::Malformed("unsupported algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed("signature is not base64url"))?;
        self.key
            .mac(&format!("{}.{}", header_b64, claims_b64))?
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }

        SubjectId::new(&claims.sub).map_err(|_| AuthError::Malformed("empty subject"))
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> AuthResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::Malformed("segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed("segment is not valid JSON"))
}

fn encode_segment<T: Serialize>(value: &T) -> AuthResult<String> {
    let json = serde_json::to_vec(value).map_err(|e| AuthError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Produces identity tokens accepted by an [`IdentityVerifier`] sharing the same secret.
///
/// Used by operators and tests; the request path never issues tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: SigningKey,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>) -> AuthResult<Self> {
        Ok(Self {
            key: SigningKey::new(secret)?,
        })
    }

    /// Issues a token for `subject` that expires after `ttl`.
    pub fn issue(&self, subject: &SubjectId, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        self.sign(&Claims {
            sub: subject.as_str().to_string(),
            exp: now + ttl.num_seconds(),
            iat: Some(now),
        })
    }

    /// Signs arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        let header = TokenHeader {
            alg: ALGORITHM.into(),
            typ: Some("JWT".into()),
        };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(claims)?);
        let signature = self.key.mac(&signing_input)?.finalize().into_bytes();
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }
}
