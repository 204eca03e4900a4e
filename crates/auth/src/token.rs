//! Signed, time-bounded access tokens.
//!
//! HS256 JWTs. Verification runs three independent checks in a fixed order:
//! structure, signature, expiry. Any single failure voids the token. Tokens are
//! stateless; there is no revocation list.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use classifieds_core::UserId;

use crate::{Clock, TokenError};

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user identifier, in display form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,

    /// Token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    pub fn new(subject_id: &UserId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: Some(subject_id.to_string()),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Some(Uuid::new_v4().to_string()),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// An issued token together with the facts it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Wire form (`header.payload.signature`).
    pub value: String,
    pub subject_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Deterministically check the time window of already-authenticated claims.
///
/// A token is expired at its `exp` second, not after it.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Issues and verifies tokens with a process-wide secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `validate_claims`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    /// Issue a token for `subject_id` valid for `ttl` from now.
    pub fn issue(&self, subject_id: &UserId, ttl: Duration) -> Result<Token, TokenError> {
        let now = self.clock.now();
        let claims = Claims::new(subject_id, now, now + ttl);

        let issued_at = claims
            .issued_at()
            .ok_or_else(|| TokenError::Issue("issued_at out of range".to_string()))?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| TokenError::Issue("expires_at out of range".to_string()))?;

        Ok(Token {
            value: self.sign(&claims)?,
            subject_id: *subject_id,
            issued_at,
            expires_at,
        })
    }

    /// Sign arbitrary claims with the service key.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Decode and verify a token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                _ => TokenError::Malformed,
            })?;

        validate_claims(&data.claims, self.clock.now())?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use proptest::prelude::*;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-testing-minimum-32-chars";

    fn service() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (TokenService::new(TEST_SECRET, clock.clone()), clock)
    }

    fn flip_signature_bit(token: &str, bit: usize) -> String {
        let (message, signature) = token.rsplit_once('.').unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
        let idx = bit % (bytes.len() * 8);
        bytes[idx / 8] ^= 1 << (idx % 8);
        format!("{message}.{}", URL_SAFE_NO_PAD.encode(bytes))
    }

    #[test]
    fn issue_then_verify() {
        let (tokens, _) = service();
        let subject = UserId::new();

        let token = tokens.issue(&subject, Duration::hours(48)).unwrap();
        assert_eq!(token.subject_id, subject);
        assert_eq!(token.expires_at - token.issued_at, Duration::hours(48));
        assert!(!token.value.chars().any(char::is_whitespace));

        let claims = tokens.verify(&token.value).unwrap();
        assert_eq!(claims.sub, Some(subject.to_string()));
    }

    #[test]
    fn expired_exactly_at_expiry() {
        let (tokens, clock) = service();
        let token = tokens.issue(&UserId::new(), Duration::hours(1)).unwrap();

        clock.set(token.expires_at - Duration::seconds(1));
        assert!(tokens.verify(&token.value).is_ok());

        clock.set(token.expires_at);
        assert_eq!(tokens.verify(&token.value), Err(TokenError::Expired));
    }

    #[test]
    fn zero_ttl_is_immediately_expired() {
        let (tokens, _) = service();
        let token = tokens.issue(&UserId::new(), Duration::zero()).unwrap();
        assert_eq!(tokens.verify(&token.value), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let (tokens, clock) = service();
        let token = tokens.issue(&UserId::new(), Duration::hours(1)).unwrap();

        let other = TokenService::new(b"another-secret-entirely", clock);
        assert_eq!(other.verify(&token.value), Err(TokenError::BadSignature));
    }

    #[test]
    fn signature_checked_before_expiry() {
        let (tokens, clock) = service();
        let token = tokens.issue(&UserId::new(), Duration::hours(1)).unwrap();
        clock.advance(Duration::hours(2));

        let tampered = flip_signature_bit(&token.value, 3);
        assert_eq!(tokens.verify(&tampered), Err(TokenError::BadSignature));
        assert_eq!(tokens.verify(&token.value), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_payload_is_bad_signature() {
        let (tokens, _) = service();
        let token = tokens.issue(&UserId::new(), Duration::hours(1)).unwrap();

        let forged_claims = Claims::new(&UserId::new(), Utc::now(), Utc::now() + Duration::days(365));
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let parts: Vec<&str> = token.value.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(tokens.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let (tokens, _) = service();
        let claims = Claims::new(&UserId::new(), Utc::now(), Utc::now() + Duration::hours(1));
        let hs512 = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert_eq!(tokens.verify(&hs512), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let (tokens, _) = service();
        assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("invalid"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("invalid.token.here"), Err(TokenError::Malformed));
    }

    #[test]
    fn claims_without_subject_still_verify() {
        let (tokens, _) = service();
        let now = Utc::now();
        let claims = Claims {
            sub: None,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            jti: None,
        };
        let token = tokens.sign(&claims).unwrap();

        assert_eq!(tokens.verify(&token).unwrap().sub, None);
    }

    #[test]
    fn tokens_issued_in_same_second_differ() {
        let (tokens, _) = service();
        let subject = UserId::new();
        let a = tokens.issue(&subject, Duration::hours(1)).unwrap();
        let b = tokens.issue(&subject, Duration::hours(1)).unwrap();
        assert_ne!(a.value, b.value);
    }

    proptest! {
        #[test]
        fn round_trip_preserves_subject(raw in any::<u128>(), ttl_secs in 1i64..=400_000) {
            let (tokens, _) = service();
            let subject = UserId::from_uuid(Uuid::from_u128(raw));

            let token = tokens.issue(&subject, Duration::seconds(ttl_secs)).unwrap();
            let claims = tokens.verify(&token.value).unwrap();
            prop_assert_eq!(claims.sub, Some(subject.to_string()));
        }

        #[test]
        fn any_flipped_signature_bit_is_rejected(bit in 0usize..256) {
            let (tokens, _) = service();
            let token = tokens.issue(&UserId::new(), Duration::hours(1)).unwrap();

            let tampered = flip_signature_bit(&token.value, bit);
            prop_assert_eq!(tokens.verify(&tampered), Err(TokenError::BadSignature));
        }
    }
}
