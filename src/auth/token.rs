//! Session-bound bearer tokens.
//!
//! Tokens are HS256 JWTs signed with `global_secret ":" session_secret`.
//! Rotating a user's session secret makes every token issued before the
//! rotation unverifiable, so there is no blocklist to maintain.
//!
//! Verification is split in two: [`extract_claimed_subject`] reads the
//! claimed user id without checking the signature, the caller fetches that
//! user's current session secret, then [`verify`] performs the full check.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// `iss` claim of every token.
pub const ISSUER: &str = "vpn-api";
/// `aud` claim of every token.
pub const AUDIENCE: &str = "vpn-client";
/// Token lifetime.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user's database id.
    pub user_id: i64,
    pub iss: String,
    pub aud: String,
    /// The user id again, as a decimal string.
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret is empty")]
    EmptySecret,

    #[error("token does not name a user")]
    MissingSubject,

    #[error("token subject does not match its user id")]
    SubjectMismatch,

    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Claims read before the signature is checked.
#[derive(Deserialize)]
struct ClaimedSubject {
    #[serde(default)]
    user_id: i64,
}

fn signing_key(global_secret: &str, session_secret: &str) -> Zeroizing<String> {
    Zeroizing::new(format!("{}:{}", global_secret, session_secret))
}

/// Issues a token for `user_id`.
///
/// # Arguments
///
/// * `user_id` - The user the token authenticates.
/// * `session_secret` - The user's current session secret.
/// * `global_secret` - The process-wide signing secret.
pub fn issue(user_id: i64, session_secret: &str, global_secret: &str) -> Result<String, TokenError> {
    if global_secret.is_empty() {
        return Err(TokenError::EmptySecret);
    }

    let now = Utc::now();
    let iat = now.timestamp();
    let claims = Claims {
        user_id,
        iss: ISSUER.to_string(),
        aud: AUDIENCE.to_string(),
        sub: user_id.to_string(),
        iat,
        nbf: iat,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };

    let key = signing_key(global_secret, session_secret);
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )?)
}

/// Reads the claimed user id without verifying anything else.
///
/// The result is only a lookup hint and must never be trusted on its own.
pub fn extract_claimed_subject(token: &str) -> Result<i64, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ClaimedSubject>(token, &DecodingKey::from_secret(&[]), &validation)?;
    match data.claims.user_id {
        0 => Err(TokenError::MissingSubject),
        id => Ok(id),
    }
}

/// Fully verifies `token` against the reconstructed signing key.
///
/// # Arguments
///
/// * `token` - The raw bearer token.
/// * `session_secret` - The current session secret of `claimed_user_id`.
/// * `global_secret` - The process-wide signing secret.
/// * `claimed_user_id` - The id returned by [`extract_claimed_subject`].
pub fn verify(
    token: &str,
    session_secret: &str,
    global_secret: &str,
    claimed_user_id: i64,
) -> Result<Claims, TokenError> {
    if global_secret.is_empty() {
        return Err(TokenError::EmptySecret);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256];
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let key = signing_key(global_secret, session_secret);
    let claims = decode::<Claims>(token, &DecodingKey::from_secret(key.as_bytes()), &validation)?
        .claims;

    if claims.sub != claims.user_id.to_string() || claims.user_id != claimed_user_id {
        return Err(TokenError::SubjectMismatch);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL: &str = "global-secret";
    const SESSION: &str = "aa11";

    fn sign<T: Serialize>(claims: &T, alg: Algorithm, key: &str) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(key.as_bytes())).unwrap()
    }

    fn claims_for(user_id: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            user_id,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            sub: user_id.to_string(),
            iat: now,
            nbf: now,
            exp: now + 3600,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let token = issue(42, SESSION, GLOBAL).unwrap();

        let claimed = extract_claimed_subject(&token).unwrap();
        assert_eq!(claimed, 42);

        let claims = verify(&token, SESSION, GLOBAL, claimed).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn rotated_session_secret_revokes_token() {
        let token = issue(42, SESSION, GLOBAL).unwrap();
        assert!(verify(&token, "bb22", GLOBAL, 42).is_err());
    }

    #[test]
    fn wrong_global_secret_is_rejected() {
        let token = issue(42, SESSION, GLOBAL).unwrap();
        assert!(verify(&token, SESSION, "other", 42).is_err());
    }

    #[test]
    fn empty_global_secret_is_refused() {
        assert!(matches!(issue(1, SESSION, ""), Err(TokenError::EmptySecret)));
        let token = issue(1, SESSION, GLOBAL).unwrap();
        assert!(matches!(verify(&token, SESSION, "", 1), Err(TokenError::EmptySecret)));
    }

    #[test]
    fn other_hmac_algorithms_are_rejected() {
        let key = format!("{}:{}", GLOBAL, SESSION);
        let token = sign(&claims_for(7), Algorithm::HS384, &key);
        assert!(verify(&token, SESSION, GLOBAL, 7).is_err());
    }

    #[test]
    fn unsigned_tokens_are_rejected() {
        // {"alg":"none","typ":"JWT"}.{"user_id":7,"sub":"7"}.
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJ1c2VyX2lkIjo3LCJzdWIiOiI3In0.";
        assert!(verify(token, SESSION, GLOBAL, 7).is_err());
    }

    #[test]
    fn tokens_without_not_before_are_rejected() {
        #[derive(Serialize)]
        struct NoNbf {
            user_id: i64,
            iss: &'static str,
            aud: &'static str,
            sub: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = NoNbf {
            user_id: 7,
            iss: ISSUER,
            aud: AUDIENCE,
            sub: "7".to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = sign(&claims, Algorithm::HS256, &format!("{}:{}", GLOBAL, SESSION));
        assert!(verify(&token, SESSION, GLOBAL, 7).is_err());
    }

    #[test]
    fn subject_must_match_user_id() {
        let mut claims = claims_for(7);
        claims.sub = "8".to_string();
        let token = sign(&claims, Algorithm::HS256, &format!("{}:{}", GLOBAL, SESSION));

        assert!(matches!(
            verify(&token, SESSION, GLOBAL, 7),
            Err(TokenError::SubjectMismatch)
        ));
    }

    #[test]
    fn claimed_subject_must_match_verified_user() {
        let token = issue(7, SESSION, GLOBAL).unwrap();
        assert!(matches!(
            verify(&token, SESSION, GLOBAL, 8),
            Err(TokenError::SubjectMismatch)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut claims = claims_for(7);
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = Utc::now().timestamp() - 1;
        let token = sign(&claims, Algorithm::HS256, &format!("{}:{}", GLOBAL, SESSION));
        assert!(verify(&token, SESSION, GLOBAL, 7).is_err());
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let key = format!("{}:{}", GLOBAL, SESSION);

        let mut claims = claims_for(7);
        claims.iss = "someone-else".to_string();
        assert!(verify(&sign(&claims, Algorithm::HS256, &key), SESSION, GLOBAL, 7).is_err());

        let mut claims = claims_for(7);
        claims.aud = "someone-else".to_string();
        assert!(verify(&sign(&claims, Algorithm::HS256, &key), SESSION, GLOBAL, 7).is_err());
    }

    #[test]
    fn subject_extraction_needs_a_user_id() {
        #[derive(Serialize)]
        struct Anonymous {
            sub: &'static str,
        }

        let token = sign(&Anonymous { sub: "7" }, Algorithm::HS256, "k");
        assert!(matches!(extract_claimed_subject(&token), Err(TokenError::MissingSubject)));
        assert!(extract_claimed_subject("not-a-token").is_err());
    }
}
