//! AES-256-GCM sealed tokens.
//!
//! `v1.local.<base64url(nonce || ciphertext)>`. The claims are encrypted
//! and authenticated; the prefix is bound as additional data so a token
//! cannot be replayed under another version or purpose.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{Result, TokenError};
use crate::maker::{check_key_len, TokenMaker};
use crate::payload::TokenPayload;

const HEADER: &str = "v1.local.";
const NONCE_LEN: usize = 12;
const KEY_SALT: &[u8] = b"bankcore-token";

/// Derive the cipher key from the configured symmetric key.
fn derive_key(symmetric_key: &[u8]) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(Some(KEY_SALT), symmetric_key);
    let mut key = [0u8; 32];
    hk.expand(HEADER.as_bytes(), &mut key)
        .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
    Ok(key)
}

/// Token maker producing encrypted, authenticated tokens.
pub struct SealedMaker {
    cipher: Aes256Gcm,
}

impl SealedMaker {
    pub fn new(symmetric_key: &str) -> Result<Self> {
        check_key_len(symmetric_key)?;
        let key = derive_key(symmetric_key.as_bytes())?;
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }
}

impl TokenMaker for SealedMaker {
    fn create_token(&self, username: &str, duration: Duration) -> Result<(String, TokenPayload)> {
        let payload = TokenPayload::new(username, duration)?;
        let claims = serde_json::to_vec(&payload).map_err(|e| TokenError::Encoding(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &claims,
                    aad: HEADER.as_bytes(),
                },
            )
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        let mut body = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        body.extend_from_slice(&nonce_bytes);
        body.extend_from_slice(&ciphertext);

        Ok((format!("{HEADER}{}", URL_SAFE_NO_PAD.encode(body)), payload))
    }

    fn verify_token(&self, token: &str) -> Result<TokenPayload> {
        let body = token
            .strip_prefix(HEADER)
            .ok_or(TokenError::InvalidSignature)?;
        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| TokenError::InvalidSignature)?;
        if body.len() <= NONCE_LEN {
            return Err(TokenError::InvalidSignature);
        }

        let (nonce, ciphertext) = body.split_at(NONCE_LEN);
        let claims = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: HEADER.as_bytes(),
                },
            )
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload: TokenPayload = serde_json::from_slice(&claims)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        payload.validate(Utc::now())?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_round_trip() {
        let maker = SealedMaker::new(KEY).unwrap();
        let (token, payload) = maker.create_token("alice", Duration::minutes(15)).unwrap();
        assert!(token.starts_with(HEADER));
        assert_eq!(maker.verify_token(&token).unwrap(), payload);
    }

    #[test]
    fn test_same_claims_differ_per_token() {
        let maker = SealedMaker::new(KEY).unwrap();
        let (a, _) = maker.create_token("alice", Duration::minutes(15)).unwrap();
        let (b, _) = maker.create_token("alice", Duration::minutes(15)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token() {
        let maker = SealedMaker::new(KEY).unwrap();
        let (token, _) = maker.create_token("alice", -Duration::minutes(1)).unwrap();
        assert_eq!(maker.verify_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_other_key_rejected() {
        let (token, _) = SealedMaker::new(KEY)
            .unwrap()
            .create_token("alice", Duration::minutes(15))
            .unwrap();
        let other = SealedMaker::new("fedcba9876543210fedcba9876543210").unwrap();
        assert_eq!(other.verify_token(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let maker = SealedMaker::new(KEY).unwrap();
        let (token, _) = maker.create_token("alice", Duration::minutes(15)).unwrap();
        let swapped = token.replacen("v1.local.", "v2.local.", 1);
        assert_eq!(maker.verify_token(&swapped), Err(TokenError::InvalidSignature));
    }
}
