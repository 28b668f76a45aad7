//! HS256 JSON Web Tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Result, TokenError};
use crate::maker::{check_key_len, TokenMaker};
use crate::payload::TokenPayload;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// JWT maker signing with HMAC-SHA256.
///
/// Only `HS256` is accepted on verification; a token declaring any other
/// algorithm, including `none`, is rejected before its MAC is checked.
pub struct JwtMaker {
    secret: Vec<u8>,
}

impl JwtMaker {
    pub fn new(symmetric_key: &str) -> Result<Self> {
        check_key_len(symmetric_key)?;
        Ok(Self {
            secret: symmetric_key.as_bytes().to_vec(),
        })
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::InvalidKey(e.to_string()))
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(&self, username: &str, duration: Duration) -> Result<(String, TokenPayload)> {
        let payload = TokenPayload::new(username, duration)?;

        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let header = serde_json::to_vec(&header).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let claims = serde_json::to_vec(&payload).map_err(|e| TokenError::Encoding(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok((format!("{signing_input}.{signature}"), payload))
    }

    fn verify_token(&self, token: &str) -> Result<TokenPayload> {
        let mut parts = token.split('.');
        let (header, claims, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => return Err(TokenError::InvalidSignature),
        };

        let header_json = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::InvalidSignature)?;
        let parsed: Header =
            serde_json::from_slice(&header_json).map_err(|_| TokenError::InvalidSignature)?;
        if parsed.alg != ALGORITHM {
            return Err(TokenError::InvalidSignature);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        let payload: TokenPayload = serde_json::from_slice(&claims_json)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;

        payload.validate(Utc::now())?;
        Ok(payload)
    }
}
