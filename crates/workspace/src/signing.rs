use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const OUTBOUND_TOKEN_HEADER: &str = "X-OUTBOUND-TOKEN";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Body and header value that prove ownership of the webhook endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResponse {
    pub body: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct VerificationSigner {
    secret: SecretString,
}

impl VerificationSigner {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Lowercase hex HMAC-SHA256 of `payload` keyed by the webhook secret.
    pub fn sign(&self, payload: &[u8]) -> Result<String, SigningError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SigningError::InvalidKey)?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// The token is computed over exactly the body bytes that are sent back.
    pub fn verification_response(
        &self,
        challenge: &str,
    ) -> Result<VerificationResponse, SigningError> {
        let body = serde_json::json!({ "response": challenge }).to_string();
        let token = self.sign(body.as_bytes())?;
        Ok(VerificationResponse { body, token })
    }
}
