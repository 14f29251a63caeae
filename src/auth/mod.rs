pub mod clock;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};

/// Claims carried by the credential token issued at login.
///
/// Built from whatever the payload holds: backends differ in the name and
/// JSON type of the subject claim, and in whether `exp` is an integer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    pub user_id: String,
    pub name: String,
    /// Expiry, seconds since epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,
}

/// Subject of an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

/// Subject claims in order of preference
const ID_CLAIMS: [&str; 3] = ["userId", "id", "sub"];

fn claim_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn claim_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Claims {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let user_id = ID_CLAIMS
            .iter()
            .find_map(|key| payload.get(*key).and_then(claim_text))
            .unwrap_or_default();
        let name = payload.get("name").and_then(claim_text).unwrap_or_default();
        let exp = payload.get("exp").and_then(claim_number);
        Self { user_id, name, exp }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user_id.clone(),
            name: self.name.clone(),
        }
    }

    /// A token is expired once its `exp` lies strictly in the past.
    /// Tokens without `exp` never expire on the client.
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.exp, Some(exp) if exp < now as f64)
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
}

pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<Claims, TokenError>;
}

/// Reads JWT claims without checking the signature.
///
/// Signature and audience validation are the server's job; the client only
/// needs the subject and the expiry to decide what to render.
#[derive(Debug, Clone, Default)]
pub struct JwtDecoder;

impl JwtDecoder {
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation
    }
}

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &Self::validation())?;
        Ok(Claims::from_payload(&data.claims))
    }
}
