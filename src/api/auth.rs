use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Exchange credentials for a token. Storing it is up to the caller.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<String, ApiError> {
    let body = client
        .send(
            client
                .request(Method::POST, "auth/login")?
                .json(&LoginRequest { email, password }),
        )
        .await?;

    let response: LoginResponse = match body {
        Value::Object(_) => serde_json::from_value(body)?,
        _ => return Err(ApiError::unexpected_format()),
    };
    tracing::info!("Logged in as {}", email);
    Ok(response.token)
}
