//! Authentication.
//!
//! Login is the one operation that surfaces a typed error: without a token
//! nothing else works, so degradation would only hide the problem. Token
//! decoding and role mapping happen elsewhere; the client only stores the
//! bearer token and attaches it to every request.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::http::ApiClient;
use crate::preferences::FacilityContext;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub jwt_token: String,
}

/// Log in and retain the bearer token on the client.
pub async fn login(api: &ApiClient, email: &str, password: &str) -> ClientResult<LoginResponse> {
    let body = LoginRequest { email, password };
    let value = api
        .post_json("/login", &body)
        .await
        .map_err(|err| ClientError::LoginRejected(err.to_string()))?;

    let response: LoginResponse = serde_json::from_value(value)
        .map_err(|err| ClientError::LoginRejected(format!("unexpected response shape: {err}")))?;

    api.set_token(Some(response.jwt_token.clone()));
    Ok(response)
}

/// Log out: drop the token and clear the facility selection.
pub fn logout(api: &ApiClient, context: &FacilityContext) {
    api.set_token(None);
    context.clear();
}
