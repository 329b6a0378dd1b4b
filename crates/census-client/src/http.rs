//! HTTP transport for the census backend.
//!
//! A thin wrapper around `reqwest` that owns the three transport-wide
//! concerns: the base URL, the bearer token attached after login, and the
//! facility-parameter injection for scoped GET requests.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

use census_core::scope::{should_inject_facility, FACILITY_PARAM};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::preferences::FacilityContext;

/// The census backend API client.
///
/// Cheap to share behind an `Arc`; the interior mutability covers the two
/// pieces of session state (token, scoping context), each written from a
/// single place.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    token: Mutex<Option<String>>,
    scope: Mutex<Option<Arc<FacilityContext>>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
            scope: Mutex::new(None),
        }
    }

    /// Attach the facility scoping context.
    ///
    /// Until this is called, requests proceed unscoped; injection is skipped
    /// silently rather than failing the request.
    pub fn attach_scope(&self, scope: Arc<FacilityContext>) {
        *self.scope.lock().expect("scope lock poisoned") = Some(scope);
    }

    /// Set or clear the bearer token carried on subsequent requests.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock().expect("token lock poisoned") = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.lock().expect("token lock poisoned").is_some()
    }

    fn token(&self) -> Option<String> {
        self.token.lock().expect("token lock poisoned").clone()
    }

    fn selection(&self) -> Option<i64> {
        let scope = self.scope.lock().expect("scope lock poisoned");
        match scope.as_ref() {
            Some(ctx) => ctx.selected(),
            None => {
                tracing::debug!("scoping context not attached; request proceeds unscoped");
                None
            }
        }
    }

    /// GET a JSON document, with facility injection per the scoping policy.
    pub async fn get_json(&self, path: &str, params: &[(&str, String)]) -> ClientResult<Value> {
        let query = scoped_query(path, params, self.selection());
        let mut request = self
            .http
            .get(format!("{}{}", self.config.base_url(), path))
            .query(&query);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// POST a JSON body and return the JSON response.
    ///
    /// Non-GET requests are never facility-shaped.
    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<Value> {
        let mut request = self
            .http
            .post(format!("{}{}", self.config.base_url(), path))
            .json(body);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Assemble the final query pairs for a GET request.
///
/// The facility parameter is appended only when the endpoint is scoped, a
/// selection is active, and the caller did not already pass one. An
/// explicit parameter always wins, and shaping the same request twice yields
/// the same result.
fn scoped_query(
    path: &str,
    params: &[(&str, String)],
    selection: Option<i64>,
) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    if let Some(facility_id) = selection {
        if should_inject_facility("GET", path) && !query.iter().any(|(k, _)| k == FACILITY_PARAM) {
            query.push((FACILITY_PARAM.to_string(), facility_id.to_string()));
        }
    }

    query
}
