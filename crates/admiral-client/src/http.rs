//! HTTP client for the control plane REST API.

use std::fmt;

use reqwest::header::LOCATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::ClientError;

/// Header carrying the session token, both on requests and on login.
pub const AUTH_TOKEN_HEADER: &str = "x-xenon-auth-token";

/// Query parameters appended to a request.
pub type Query<'a> = &'a [(&'a str, &'a str)];

/// A successful response with its body read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, if any.
    pub location: Option<String>,
    /// Session token header, if any.
    pub auth_token: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for REST API endpoints.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client without credentials.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Builder method to attach a session token to every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Base URL of the control plane.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path on the control plane.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and read the whole response.
    ///
    /// Non-success statuses are turned into errors.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<RawResponse, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.inner.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let raw = read_response(response).await?;
        debug!(method = %method, url = %url, status = raw.status, "Received response");

        check_status(raw)
    }

    /// Get JSON from an endpoint.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.get_json_query(path, &[]).await
    }

    /// Get JSON from an endpoint with query parameters.
    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
    ) -> Result<T, ClientError> {
        self.send::<()>(Method::GET, path, query, None)
            .await?
            .json()
    }

    /// POST a JSON body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ClientError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    /// POST a JSON body with query parameters.
    pub async fn post_query<B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: Query<'_>,
        body: &B,
    ) -> Result<RawResponse, ClientError> {
        self.send(Method::POST, path, query, Some(body)).await
    }

    /// POST a JSON body and decode the JSON answer.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path, body).await?.json()
    }

    /// PUT a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ClientError> {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    /// PATCH a JSON body.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, ClientError> {
        self.send(Method::PATCH, path, &[], Some(body)).await
    }

    /// Log in with basic credentials and return the session token.
    pub async fn login(&self, user: &str, password: &str) -> Result<String, ClientError> {
        let url = self.url("/core/authn/basic");
        debug!(url = %url, user = %user, "Logging in");

        let response = self
            .inner
            .post(&url)
            .basic_auth(user, Some(password))
            .json(&json!({ "requestType": "LOGIN" }))
            .send()
            .await?;
        let raw = check_status(read_response(response).await?)?;

        raw.auth_token.ok_or(ClientError::Unauthorized)
    }

    /// Invalidate the current session token.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.post("/core/authn/basic", &json!({ "requestType": "LOGOUT" }))
            .await?;
        Ok(())
    }
}

async fn read_response(response: reqwest::Response) -> Result<RawResponse, ClientError> {
    let status = response.status().as_u16();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let location = header(LOCATION.as_str());
    let auth_token = header(AUTH_TOKEN_HEADER);
    let body = response.bytes().await?.to_vec();

    Ok(RawResponse {
        status,
        location,
        auth_token,
        body,
    })
}

fn check_status(raw: RawResponse) -> Result<RawResponse, ClientError> {
    let status = StatusCode::from_u16(raw.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_success() {
        return Ok(raw);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized);
    }
    Err(ClientError::Api {
        status: raw.status,
        message: error_message(status, &raw.body),
    })
}

/// Extract the `message` of an error body, falling back to the status text.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        })
}
