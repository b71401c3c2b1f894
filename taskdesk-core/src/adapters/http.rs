//! Task backend HTTP client
//!
//! Every request is built through [`HttpClient::request`], which attaches
//! `Authorization: Bearer <token>` whenever the token supplier yields one.
//! There is no retry, no timeout and no response rewriting: non-2xx
//! responses are classified into [`Error`] and handed back to the caller.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::TokenSupplier;

/// Backend API root used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Shared HTTP client for the task backend
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: TokenSupplier,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client for the API rooted at `base_url`
    ///
    /// `token` is consulted before every request; the client never reads
    /// token storage on its own.
    pub fn new(base_url: &str, token: TokenSupplier) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid API URL '{}': {}", base_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/tasks/5`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with the current bearer token attached (if any)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "dispatching request");
        let builder = self.client.request(method, self.url(path));
        match (self.token)() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Start a request authenticated with an explicit token instead of the
    /// supplier's
    pub fn request_with_token(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        debug!(%method, path, "dispatching request with explicit token");
        self.client.request(method, self.url(path)).bearer_auth(token)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send_json(self.request(Method::GET, path).query(query)).await
    }

    /// GET with an explicit bearer token
    pub async fn get_json_as<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        self.send_json(self.request_with_token(Method::GET, path, token)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::PUT, path).json(body)).await
    }

    /// POST an `application/x-www-form-urlencoded` body
    pub async fn post_form<F, T>(&self, path: &str, form: &F) -> Result<T>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).form(form)).await
    }

    /// DELETE, ignoring any response body
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.dispatch(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// Send a prepared request and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.dispatch(builder).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(e))?;

        serde_json::from_slice(&body)
            .map_err(|e| Error::Decode(format!("Failed to parse response body: {}", e)))
    }

    /// Send a request, turning transport failures and non-2xx statuses
    /// into errors
    async fn dispatch(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "request rejected by server");
        Err(Error::from_status(status.as_u16(), extract_detail(&body)))
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Transport("Request timed out".to_string())
        } else if error.is_connect() {
            Error::Transport(format!("Unable to connect to {}", self.base_url))
        } else {
            Error::Transport(format!("Request failed: {}", error))
        }
    }
}

/// Pull the `detail` message out of an error body
///
/// The backend sends either `{"detail": "message"}` or, for validation
/// failures, `{"detail": [{"msg": "...", ...}, ...]}`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;

    match value.get("detail")? {
        JsonValue::String(message) => Some(message.clone()),
        JsonValue::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
