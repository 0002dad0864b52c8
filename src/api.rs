use std::future::Future;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::types::device::{DeviceCollection, DeviceListResponse};

pub const API_URL: &str = "https://api.oilfox.io/customer-api/v1/";
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Additional attempts after the first failed request.
const RETRY_COUNT: u32 = 3;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("API error: {0}")]
    Api(String),
}

/// Seam between the coordinator and the HTTP client.
pub trait DeviceSource {
    fn fetch_devices(&self) -> impl Future<Output = Result<DeviceCollection, ApiError>>;
}

/// Client for the OilFox customer API (https://github.com/foxinsights/customer-api).
pub struct OilfoxApi {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
}

/// Outcome of a single request attempt, before the retry policy is applied.
enum AttemptError {
    /// 401/403; never retried.
    Auth,
    /// Timeout, transport failure or non-2xx status; retried unless the
    /// response carried a 429.
    Retryable {
        status: Option<StatusCode>,
        message: String,
    },
    /// Anything unclassified; wrapped as a generic API error, not retried.
    Unexpected(String),
}

impl OilfoxApi {
    pub fn new(base_url: &str, email: &str, password: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    /// Request an access token. The login path intentionally narrows every
    /// failure mode to an authentication error; a missing `access_token` in
    /// an otherwise successful response is `None`, not an error.
    pub async fn login(&self) -> Result<Option<String>, ApiError> {
        let body = json!({ "email": self.email, "password": self.password });

        match self.request(Method::POST, "login", Some(body), None).await {
            Ok(value) => Ok(token_from_response(&value)),
            Err(e) => {
                error!("Error getting token: {e}");
                Err(ApiError::Authentication(e.to_string()))
            }
        }
    }

    /// Check whether the configured credentials can obtain a token.
    pub async fn test_login(&self) -> Result<bool, ApiError> {
        Ok(self.login().await?.is_some())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempts_left = RETRY_COUNT;

        loop {
            debug!(%url, attempts_left, "API request");

            match self.attempt(&method, &url, body.as_ref(), token).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Auth) => {
                    return Err(ApiError::Authentication("Invalid credentials".to_string()));
                }
                Err(AttemptError::Retryable { status, message }) => {
                    if should_retry(attempts_left, status) {
                        attempts_left -= 1;
                        continue;
                    }
                    return Err(ApiError::Connection(message));
                }
                Err(AttemptError::Unexpected(message)) => {
                    return Err(ApiError::Api(message));
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, AttemptError> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = token {
            request = request
                .bearer_auth(token)
                .header(reqwest::header::ACCEPT, "application/json; charset=UTF-8");
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return Err(AttemptError::Retryable {
                    status: e.status(),
                    message: format!("Error fetching information: {e}"),
                });
            }
            Err(e) => return Err(AttemptError::Unexpected(e.to_string())),
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AttemptError::Auth);
        }
        if !status.is_success() {
            return Err(AttemptError::Retryable {
                status: Some(status),
                message: format!("HTTP status {status} from {url}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AttemptError::Unexpected(format!("Invalid response body: {e}")))
    }
}

impl DeviceSource for OilfoxApi {
    /// Fetch the device list. No token from a successful login means "no
    /// credentials available yet" and yields an empty collection without
    /// hitting the device endpoint.
    async fn fetch_devices(&self) -> Result<DeviceCollection, ApiError> {
        let Some(token) = self.login().await? else {
            return Ok(DeviceCollection::new());
        };

        let value = self
            .request(Method::GET, "device", None, Some(&token))
            .await?;

        let response: DeviceListResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::Api(format!("Unexpected device payload: {e}")))?;

        Ok(response.into_collection())
    }
}

fn token_from_response(value: &Value) -> Option<String> {
    value
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Retry unless attempts are exhausted or the attempt that just failed was
/// answered with 429 (rate-limited requests are never retried).
fn should_retry(attempts_left: u32, status: Option<StatusCode>) -> bool {
    attempts_left > 0 && status != Some(StatusCode::TOO_MANY_REQUESTS)
}
