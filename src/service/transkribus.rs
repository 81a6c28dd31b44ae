//! Transkribus Processing API client.
//!
//! Wrapper of the Transkribus metagrapho API
//! (<https://transkribus.eu/processing/swagger/>). Authentication is an
//! OAuth2 password grant against the READ-COOP account realm; the access
//! token is captured once at login and sent as a bearer header on every
//! processing call.

use crate::config::{Credentials, EnrichConfig};
use crate::service::{RecognitionService, ServiceError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Processing API base URL.
const BASE_URL: &str = "https://transkribus.eu/processing/v1";

/// OAuth2 token endpoint of the READ-COOP account realm.
const TOKEN_URL: &str =
    "https://account.readcoop.eu/auth/realms/readcoop/protocol/openid-connect/token";

/// OAuth2 client id registered for the processing API.
const CLIENT_ID: &str = "processing-api-client";

/// Authenticated client for the Transkribus Processing API.
pub struct TranskribusProcessing {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl TranskribusProcessing {
    /// Authenticate using the config's credentials, falling back to
    /// `TRANSKRIBUS_USER` / `TRANSKRIBUS_PASSWORD` from the environment.
    pub async fn from_config(config: &EnrichConfig) -> Result<Self, ServiceError> {
        let credentials = config
            .credentials
            .clone()
            .or_else(Credentials::from_env)
            .ok_or_else(|| ServiceError::Auth {
                detail: "no credentials configured; \
                         set TRANSKRIBUS_USER and TRANSKRIBUS_PASSWORD"
                    .into(),
            })?;
        Self::login(&credentials, config.api_timeout_secs).await
    }

    /// Authenticate and build a client.
    pub async fn login(
        credentials: &Credentials,
        timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        Self::login_at(BASE_URL, TOKEN_URL, credentials, timeout_secs).await
    }

    /// Authenticate against explicit endpoints. Exists so tests can point
    /// the client at a local server.
    pub async fn login_at(
        base_url: &str,
        token_url: &str,
        credentials: &Credentials,
        timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Request {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        let response = http
            .post(token_url)
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.user.as_str()),
                ("password", credentials.password.as_str()),
                ("client_id", CLIENT_ID),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::Auth {
                detail: format!("token request failed: {e}"),
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| ServiceError::Auth {
            detail: format!("token response was not JSON: {e}"),
        })?;

        if !status.is_success() {
            return Err(ServiceError::Auth {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Auth {
                detail: "token response has no 'access_token'".into(),
            })?
            .to_string();

        info!("{} authorized successfully with {}", credentials.user, base_url);
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            access_token,
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ServiceError> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse {
                detail: format!("response was not JSON: {e}"),
            })?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                detail: body.to_string(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl RecognitionService for TranskribusProcessing {
    async fn submit(
        &self,
        line_model_id: u64,
        atr_model_id: u64,
        image_base64: &str,
    ) -> Result<String, ServiceError> {
        let body = json!({
            "config": {
                "lineDetection": {
                    "modelId": line_model_id,
                },
                "textRecognition": {
                    "htrId": atr_model_id,
                },
            },
            "image": {
                "base64": image_base64,
            },
        });

        let response = self
            .http
            .post(format!("{}/processes", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Request {
                detail: format!("submission failed: {e}"),
            })?;

        let body = Self::read_json(response).await?;

        // processId is documented as a number; tolerate a string.
        let process_id = match body.get("processId") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => {
                return Err(ServiceError::MalformedResponse {
                    detail: format!("submission response has no 'processId': {body}"),
                })
            }
        };
        debug!("Submitted image, process ID {process_id}");
        Ok(process_id)
    }

    async fn fetch_result(&self, process_id: &str) -> Result<Value, ServiceError> {
        let response = self
            .http
            .get(format!("{}/processes/{process_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ServiceError::Request {
                detail: format!("result fetch for process {process_id} failed: {e}"),
            })?;

        Self::read_json(response).await
    }
}
