//! Startup credential loading from Google Secret Manager.
//!
//! The fetched key is returned as a [`Credential`] value and handed to the
//! clients that need it. It is never written into the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::core::http::http_client;

pub const GCP_PROJECT_ID: &str = "ziz-llm";
pub const SECRET_ID: &str = "zizek-google-api-key";
pub const SECRET_VERSION: &str = "latest";

/// Read-only fallback for local runs without a metadata server.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_METADATA_BASE: &str = "http://metadata.google.internal";
const DEFAULT_SECRET_MANAGER_BASE: &str = "https://secretmanager.googleapis.com";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
}

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{context} returned {status}: {body}")]
    Status {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("invalid secret payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretName {
    pub project: String,
    pub secret: String,
    pub version: String,
}

impl SecretName {
    /// The compiled-in location of the Google API key.
    pub fn api_key() -> Self {
        Self {
            project: GCP_PROJECT_ID.to_string(),
            secret: SECRET_ID.to_string(),
            version: SECRET_VERSION.to_string(),
        }
    }

    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/secrets/{}/versions/{}",
            self.project, self.secret, self.version
        )
    }
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn access_secret(&self, name: &SecretName) -> Result<Credential, SecretError>;
}

/// Secret Manager client authenticated through the instance metadata server.
pub struct GcpSecretManager {
    client: Client,
    metadata_base: String,
    api_base: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayload>,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: Option<String>,
}

impl GcpSecretManager {
    pub fn new(timeout: Duration) -> Self {
        let client = http_client("Secret Manager", timeout);
        Self::with_endpoints(client, DEFAULT_METADATA_BASE, DEFAULT_SECRET_MANAGER_BASE)
    }

    pub fn with_endpoints(client: Client, metadata_base: &str, api_base: &str) -> Self {
        Self {
            client,
            metadata_base: metadata_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn access_token(&self) -> Result<String, SecretError> {
        let url = format!("{}{}", self.metadata_base, TOKEN_PATH);
        let res = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SecretError::Status {
                context: "metadata server",
                status,
                body,
            });
        }

        let token: MetadataToken = res.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretSource for GcpSecretManager {
    async fn access_secret(&self, name: &SecretName) -> Result<Credential, SecretError> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/{}:access", self.api_base, name.resource_name());

        let res = self.client.get(&url).bearer_auth(token).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SecretError::Status {
                context: "secret manager",
                status,
                body,
            });
        }

        let response: AccessSecretVersionResponse = res.json().await?;
        let data = response
            .payload
            .and_then(|payload| payload.data)
            .ok_or_else(|| SecretError::Payload("missing payload.data".to_string()))?;
        decode_payload(&data)
    }
}

fn decode_payload(data: &str) -> Result<Credential, SecretError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| SecretError::Payload(e.to_string()))?;
    let value = String::from_utf8(bytes).map_err(|e| SecretError::Payload(e.to_string()))?;
    let value = value.trim_end();
    if value.is_empty() {
        return Err(SecretError::Payload("secret is empty".to_string()));
    }
    Ok(Credential::new(value))
}

/// Fetches the API key once. Failures are logged, never fatal.
pub async fn load_api_key(source: &dyn SecretSource) -> Option<Credential> {
    let name = SecretName::api_key();
    let fetched = source.access_secret(&name).await;
    resolve_credential(&name, fetched, env::var(API_KEY_ENV).ok())
}

fn resolve_credential(
    name: &SecretName,
    fetched: Result<Credential, SecretError>,
    env_value: Option<String>,
) -> Option<Credential> {
    match fetched {
        Ok(credential) => {
            tracing::info!("{} loaded from Secret Manager: {}", API_KEY_ENV, name.secret);
            Some(credential)
        }
        Err(err) => {
            tracing::error!(
                "Failed to load {} ({}) from Secret Manager: {}",
                API_KEY_ENV,
                name.secret,
                err
            );
            let fallback = env_value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())?;
            tracing::warn!("Using {} from the process environment", API_KEY_ENV);
            Some(Credential::new(fallback))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET_PATH: &str =
        "/v1/projects/ziz-llm/secrets/zizek-google-api-key/versions/latest:access";

    async fn mount_token(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;
    }

    fn manager(server: &MockServer) -> GcpSecretManager {
        GcpSecretManager::with_endpoints(Client::new(), &server.uri(), &server.uri())
    }

    #[test]
    fn resource_name_uses_compiled_identifiers() {
        assert_eq!(
            SecretName::api_key().resource_name(),
            "projects/ziz-llm/secrets/zizek-google-api-key/versions/latest"
        );
    }

    #[test]
    fn debug_output_redacts_value() {
        let credential = Credential::new("super-secret");
        assert_eq!(format!("{:?}", credential), "Credential(****)");
    }

    #[tokio::test]
    async fn access_secret_decodes_payload() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/1/secrets/zizek-google-api-key/versions/3",
                "payload": { "data": STANDARD.encode("AIza-test-key\n") }
            })))
            .mount(&server)
            .await;

        let credential = manager(&server)
            .access_secret(&SecretName::api_key())
            .await
            .expect("secret should load");

        assert_eq!(credential.value(), "AIza-test-key");
    }

    #[tokio::test]
    async fn permission_denied_is_reported_with_status() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path(SECRET_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = manager(&server)
            .access_secret(&SecretName::api_key())
            .await
            .unwrap_err();

        match err {
            SecretError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert!(body.contains("PERMISSION_DENIED"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_base64_is_a_payload_error() {
        assert!(matches!(
            decode_payload("***not base64***"),
            Err(SecretError::Payload(_))
        ));
    }

    #[test]
    fn failed_fetch_falls_back_to_environment_value() {
        let name = SecretName::api_key();
        let fetched = Err(SecretError::Payload("boom".to_string()));

        let credential = resolve_credential(&name, fetched, Some("env-key".to_string()));

        assert_eq!(credential, Some(Credential::new("env-key")));
    }

    #[test]
    fn failed_fetch_without_fallback_yields_none() {
        let name = SecretName::api_key();

        let missing = resolve_credential(
            &name,
            Err(SecretError::Payload("boom".to_string())),
            None,
        );
        let blank = resolve_credential(
            &name,
            Err(SecretError::Payload("boom".to_string())),
            Some("   ".to_string()),
        );

        assert!(missing.is_none());
        assert!(blank.is_none());
    }
}
