//! Database credentials from the Lambda secrets extension.
//!
//! The extension serves Secrets Manager values on
//! `http://localhost:{port}/secretsmanager/get` and answers 400 until it
//! is ready, so 400 is retried with a one second pause.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{DatabaseTarget, HttpSettings, SecretsSettings};
use crate::error::{AppError, AppResult};

const SECRETS_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";
const NOT_READY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecretValueResponse {
    secret_string: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

/// Connection fields of a database secret.
#[derive(Deserialize)]
pub struct DatabaseSecret {
    username: String,
    password: SecretString,
    host: String,
    port: PortValue,
    #[serde(alias = "database")]
    dbname: String,
}

impl DatabaseSecret {
    /// PostgreSQL connection URL with the password percent-encoded.
    pub fn connection_url(&self) -> SecretString {
        let port = match &self.port {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s.clone(),
        };
        SecretString::from(format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.username),
            urlencoding::encode(self.password.expose_secret()),
            self.host,
            port,
            self.dbname
        ))
    }
}

/// Client for the secrets extension.
pub struct SecretsClient {
    client: reqwest::Client,
    port: u16,
    session_token: Option<String>,
    max_retry: u32,
}

impl SecretsClient {
    pub fn new(secrets: &SecretsSettings, http: &HttpSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout)
            .read_timeout(http.read_timeout)
            .build()
            .map_err(|e| AppError::ExternalApi(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            port: secrets.port,
            session_token: secrets.session_token.clone(),
            max_retry: http.max_retry,
        })
    }

    /// Fetch and decode a database secret.
    pub async fn database_secret(&self, secret_id: &str) -> AppResult<DatabaseSecret> {
        let url = format!("http://localhost:{}/secretsmanager/get", self.port);
        let mut retries_left = self.max_retry;

        loop {
            let mut request = self.client.get(&url).query(&[("secretId", secret_id)]);
            if let Some(ref token) = self.session_token {
                request = request.header(SECRETS_TOKEN_HEADER, token);
            }

            let response = request.send().await.map_err(|e| {
                AppError::ExternalApi(format!("Failed to reach secrets extension: {}", e))
            })?;

            match response.status() {
                StatusCode::OK => {
                    let body: SecretValueResponse = response.json().await.map_err(|e| {
                        AppError::ExternalApi(format!("Invalid secrets extension response: {}", e))
                    })?;
                    info!("Resolved database secret {}", secret_id);
                    return parse_database_secret(&body.secret_string);
                }
                StatusCode::BAD_REQUEST if retries_left > 0 => {
                    retries_left -= 1;
                    warn!("Secrets extension not ready, retrying ({} left)", retries_left);
                    tokio::time::sleep(NOT_READY_PAUSE).await;
                }
                status => {
                    return Err(AppError::ExternalApi(format!(
                        "Secrets extension returned {} for {}",
                        status, secret_id
                    )));
                }
            }
        }
    }

    /// Connection URL for a configured database target.
    pub async fn resolve(&self, target: &DatabaseTarget) -> AppResult<SecretString> {
        match target {
            DatabaseTarget::Url(url) => Ok(SecretString::from(url.clone())),
            DatabaseTarget::Secret(id) => Ok(self.database_secret(id).await?.connection_url()),
        }
    }
}

fn parse_database_secret(secret_string: &str) -> AppResult<DatabaseSecret> {
    serde_json::from_str(secret_string)
        .map_err(|e| AppError::ExternalApi(format!("Invalid database secret: {}", e)))
}
