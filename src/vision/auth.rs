//! Credential resolution for the OCR service
//!
//! Resolution order:
//! 1. Explicit Vision API key (`?key=` query parameter)
//! 2. Credentials file (`service_account` or `authorized_user` JSON)
//! 3. Ambient credentials from the GCE metadata server

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::OcrError;
use crate::config::OcrSettings;

const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh tokens this long before they actually expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Key material from a `service_account` credentials file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Refresh-token credentials from an `authorized_user` file
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// How requests to the OCR service are authorized
#[derive(Debug, Clone)]
pub enum AuthMethod {
    ApiKey(String),
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    Metadata,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Produces authorized requests, caching OAuth tokens until shortly before expiry
#[derive(Debug)]
pub struct TokenProvider {
    method: AuthMethod,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(method: AuthMethod) -> Self {
        Self {
            method,
            cached: Mutex::new(None),
        }
    }

    /// Pick the credential source from OCR settings
    pub fn from_settings(settings: &OcrSettings) -> Result<Self, OcrError> {
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(Self::new(AuthMethod::ApiKey(key.trim().to_string())));
        }

        if let Some(path) = &settings.credentials_path {
            return Ok(Self::new(load_credentials_file(path)?));
        }

        Ok(Self::new(AuthMethod::Metadata))
    }

    /// Short description of the credential source for logs
    pub fn describe(&self) -> &'static str {
        match self.method {
            AuthMethod::ApiKey(_) => "API key",
            AuthMethod::ServiceAccount(_) => "service account",
            AuthMethod::AuthorizedUser(_) => "authorized user",
            AuthMethod::Metadata => "ambient (metadata server)",
        }
    }

    /// Attach credentials to a request
    pub async fn authorize(
        &self,
        http: &reqwest::Client,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, OcrError> {
        match &self.method {
            AuthMethod::ApiKey(key) => Ok(request.query(&[("key", key)])),
            _ => {
                let token = self.access_token(http).await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    async fn access_token(&self, http: &reqwest::Client) -> Result<String, OcrError> {
        if let Some(cached) = self.cached.lock().as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        let response = match &self.method {
            AuthMethod::ApiKey(key) => return Ok(key.clone()),
            AuthMethod::ServiceAccount(key) => fetch_service_account_token(http, key).await?,
            AuthMethod::AuthorizedUser(user) => fetch_refresh_token(http, user).await?,
            AuthMethod::Metadata => fetch_metadata_token(http).await?,
        };

        debug!("Obtained OCR access token valid for {}s", response.expires_in);
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
        *self.cached.lock() = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }
}

/// Read a Google credentials JSON file and classify it by its `type` field
pub fn load_credentials_file(path: &Path) -> Result<AuthMethod, OcrError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OcrError::Auth(format!("cannot read credentials file {}: {e}", path.display()))
    })?;
    parse_credentials(&content)
}

/// Parse credentials JSON content
pub fn parse_credentials(content: &str) -> Result<AuthMethod, OcrError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| OcrError::Auth(format!("credentials file is not valid JSON: {e}")))?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        "service_account" => {
            let key: ServiceAccountKey = serde_json::from_value(value)
                .map_err(|e| OcrError::Auth(format!("invalid service account file: {e}")))?;
            info!("Loaded service account credentials for {}", key.client_email);
            Ok(AuthMethod::ServiceAccount(key))
        }
        "authorized_user" => {
            let user: AuthorizedUser = serde_json::from_value(value)
                .map_err(|e| OcrError::Auth(format!("invalid authorized user file: {e}")))?;
            Ok(AuthMethod::AuthorizedUser(user))
        }
        other => Err(OcrError::Auth(format!(
            "unsupported credentials type {other:?} (expected service_account or authorized_user)"
        ))),
    }
}

/// Build the signed JWT assertion for a service account
fn service_account_assertion(key: &ServiceAccountKey, now: u64) -> Result<String, OcrError> {
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: VISION_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + 3600,
    };

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| OcrError::Auth(format!("invalid service account private key: {e}")))?;

    encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|e| OcrError::Auth(format!("failed to sign token request: {e}")))
}

async fn fetch_service_account_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
) -> Result<TokenResponse, OcrError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let assertion = service_account_assertion(key, now)?;

    let request = http.post(&key.token_uri).form(&[
        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
        ("assertion", assertion.as_str()),
    ]);
    read_token_response(request).await
}

async fn fetch_refresh_token(
    http: &reqwest::Client,
    user: &AuthorizedUser,
) -> Result<TokenResponse, OcrError> {
    let request = http.post(DEFAULT_TOKEN_URI).form(&[
        ("grant_type", "refresh_token"),
        ("client_id", user.client_id.as_str()),
        ("client_secret", user.client_secret.as_str()),
        ("refresh_token", user.refresh_token.as_str()),
    ]);
    read_token_response(request).await
}

async fn fetch_metadata_token(http: &reqwest::Client) -> Result<TokenResponse, OcrError> {
    let request = http
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google");
    read_token_response(request).await.map_err(|e| {
        OcrError::Auth(format!(
            "no OCR credentials configured and ambient credentials are unavailable ({e})"
        ))
    })
}

async fn read_token_response(request: reqwest::RequestBuilder) -> Result<TokenResponse, OcrError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(OcrError::Auth(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body.trim()
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| OcrError::Auth(format!("unexpected token response: {e}")))
}
