//! Credential handling and OAuth2 refresh-grant token acquisition.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use simsync_common::{Error, Result, Secret};

/// OAuth2 token endpoint.
const TOKEN_URL: &str = "https://api.dropbox.com/oauth2/token";

/// Token lifetime assumed when the backend omits `expires_in`.
const DEFAULT_EXPIRY_SECS: i64 = 3600;

/// Long-lived credentials supplied once per process invocation.
///
/// All three values are treated as secrets: they are never persisted and the
/// Debug impl redacts them.
#[derive(Debug, Clone)]
pub struct Credentials {
    app_key: Secret,
    app_secret: Secret,
    refresh_token: Secret,
}

impl Credentials {
    /// Build credentials from process-boundary inputs.
    ///
    /// # Preconditions
    /// - All three strings must be non-empty
    ///
    /// # Errors
    /// - `Config` if any value is missing; reported before any network call
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Self {
            app_key: Secret::new(app_key),
            app_secret: Secret::new(app_secret),
            refresh_token: Secret::new(refresh_token),
        };

        if credentials.app_key.is_empty() {
            return Err(Error::Config("APP_KEY is not set".to_string()));
        }
        if credentials.app_secret.is_empty() {
            return Err(Error::Config("APP_SECRET is not set".to_string()));
        }
        if credentials.refresh_token.is_empty() {
            return Err(Error::Config("REFRESH_TOKEN is not set".to_string()));
        }

        Ok(credentials)
    }

    /// App key (OAuth2 client id).
    pub fn app_key(&self) -> &str {
        self.app_key.as_str()
    }

    /// App secret (OAuth2 client secret).
    pub fn app_secret(&self) -> &str {
        self.app_secret.as_str()
    }

    /// Long-lived refresh token.
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }
}

/// Short-lived access token with expiration tracking.
///
/// Held in process memory for the duration of one transfer-client session
/// and discarded with the process; never cached to disk.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: Secret,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Expose the bearer token value.
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }

    /// Check if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 5 minutes remaining
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges long-lived credentials for a short-lived access token.
pub struct CredentialProvider {
    http: reqwest::Client,
}

impl CredentialProvider {
    /// Create a new provider.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("simsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Authentication(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Obtain an access token via the OAuth2 refresh grant.
    ///
    /// # Postconditions
    /// - Returns a token usable for exactly one transfer-client session
    ///
    /// # Errors
    /// - `Authentication` on an invalid or expired refresh token, network
    ///   failure, or backend rejection. Always fatal; a bad refresh token
    ///   will not become valid by retrying.
    pub async fn obtain_access_token(&self, credentials: &Credentials) -> Result<AccessToken> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token()),
                ("client_id", credentials.app_key()),
                ("client_secret", credentials.app_secret()),
            ])
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!(
                "Token refresh rejected: {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("Malformed token response: {}", e)))?;

        tracing::debug!("access token obtained");

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRY_SECS);
        Ok(AccessToken {
            secret: Secret::new(token.access_token),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}
