//! App state: proxy config and the Pinata client.

use supplydna_core::constants::{DEFAULT_PINATA_API_URL, DEFAULT_PROXY_PORT};
use supplydna_core::error::Result;
use supplydna_ipfs::{PinataClient, PinataConfig};

const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Upload proxy configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Pinata API key
    pub pinata_api_key: Option<String>,
    /// Pinata secret API key
    pub pinata_secret_key: Option<String>,
    /// Pinata REST API base URL
    pub pinata_api_url: String,
    /// Port to listen on
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub body_limit_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            pinata_api_key: None,
            pinata_secret_key: None,
            pinata_api_url: DEFAULT_PINATA_API_URL.into(),
            port: DEFAULT_PROXY_PORT,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            pinata_api_key: non_empty("PINATA_API_KEY"),
            pinata_secret_key: non_empty("PINATA_SECRET_API_KEY"),
            pinata_api_url: non_empty("PINATA_API_URL")
                .unwrap_or_else(|| DEFAULT_PINATA_API_URL.into()),
            port: non_empty("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PROXY_PORT),
            body_limit_bytes: non_empty("UPLOAD_BODY_LIMIT_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BODY_LIMIT_BYTES),
        }
    }

    /// Sets Pinata credentials.
    pub fn with_pinata(mut self, api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.pinata_api_key = Some(api_key.into());
        self.pinata_secret_key = Some(secret_key.into());
        self
    }

    /// Points the proxy at a different Pinata API base.
    pub fn with_pinata_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.pinata_api_url = api_url.into();
        self
    }

    /// Returns true when both Pinata credentials are present.
    pub fn has_pinata_credentials(&self) -> bool {
        self.pinata_config().has_credentials()
    }

    fn pinata_config(&self) -> PinataConfig {
        PinataConfig {
            api_key: self.pinata_api_key.clone(),
            secret_key: self.pinata_secret_key.clone(),
            ..PinataConfig::default()
        }
        .with_api_url(self.pinata_api_url.clone())
    }
}

/// Shared state of the proxy.
pub struct AppState {
    /// Proxy configuration
    pub config: ApiConfig,
    /// Upstream pinning client
    pub pinata: PinataClient,
}

impl AppState {
    /// Builds the state, including the Pinata HTTP client.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let pinata = PinataClient::with_config(config.pinata_config())?;
        Ok(Self { config, pinata })
    }
}
