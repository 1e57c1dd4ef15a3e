//! Configuration loaded from `kalkulator.toml`.
//!
//! Values missing from the file fall back to defaults suited for local runs.
//! Environment variables take precedence over the file; the deployment
//! profile comes from `NAIS_CLUSTER_NAME`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::regelapi::PollConfig;

const DEFAULT_CONFIG_FILE: &str = "kalkulator.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Local,
    Dev,
    Prod,
}

impl Profile {
    /// `dev-*` and `prod-*` clusters map to their profile, anything else is local.
    pub fn from_cluster(cluster: Option<&str>) -> Self {
        match cluster {
            Some(c) if c.starts_with("dev-") => Profile::Dev,
            Some(c) if c.starts_with("prod-") => Profile::Prod,
            _ => Profile::Local,
        }
    }
}

/// Azure AD client-credentials settings shared by both downstream services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub token_endpoint: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl AzureConfig {
    fn is_complete(&self) -> bool {
        !self.token_endpoint.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KalkulatorConfig {
    #[serde(skip)]
    pub profile: Profile,

    /// Base URL of the regel-api (through dp-proxy).
    #[serde(default = "default_dp_proxy_url")]
    pub dp_proxy_url: String,

    #[serde(default = "default_pdl_api_url")]
    pub pdl_api_url: String,

    #[serde(default)]
    pub dp_proxy_scope: String,

    #[serde(default)]
    pub pdl_api_scope: String,

    /// How long a behov may stay pending before giving up.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout for every outbound call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Fixed bearer token, only honoured in the local profile.
    #[serde(default)]
    pub static_token: Option<String>,

    #[serde(default)]
    pub azure: AzureConfig,

    /// API key trusted services present to recalculate; unset disables it.
    #[serde(default)]
    pub forskudd_api_key: Option<String>,
}

fn default_dp_proxy_url() -> String {
    "http://localhost:8092".to_string()
}

fn default_pdl_api_url() -> String {
    "http://localhost:8093".to_string()
}

fn default_max_wait_ms() -> u64 {
    20_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for KalkulatorConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Local,
            dp_proxy_url: default_dp_proxy_url(),
            pdl_api_url: default_pdl_api_url(),
            dp_proxy_scope: String::new(),
            pdl_api_scope: String::new(),
            max_wait_ms: default_max_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            static_token: None,
            azure: AzureConfig::default(),
            forskudd_api_key: None,
        }
    }
}

/// Where outbound tokens come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Static(String),
    ClientCredentials,
}

impl KalkulatorConfig {
    /// Loads `path`, or `kalkulator.toml` in the working directory when no
    /// path is given. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// [`Self::load`] with the environment supplied by `lookup`.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Overrides file values with whatever `lookup` finds.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.profile = Profile::from_cluster(lookup("NAIS_CLUSTER_NAME").as_deref());

        let overrides: [(&str, &mut String); 7] = [
            ("DP_PROXY_URL", &mut self.dp_proxy_url),
            ("PDL_API_URL", &mut self.pdl_api_url),
            ("DP_PROXY_SCOPE", &mut self.dp_proxy_scope),
            ("PDL_API_SCOPE", &mut self.pdl_api_scope),
            ("AZURE_OPENID_CONFIG_TOKEN_ENDPOINT", &mut self.azure.token_endpoint),
            ("AZURE_APP_CLIENT_ID", &mut self.azure.client_id),
            ("AZURE_APP_CLIENT_SECRET", &mut self.azure.client_secret),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        if let Some(token) = lookup("KALKULATOR_STATIC_TOKEN") {
            self.static_token = Some(token);
        }
        if let Some(key) = lookup("FORSKUDD_API_KEY") {
            self.forskudd_api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        PollConfig::new(self.max_wait(), self.poll_interval())?;
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be positive");
        }
        if self.profile != Profile::Local && !self.azure.is_complete() {
            bail!("Azure client credentials are required outside the local profile");
        }
        Ok(())
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_config(&self) -> Result<PollConfig> {
        Ok(PollConfig::new(self.max_wait(), self.poll_interval())?)
    }

    /// Client credentials win whenever they are complete; a static token is
    /// only used locally.
    pub fn credentials(&self) -> Credentials {
        if self.azure.is_complete() {
            return Credentials::ClientCredentials;
        }
        Credentials::Static(
            self.static_token
                .clone()
                .unwrap_or_else(|| "local-token".to_string()),
        )
    }
}
