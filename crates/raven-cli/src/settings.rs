//! Settings file for the `raven` CLI: validator config plus access policy.
//!
//! ```yaml
//! return_url: "https://app.example.org/raven/return/"
//! protocol_version: 3
//! accepted_auth_methods: [pwd]
//! trusted_keys:
//!   - kid: "901"
//!     public_key_path: pubkey901.pem
//! policy:
//!   required_ptags: [current]
//! login_url: "https://raven.cam.ac.uk/auth/authenticate.html"
//! ```
//!
//! Relative key paths are resolved against the settings file's directory.
//! `RAVEN_*` environment variables override file values.

use std::path::Path;

use anyhow::{Context, Result};
use raven_core::{AccessPolicy, Config, DEFAULT_LOGIN_URL};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliSettings {
    #[serde(flatten)]
    pub config: Config,

    #[serde(default)]
    pub policy: AccessPolicy,

    /// WLS login page used by `raven request`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
}

impl CliSettings {
    /// Load from `path` if given, else start from defaults; then apply the
    /// environment and an optional return URL override.
    pub fn load(path: Option<&Path>, return_url: Option<&str>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings
            .config
            .apply_env()
            .context("invalid RAVEN_* environment")?;
        if let Some(url) = return_url {
            settings.config.return_url = url.to_string();
        }
        settings.config.check()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let mut settings: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;

        if let Some(base) = path.parent() {
            settings.resolve_key_paths(base);
        }
        Ok(settings)
    }

    fn resolve_key_paths(&mut self, base: &Path) {
        for key in &mut self.config.trusted_keys {
            if let Some(p) = &key.public_key_path {
                if p.is_relative() {
                    key.public_key_path = Some(base.join(p));
                }
            }
        }
    }

    pub fn login_url(&self) -> &str {
        self.login_url.as_deref().unwrap_or(DEFAULT_LOGIN_URL)
    }
}
