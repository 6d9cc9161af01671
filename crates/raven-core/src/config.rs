//! Validator configuration.
//!
//! Loaded from YAML (`Config::from_file`) and/or the environment
//! (`Config::from_env`), then handed to the validator by value. The validator
//! never reads settings on its own.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RAVEN_RETURN_URL` | Return URL the WLS must echo |
//! | `RAVEN_PROTOCOL_VERSION` | Protocol version requests are issued with (default: 3) |
//! | `RAVEN_MAX_CLOCK_SKEW` | Clock skew tolerance in seconds, versions 1-2 only (default: 2) |
//! | `RAVEN_TIMEOUT` | Maximum response age in seconds (default: 10) |
//! | `RAVEN_AAUTH` | Comma-separated accepted auth methods, or `any` (default: `pwd,card`) |
//! | `RAVEN_IACT` | `yes`, `no` or empty for indifferent |

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::keys::TrustedKey;

/// Highest protocol version this crate understands.
pub const LATEST_VERSION: u8 = 3;

const DEFAULT_MAX_CLOCK_SKEW_SECS: u64 = 2;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Authentication methods acceptable as evidence of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthMethodsRepr", into = "AuthMethodsRepr")]
pub enum AuthMethods {
    /// Any method the WLS reports is acceptable.
    Any,
    /// Only the listed methods are acceptable.
    Only(BTreeSet<String>),
}

impl AuthMethods {
    pub fn only<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(methods.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, method: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(set) => set.contains(method),
        }
    }

    /// True if at least one of `methods` is acceptable.
    pub fn accepts_any_of<'a>(&self, methods: impl IntoIterator<Item = &'a str>) -> bool {
        methods.into_iter().any(|m| self.accepts(m))
    }

    /// Parse `any` or a comma-separated list.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Self::Any;
        }
        Self::only(s.split(',').map(str::trim).filter(|m| !m.is_empty()))
    }

    /// Comma-joined list as sent in the `aauth` request parameter.
    /// Empty for [`AuthMethods::Any`].
    pub fn to_request_value(&self) -> String {
        match self {
            Self::Any => String::new(),
            Self::Only(set) => set.iter().cloned().collect::<Vec<_>>().join(","),
        }
    }
}

impl Default for AuthMethods {
    fn default() -> Self {
        Self::only(["pwd", "card"])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AuthMethodsRepr {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<AuthMethodsRepr> for AuthMethods {
    type Error = String;

    fn try_from(repr: AuthMethodsRepr) -> Result<Self, Self::Error> {
        match repr {
            AuthMethodsRepr::Keyword(k) if k.eq_ignore_ascii_case("any") => Ok(Self::Any),
            AuthMethodsRepr::Keyword(k) => Err(format!(
                "expected 'any' or a list of methods, got '{k}'"
            )),
            AuthMethodsRepr::List(list) => Ok(Self::only(list)),
        }
    }
}

impl From<AuthMethods> for AuthMethodsRepr {
    fn from(methods: AuthMethods) -> Self {
        match methods {
            AuthMethods::Any => Self::Keyword("any".to_string()),
            AuthMethods::Only(set) => Self::List(set.into_iter().collect()),
        }
    }
}

/// Whether the user must (or must not) have authenticated interactively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interactive {
    /// Single sign-on from an earlier session is not enough.
    Yes,
    /// The WLS must not have interacted with the user.
    No,
    #[default]
    Indifferent,
}

impl Interactive {
    pub fn parse(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "" | "indifferent" => Ok(Self::Indifferent),
            other => Err(ConfigError::invalid(format!(
                "interactive must be yes, no or indifferent, got '{other}'"
            ))),
        }
    }

    /// Value of the `iact` request parameter; `None` when indifferent.
    pub fn request_value(&self) -> Option<&'static str> {
        match self {
            Self::Yes => Some("yes"),
            Self::No => Some("no"),
            Self::Indifferent => None,
        }
    }
}

/// Trust parameters for one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL the WLS must echo back; computed by the caller for this attempt.
    pub return_url: String,

    /// Version the authentication request was issued with (1-3).
    pub protocol_version: u8,

    /// Clock skew tolerance; only applied to versions 1 and 2.
    pub max_clock_skew_secs: u64,

    /// Maximum age of a response.
    pub timeout_secs: u64,

    pub accepted_auth_methods: AuthMethods,

    pub require_interactive: Interactive,

    /// Keys the WLS may sign with.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trusted_keys: Vec<TrustedKey>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            return_url: String::new(),
            protocol_version: LATEST_VERSION,
            max_clock_skew_secs: DEFAULT_MAX_CLOCK_SKEW_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accepted_auth_methods: AuthMethods::default(),
            require_interactive: Interactive::default(),
            trusted_keys: Vec::new(),
        }
    }
}

impl Config {
    pub fn new(return_url: impl Into<String>) -> Self {
        Self {
            return_url: return_url.into(),
            ..Default::default()
        }
    }

    pub fn with_protocol_version(mut self, version: u8) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn with_max_clock_skew(mut self, secs: u64) -> Self {
        self.max_clock_skew_secs = secs;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_auth_methods(mut self, methods: AuthMethods) -> Self {
        self.accepted_auth_methods = methods;
        self
    }

    pub fn with_interactive(mut self, interactive: Interactive) -> Self {
        self.require_interactive = interactive;
        self
    }

    pub fn with_trusted_key(mut self, key: TrustedKey) -> Self {
        self.trusted_keys.push(key);
        self
    }

    /// Load config from a YAML file and check it.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string and check it.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Defaults overridden by `RAVEN_*` environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.check()?;
        Ok(config)
    }

    /// Override fields from `RAVEN_*` environment variables.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Override fields from a variable source.
    pub fn apply_env_from<F>(&mut self, var: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("RAVEN_RETURN_URL") {
            self.return_url = v;
        }
        if let Some(v) = var("RAVEN_PROTOCOL_VERSION") {
            self.protocol_version = parse_number("RAVEN_PROTOCOL_VERSION", &v)?;
        }
        if let Some(v) = var("RAVEN_MAX_CLOCK_SKEW") {
            self.max_clock_skew_secs = parse_number("RAVEN_MAX_CLOCK_SKEW", &v)?;
        }
        if let Some(v) = var("RAVEN_TIMEOUT") {
            self.timeout_secs = parse_number("RAVEN_TIMEOUT", &v)?;
        }
        if let Some(v) = var("RAVEN_AAUTH") {
            self.accepted_auth_methods = AuthMethods::parse(&v);
        }
        if let Some(v) = var("RAVEN_IACT") {
            self.require_interactive = Interactive::parse(&v)?;
        }
        Ok(())
    }

    /// Reject values the validator cannot work with.
    pub fn check(&self) -> ConfigResult<()> {
        if self.return_url.is_empty() {
            return Err(ConfigError::invalid("return_url must be set"));
        }
        if !(1..=LATEST_VERSION).contains(&self.protocol_version) {
            return Err(ConfigError::invalid(format!(
                "protocol_version must be between 1 and {LATEST_VERSION}, got {}",
                self.protocol_version
            )));
        }
        if let AuthMethods::Only(set) = &self.accepted_auth_methods {
            if set.is_empty() {
                return Err(ConfigError::invalid(
                    "accepted_auth_methods is empty; use 'any' to accept every method",
                ));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(format!("{name} must be a number, got '{value}'")))
}
