//! Authentication requests sent from the WAA to the WLS.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::codec::format_timestamp;
use crate::config::{AuthMethods, Config, Interactive};

/// Login page of the University of Cambridge WLS.
pub const DEFAULT_LOGIN_URL: &str = "https://raven.cam.ac.uk/auth/authenticate.html";

/// Parameters of a redirect to the WLS login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub ver: u8,
    /// Return URL; the response is validated against it.
    pub url: String,
    /// Resource description shown on the login page.
    pub desc: Option<String>,
    pub aauth: AuthMethods,
    pub iact: Interactive,
    /// Why authentication is being requested.
    pub msg: Option<String>,
    /// Echoed back verbatim in the response.
    pub params: Option<String>,
    /// WAA's current time, to help the WLS detect clock problems.
    pub date: Option<DateTime<Utc>>,
    /// Ask the WLS to show its own error page instead of returning failures.
    pub fail: bool,
}

impl AuthRequest {
    /// Request carrying the return URL, version and method requirements the
    /// validator will later enforce.
    pub fn from_config(config: &Config) -> Self {
        Self {
            ver: config.protocol_version,
            url: config.return_url.clone(),
            desc: None,
            aauth: config.accepted_auth_methods.clone(),
            iact: config.require_interactive,
            msg: None,
            params: None,
            date: None,
            fail: false,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_fail(mut self, fail: bool) -> Self {
        self.fail = fail;
        self
    }

    /// Query parameters in protocol order. Unset values are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("ver", self.ver.to_string()), ("url", self.url.clone())];
        if let Some(desc) = &self.desc {
            pairs.push(("desc", desc.clone()));
        }
        let aauth = self.aauth.to_request_value();
        if !aauth.is_empty() {
            pairs.push(("aauth", aauth));
        }
        if let Some(iact) = self.iact.request_value() {
            pairs.push(("iact", iact.to_string()));
        }
        if let Some(msg) = &self.msg {
            pairs.push(("msg", msg.clone()));
        }
        if let Some(params) = &self.params {
            pairs.push(("params", params.clone()));
        }
        if let Some(date) = &self.date {
            pairs.push(("date", format_timestamp(date)));
        }
        if self.fail {
            pairs.push(("fail", "yes".to_string()));
        }
        pairs
    }

    /// The full redirect URL. Existing query parameters of `login_url` are
    /// kept.
    pub fn to_url(&self, login_url: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(login_url)?;
        url.query_pairs_mut().extend_pairs(self.query_pairs());
        Ok(url)
    }
}
