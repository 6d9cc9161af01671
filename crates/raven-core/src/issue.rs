//! Issuing signed response tokens, as a development WLS would.
//!
//! The validator never needs this; it exists for test fixtures and the
//! `raven sign` command.

use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::codec::{encode_signature, format_timestamp, percent_encode_field};
use crate::config::LATEST_VERSION;
use crate::error::{ConfigError, ConfigResult};
use crate::keys::KeyId;
use crate::layout::Layout;
use crate::signature::{join_raw, sign_pkcs1_sha1};
use crate::status::Status;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("cannot issue protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("signing failed: {0}")]
    Signing(#[from] rsa::Error),
}

/// Field values of a response to issue, unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedResponse {
    pub ver: u8,
    pub status: Status,
    pub msg: String,
    pub issue: DateTime<Utc>,
    pub ident: String,
    pub url: String,
    pub principal: String,
    /// Dropped for versions 1 and 2.
    pub ptags: Vec<String>,
    pub auth: String,
    pub sso: Vec<String>,
    pub life: Option<u64>,
    pub params: String,
}

impl IssuedResponse {
    /// A successful interactive `pwd` login at the latest version.
    pub fn success(
        url: impl Into<String>,
        principal: impl Into<String>,
        issue: DateTime<Utc>,
    ) -> Self {
        Self {
            principal: principal.into(),
            auth: "pwd".to_string(),
            ..Self::failure(url, Status::Success, issue)
        }
    }

    /// A response carrying only a status, as sent on cancellation or error.
    pub fn failure(url: impl Into<String>, status: Status, issue: DateTime<Utc>) -> Self {
        Self {
            ver: LATEST_VERSION,
            status,
            msg: String::new(),
            issue,
            ident: format!("{}-{}", issue.timestamp(), issue.timestamp_subsec_micros()),
            url: url.into(),
            principal: String::new(),
            ptags: Vec::new(),
            auth: String::new(),
            sso: Vec::new(),
            life: None,
            params: String::new(),
        }
    }

    pub fn with_version(mut self, ver: u8) -> Self {
        self.ver = ver;
        self
    }

    pub fn with_issue(mut self, issue: DateTime<Utc>) -> Self {
        self.issue = issue;
        self
    }

    pub fn with_ptags<I, S>(mut self, ptags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ptags = ptags.into_iter().map(Into::into).collect();
        self
    }

    /// Report single sign-on from earlier `methods` instead of interaction.
    pub fn with_sso<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth.clear();
        self.sso = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = auth.into();
        self
    }

    pub fn with_life(mut self, life: u64) -> Self {
        self.life = Some(life);
        self
    }

    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = msg.into();
        self
    }

    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = ident.into();
        self
    }

    /// The signed part of the token: escaped fields up to `params`.
    pub fn encode_signed_part(&self) -> Result<String, IssueError> {
        let layout =
            Layout::for_version(self.ver).ok_or(IssueError::UnsupportedVersion(self.ver))?;

        let mut values = vec![
            self.ver.to_string(),
            self.status.code().to_string(),
            self.msg.clone(),
            format_timestamp(&self.issue),
            self.ident.clone(),
            self.url.clone(),
            self.principal.clone(),
        ];
        if layout == Layout::V3 {
            values.push(self.ptags.join(","));
        }
        values.extend([
            self.auth.clone(),
            self.sso.join(","),
            self.life.map(|l| l.to_string()).unwrap_or_default(),
            self.params.clone(),
        ]);

        let encoded: Vec<String> = values.iter().map(|v| percent_encode_field(v)).collect();
        let refs: Vec<&str> = encoded.iter().map(String::as_str).collect();
        Ok(join_raw(&refs))
    }

    /// Token with empty `kid` and `sig`.
    pub fn to_unsigned_token(&self) -> Result<String, IssueError> {
        Ok(format!("{}!!", self.encode_signed_part()?))
    }
}

/// Signs response tokens with one private key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: RsaPrivateKey,
    kid: KeyId,
}

impl TokenIssuer {
    pub fn new(key: RsaPrivateKey, kid: KeyId) -> Self {
        Self { key, kid }
    }

    /// Load a PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`) PEM private key.
    pub fn from_pem(pem: &str, kid: KeyId) -> ConfigResult<Self> {
        let parsed = if pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| e.to_string())
        } else {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| e.to_string())
        };
        let key = parsed.map_err(|reason| ConfigError::InvalidKey {
            kid: kid.to_string(),
            reason,
        })?;
        Ok(Self::new(key, kid))
    }

    pub fn kid(&self) -> &KeyId {
        &self.kid
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// Encode, sign and assemble a complete token.
    pub fn sign(&self, response: &IssuedResponse) -> Result<String, IssueError> {
        let signed = response.encode_signed_part()?;
        let signature = sign_pkcs1_sha1(&self.key, signed.as_bytes())?;
        Ok(format!(
            "{signed}!{}!{}",
            self.kid,
            encode_signature(&signature)
        ))
    }
}
