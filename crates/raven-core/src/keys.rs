//! Trusted WLS signing keys.
//!
//! The validator only needs a [`KeyLookup`]; [`KeyStore`] is the provided
//! implementation. It is an immutable snapshot behind an `Arc`: cloning is
//! cheap and inserting copies on write, so a caller rotating keys hands each
//! validation call a consistent view.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

use crate::error::{ConfigError, ConfigResult};

/// Maximum length of a key id.
pub const MAX_KEY_ID_LEN: usize = 8;

/// Identifier of a WLS signing key: 1 to 8 decimal digits, no leading zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

impl KeyId {
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s.len() <= MAX_KEY_ID_LEN
            && s.bytes().all(|b| b.is_ascii_digit())
            && !s.starts_with('0');
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid key id '{s}'"))
    }
}

impl TryFrom<String> for KeyId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyId> for String {
    fn from(kid: KeyId) -> Self {
        kid.0
    }
}

impl Borrow<str> for KeyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A trusted key entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedKey {
    pub kid: String,

    /// Path to a PEM public key (SPKI or PKCS#1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_path: Option<PathBuf>,

    /// Inline PEM public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_pem: Option<String>,

    /// Friendly name for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TrustedKey {
    pub fn from_pem(kid: impl Into<String>, pem: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            public_key_path: None,
            public_key_pem: Some(pem.into()),
            name: None,
        }
    }

    pub fn from_path(kid: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kid: kid.into(),
            public_key_path: Some(path.into()),
            public_key_pem: None,
            name: None,
        }
    }
}

/// Resolves a key id to the public key the WLS signed with.
///
/// Implementations must be safe to call from concurrent validations and
/// return the same answer for the duration of one call.
pub trait KeyLookup {
    fn lookup(&self, kid: &KeyId) -> Option<&RsaPublicKey>;
}

impl<T: KeyLookup + ?Sized> KeyLookup for &T {
    fn lookup(&self, kid: &KeyId) -> Option<&RsaPublicKey> {
        (**self).lookup(kid)
    }
}

impl KeyLookup for HashMap<KeyId, RsaPublicKey> {
    fn lookup(&self, kid: &KeyId) -> Option<&RsaPublicKey> {
        self.get(kid)
    }
}

impl KeyLookup for BTreeMap<KeyId, RsaPublicKey> {
    fn lookup(&self, kid: &KeyId) -> Option<&RsaPublicKey> {
        self.get(kid)
    }
}

/// Snapshot of trusted WLS keys.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: Arc<BTreeMap<KeyId, RsaPublicKey>>,
}

impl KeyStore {
    /// Create an empty key store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every entry of a config's `trusted_keys`.
    pub fn from_trusted_keys(entries: &[TrustedKey]) -> ConfigResult<Self> {
        let mut store = Self::new();
        for entry in entries {
            store.add_trusted_key(entry)?;
        }
        Ok(store)
    }

    /// Add a key, replacing any key with the same id.
    ///
    /// Other clones of this store keep their previous snapshot.
    pub fn insert(&mut self, kid: KeyId, key: RsaPublicKey) -> Option<RsaPublicKey> {
        Arc::make_mut(&mut self.keys).insert(kid, key)
    }

    pub fn with_key(mut self, kid: KeyId, key: RsaPublicKey) -> Self {
        self.insert(kid, key);
        self
    }

    /// Parse a PEM public key and add it under `kid`.
    pub fn insert_pem(&mut self, kid: &str, pem: &str) -> ConfigResult<()> {
        let key_id = parse_config_kid(kid)?;
        let key = load_public_key_pem(pem).map_err(|reason| ConfigError::InvalidKey {
            kid: kid.to_string(),
            reason,
        })?;
        self.insert(key_id, key);
        Ok(())
    }

    /// Add a configured key, reading its file if needed.
    pub fn add_trusted_key(&mut self, entry: &TrustedKey) -> ConfigResult<()> {
        let pem = match (&entry.public_key_pem, &entry.public_key_path) {
            (Some(pem), None) => pem.clone(),
            (None, Some(path)) => fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?,
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidKey {
                    kid: entry.kid.clone(),
                    reason: "set only one of public_key_pem and public_key_path".to_string(),
                })
            }
            (None, None) => {
                return Err(ConfigError::InvalidKey {
                    kid: entry.kid.clone(),
                    reason: "no public_key_pem or public_key_path".to_string(),
                })
            }
        };

        self.insert_pem(&entry.kid, &pem)?;
        tracing::debug!(
            kid = %entry.kid,
            name = entry.name.as_deref().unwrap_or(""),
            "loaded trusted WLS key"
        );
        Ok(())
    }

    pub fn get(&self, kid: &str) -> Option<&RsaPublicKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// All trusted key ids, in order.
    pub fn key_ids(&self) -> Vec<KeyId> {
        self.keys.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyLookup for KeyStore {
    fn lookup(&self, kid: &KeyId) -> Option<&RsaPublicKey> {
        self.keys.get(kid)
    }
}

fn parse_config_kid(kid: &str) -> ConfigResult<KeyId> {
    KeyId::parse(kid).ok_or_else(|| ConfigError::InvalidKey {
        kid: kid.to_string(),
        reason: format!("key ids are 1 to {MAX_KEY_ID_LEN} digits without a leading zero"),
    })
}

/// Parse an RSA public key from SPKI (`BEGIN PUBLIC KEY`) or PKCS#1
/// (`BEGIN RSA PUBLIC KEY`) PEM, or take it from an X.509 certificate
/// (`BEGIN CERTIFICATE`), the form the WLS publishes its keys in.
pub fn load_public_key_pem(pem: &str) -> Result<RsaPublicKey, String> {
    if pem.contains("BEGIN CERTIFICATE") {
        return load_certificate_key(pem);
    }
    if pem.contains("BEGIN RSA PUBLIC KEY") {
        return RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| format!("invalid PKCS#1 PEM: {e}"));
    }
    RsaPublicKey::from_public_key_pem(pem).map_err(|e| format!("invalid SPKI PEM: {e}"))
}

// Certificate validity and issuer are not checked; trust comes from the kid mapping.
fn load_certificate_key(pem: &str) -> Result<RsaPublicKey, String> {
    let cert = Certificate::from_pem(pem.as_bytes())
        .map_err(|e| format!("invalid X.509 certificate PEM: {e}"))?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| format!("invalid certificate public key: {e}"))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| format!("certificate does not hold an RSA public key: {e}"))
}
