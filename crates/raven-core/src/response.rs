//! A validated WLS response.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::form_urlencoded;

use crate::codec::format_timestamp;
use crate::keys::KeyId;
use crate::status::Status;

/// Round-trip data the WAA sent with its request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Params {
    /// Versions 1 and 2 pass the field through untouched.
    Opaque(String),
    /// Version 3 parses the field as a query string.
    Query(BTreeMap<String, Vec<String>>),
}

impl Params {
    /// Parse a query string into key → values, keeping repeated keys.
    pub fn parse_query(query: &str) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            map.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        Self::Query(map)
    }

    /// First value of `key`. Opaque params are read as a query string.
    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::Query(map) => map.get(key).and_then(|v| v.first()).cloned(),
            Self::Opaque(raw) => form_urlencoded::parse(raw.as_bytes())
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Opaque(raw) => raw.is_empty(),
            Self::Query(map) => map.is_empty(),
        }
    }
}

/// A response that passed every structural, temporal, policy and signature
/// check. Built once per token and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub ver: u8,
    pub status: Status,
    pub msg: Option<String>,
    pub issue: DateTime<Utc>,
    pub ident: String,
    pub url: String,
    /// Present iff the status is 200.
    pub principal: Option<String>,
    /// Always empty before version 3.
    pub ptags: BTreeSet<String>,
    pub auth: Option<String>,
    pub sso: Vec<String>,
    pub life: Option<u64>,
    pub params: Params,
    /// Decoded `params` field exactly as the WLS echoed it.
    pub raw_params: String,
    pub key_id: Option<KeyId>,
    #[serde(skip)]
    pub signature: Option<Vec<u8>>,
}

impl Response {
    /// True when the WLS reports a successful authentication.
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// Identifier unique to this response across the WLS.
    pub fn uid(&self) -> String {
        format!("{}-{}", format_timestamp(&self.issue), self.ident)
    }

    pub fn has_ptag(&self, tag: &str) -> bool {
        self.ptags.contains(tag)
    }

    /// True when the user authenticated during this request rather than via
    /// an existing WLS session.
    pub fn is_interactive(&self) -> bool {
        self.auth.is_some()
    }

    /// Where the WAA asked to go after login (`next` in params).
    ///
    /// Not sanitized; callers decide whether the target is acceptable.
    pub fn next_url(&self) -> Option<String> {
        self.params.get("next")
    }
}
