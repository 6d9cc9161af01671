//! Response validation.
//!
//! Contract:
//! - checks run in a fixed order and the first failure wins
//! - no I/O; the only time source is the `now` handed in
//! - the signature is verified over the raw fields, never re-encoded ones

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::codec::{self, Fields};
use crate::config::{Config, Interactive};
use crate::error::{ConfigResult, WlsError, WlsResult};
use crate::keys::{KeyId, KeyLookup, KeyStore};
use crate::layout::{Field, Layout};
use crate::response::{Params, Response};
use crate::signature;
use crate::status::Status;

/// A validator bound to one configuration and key source.
///
/// Holds no mutable state; share it across threads and call
/// [`ResponseValidator::validate`] concurrently.
#[derive(Debug, Clone)]
pub struct ResponseValidator<K = KeyStore> {
    config: Config,
    keys: K,
}

impl ResponseValidator<KeyStore> {
    /// Check `config` and load its `trusted_keys`.
    pub fn from_config(config: Config) -> ConfigResult<Self> {
        config.check()?;
        let keys = KeyStore::from_trusted_keys(&config.trusted_keys)?;
        Ok(Self { config, keys })
    }
}

impl<K: KeyLookup> ResponseValidator<K> {
    pub fn new(config: Config, keys: K) -> Self {
        Self { config, keys }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Validate against the system clock.
    pub fn validate(&self, token: &str) -> WlsResult<Response> {
        validate(token, &self.config, &self.keys)
    }

    /// Validate against a caller-supplied clock.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> WlsResult<Response> {
        validate_at(token, &self.config, &self.keys, now)
    }
}

/// Validate `token` against the system clock.
pub fn validate<K: KeyLookup + ?Sized>(
    token: &str,
    config: &Config,
    keys: &K,
) -> WlsResult<Response> {
    validate_at(token, config, keys, Utc::now())
}

/// Validate `token` as if the current time were `now`.
///
/// Same inputs, same result: nothing here reads the clock or the environment.
pub fn validate_at<K: KeyLookup + ?Sized>(
    token: &str,
    config: &Config,
    keys: &K,
    now: DateTime<Utc>,
) -> WlsResult<Response> {
    let result = check_token(token, config, keys, now);
    match &result {
        Ok(response) => tracing::debug!(
            ver = response.ver,
            status = response.status.code(),
            ident = %response.ident,
            kid = response.key_id.as_ref().map(KeyId::as_str).unwrap_or(""),
            "accepted WLS response"
        ),
        Err(e) => tracing::warn!(kind = %e.kind, detail = %e.detail, "rejected WLS response"),
    }
    result
}

/// Field access by name once the layout is fixed.
struct View<'f, 'a> {
    fields: &'f Fields<'a>,
    layout: Layout,
}

impl<'f, 'a> View<'f, 'a> {
    /// Decoded value, or `""` for a field this layout does not carry.
    fn get(&self, field: Field) -> &'f str {
        let fields = self.fields;
        self.layout
            .index(field)
            .and_then(|i| fields.decoded(i))
            .unwrap_or("")
    }
}

fn check_token<K: KeyLookup + ?Sized>(
    token: &str,
    config: &Config,
    keys: &K,
    now: DateTime<Utc>,
) -> WlsResult<Response> {
    if token.is_empty() {
        return Err(WlsError::malformed("no response supplied"));
    }

    let fields = codec::tokenize(token)?;

    let (ver, layout) = check_version(&fields, config)?;
    if fields.len() != layout.field_count() {
        return Err(WlsError::malformed(format!(
            "wrong parameter count: expected {}, got {}",
            layout.field_count(),
            fields.len()
        )));
    }
    let view = View {
        fields: &fields,
        layout,
    };

    let status = check_status(view.get(Field::Status))?;

    let msg = non_empty(view.get(Field::Msg));
    let issue_field = view.get(Field::Issue);
    if issue_field.is_empty() {
        return Err(WlsError::malformed("missing issue timestamp"));
    }
    let issue = codec::parse_timestamp(issue_field)?;
    let ident = view.get(Field::Ident);
    if ident.is_empty() {
        return Err(WlsError::malformed("missing response id"));
    }

    let url = view.get(Field::Url);
    if url != config.return_url {
        return Err(WlsError::invalid(format!(
            "return URL mismatch: expected {:?}, got {url:?}",
            config.return_url
        )));
    }

    check_freshness(issue, now, layout, config)?;

    let principal = non_empty(view.get(Field::Principal));
    match (&principal, status.is_success()) {
        (None, true) => return Err(WlsError::invalid("no principal on success status")),
        (Some(_), false) => return Err(WlsError::invalid("principal present on failure status")),
        _ => {}
    }
    let ptags: BTreeSet<String> = split_list(view.get(Field::Ptags)).collect();

    let auth = non_empty(view.get(Field::Auth));
    let sso: Vec<String> = split_list(view.get(Field::Sso)).collect();
    check_auth(auth.as_deref(), &sso, status, config)?;

    let life = match view.get(Field::Life) {
        "" => None,
        s => Some(s.parse::<u64>().map_err(|_| {
            WlsError::malformed(format!("life must be a non-negative integer, got {s:?}"))
        })?),
    };

    let raw_params = view.get(Field::Params).to_string();
    let params = match layout {
        Layout::V3 => Params::parse_query(&raw_params),
        Layout::V1V2 => Params::Opaque(raw_params.clone()),
    };

    let key_id = match view.get(Field::Kid) {
        "" => None,
        s => Some(
            KeyId::parse(s).ok_or_else(|| WlsError::malformed(format!("bad key id {s:?}")))?,
        ),
    };

    let sig_field = view.get(Field::Sig);
    if sig_field.is_empty() && status.is_success() {
        return Err(WlsError::invalid("signature required for success status"));
    }
    let signature = match (&key_id, sig_field) {
        (_, "") => None,
        (None, _) => return Err(WlsError::invalid("signature present without key id")),
        (Some(kid), sig) => Some(signature::verify_response_signature(
            &fields, layout, kid, sig, keys,
        )?),
    };

    Ok(Response {
        ver,
        status,
        msg,
        issue,
        ident: ident.to_string(),
        url: url.to_string(),
        principal,
        ptags,
        auth,
        sso,
        life,
        params,
        raw_params,
        key_id,
        signature,
    })
}

/// The version must be known and match what the request was issued with.
fn check_version(fields: &Fields<'_>, config: &Config) -> WlsResult<(u8, Layout)> {
    let field = fields.decoded(0).unwrap_or("");
    let ver: u8 = field
        .parse()
        .map_err(|_| WlsError::malformed(format!("version must be an integer, got {field:?}")))?;
    let layout = Layout::for_version(ver).ok_or_else(|| {
        WlsError::malformed(format!("unsupported or mismatched version: {ver}"))
    })?;

    // The WLS echoes the version the request was issued with.
    if ver != config.protocol_version {
        return Err(WlsError::malformed(format!(
            "unsupported or mismatched version: requested {}, got {ver}",
            config.protocol_version
        )));
    }
    Ok((ver, layout))
}

fn check_status(field: &str) -> WlsResult<Status> {
    let code: i64 = field
        .parse()
        .map_err(|_| WlsError::malformed(format!("status must be an integer, got {field:?}")))?;
    u16::try_from(code)
        .ok()
        .and_then(Status::from_code)
        .ok_or_else(|| WlsError::invalid(format!("unknown status {code}")))
}

/// Versions 1 and 2 widen both bounds by the configured skew.
fn check_freshness(
    issue: DateTime<Utc>,
    now: DateTime<Utc>,
    layout: Layout,
    config: &Config,
) -> WlsResult<()> {
    let skew = match layout {
        Layout::V1V2 => secs(config.max_clock_skew_secs),
        Layout::V3 => 0,
    };
    let timeout = secs(config.timeout_secs);
    let (issued, current) = (issue.timestamp(), now.timestamp());

    if issued > current.saturating_add(skew) {
        return Err(WlsError::invalid(format!(
            "response issued in the future: {} is after {}",
            codec::format_timestamp(&issue),
            codec::format_timestamp(&now)
        )));
    }
    if issued < current.saturating_sub(timeout).saturating_sub(skew) {
        return Err(WlsError::invalid(format!(
            "response timed out: issued {}s ago, limit {}s",
            current.saturating_sub(issued),
            config.timeout_secs
        )));
    }
    Ok(())
}

fn check_auth(auth: Option<&str>, sso: &[String], status: Status, config: &Config) -> WlsResult<()> {
    let accepted = &config.accepted_auth_methods;
    if let Some(method) = auth {
        if !sso.is_empty() {
            return Err(WlsError::malformed("both auth and sso supplied"));
        }
        if !accepted.accepts(method) {
            return Err(WlsError::invalid(format!(
                "authentication method {method:?} not accepted"
            )));
        }
        if config.require_interactive == Interactive::No {
            return Err(WlsError::invalid(
                "interactive authentication used but not permitted",
            ));
        }
    } else if !sso.is_empty() {
        if !accepted.accepts_any_of(sso.iter().map(String::as_str)) {
            return Err(WlsError::invalid(format!(
                "no accepted method among previous authentications: {}",
                sso.join(",")
            )));
        }
        if config.require_interactive == Interactive::Yes {
            return Err(WlsError::invalid("interactive authentication required"));
        }
    } else if status.is_success() {
        return Err(WlsError::malformed("no authentication types supplied"));
    }
    Ok(())
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn split_list(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(',').filter(|t| !t.is_empty()).map(str::to_string)
}

fn secs(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
