//! End-to-end validation of signed response tokens.
//!
//! Tokens are produced with `TokenIssuer` and a runtime-generated RSA key, then
//! validated against a frozen clock.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, TimeZone, Utc};
use raven_core::{
    AccessPolicy, AuthMethods, Config, ErrorKind, Interactive, IssuedResponse, KeyId, KeyStore,
    Params, PolicyError, ResponseValidator, Status, TokenIssuer, TrustedKey, WlsError,
};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;

const RETURN_URL: &str = "https://app.example.org/raven/return/";

fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("failed to generate key")
    })
}

fn other_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("failed to generate key")
    })
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

fn kid(s: &str) -> KeyId {
    KeyId::parse(s).unwrap()
}

fn issuer() -> TokenIssuer {
    TokenIssuer::new(test_key().clone(), kid("901"))
}

fn validator(config: Config) -> ResponseValidator {
    let keys = KeyStore::new().with_key(kid("901"), test_key().to_public_key());
    ResponseValidator::new(config, keys)
}

fn v3_validator() -> ResponseValidator {
    validator(Config::new(RETURN_URL))
}

fn success() -> IssuedResponse {
    IssuedResponse::success(RETURN_URL, "abc123", now())
        .with_ptags(["current"])
        .with_life(36000)
        .with_ident("1709285400-25283-0")
}

fn sign(response: &IssuedResponse) -> String {
    issuer().sign(response).expect("signing failed")
}

// Scenario A
#[test]
fn test_v3_success_with_current_ptag() {
    let token = sign(&success().with_params("next=%2Fprofile"));
    let response = v3_validator().validate_at(&token, now()).unwrap();

    assert!(response.is_successful());
    assert_eq!(response.ver, 3);
    assert_eq!(response.principal.as_deref(), Some("abc123"));
    assert_eq!(response.ptags, BTreeSet::from(["current".to_string()]));
    assert_eq!(response.auth.as_deref(), Some("pwd"));
    assert!(response.sso.is_empty());
    assert_eq!(response.life, Some(36000));
    assert_eq!(response.key_id, Some(kid("901")));
    assert!(response.signature.is_some());
    assert_eq!(response.next_url().as_deref(), Some("/profile"));
    assert_eq!(response.uid(), "20240301T093000Z-1709285400-25283-0");
}

// Scenario B
#[test]
fn test_empty_ptags_rejected_only_by_policy() {
    let token = sign(&success().with_ptags(Vec::<String>::new()));
    let response = v3_validator().validate_at(&token, now()).unwrap();
    assert!(response.ptags.is_empty());

    let err = AccessPolicy::current_members().check(&response).unwrap_err();
    assert!(matches!(err, PolicyError::NotAuthorised { .. }));
}

// Scenario C
#[test]
fn test_v3_token_with_thirteen_fields() {
    let token = sign(&success().with_version(2)).replacen('2', "3", 1);
    let err = v3_validator().validate_at(&token, now()).unwrap_err();
    assert_eq!(
        err,
        WlsError::malformed("wrong parameter count: expected 14, got 13")
    );
}

// Scenario D
#[test]
fn test_untrusted_key_id() {
    let untrusted = TokenIssuer::new(other_key().clone(), kid("7"));
    let token = untrusted.sign(&success()).unwrap();
    let err = v3_validator().validate_at(&token, now()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::PublicKeyNotFound);
    assert_eq!(err.exit_code(), 4);
}

// Scenario E
#[test]
fn test_success_without_auth_or_sso() {
    let token = sign(&success().with_auth(""));
    let err = v3_validator().validate_at(&token, now()).unwrap_err();
    assert_eq!(err, WlsError::malformed("no authentication types supplied"));
}

#[test]
fn test_success_with_both_auth_and_sso() {
    let token = sign(&success().with_sso(["pwd"]).with_auth("pwd"));
    assert!(token.contains("!pwd!pwd!"));
    let err = v3_validator().validate_at(&token, now()).unwrap_err();
    assert_eq!(err, WlsError::malformed("both auth and sso supplied"));
}

// Scenario F
#[test]
fn test_cancelled_is_structurally_valid() {
    let cancelled = IssuedResponse::failure(RETURN_URL, Status::Cancelled, now());
    let token = sign(&cancelled);
    let response = v3_validator().validate_at(&token, now()).unwrap();
    assert!(!response.is_successful());
    assert_eq!(response.principal, None);
    assert_eq!(response.status.code(), 410);

    let err = AccessPolicy::default().check(&response).unwrap_err();
    assert!(matches!(err, PolicyError::Unsuccessful { status: 410, .. }));
}

#[test]
fn test_freshness_boundaries_v3() {
    let validator = v3_validator();
    let at = |issue: DateTime<Utc>| sign(&success().with_ident("x").with_issue(issue));

    assert!(validator.validate_at(&at(now()), now()).is_ok());
    assert!(validator
        .validate_at(&at(now() - Duration::seconds(10)), now())
        .is_ok());

    let err = validator
        .validate_at(&at(now() - Duration::seconds(11)), now())
        .unwrap_err();
    assert!(err.is_invalid());
    assert!(err.detail.contains("timed out"));

    let err = validator
        .validate_at(&at(now() + Duration::seconds(1)), now())
        .unwrap_err();
    assert!(err.detail.contains("future"));
}

#[test]
fn test_freshness_boundaries_v2_with_skew() {
    let validator = validator(Config::new(RETURN_URL).with_protocol_version(2));
    let at = |issue: DateTime<Utc>| sign(&success().with_version(2).with_issue(issue));

    assert!(validator
        .validate_at(&at(now() + Duration::seconds(2)), now())
        .is_ok());
    assert!(validator
        .validate_at(&at(now() + Duration::seconds(3)), now())
        .unwrap_err()
        .detail
        .contains("future"));
    assert!(validator
        .validate_at(&at(now() - Duration::seconds(12)), now())
        .is_ok());
    assert!(validator
        .validate_at(&at(now() - Duration::seconds(13)), now())
        .unwrap_err()
        .detail
        .contains("timed out"));
}

#[test]
fn test_tampering_with_signed_fields() {
    let token = sign(&success());
    let validator = v3_validator();

    for (from, to) in [("abc123", "abc124"), ("current", "staff"), ("36000", "99999")] {
        let tampered = token.replacen(from, to, 1);
        assert_ne!(tampered, token);
        let err = validator.validate_at(&tampered, now()).unwrap_err();
        assert_eq!(err, WlsError::invalid("signature invalid"), "tampered {from}");
    }
}

#[test]
fn test_signature_from_wrong_key() {
    let forged = TokenIssuer::new(other_key().clone(), kid("901"))
        .sign(&success())
        .unwrap();
    let err = v3_validator().validate_at(&forged, now()).unwrap_err();
    assert_eq!(err, WlsError::invalid("signature invalid"));
}

#[test]
fn test_escaped_principal_and_params_verify() {
    let response = IssuedResponse::success(RETURN_URL, "odd!user%42", now())
        .with_ptags(["current"])
        .with_params("state=50%!done");
    let token = sign(&response);
    assert!(token.contains("odd%21user%2542"));

    let validated = v3_validator().validate_at(&token, now()).unwrap();
    assert_eq!(validated.principal.as_deref(), Some("odd!user%42"));
    assert_eq!(validated.raw_params, "state=50%!done");
}

#[test]
fn test_validation_is_idempotent() {
    let token = sign(&success());
    let validator = v3_validator();
    let first = validator.validate_at(&token, now()).unwrap();
    let second = validator.validate_at(&token, now()).unwrap();
    assert_eq!(first, second);

    let bad = token.replacen("abc123", "mallory", 1);
    assert_eq!(
        validator.validate_at(&bad, now()).unwrap_err(),
        validator.validate_at(&bad, now()).unwrap_err()
    );
}

#[test]
fn test_missing_or_non_numeric_fields_are_malformed() {
    let token = sign(&success());
    let fields: Vec<&str> = token.split('!').collect();

    for index in 0..fields.len() {
        let mut shorter = fields.clone();
        shorter.remove(index);
        let err = v3_validator()
            .validate_at(&shorter.join("!"), now())
            .unwrap_err();
        assert!(err.is_malformed(), "removed field {index}: {err}");
    }

    // ver, status, life and kid must be numeric
    for index in [0, 1, 10, 12] {
        let mut garbled = fields.clone();
        garbled[index] = "x";
        let err = v3_validator()
            .validate_at(&garbled.join("!"), now())
            .unwrap_err();
        assert!(err.is_malformed(), "garbled field {index}: {err}");
    }
}

#[test]
fn test_v1_success_ignores_ptags() {
    let config = Config::new(RETURN_URL).with_protocol_version(1);
    let token = sign(&success().with_version(1).with_params("opaque;state"));
    let response = validator(config).validate_at(&token, now()).unwrap();
    assert_eq!(response.ver, 1);
    assert!(response.ptags.is_empty());
    assert_eq!(response.params, Params::Opaque("opaque;state".to_string()));
}

#[test]
fn test_v2_sso_and_interactive_requirements() {
    let config = Config::new(RETURN_URL)
        .with_protocol_version(2)
        .with_auth_methods(AuthMethods::only(["pwd", "card"]));
    let token = sign(&success().with_version(2).with_sso(["card"]));

    let response = validator(config.clone()).validate_at(&token, now()).unwrap();
    assert_eq!(response.sso, vec!["card".to_string()]);
    assert!(!response.is_interactive());

    let err = validator(config.with_interactive(Interactive::Yes))
        .validate_at(&token, now())
        .unwrap_err();
    assert_eq!(err, WlsError::invalid("interactive authentication required"));
}

#[test]
fn test_version_mismatch_with_request() {
    let config = Config::new(RETURN_URL).with_protocol_version(1);
    let token = sign(&success().with_version(2));
    let err = validator(config).validate_at(&token, now()).unwrap_err();
    assert!(err.is_malformed());
    assert!(err.detail.starts_with("unsupported or mismatched version"));
}

#[test]
fn test_validator_from_yaml_config() {
    let pem = test_key()
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    let config = Config::new(RETURN_URL).with_trusted_key(TrustedKey::from_pem("901", pem));
    let yaml = serde_yaml::to_string(&config).unwrap();

    let validator = ResponseValidator::from_config(Config::from_yaml(&yaml).unwrap()).unwrap();
    let response = validator.validate_at(&sign(&success()), now()).unwrap();
    assert_eq!(response.principal.as_deref(), Some("abc123"));
}

#[test]
fn test_expected_params_policy() {
    let token = sign(&success().with_params("next=/a"));
    let response = v3_validator().validate_at(&token, now()).unwrap();

    let policy = AccessPolicy::current_members().with_expected_params("next=/a");
    assert!(policy.check(&response).is_ok());

    let policy = AccessPolicy::default().with_expected_params("next=/b");
    assert!(matches!(
        policy.check(&response),
        Err(PolicyError::ParamsMismatch { .. })
    ));
}

#[test]
fn test_key_trusted_through_certificate_file() {
    let fixtures = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let config = Config::new(RETURN_URL)
        .with_trusted_key(TrustedKey::from_path("2", fixtures.join("pubkey2.crt")));
    let validator = ResponseValidator::from_config(config).unwrap();

    let wls = TokenIssuer::from_pem(include_str!("fixtures/privkey2.pem"), kid("2")).unwrap();
    let token = wls.sign(&success()).unwrap();
    let response = validator.validate_at(&token, now()).unwrap();
    assert_eq!(response.key_id, Some(kid("2")));

    let err = validator.validate_at(&sign(&success()), now()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::PublicKeyNotFound);
}
