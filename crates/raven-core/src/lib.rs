//! Validation of WAA2WLS (Raven / Ucam-WebAuth) authentication responses.
//!
//! A web application (WAA) redirects the user to the web login service (WLS),
//! which sends the browser back with a signed response token. This crate
//! turns that token into a trusted [`Response`] or a classified [`WlsError`].
//!
//! - Protocol versions 1, 2 and 3
//! - RSA PKCS#1 v1.5 / SHA-1 signature verification against trusted keys
//! - Freshness, return URL and authentication-method checks
//! - Caller-side access policy (ptags, params echo)
//! - Request URL construction and a development token issuer
//!
//! # Quick Start
//!
//! ```no_run
//! use raven_core::{Config, ResponseValidator};
//!
//! # fn example(token: &str) -> anyhow::Result<()> {
//! let config = Config::from_file("raven.yaml".as_ref())?;
//! let validator = ResponseValidator::from_config(config)?;
//!
//! let response = validator.validate(token)?;
//! if let Some(principal) = &response.principal {
//!     println!("authenticated {principal}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RAVEN_RETURN_URL` | Return URL the WLS must echo |
//! | `RAVEN_PROTOCOL_VERSION` | Protocol version (default: 3) |
//! | `RAVEN_MAX_CLOCK_SKEW` | Clock skew tolerance in seconds (default: 2) |
//! | `RAVEN_TIMEOUT` | Maximum response age in seconds (default: 10) |
//! | `RAVEN_AAUTH` | Accepted auth methods (default: `pwd`) |
//! | `RAVEN_IACT` | Interactive requirement: `yes`, `no` or unset |

pub mod codec;
pub mod config;
pub mod error;
pub mod issue;
pub mod keys;
pub mod layout;
pub mod policy;
pub mod request;
pub mod response;
pub mod signature;
pub mod status;
pub mod validate;

// Re-export main types
pub use config::{AuthMethods, Config, Interactive, LATEST_VERSION};
pub use error::{
    ConfigError, ConfigResult, ErrorKind, PolicyError, WlsError, WlsResult,
};
pub use issue::{IssueError, IssuedResponse, TokenIssuer};
pub use keys::{load_public_key_pem, KeyId, KeyLookup, KeyStore, TrustedKey};
pub use layout::{Field, Layout};
pub use policy::AccessPolicy;
pub use request::{AuthRequest, DEFAULT_LOGIN_URL};
pub use response::{Params, Response};
pub use status::Status;
pub use validate::{validate, validate_at, ResponseValidator};
