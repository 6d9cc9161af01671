//! WLS status codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code reported by the WLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Status {
    Success,
    Cancelled,
    NoMutualAuthTypes,
    UnsupportedVersion,
    RequestParameterError,
    InteractionRequired,
    WaaNotAuthorised,
    AuthenticationDeclined,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Self::Success,
        Self::Cancelled,
        Self::NoMutualAuthTypes,
        Self::UnsupportedVersion,
        Self::RequestParameterError,
        Self::InteractionRequired,
        Self::WaaNotAuthorised,
        Self::AuthenticationDeclined,
    ];

    pub fn code(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Cancelled => 410,
            Self::NoMutualAuthTypes => 510,
            Self::UnsupportedVersion => 520,
            Self::RequestParameterError => 530,
            Self::InteractionRequired => 540,
            Self::WaaNotAuthorised => 560,
            Self::AuthenticationDeclined => 570,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Success => "Successful authentication",
            Self::Cancelled => "User cancelled authentication",
            Self::NoMutualAuthTypes => "No mutually acceptable authentication types available",
            Self::UnsupportedVersion => "Unsupported protocol version",
            Self::RequestParameterError => "General request parameter error",
            Self::InteractionRequired => "Interaction would be required",
            Self::WaaNotAuthorised => "WAA not authorised to use this WLS",
            Self::AuthenticationDeclined => "Authentication declined",
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// Unknown status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0}")]
pub struct UnknownStatus(pub u16);

impl TryFrom<u16> for Status {
    type Error = UnknownStatus;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(UnknownStatus(code))
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> Self {
        status.code()
    }
}
