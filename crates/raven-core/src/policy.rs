//! Application-side authorization of a validated response.
//!
//! Validation answers "did the WLS say this?"; [`AccessPolicy`] answers
//! "does the application let this principal in?".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::response::Response;

/// The ptag carried by current members of the University.
pub const CURRENT_PTAG: &str = "current";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    /// Every tag must be present on a version 3 response.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub required_ptags: BTreeSet<String>,

    /// The `params` value the request was sent with, if the application
    /// wants the echo checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_params: Option<String>,
}

impl AccessPolicy {
    /// Admit only principals tagged `current`.
    pub fn current_members() -> Self {
        Self::default().with_required_ptag(CURRENT_PTAG)
    }

    pub fn with_required_ptag(mut self, tag: impl Into<String>) -> Self {
        self.required_ptags.insert(tag.into());
        self
    }

    pub fn with_expected_params(mut self, params: impl Into<String>) -> Self {
        self.expected_params = Some(params.into());
        self
    }

    /// Decide whether `response` grants access.
    ///
    /// Versions 1 and 2 carry no ptags, so the ptag requirement only applies
    /// to version 3.
    pub fn check(&self, response: &Response) -> Result<(), PolicyError> {
        if !response.is_successful() {
            return Err(PolicyError::Unsuccessful {
                status: response.status.code(),
                description: response.status.description(),
            });
        }

        if response.ver >= 3 {
            let missing: Vec<String> = self
                .required_ptags
                .iter()
                .filter(|tag| !response.has_ptag(tag))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(PolicyError::NotAuthorised {
                    principal: response.principal.clone().unwrap_or_default(),
                    missing,
                });
            }
        }

        if let Some(expected) = &self.expected_params {
            if *expected != response.raw_params {
                return Err(PolicyError::ParamsMismatch {
                    expected: expected.clone(),
                    actual: response.raw_params.clone(),
                });
            }
        }
        Ok(())
    }
}
