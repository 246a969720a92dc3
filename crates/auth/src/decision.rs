use serde::Serialize;

use crate::{Grant, Scope};

/// Why a request was denied.
///
/// Absence of an element, rule or role is never reported distinctly; it is
/// always `Forbidden`, so denials do not reveal which resources exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The actor presented no usable identity.
    Unauthenticated,
    /// The actor is known but lacks the permission.
    Forbidden,
}

impl DenyReason {
    /// HTTP status the boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            DenyReason::Unauthenticated => 401,
            DenyReason::Forbidden => 403,
        }
    }

    /// Stable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::Forbidden => "forbidden",
        }
    }

    /// Fixed, detail-free message for error bodies.
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "authentication required",
            DenyReason::Forbidden => "access denied",
        }
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Allow(Grant),
    Deny { reason: DenyReason },
}

impl Decision {
    pub fn deny(reason: DenyReason) -> Self {
        Decision::Deny { reason }
    }

    pub fn forbidden() -> Self {
        Self::deny(DenyReason::Forbidden)
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn grant(&self) -> Option<&Grant> {
        match self {
            Decision::Allow(grant) => Some(grant),
            Decision::Deny { .. } => None,
        }
    }

    pub fn scope(&self) -> Option<Scope> {
        self.grant().map(Grant::scope)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow(_) => None,
            Decision::Deny { reason } => Some(*reason),
        }
    }

    /// Convert into a `Result`, for `?` at the boundary.
    pub fn into_result(self) -> Result<Grant, DenyReason> {
        match self {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny { reason } => Err(reason),
        }
    }
}
