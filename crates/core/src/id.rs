//! Strongly-typed identifiers used across the domain.
//!
//! `JobId` deliberately encodes its owning user: the rendered form is
//! `<user>:<job-type>:<nonce>`, so ownership can be verified from the raw
//! identifier alone, without a store lookup. Construction and parsing are
//! exactly symmetric — the owner is always recoverable losslessly.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a user (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<UserId> for Uuid {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("UserId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Ownership-encoded job identifier.
///
/// Rendered as `<user>:<job-type>:<nonce>`. The job-type segment is the
/// kebab-case handler name; neither UUID segment can contain `:`, so the
/// three segments are unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId {
    owner: UserId,
    kind: String,
    nonce: Uuid,
}

impl JobId {
    /// Construct a fresh id owned by `owner` for the given job type.
    ///
    /// The nonce is UUIDv7, which also makes ids time-ordered per owner.
    pub fn new(owner: UserId, kind: impl Into<String>) -> Self {
        Self {
            owner,
            kind: kind.into(),
            nonce: Uuid::now_v7(),
        }
    }

    /// The user this job belongs to.
    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// The job-type segment (handler name).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Check whether a *raw* identifier string belongs to `user`.
    ///
    /// This is the authorization primitive: it must hold for malformed ids
    /// too (a garbage id is nobody's job), so it works on the string prefix
    /// rather than a parsed value.
    pub fn verify_ownership(raw: &str, user: UserId) -> bool {
        match raw.split_once(':') {
            Some((prefix, _)) => prefix == user.to_string(),
            None => false,
        }
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}:{}", self.owner, self.kind, self.nonce)
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (owner, kind, nonce) = match (parts.next(), parts.next(), parts.next()) {
            (Some(o), Some(k), Some(n)) => (o, k, n),
            _ => return Err(DomainError::invalid_id("JobId: expected 3 segments")),
        };

        if kind.is_empty() {
            return Err(DomainError::invalid_id("JobId: empty job-type segment"));
        }

        let owner: UserId = owner.parse()?;
        let nonce =
            Uuid::from_str(nonce).map_err(|e| DomainError::invalid_id(format!("JobId: {e}")))?;

        Ok(Self {
            owner,
            kind: kind.to_string(),
            nonce,
        })
    }
}

impl TryFrom<String> for JobId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn job_id_display_parse_symmetry() {
        let owner = UserId::new();
        let id = JobId::new(owner, "resume-optimization");

        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.owner(), owner);
        assert_eq!(parsed.kind(), "resume-optimization");
    }

    #[test]
    fn ownership_check_holds_for_owner_only() {
        let owner = UserId::new();
        let other = UserId::new();
        let raw = JobId::new(owner, "career-insights").to_string();

        assert!(JobId::verify_ownership(&raw, owner));
        assert!(!JobId::verify_ownership(&raw, other));
    }

    #[test]
    fn ownership_check_rejects_malformed_ids() {
        let user = UserId::new();

        assert!(!JobId::verify_ownership("", user));
        assert!(!JobId::verify_ownership("no-colons-here", user));
        assert!(!JobId::verify_ownership("not-a-uuid:type:nonce", user));
    }

    #[test]
    fn parse_rejects_missing_segments() {
        let owner = UserId::new();

        assert!(format!("{owner}").parse::<JobId>().is_err());
        assert!(format!("{owner}:only-type").parse::<JobId>().is_err());
        assert!(format!("{owner}::{}", Uuid::now_v7()).parse::<JobId>().is_err());
    }

    proptest! {
        // Authorization invariant: an id never verifies against a user other
        // than the one it was constructed for.
        #[test]
        fn ownership_never_crosses_users(a in any::<u128>(), b in any::<u128>()) {
            prop_assume!(a != b);
            let owner = UserId::from_uuid(Uuid::from_u128(a));
            let other = UserId::from_uuid(Uuid::from_u128(b));
            let raw = JobId::new(owner, "skill-gap-analysis").to_string();

            prop_assert!(JobId::verify_ownership(&raw, owner));
            prop_assert!(!JobId::verify_ownership(&raw, other));
        }
    }
}
