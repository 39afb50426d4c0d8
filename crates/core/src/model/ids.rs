use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("sample id cannot be empty")]
    EmptySampleId,

    #[error("avatar id must be between 1 and 6")]
    AvatarOutOfRange,
}

/// Identifier printed on the sample label.
///
/// Derived once from the session start time and never regenerated; a
/// rehydrated record keeps whatever id it was frozen with.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
    /// Derives the label id from the session start time, using the last
    /// four digits of the epoch-millisecond timestamp.
    #[must_use]
    pub fn derive(started_at: DateTime<Utc>) -> Self {
        let tail = started_at.timestamp_millis().rem_euclid(10_000);
        Self(format!("CU-OX-{tail:04}"))
    }

    /// Rebuilds a sample id from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `IdError::EmptySampleId` if the stored value is blank.
    pub fn from_persisted(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(IdError::EmptySampleId);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One of the fixed set of student avatars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvatarId(u8);

impl AvatarId {
    pub const MAX: u8 = 6;

    /// Creates a new `AvatarId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::AvatarOutOfRange` unless `1 <= id <= 6`.
    pub fn new(id: u8) -> Result<Self, IdError> {
        if (1..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(IdError::AvatarOutOfRange)
        }
    }

    /// Returns the underlying number.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns the picture URL the presentation layer renders.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://picsum.photos/seed/avatar{}/100", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Debug for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleId({})", self.0)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvatarId({})", self.0)
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AvatarId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| IdError::AvatarOutOfRange)
            .and_then(AvatarId::new)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn sample_id_derives_from_start_time() {
        // 1_700_000_000_000 ms ends in 0000.
        let id = SampleId::derive(fixed_now());
        assert_eq!(id.as_str(), "CU-OX-0000");
    }

    #[test]
    fn sample_id_is_stable_for_a_given_start() {
        let at = fixed_now();
        assert_eq!(SampleId::derive(at), SampleId::derive(at));
    }

    #[test]
    fn persisted_sample_id_rejects_blank() {
        assert_eq!(SampleId::from_persisted("  "), Err(IdError::EmptySampleId));
    }

    #[test]
    fn avatar_id_bounds() {
        assert!(AvatarId::new(1).is_ok());
        assert!(AvatarId::new(6).is_ok());
        assert_eq!(AvatarId::new(0), Err(IdError::AvatarOutOfRange));
        assert_eq!(AvatarId::new(7), Err(IdError::AvatarOutOfRange));
    }

    #[test]
    fn avatar_id_renders_seed_url() {
        let avatar = AvatarId::new(3).unwrap();
        assert_eq!(avatar.url(), "https://picsum.photos/seed/avatar3/100");
    }

    #[test]
    fn avatar_id_parses_from_str() {
        let avatar: AvatarId = "4".parse().unwrap();
        assert_eq!(avatar.value(), 4);
        assert!("nope".parse::<AvatarId>().is_err());
    }
}
