//! Identity and ordering types for camlink.

use crate::error::IdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Identifier of a camera producer.
///
/// Cameras pick their own identifier, usually a small integer such as `"1"`
/// or a short name such as `"porch"`. Restricted to 1-64 characters of
/// `[A-Za-z0-9_-]` so it can be embedded in URL paths and metric labels.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CameraId(String);

impl CameraId {
    /// Maximum identifier length in characters.
    pub const MAX_LEN: usize = 64;

    /// Parse and validate a camera identifier.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        if raw.is_empty() {
            return Err(IdError::Empty);
        }
        let len = raw.chars().count();
        if len > Self::MAX_LEN {
            return Err(IdError::TooLong {
                len,
                max: Self::MAX_LEN,
            });
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(IdError::InvalidChar(c));
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CameraId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CameraId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CameraId> for String {
    fn from(id: CameraId) -> Self {
        id.0
    }
}

impl From<u32> for CameraId {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CameraId({})", self.0)
    }
}

/// A per-camera alarm sequence number.
///
/// Assigned by the relay, starting at 1. `Sequence::zero()` means
/// "nothing seen yet" and is what a fresh viewer polls from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    /// Create a new Sequence with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Sequence.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Create a Sequence representing "no events yet".
    pub fn zero() -> Self {
        Self(0)
    }

    /// Increment the sequence by one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence({})", self.0)
    }
}

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// Relay operations take the timestamp as an argument so liveness and
/// retention can be evaluated against synthetic clocks in tests.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Create a Timestamp from milliseconds since the epoch.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a Timestamp from whole seconds since the epoch.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp shifted forward by `d`.
    pub fn after(&self, d: Duration) -> Self {
        Self(self.0.saturating_add(d.as_millis() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_id_accepts_numbers_and_names() {
        assert_eq!(CameraId::parse("1").unwrap().as_str(), "1");
        assert_eq!(CameraId::parse("front-door_2").unwrap().as_str(), "front-door_2");
        assert_eq!(CameraId::from(4u32), CameraId::parse("4").unwrap());
    }

    #[test]
    fn camera_id_rejects_invalid() {
        assert_eq!(CameraId::parse(""), Err(IdError::Empty));
        assert_eq!(CameraId::parse("a/b"), Err(IdError::InvalidChar('/')));
        assert_eq!(CameraId::parse("cam 1"), Err(IdError::InvalidChar(' ')));

        let long = "x".repeat(CameraId::MAX_LEN + 1);
        assert!(matches!(
            CameraId::parse(&long),
            Err(IdError::TooLong { len: 65, max: 64 })
        ));
        assert!(CameraId::parse(&"x".repeat(CameraId::MAX_LEN)).is_ok());
    }

    #[test]
    fn camera_id_serde_validates() {
        let id: CameraId = serde_json::from_str("\"porch\"").unwrap();
        assert_eq!(id.to_string(), "porch");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"porch\"");

        assert!(serde_json::from_str::<CameraId>("\"no spaces\"").is_err());
    }

    #[test]
    fn sequence_ordering() {
        let s1 = Sequence::new(1);
        let s2 = s1.next();
        assert!(s2 > s1);
        assert_eq!(s2.value(), 2);
        assert_eq!(Sequence::zero().next(), Sequence::new(1));
        assert_eq!(Sequence::new(u64::MAX).next(), Sequence::new(u64::MAX));
    }

    #[test]
    fn sequence_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Sequence::new(7)).unwrap(), "7");
    }

    #[test]
    fn timestamp_arithmetic() {
        let t0 = Timestamp::from_secs(10);
        let t1 = t0.after(Duration::from_millis(1500));
        assert_eq!(t1.as_millis(), 11_500);
        assert_eq!(t1.saturating_since(t0), Duration::from_millis(1500));
        assert_eq!(t0.saturating_since(t1), Duration::ZERO);
    }

    #[test]
    fn timestamp_now_is_after_epoch() {
        assert!(Timestamp::now() > Timestamp::from_secs(1_600_000_000));
    }
}
