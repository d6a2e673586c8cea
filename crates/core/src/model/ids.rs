use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of hex characters in a rendered `ObjectId`.
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Error type for parsing an id from a string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("{kind} must be 24 hex characters, got {len}")]
    InvalidLength { kind: &'static str, len: usize },

    #[error("{kind} contains a non-hex character")]
    InvalidHex { kind: &'static str },
}

/// 12-byte document identifier, rendered as 24 lowercase hex characters.
///
/// Layout of generated ids: 4-byte big-endian unix seconds, then 8 random bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a fresh id stamped with the given time.
    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        let secs = u32::try_from(at.timestamp().max(0)).unwrap_or(u32::MAX);
        let tail: [u8; 8] = rand::random();
        let mut bytes = [0_u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..].copy_from_slice(&tail);
        Self(bytes)
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use fmt::Write as _;
        let mut out = String::with_capacity(OBJECT_ID_HEX_LEN);
        for b in self.0 {
            let _ = write!(out, "{b:02x}");
        }
        out
    }

    fn parse_as(kind: &'static str, s: &str) -> Result<Self, IdError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(IdError::InvalidLength {
                kind,
                len: s.chars().count(),
            });
        }
        let raw = s.as_bytes();
        let mut bytes = [0_u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_value(raw[2 * i]).ok_or(IdError::InvalidHex { kind })?;
            let lo = hex_value(raw[2 * i + 1]).ok_or(IdError::InvalidHex { kind })?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_as("ObjectId", s)
    }
}

/// Unique identifier for a lesson in the catalog
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LessonId(ObjectId);

impl LessonId {
    #[must_use]
    pub fn new(id: ObjectId) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(ObjectId::generate(at))
    }

    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

/// Unique identifier for a learner account
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(ObjectId);

impl UserId {
    #[must_use]
    pub fn new(id: ObjectId) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(ObjectId::generate(at))
    }

    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

/// Unique identifier for a section inside a lesson
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(ObjectId);

impl SectionId {
    #[must_use]
    pub fn new(id: ObjectId) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(ObjectId::generate(at))
    }

    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SectionId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

impl FromStr for LessonId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_as("LessonId", s).map(Self)
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_as("UserId", s).map(Self)
    }
}

impl FromStr for SectionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_as("SectionId", s).map(Self)
    }
}

// ─── Serde (hex strings on the wire) ───────────────────────────────────────────

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for LessonId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LessonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for SectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
