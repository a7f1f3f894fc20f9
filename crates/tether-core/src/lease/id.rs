use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coordinator-assigned lease identifier.
///
/// etcd's JSON gateway encodes 64-bit integers as strings, so the ID is
/// written as a string and accepted as either a string or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(i64);

impl LeaseId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for LeaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LeaseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        int64::deserialize(deserializer).map(Self)
    }
}

/// A lease as reported by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    #[serde(rename = "ID")]
    pub id: LeaseId,
    /// Remaining (or granted) time-to-live in seconds. Zero or absent means
    /// the coordinator no longer knows the lease.
    #[serde(rename = "TTL", default, with = "int64")]
    pub ttl_secs: i64,
}

impl Lease {
    pub fn new(id: LeaseId, ttl_secs: i64) -> Self {
        Self { id, ttl_secs }
    }

    /// Whether the coordinator still holds this lease.
    pub fn is_alive(&self) -> bool {
        self.ttl_secs > 0
    }
}

/// Serde helpers for int64 fields that may arrive as strings.
pub mod int64 {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
