//! Workspace quotas

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stored value meaning "no limit"
const UNLIMITED: i64 = -1;

/// Stored value meaning "no workspaces allowed"
const DISABLED: i64 = 0;

/// Quota on the number of non-terminated workspaces
///
/// Persisted and exchanged as an integer: `-1` is unlimited, `0` is disabled,
/// anything positive is a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Quota {
    #[default]
    Unlimited,
    Disabled,
    Limited(u32),
}

impl Quota {
    /// Convert from the stored integer
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            UNLIMITED => Some(Quota::Unlimited),
            DISABLED => Some(Quota::Disabled),
            n if n > 0 => u32::try_from(n).ok().map(Quota::Limited),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Quota::Unlimited => UNLIMITED,
            Quota::Disabled => DISABLED,
            Quota::Limited(n) => i64::from(*n),
        }
    }

    /// Whether `count` existing workspaces leave no room for another one
    pub fn is_exceeded_by(&self, count: i64) -> bool {
        match self {
            Quota::Unlimited => false,
            Quota::Disabled => true,
            Quota::Limited(n) => count >= i64::from(*n),
        }
    }
}

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for Quota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Quota::from_i64(value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid quota {}: expected -1 (unlimited), 0 (disabled) or a positive limit",
                value
            ))
        })
    }
}
