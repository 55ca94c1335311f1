//! Airport, city and nation codes, and the resolved location record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid location code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid location code: {reason}")]
pub struct InvalidLocCode {
    reason: &'static str,
}

/// A valid 3-letter IATA airport or city code.
///
/// # Examples
///
/// ```
/// use transfer_rules::domain::LocCode;
///
/// let chi = LocCode::parse("CHI").unwrap();
/// assert_eq!(chi.as_str(), "CHI");
///
/// assert!(LocCode::parse("chi").is_err());
/// assert!(LocCode::parse("CH").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocCode([u8; 3]);

impl LocCode {
    /// Parse a location code from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidLocCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidLocCode {
                reason: "must be exactly 3 characters",
            });
        }

        for &b in bytes {
            if !b.is_ascii_uppercase() {
                return Err(InvalidLocCode {
                    reason: "must be uppercase ASCII letters A-Z",
                });
            }
        }

        Ok(LocCode([bytes[0], bytes[1], bytes[2]]))
    }

    /// Returns the location code as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl TryFrom<String> for LocCode {
    type Error = InvalidLocCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LocCode> for String {
    fn from(code: LocCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Debug for LocCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocCode({})", self.as_str())
    }
}

impl fmt::Display for LocCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A 2-letter ISO nation code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationCode([u8; 2]);

impl NationCode {
    /// Parse a nation code. The input must be exactly 2 uppercase ASCII letters.
    pub fn parse(s: &str) -> Result<Self, InvalidLocCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(InvalidLocCode {
                reason: "nation must be exactly 2 uppercase ASCII letters",
            });
        }

        Ok(NationCode([bytes[0], bytes[1]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Russia is filed under two nation codes (European and Asian parts).
    pub fn is_russia(&self) -> bool {
        matches!(self.as_str(), "RU" | "XU")
    }
}

impl TryFrom<String> for NationCode {
    type Error = InvalidLocCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NationCode> for String {
    fn from(code: NationCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Debug for NationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NationCode({})", self.as_str())
    }
}

impl fmt::Display for NationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A resolved point of travel.
///
/// `city` is the multi-transport city the airport belongs to (equal to
/// `code` for single-airport cities). `area` is the IATA traffic conference
/// area (1, 2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub code: LocCode,
    pub city: LocCode,
    pub nation: NationCode,
    pub area: u8,
}

impl Location {
    /// Create a location.
    pub fn new(code: LocCode, city: LocCode, nation: NationCode, area: u8) -> Self {
        Self {
            code,
            city,
            nation,
            area,
        }
    }

    /// True if both points lie in the same nation for transfer purposes.
    pub fn same_nation(&self, other: &Location) -> bool {
        self.nation == other.nation || (self.nation.is_russia() && other.nation.is_russia())
    }
}
