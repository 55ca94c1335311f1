//! Airline carrier code type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid carrier code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid carrier code: {reason}")]
pub struct InvalidCarrierCode {
    reason: &'static str,
}

/// A valid 2-character IATA airline designator.
///
/// Designators are two uppercase ASCII letters or digits, and at least one
/// of the two must be a letter (e.g. "AA", "9W", "B6").
///
/// # Examples
///
/// ```
/// use transfer_rules::domain::CarrierCode;
///
/// let aa = CarrierCode::parse("AA").unwrap();
/// assert_eq!(aa.as_str(), "AA");
///
/// assert!(CarrierCode::parse("9W").is_ok());
///
/// // Lowercase is rejected
/// assert!(CarrierCode::parse("aa").is_err());
///
/// // Two digits are rejected
/// assert!(CarrierCode::parse("12").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CarrierCode([u8; 2]);

impl CarrierCode {
    /// Parse a carrier code from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidCarrierCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 2 {
            return Err(InvalidCarrierCode {
                reason: "must be exactly 2 characters",
            });
        }

        for &b in bytes {
            if !(b.is_ascii_uppercase() || b.is_ascii_digit()) {
                return Err(InvalidCarrierCode {
                    reason: "must be uppercase ASCII letters or digits",
                });
            }
        }

        if bytes.iter().all(u8::is_ascii_digit) {
            return Err(InvalidCarrierCode {
                reason: "must contain at least one letter",
            });
        }

        Ok(CarrierCode([bytes[0], bytes[1]]))
    }

    /// Returns the carrier code as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl TryFrom<String> for CarrierCode {
    type Error = InvalidCarrierCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CarrierCode> for String {
    fn from(code: CarrierCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Debug for CarrierCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CarrierCode({})", self.as_str())
    }
}

impl fmt::Display for CarrierCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
