//! Transfer count fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid transfer count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transfer count: {reason}")]
pub struct InvalidTransferCount {
    reason: &'static str,
}

/// A numeric transfer limit as filed in a rule record.
///
/// Counts are filed as up to two digits, or as `XX` for unlimited. A blank
/// field is modelled as `Option::None` by the record that holds it, since
/// blank and unlimited behave differently in several checks.
///
/// # Examples
///
/// ```
/// use transfer_rules::record::TransferCount;
///
/// assert_eq!(TransferCount::parse("XX"), Ok(TransferCount::Unlimited));
/// assert_eq!(TransferCount::parse("02"), Ok(TransferCount::Limited(2)));
/// assert!(TransferCount::parse("2X").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransferCount {
    Limited(u16),
    #[default]
    Unlimited,
}

impl TransferCount {
    /// The filed value for "no limit".
    pub const UNLIMITED: &'static str = "XX";

    /// Parse a filed count: `XX` or up to two decimal digits.
    pub fn parse(s: &str) -> Result<Self, InvalidTransferCount> {
        if s == Self::UNLIMITED {
            return Ok(TransferCount::Unlimited);
        }

        if s.is_empty() || s.len() > 2 {
            return Err(InvalidTransferCount {
                reason: "must be XX or 1-2 digits",
            });
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidTransferCount {
                reason: "must contain only digits",
            });
        }

        s.parse::<u16>()
            .map(TransferCount::Limited)
            .map_err(|_| InvalidTransferCount {
                reason: "out of range",
            })
    }

    /// The limit, or `None` when unlimited.
    pub fn limit(&self) -> Option<u16> {
        match self {
            TransferCount::Limited(n) => Some(*n),
            TransferCount::Unlimited => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, TransferCount::Unlimited)
    }

    /// True if `count` transfers would exceed this limit.
    pub fn is_exceeded_by(&self, count: u16) -> bool {
        self.limit().is_some_and(|max| count > max)
    }

    /// True if `count` transfers have already used up this limit.
    pub fn is_reached_by(&self, count: u16) -> bool {
        self.limit().is_some_and(|max| count >= max)
    }
}

impl TryFrom<String> for TransferCount {
    type Error = InvalidTransferCount;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TransferCount> for String {
    fn from(count: TransferCount) -> Self {
        count.to_string()
    }
}

impl fmt::Display for TransferCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferCount::Limited(n) => write!(f, "{n}"),
            TransferCount::Unlimited => f.write_str(Self::UNLIMITED),
        }
    }
}
