//! Single-character indicator fields of the transfer rule record.
//!
//! Each indicator is an enum whose serde form is the filed character. The
//! blank value deserializes from either `""` or `" "`.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an indicator field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid indicator {value:?}: {reason}")]
pub struct InvalidIndicator {
    value: String,
    reason: &'static str,
}

/// Availability of the rule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnavailableTag {
    #[default]
    #[serde(rename = "", alias = " ")]
    Available,
    /// Record may not be used for pricing.
    #[serde(rename = "X")]
    NotAvailable,
    /// Record carries text only.
    #[serde(rename = "Y")]
    TextOnly,
}

/// How the out and in maxima combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InOutApplication {
    #[default]
    #[serde(rename = "", alias = " ")]
    Combined,
    /// Transfers permitted outbound or inbound, not both.
    #[serde(rename = "X")]
    OutOrReturnExclusive,
}

/// Whether a sub-segment's transfer is required, permitted or forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Applicability {
    #[serde(rename = "R")]
    Required,
    #[default]
    #[serde(rename = "", alias = " ")]
    Permitted,
    #[serde(rename = "N")]
    NotPermitted,
}

/// Portion of travel a sub-segment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InOutPortion {
    #[default]
    #[serde(rename = "", alias = " ")]
    Blank,
    #[serde(rename = "O")]
    Outbound,
    #[serde(rename = "I")]
    Inbound,
    /// Outbound or inbound, not both.
    #[serde(rename = "E")]
    Either,
    /// Outbound and inbound, each counted separately.
    #[serde(rename = "B")]
    Both,
}

impl InOutPortion {
    pub fn is_blank(&self) -> bool {
        matches!(self, InOutPortion::Blank)
    }

    /// Blank or either: the sub-segment is not tied to one fare component.
    pub fn spans_pricing_unit(&self) -> bool {
        matches!(self, InOutPortion::Blank | InOutPortion::Either)
    }
}

/// Domestic / international restriction on the two flights of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Restriction {
    #[default]
    #[serde(rename = "", alias = " ")]
    Blank,
    /// Both flights domestic.
    #[serde(rename = "D")]
    Domestic,
    /// Both flights international.
    #[serde(rename = "I")]
    International,
    /// One domestic and one international flight.
    #[serde(rename = "B")]
    Mixed,
}

/// Which charge a matched sub-segment applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChargeAppl {
    #[default]
    #[serde(rename = "", alias = " ")]
    NoCharge,
    #[serde(rename = "1")]
    Charge1,
    #[serde(rename = "2")]
    Charge2,
}

/// Stopover or connection requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopConn {
    #[default]
    #[serde(rename = "", alias = " ")]
    Either,
    #[serde(rename = "S")]
    Stopover,
    #[serde(rename = "C")]
    Connection,
}

/// How the in/out carriers of a sub-segment are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarrierAppl {
    /// Inbound carrier against carrier in, outbound against carrier out.
    #[default]
    #[serde(rename = "", alias = " ")]
    Direct,
    /// Either orientation may match.
    #[serde(rename = "X")]
    Between,
}

/// Application of one carrier application table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarrierTableAppl {
    #[default]
    #[serde(rename = "", alias = " ")]
    Permitted,
    #[serde(rename = "X")]
    NotPermitted,
}

/// Whether a surface sector may sit at a fare break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FareBreakSurface {
    #[default]
    #[serde(rename = "Y", alias = "", alias = " ")]
    Permitted,
    #[serde(rename = "N")]
    NotPermitted,
}

/// Domestic / international restriction of a surface table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurfaceRestriction {
    #[default]
    #[serde(rename = "", alias = " ")]
    Either,
    #[serde(rename = "D")]
    Domestic,
    #[serde(rename = "I")]
    International,
}

/// Which end of the fare component a fare-break surface entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurfaceOrigDest {
    #[default]
    #[serde(rename = "", alias = " ")]
    Either,
    #[serde(rename = "O")]
    Origin,
    #[serde(rename = "D")]
    Destination,
}

/// Maximum number of surface sectors embedded in one fare component.
///
/// Filed as `N` (none), a digit `1`-`9`, or anything else for unlimited.
///
/// # Examples
///
/// ```
/// use transfer_rules::record::EmbeddedSurfaces;
///
/// assert_eq!(EmbeddedSurfaces::parse("N"), Ok(EmbeddedSurfaces::NotPermitted));
/// assert_eq!(EmbeddedSurfaces::parse("3"), Ok(EmbeddedSurfaces::Max(3)));
/// assert_eq!(EmbeddedSurfaces::parse(""), Ok(EmbeddedSurfaces::Unlimited));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EmbeddedSurfaces {
    NotPermitted,
    Max(u8),
    #[default]
    Unlimited,
}

impl EmbeddedSurfaces {
    /// Parse the filed indicator.
    pub fn parse(s: &str) -> Result<Self, InvalidIndicator> {
        let mut chars = s.chars();
        let Some(c) = chars.next() else {
            return Ok(EmbeddedSurfaces::Unlimited);
        };
        if chars.next().is_some() {
            return Err(InvalidIndicator {
                value: s.to_string(),
                reason: "must be a single character",
            });
        }

        Ok(match c {
            'N' => EmbeddedSurfaces::NotPermitted,
            '1'..='9' => EmbeddedSurfaces::Max(c as u8 - b'0'),
            _ => EmbeddedSurfaces::Unlimited,
        })
    }

    /// The maximum as a count, or `None` when unlimited.
    pub fn limit(&self) -> Option<usize> {
        match self {
            EmbeddedSurfaces::NotPermitted => Some(0),
            EmbeddedSurfaces::Max(n) => Some(usize::from(*n)),
            EmbeddedSurfaces::Unlimited => None,
        }
    }

    pub fn is_permitted(&self) -> bool {
        self.limit() != Some(0)
    }
}

impl TryFrom<String> for EmbeddedSurfaces {
    type Error = InvalidIndicator;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmbeddedSurfaces> for String {
    fn from(value: EmbeddedSurfaces) -> Self {
        match value {
            EmbeddedSurfaces::NotPermitted => "N".to_string(),
            EmbeddedSurfaces::Max(n) => n.to_string(),
            EmbeddedSurfaces::Unlimited => String::new(),
        }
    }
}
