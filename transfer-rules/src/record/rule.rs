//! The transfer rule record and its sub-segments.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    Applicability, CarrierAppl, CarrierTableAppl, ChargeAppl, EmbeddedSurfaces, FareBreakSurface,
    InOutApplication, InOutPortion, Restriction, StopConn, SurfaceOrigDest, SurfaceRestriction,
    TransferCount, UnavailableTag,
};
use crate::domain::CarrierCode;

/// Kind of location a [`LocKey`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocType {
    #[serde(rename = "A")]
    Area,
    #[serde(rename = "*")]
    SubArea,
    #[serde(rename = "Z")]
    Zone,
    #[serde(rename = "N")]
    Nation,
    #[serde(rename = "S")]
    State,
    #[serde(rename = "C")]
    City,
    #[serde(rename = "P")]
    Airport,
}

/// A typed geographic reference, e.g. nation `US` or city `CHI`.
///
/// A key with a type but no code matches any location of that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocKey {
    pub loc_type: LocType,
    #[serde(default)]
    pub code: String,
}

impl LocKey {
    pub fn new(loc_type: LocType, code: impl Into<String>) -> Self {
        Self {
            loc_type,
            code: code.into(),
        }
    }

    /// A key naming only a location type.
    pub fn of_type(loc_type: LocType) -> Self {
        Self::new(loc_type, "")
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }
}

impl fmt::Display for LocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.loc_type {
            LocType::Area => 'A',
            LocType::SubArea => '*',
            LocType::Zone => 'Z',
            LocType::Nation => 'N',
            LocType::State => 'S',
            LocType::City => 'C',
            LocType::Airport => 'P',
        };
        write!(f, "{tag}-{}", self.code)
    }
}

/// Carrier pairing of a transfer, relative to the governing carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierPair {
    /// Governing carrier in and out.
    PrimePrime,
    /// The same non-governing carrier in and out.
    SameSame,
    /// Governing carrier on one side only.
    PrimeOther,
    /// Two different non-governing carriers.
    OtherOther,
}

impl CarrierPair {
    /// Diagnostic code for the pairing.
    pub fn code(&self) -> &'static str {
        match self {
            CarrierPair::PrimePrime => "P/P",
            CarrierPair::SameSame => "S/S",
            CarrierPair::PrimeOther => "P/O",
            CarrierPair::OtherOther => "O/O",
        }
    }
}

/// Per-pairing allow flags of a sub-segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairFlags {
    #[serde(default)]
    pub prime_prime: bool,
    #[serde(default)]
    pub same_same: bool,
    #[serde(default)]
    pub prime_other: bool,
    #[serde(default)]
    pub other_other: bool,
}

impl PairFlags {
    pub fn any(&self) -> bool {
        self.prime_prime || self.same_same || self.prime_other || self.other_other
    }

    pub fn allows(&self, pair: CarrierPair) -> bool {
        match pair {
            CarrierPair::PrimePrime => self.prime_prime,
            CarrierPair::SameSame => self.same_same,
            CarrierPair::PrimeOther => self.prime_other,
            CarrierPair::OtherOther => self.other_other,
        }
    }
}

/// Record-level pairing allowances.
///
/// `None` leaves a pairing blank; `Some(max)` allows it up to `max`
/// transfers. When every pairing is blank all pairings are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarrierPairLimits {
    #[serde(default)]
    pub prime_prime: Option<TransferCount>,
    #[serde(default)]
    pub same_same: Option<TransferCount>,
    #[serde(default)]
    pub prime_other: Option<TransferCount>,
    #[serde(default)]
    pub other_other: Option<TransferCount>,
}

impl CarrierPairLimits {
    pub fn all_blank(&self) -> bool {
        self.prime_prime.is_none()
            && self.same_same.is_none()
            && self.prime_other.is_none()
            && self.other_other.is_none()
    }

    pub fn limit(&self, pair: CarrierPair) -> Option<TransferCount> {
        match pair {
            CarrierPair::PrimePrime => self.prime_prime,
            CarrierPair::SameSame => self.same_same,
            CarrierPair::PrimeOther => self.prime_other,
            CarrierPair::OtherOther => self.other_other,
        }
    }

    pub fn allows(&self, pair: CarrierPair) -> bool {
        self.all_blank() || self.limit(pair).is_some()
    }
}

/// Transfer charges in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeColumn {
    pub currency: String,
    /// First charge, in minor units.
    pub charge1: i64,
    /// Second charge, in minor units.
    #[serde(default)]
    pub charge2: i64,
    #[serde(default)]
    pub decimals: u8,
}

/// Charges filed on the record, in up to two currencies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferCharges {
    #[serde(default)]
    pub first: Option<ChargeColumn>,
    #[serde(default)]
    pub second: Option<ChargeColumn>,
    /// Transfers that may carry the first charge; blank is unlimited.
    #[serde(default)]
    pub max_charge1: TransferCount,
    /// Transfers that may carry the second charge; blank is unlimited.
    #[serde(default)]
    pub max_charge2: TransferCount,
}

impl TransferCharges {
    /// The column to charge a fare published in `fare_currency`.
    ///
    /// A single column is always used. With two columns the one in the fare
    /// currency wins; `Err` carries both currencies when neither matches.
    pub fn column_for(&self, fare_currency: &str) -> Result<Option<&ChargeColumn>, (String, String)> {
        match (&self.first, &self.second) {
            (None, None) => Ok(None),
            (Some(c), None) | (None, Some(c)) => Ok(Some(c)),
            (Some(a), Some(b)) => {
                if a.currency == fare_currency {
                    Ok(Some(a))
                } else if b.currency == fare_currency {
                    Ok(Some(b))
                } else {
                    Err((a.currency.clone(), b.currency.clone()))
                }
            }
        }
    }
}

/// Carrier named in a carrier application table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CarrierSelector {
    /// `$$`: any carrier.
    Any,
    Carrier(CarrierCode),
}

impl CarrierSelector {
    pub fn matches(&self, carrier: CarrierCode) -> bool {
        match self {
            CarrierSelector::Any => true,
            CarrierSelector::Carrier(c) => *c == carrier,
        }
    }
}

impl TryFrom<String> for CarrierSelector {
    type Error = crate::domain::InvalidCarrierCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "$$" {
            Ok(CarrierSelector::Any)
        } else {
            CarrierCode::parse(&value).map(CarrierSelector::Carrier)
        }
    }
}

impl From<CarrierSelector> for String {
    fn from(value: CarrierSelector) -> Self {
        match value {
            CarrierSelector::Any => "$$".to_string(),
            CarrierSelector::Carrier(c) => c.as_str().to_string(),
        }
    }
}

/// One entry of a carrier application table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierApplEntry {
    pub carrier: CarrierSelector,
    #[serde(default)]
    pub appl: CarrierTableAppl,
}

/// One entry of a surface transfer table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceTransferEntry {
    #[serde(default)]
    pub restriction: SurfaceRestriction,
    #[serde(default)]
    pub orig_dest: SurfaceOrigDest,
    /// Location at the fare break (or first end of an embedded surface).
    #[serde(default)]
    pub fare_break_loc: Option<LocKey>,
    /// Location at the other end of the surface sector.
    #[serde(default)]
    pub surface_loc: Option<LocKey>,
}

impl SurfaceTransferEntry {
    pub fn has_both_locations(&self) -> bool {
        self.fare_break_loc.is_some() && self.surface_loc.is_some()
    }
}

/// One recurring segment of the rule: a pattern a transfer point may match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSubSegment {
    pub order_no: u32,
    #[serde(default)]
    pub applicability: Applicability,
    #[serde(default)]
    pub loc1: Option<LocKey>,
    #[serde(default)]
    pub loc2: Option<LocKey>,
    #[serde(default)]
    pub zone_table: Option<u32>,
    #[serde(default)]
    pub tsi: Option<u16>,
    /// Geography is a window between loc1 and loc2 rather than a point.
    #[serde(default)]
    pub between: bool,
    #[serde(default)]
    pub carrier_in: Option<CarrierCode>,
    #[serde(default)]
    pub carrier_out: Option<CarrierCode>,
    #[serde(default)]
    pub carrier_in_table: Option<u32>,
    #[serde(default)]
    pub carrier_out_table: Option<u32>,
    #[serde(default)]
    pub carrier_appl: CarrierAppl,
    #[serde(default)]
    pub stop_conn: StopConn,
    #[serde(default)]
    pub in_out: InOutPortion,
    #[serde(default)]
    pub restriction: Restriction,
    #[serde(default)]
    pub charge: ChargeAppl,
    #[serde(default)]
    pub max_transfers: TransferCount,
    #[serde(default)]
    pub gateway_only: bool,
    #[serde(default)]
    pub transfer_types: PairFlags,
}

impl RuleSubSegment {
    /// A sub-segment that matches every transfer.
    pub fn new(order_no: u32) -> Self {
        Self {
            order_no,
            applicability: Applicability::Permitted,
            loc1: None,
            loc2: None,
            zone_table: None,
            tsi: None,
            between: false,
            carrier_in: None,
            carrier_out: None,
            carrier_in_table: None,
            carrier_out_table: None,
            carrier_appl: CarrierAppl::Direct,
            stop_conn: StopConn::Either,
            in_out: InOutPortion::Blank,
            restriction: Restriction::Blank,
            charge: ChargeAppl::NoCharge,
            max_transfers: TransferCount::Unlimited,
            gateway_only: false,
            transfer_types: PairFlags::default(),
        }
    }

    /// A location or zone is coded (TSI aside).
    pub fn has_loc_or_zone(&self) -> bool {
        self.loc1.is_some() || self.loc2.is_some() || self.zone_table.is_some()
    }

    /// Any geographic restriction is coded, TSI included.
    pub fn has_geo(&self) -> bool {
        self.loc1.is_some() || self.loc2.is_some() || self.tsi.is_some()
    }

    /// loc1 names only a location type, with no codes anywhere.
    pub fn is_loc_type_only(&self) -> bool {
        self.loc1.as_ref().is_some_and(|k| !k.has_code())
            && !self.loc2.as_ref().is_some_and(LocKey::has_code)
    }

    /// The in/out portion needs checking against the transfer direction.
    pub fn checks_in_out(&self) -> bool {
        !self.in_out.is_blank()
    }

    pub fn is_not_permitted(&self) -> bool {
        self.applicability == Applicability::NotPermitted
    }
}

/// A transfer restriction rule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRule {
    pub vendor: String,
    pub item_no: u32,
    #[serde(default)]
    pub unavailable: UnavailableTag,
    /// Blank when absent.
    #[serde(default)]
    pub min_transfers: Option<u16>,
    #[serde(default)]
    pub max_transfers: Option<TransferCount>,
    #[serde(default)]
    pub out_max: Option<TransferCount>,
    #[serde(default)]
    pub in_max: Option<TransferCount>,
    #[serde(default)]
    pub in_out_application: InOutApplication,
    #[serde(default)]
    pub carrier_pairs: CarrierPairLimits,
    #[serde(default)]
    pub fare_break_surface: FareBreakSurface,
    #[serde(default)]
    pub fare_break_surface_table: Option<u32>,
    #[serde(default)]
    pub embedded_surfaces: EmbeddedSurfaces,
    #[serde(default)]
    pub embedded_surface_table: Option<u32>,
    #[serde(default)]
    pub charges: TransferCharges,
    #[serde(default)]
    pub segments: Vec<RuleSubSegment>,
}

impl TransferRule {
    /// A rule with every field blank.
    pub fn new(vendor: impl Into<String>, item_no: u32) -> Self {
        Self {
            vendor: vendor.into(),
            item_no,
            unavailable: UnavailableTag::Available,
            min_transfers: None,
            max_transfers: None,
            out_max: None,
            in_max: None,
            in_out_application: InOutApplication::Combined,
            carrier_pairs: CarrierPairLimits::default(),
            fare_break_surface: FareBreakSurface::Permitted,
            fare_break_surface_table: None,
            embedded_surfaces: EmbeddedSurfaces::Unlimited,
            embedded_surface_table: None,
            charges: TransferCharges::default(),
            segments: Vec::new(),
        }
    }

    /// Maximum as a limit; blank and `XX` are both unlimited.
    pub fn max_limit(&self) -> TransferCount {
        self.max_transfers.unwrap_or_default()
    }

    /// Maximum coded with a number (not blank, not `XX`).
    pub fn has_numeric_max(&self) -> bool {
        matches!(self.max_transfers, Some(TransferCount::Limited(_)))
    }

    /// A sub-segment validated per pricing unit rather than per component.
    pub fn is_recurring_for_pricing_unit(&self, seg: &RuleSubSegment) -> bool {
        self.max_transfers.is_some() && seg.in_out.spans_pricing_unit()
    }

    pub fn has_tsi(&self) -> bool {
        self.segments.iter().any(|s| s.tsi.is_some())
    }

    pub fn has_gateway_restriction(&self) -> bool {
        self.segments.iter().any(|s| s.gateway_only)
    }
}
