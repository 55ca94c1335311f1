//! Fare components and pricing units.
//!
//! A fare component covers a contiguous run of itinerary segments under one
//! governing carrier. Pricing units combine components (one-way, round trip,
//! circle trip, open jaw). Segments are referenced by [`SegmentId`] into the owning
//! [`super::Itinerary`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CarrierCode, SegmentId};

/// Index of a fare component within its itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a fare component relative to the journey origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FareDirection {
    Outbound,
    Inbound,
    #[default]
    Unknown,
}

/// Geographic classification of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoTravelType {
    #[default]
    Domestic,
    Transborder,
    International,
    ForeignDomestic,
}

impl GeoTravelType {
    /// International and foreign-domestic travel use the longer stopover threshold.
    pub fn uses_international_stopover(&self) -> bool {
        matches!(self, GeoTravelType::International | GeoTravelType::ForeignDomestic)
    }
}

/// One priced component of the itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareComponent {
    pub governing_carrier: CarrierCode,
    #[serde(default)]
    pub direction: FareDirection,
    #[serde(default)]
    pub geo_travel_type: GeoTravelType,
    /// All segments of the component in travel order, surface sectors included.
    pub segments: Vec<SegmentId>,
    /// Segments whose destination the fare market already treats as a stopover.
    #[serde(default)]
    pub stopover_segments: Vec<SegmentId>,
    /// The fare is one-way (may or may not be doubled).
    #[serde(default)]
    pub one_way: bool,
    /// Rules for this fare must be re-validated at pricing-unit level.
    #[serde(default)]
    pub pricing_unit_rule_validation: bool,
    /// Travel lies wholly within the US and Canada.
    #[serde(default)]
    pub within_us_ca: bool,
    /// Currency the fare is published in.
    #[serde(default)]
    pub currency: String,
}

impl FareComponent {
    /// Create a component with default flags.
    pub fn new(governing_carrier: CarrierCode, direction: FareDirection, segments: Vec<SegmentId>) -> Self {
        Self {
            governing_carrier,
            direction,
            geo_travel_type: GeoTravelType::Domestic,
            segments,
            stopover_segments: Vec::new(),
            one_way: false,
            pricing_unit_rule_validation: false,
            within_us_ca: false,
            currency: String::new(),
        }
    }

    pub fn first_segment(&self) -> Option<SegmentId> {
        self.segments.first().copied()
    }

    pub fn last_segment(&self) -> Option<SegmentId> {
        self.segments.last().copied()
    }

    pub fn contains(&self, segment: SegmentId) -> bool {
        self.segments.contains(&segment)
    }

    pub fn is_forced_stopover(&self, segment: SegmentId) -> bool {
        self.stopover_segments.contains(&segment)
    }
}

/// A fare component as used inside a pricing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareUsage {
    pub component: ComponentId,
    #[serde(default)]
    pub inbound: bool,
}

impl FareUsage {
    pub fn outbound(component: ComponentId) -> Self {
        Self {
            component,
            inbound: false,
        }
    }

    pub fn inbound(component: ComponentId) -> Self {
        Self {
            component,
            inbound: true,
        }
    }
}

/// Shape of a pricing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnitKind {
    #[default]
    OneWay,
    RoundTrip,
    CircleTrip,
    OpenJaw,
}

/// Fare components validated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingUnit {
    #[serde(default)]
    pub kind: PricingUnitKind,
    #[serde(default)]
    pub geo_travel_type: GeoTravelType,
    pub fare_usages: Vec<FareUsage>,
}

impl PricingUnit {
    pub fn new(kind: PricingUnitKind, geo_travel_type: GeoTravelType, fare_usages: Vec<FareUsage>) -> Self {
        Self {
            kind,
            geo_travel_type,
            fare_usages,
        }
    }

    /// Position of the usage pricing `component`, if any.
    pub fn usage_of(&self, component: ComponentId) -> Option<&FareUsage> {
        self.fare_usages.iter().find(|fu| fu.component == component)
    }
}
