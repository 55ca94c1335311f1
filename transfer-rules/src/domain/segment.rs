//! Travel segments of an itinerary.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{CarrierCode, Location};

/// Index of a travel segment within its itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

impl SegmentId {
    /// The 1-based segment number shown in traces.
    pub fn number(&self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Marketing carrier and flight number of a flown segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub carrier: CarrierCode,
    pub number: u32,
}

/// How a segment is travelled.
///
/// `Open` is a flown segment booked without a firm date; `Arunk` is a
/// surface sector (travel by other means between two points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SegmentKind {
    Air(Flight),
    Open(Flight),
    Arunk,
}

/// One segment of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelSegment {
    pub origin: Location,
    pub destination: Location,
    pub kind: SegmentKind,
    #[serde(default)]
    pub departure: Option<NaiveDateTime>,
    #[serde(default)]
    pub arrival: Option<NaiveDateTime>,
    /// The passenger has requested a stopover at the destination.
    #[serde(default)]
    pub forced_stopover: bool,
    /// The passenger has requested a connection at the destination.
    #[serde(default)]
    pub forced_connection: bool,
}

impl TravelSegment {
    /// Create a dated flown segment.
    pub fn air(
        origin: Location,
        destination: Location,
        carrier: CarrierCode,
        number: u32,
        departure: NaiveDateTime,
        arrival: NaiveDateTime,
    ) -> Self {
        Self {
            origin,
            destination,
            kind: SegmentKind::Air(Flight { carrier, number }),
            departure: Some(departure),
            arrival: Some(arrival),
            forced_stopover: false,
            forced_connection: false,
        }
    }

    /// Create a surface sector.
    pub fn arunk(origin: Location, destination: Location) -> Self {
        Self {
            origin,
            destination,
            kind: SegmentKind::Arunk,
            departure: None,
            arrival: None,
            forced_stopover: false,
            forced_connection: false,
        }
    }

    /// The flight, for flown (including open) segments.
    pub fn flight(&self) -> Option<&Flight> {
        match &self.kind {
            SegmentKind::Air(flight) | SegmentKind::Open(flight) => Some(flight),
            SegmentKind::Arunk => None,
        }
    }

    pub fn carrier(&self) -> Option<CarrierCode> {
        self.flight().map(|f| f.carrier)
    }

    pub fn is_air(&self) -> bool {
        self.flight().is_some()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.kind, SegmentKind::Open(_))
    }

    /// Both ends in the same nation.
    pub fn is_domestic(&self) -> bool {
        self.origin.same_nation(&self.destination)
    }

    /// Time on the ground between arriving on this segment and departing on `next`.
    pub fn ground_time_before(&self, next: &TravelSegment) -> Option<Duration> {
        match (self.arrival, next.departure) {
            (Some(arrive), Some(depart)) => Some(depart - arrive),
            _ => None,
        }
    }
}
