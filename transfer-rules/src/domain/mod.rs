//! Domain types for transfer rule validation.
//!
//! This module contains the itinerary model the validator reads: validated
//! carrier and location codes, travel segments, fare components and pricing
//! units. Code types enforce their invariants at construction time, and all
//! cross references are indices into the [`Itinerary`] arena.

mod carrier;
mod error;
mod fare;
mod itinerary;
mod location;
mod segment;

pub use carrier::{CarrierCode, InvalidCarrierCode};
pub use error::DomainError;
pub use fare::{
    ComponentId, FareComponent, FareDirection, FareUsage, GeoTravelType, PricingUnit,
    PricingUnitKind,
};
pub use itinerary::Itinerary;
pub use location::{InvalidLocCode, LocCode, Location, NationCode};
pub use segment::{Flight, SegmentId, SegmentKind, TravelSegment};
