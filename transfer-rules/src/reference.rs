//! Reference data lookups used during validation.
//!
//! Location membership, zone tables, carrier application tables, surface
//! transfer tables, carrier preferences and TSI scopes are all owned by the
//! caller and already loaded. [`ReferenceData`] is the seam the engine talks
//! through; [`StaticReferenceData`] is an in-memory implementation built from
//! scenario files or test builders.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    CarrierCode, ComponentId, DomainError, Itinerary, LocCode, Location, PricingUnit, SegmentId,
};
use crate::record::{CarrierApplEntry, LocKey, LocType, SurfaceTransferEntry};

/// Errors resolving a TSI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TsiError {
    /// No definition for this TSI
    #[error("unknown TSI {0}")]
    Unknown(u16),

    /// Sub-journey TSI resolved without a pricing unit
    #[error("TSI {0} needs a pricing unit")]
    NoPricingUnit(u16),

    /// The itinerary does not contain the segments the scope names
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Portion of the journey a TSI inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsiScope {
    Journey,
    SubJourney,
    FareComponent,
}

/// Which segments of the scope a TSI selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsiSelect {
    #[default]
    All,
    International,
    Domestic,
    Flown,
}

/// A travel segment identifier: a named selection of segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsiDefinition {
    pub scope: TsiScope,
    #[serde(default)]
    pub select: TsiSelect,
    /// The segment's origin is a matched point.
    #[serde(default)]
    pub check_origin: bool,
    /// The segment's destination is a matched point.
    #[serde(default)]
    pub check_destination: bool,
}

impl TsiDefinition {
    /// TSI 18: every international sector of the journey.
    pub fn international_sectors() -> Self {
        Self {
            scope: TsiScope::Journey,
            select: TsiSelect::International,
            check_origin: true,
            check_destination: true,
        }
    }
}

/// What a TSI is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct TsiContext<'a> {
    pub itinerary: &'a Itinerary,
    pub component: ComponentId,
    pub pricing_unit: Option<&'a PricingUnit>,
}

/// One segment selected by a TSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsiMatch {
    pub segment: SegmentId,
    pub orig_match: bool,
    pub dest_match: bool,
}

/// Synchronous reference lookups.
pub trait ReferenceData {
    /// True if `loc` lies within `key`. A key without a code matches any location.
    fn is_in_loc(&self, loc: &Location, key: &LocKey) -> bool;

    /// True if `loc` lies within the user zone table `zone`.
    fn is_in_zone(&self, loc: &Location, zone: u32) -> bool;

    /// Code of the location of type `loc_type` that contains `loc`.
    fn loc_of_type(&self, loc: &Location, loc_type: LocType) -> Option<String>;

    /// Entries of a carrier application table; empty if unknown.
    fn carrier_table(&self, table: u32) -> &[CarrierApplEntry];

    /// Entries of a surface transfer table; empty if unknown.
    fn surface_table(&self, table: u32) -> &[SurfaceTransferEntry];

    /// The carrier's preferences forbid surface sectors at fare breaks.
    fn no_surface_at_fare_break(&self, carrier: CarrierCode) -> bool;

    /// Scope of a TSI, or `None` if it is not defined.
    fn tsi_scope(&self, tsi: u16) -> Option<TsiScope>;

    /// Segments selected by a TSI.
    fn resolve_tsi(&self, tsi: u16, ctx: &TsiContext<'_>) -> Result<Vec<TsiMatch>, TsiError>;
}

/// Named group of locations, e.g. a state or sub-area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocGroup {
    pub loc: LocKey,
    /// Airport or city codes in the group.
    pub members: Vec<LocCode>,
}

/// In-memory reference tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticReferenceData {
    #[serde(default)]
    groups: Vec<LocGroup>,
    #[serde(default)]
    zones: HashMap<u32, Vec<LocKey>>,
    #[serde(default)]
    carrier_tables: HashMap<u32, Vec<CarrierApplEntry>>,
    #[serde(default)]
    surface_tables: HashMap<u32, Vec<SurfaceTransferEntry>>,
    #[serde(default)]
    no_surface_at_fare_break: Vec<CarrierCode>,
    #[serde(default)]
    tsis: HashMap<u16, TsiDefinition>,
}

impl StaticReferenceData {
    /// Create empty reference data.
    pub fn new() -> Self {
        Self::default()
    }

    fn group_contains(&self, loc: &Location, key: &LocKey) -> bool {
        self.groups
            .iter()
            .filter(|g| g.loc == *key)
            .any(|g| g.members.contains(&loc.code) || g.members.contains(&loc.city))
    }

    fn selects(select: TsiSelect, itinerary: &Itinerary, sid: SegmentId) -> Result<bool, DomainError> {
        let seg = itinerary.segment(sid)?;
        Ok(match select {
            TsiSelect::All => true,
            TsiSelect::International => !seg.is_domestic(),
            TsiSelect::Domestic => seg.is_domestic(),
            TsiSelect::Flown => seg.is_air(),
        })
    }
}

impl ReferenceData for StaticReferenceData {
    fn is_in_loc(&self, loc: &Location, key: &LocKey) -> bool {
        if !key.has_code() {
            return true;
        }
        match key.loc_type {
            LocType::Area => loc.area.to_string() == key.code,
            LocType::Nation => loc.nation.as_str() == key.code,
            LocType::City => loc.city.as_str() == key.code || loc.code.as_str() == key.code,
            LocType::Airport => loc.code.as_str() == key.code,
            LocType::SubArea | LocType::Zone | LocType::State => self.group_contains(loc, key),
        }
    }

    fn is_in_zone(&self, loc: &Location, zone: u32) -> bool {
        self.zones
            .get(&zone)
            .is_some_and(|keys| keys.iter().any(|k| self.is_in_loc(loc, k)))
    }

    fn loc_of_type(&self, loc: &Location, loc_type: LocType) -> Option<String> {
        match loc_type {
            LocType::Area => Some(loc.area.to_string()),
            LocType::Nation => Some(loc.nation.as_str().to_string()),
            LocType::City => Some(loc.city.as_str().to_string()),
            LocType::Airport => Some(loc.code.as_str().to_string()),
            LocType::SubArea | LocType::Zone | LocType::State => self
                .groups
                .iter()
                .find(|g| {
                    g.loc.loc_type == loc_type
                        && (g.members.contains(&loc.code) || g.members.contains(&loc.city))
                })
                .map(|g| g.loc.code.clone()),
        }
    }

    fn carrier_table(&self, table: u32) -> &[CarrierApplEntry] {
        self.carrier_tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn surface_table(&self, table: u32) -> &[SurfaceTransferEntry] {
        self.surface_tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn no_surface_at_fare_break(&self, carrier: CarrierCode) -> bool {
        self.no_surface_at_fare_break.contains(&carrier)
    }

    fn tsi_scope(&self, tsi: u16) -> Option<TsiScope> {
        self.tsis.get(&tsi).map(|d| d.scope)
    }

    fn resolve_tsi(&self, tsi: u16, ctx: &TsiContext<'_>) -> Result<Vec<TsiMatch>, TsiError> {
        let def = self.tsis.get(&tsi).ok_or(TsiError::Unknown(tsi))?;

        let in_scope: Vec<SegmentId> = match def.scope {
            TsiScope::Journey => (0..ctx.itinerary.segments.len()).map(SegmentId).collect(),
            TsiScope::FareComponent => ctx.itinerary.component(ctx.component)?.segments.clone(),
            TsiScope::SubJourney => {
                let pu = ctx.pricing_unit.ok_or(TsiError::NoPricingUnit(tsi))?;
                let mut segs = Vec::new();
                for fu in &pu.fare_usages {
                    segs.extend(ctx.itinerary.component(fu.component)?.segments.iter().copied());
                }
                segs.sort();
                segs
            }
        };

        let mut matches = Vec::new();
        for sid in in_scope {
            if Self::selects(def.select, ctx.itinerary, sid)? {
                matches.push(TsiMatch {
                    segment: sid,
                    orig_match: def.check_origin,
                    dest_match: def.check_destination,
                });
            }
        }
        Ok(matches)
    }
}

/// Builder for [`StaticReferenceData`].
#[derive(Debug, Default)]
pub struct StaticReferenceDataBuilder {
    inner: StaticReferenceData,
}

impl StaticReferenceDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location group (state, sub-area or zone) and its member codes.
    pub fn group(mut self, loc: LocKey, members: &[&str]) -> Self {
        let members = members.iter().filter_map(|m| LocCode::parse(m).ok()).collect();
        self.inner.groups.push(LocGroup { loc, members });
        self
    }

    pub fn zone(mut self, zone: u32, keys: Vec<LocKey>) -> Self {
        self.inner.zones.insert(zone, keys);
        self
    }

    pub fn carrier_table(mut self, table: u32, entries: Vec<CarrierApplEntry>) -> Self {
        self.inner.carrier_tables.insert(table, entries);
        self
    }

    pub fn surface_table(mut self, table: u32, entries: Vec<SurfaceTransferEntry>) -> Self {
        self.inner.surface_tables.insert(table, entries);
        self
    }

    pub fn no_surface_at_fare_break(mut self, carrier: CarrierCode) -> Self {
        self.inner.no_surface_at_fare_break.push(carrier);
        self
    }

    pub fn tsi(mut self, tsi: u16, def: TsiDefinition) -> Self {
        self.inner.tsis.insert(tsi, def);
        self
    }

    pub fn build(self) -> StaticReferenceData {
        self.inner
    }
}
