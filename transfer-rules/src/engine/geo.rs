//! Geographic sub-segment predicates.
//!
//! A sub-segment locates its transfer point one of three ways: a point
//! (loc1, loc2 or a zone table) the transfer must be in; a window between
//! loc1 and loc2 the transfer must lie inside; or a TSI that selects the
//! segments around the transfer.

use tracing::warn;

use crate::domain::{ComponentId, FareDirection, Location};
use crate::record::{Applicability, LocKey, RuleSubSegment};
use crate::reference::{ReferenceData, TsiContext, TsiMatch, TsiScope};

use super::context::RuleContext;
use super::markup::{Markup, Markups};
use super::outcome::{Halt, MatchResult};

/// TSI that selects every international sector.
const TSI_INTERNATIONAL_SECTORS: u16 = 18;

/// A coded location key containing `loc`.
pub(crate) fn in_loc(reference: &dyn ReferenceData, loc: &Location, key: Option<&LocKey>) -> bool {
    key.is_some_and(|k| k.has_code() && reference.is_in_loc(loc, k))
}

fn in_zone(reference: &dyn ReferenceData, loc: &Location, zone: Option<u32>) -> bool {
    zone.is_some_and(|z| reference.is_in_zone(loc, z))
}

/// Match a transfer point against loc1, then loc2 or the zone table.
pub(crate) fn match_geo(reference: &dyn ReferenceData, loc: &Location, sub: &RuleSubSegment) -> MatchResult {
    if !sub.has_loc_or_zone() {
        return MatchResult::DoesNotApply;
    }
    if sub.is_loc_type_only() {
        return MatchResult::Match;
    }
    if in_loc(reference, loc, sub.loc1.as_ref()) {
        return MatchResult::Match;
    }
    let second = if sub.loc2.is_some() {
        in_loc(reference, loc, sub.loc2.as_ref())
    } else {
        in_zone(reference, loc, sub.zone_table)
    };
    MatchResult::from_bool(second)
}

/// The far end of a between window: loc2, or the zone table without one.
fn in_far_end(reference: &dyn ReferenceData, loc: &Location, sub: &RuleSubSegment) -> bool {
    if sub.loc2.is_some() {
        in_loc(reference, loc, sub.loc2.as_ref())
    } else {
        in_zone(reference, loc, sub.zone_table)
    }
}

/// Half-open range of pricing-unit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub first: usize,
    pub last: usize,
}

impl Window {
    fn contains(&self, pos: usize) -> bool {
        self.first <= pos && pos < self.last
    }
}

#[derive(Debug, Default)]
struct Scan {
    first1: Option<usize>,
    last1: Option<usize>,
    first2: Option<usize>,
    last2: Option<usize>,
}

impl Scan {
    fn window(&self) -> Option<Window> {
        let forward = match (self.first1, self.last1) {
            (Some(first), Some(last)) if first <= last => Some(Window { first, last }),
            _ => None,
        };
        forward.or(match (self.first2, self.last2) {
            (Some(first), Some(last)) if first <= last => Some(Window { first, last }),
            _ => None,
        })
    }
}

/// Between windows of one sub-segment, per direction of travel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BetweenWindows {
    pub outbound: Option<Window>,
    pub inbound: Option<Window>,
}

impl BetweenWindows {
    /// Scan the markups in pricing-unit order for the window ends.
    ///
    /// Forward runs from the last departure from loc1 to the first arrival
    /// in loc2; the reverse orientation is used when forward is not a window.
    pub fn scan(ctx: &RuleContext<'_>, sub: &RuleSubSegment, markups: &Markups) -> Result<Self, Halt> {
        let reference = ctx.reference;
        let mut out = Scan::default();
        let mut inb = Scan::default();

        for (pos, markup) in markups.iter().enumerate() {
            let seg = ctx.segment(markup.segment)?;
            let scan = if markup.direction == FareDirection::Inbound {
                &mut inb
            } else {
                &mut out
            };

            if in_loc(reference, &seg.origin, sub.loc1.as_ref()) {
                scan.first1 = Some(pos);
            }
            if scan.last1.is_none() && in_far_end(reference, &seg.destination, sub) {
                scan.last1 = Some(pos);
            }
            if in_far_end(reference, &seg.origin, sub) {
                scan.first2 = Some(pos);
            }
            if scan.last2.is_none() && in_loc(reference, &seg.destination, sub.loc1.as_ref()) {
                scan.last2 = Some(pos);
            }
        }

        Ok(Self {
            outbound: out.window(),
            inbound: inb.window(),
        })
    }

    /// Match the transfer at pricing-unit position `pos`.
    pub fn matches(&self, pos: usize, direction: FareDirection) -> MatchResult {
        let window = if direction == FareDirection::Inbound {
            self.inbound
        } else {
            self.outbound
        };
        MatchResult::from_bool(window.is_some_and(|w| w.contains(pos)))
    }
}

/// Segments a sub-segment's TSI selects for this transfer.
///
/// `None` when the TSI cannot be evaluated in this scope.
pub(crate) fn tsi_segments(
    ctx: &RuleContext<'_>,
    sub: &RuleSubSegment,
    tsi: u16,
    fare_component: ComponentId,
) -> Result<Option<Vec<TsiMatch>>, Halt> {
    let error = || Halt::fail(format!("TSI ERROR - SEG: {}", sub.order_no));

    let Some(scope) = ctx.reference.tsi_scope(tsi) else {
        warn!(tsi, order_no = sub.order_no, "TSI scope unknown");
        return Err(error());
    };
    if scope == TsiScope::SubJourney && ctx.pricing_unit().is_none() {
        return Ok(None);
    }

    let tsi_ctx = TsiContext {
        itinerary: ctx.itinerary,
        component: fare_component,
        pricing_unit: ctx.pricing_unit(),
    };
    match ctx.reference.resolve_tsi(tsi, &tsi_ctx) {
        Ok(matches) => Ok(Some(matches)),
        Err(err) => {
            warn!(tsi, order_no = sub.order_no, error = %err, "TSI resolution failed");
            Err(error())
        }
    }
}

/// Match a transfer against the segments selected by a TSI.
pub(crate) fn tsi_geo(
    matches: &[TsiMatch],
    markup: &Markup,
    sub: &RuleSubSegment,
    tsi: u16,
) -> Result<MatchResult, Halt> {
    if matches.is_empty() {
        if sub.applicability == Applicability::Required {
            return Err(Halt::fail(format!(
                " TRANSFER REQUIRED BUT NO SEGMENTS MATCH TSI: {tsi}"
            )));
        }
        return Ok(MatchResult::NotMatch);
    }

    let current = matches.iter().find(|m| m.segment == markup.segment);
    let next = markup
        .next_segment
        .and_then(|n| matches.iter().find(|m| m.segment == n));

    let matched = if tsi == TSI_INTERNATIONAL_SECTORS {
        current.is_some() && next.is_some()
    } else {
        current.is_some_and(|m| m.dest_match) || next.is_some_and(|m| m.orig_match)
    };
    Ok(MatchResult::from_bool(matched))
}
