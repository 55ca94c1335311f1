//! Surface sector restrictions.
//!
//! A surface sector is a non-air segment between two different cities. At a
//! fare break (first or last segment of the component) it is governed by the
//! record's fare-break indicator and the governing carrier's preference; inside
//! the component by the embedded-surface indicator. Either may point at a
//! surface transfer table. A sector matching the table where surfaces are not
//! permitted fails, as does one missing the table where they are.

use tracing::debug;

use crate::domain::{FareComponent, SegmentId, TravelSegment};
use crate::record::{
    FareBreakSurface, SurfaceOrigDest, SurfaceRestriction, SurfaceTransferEntry, TransferRule,
};
use crate::reference::ReferenceData;

use super::context::RuleContext;
use super::geo::in_loc;
use super::outcome::Halt;

/// Check fare-break and embedded surface sectors of the current component.
pub(crate) fn check_surface_sectors(ctx: &RuleContext<'_>) -> Result<(), Halt> {
    let fc = ctx.component(ctx.current)?;
    if fc.segments.is_empty() || ctx.config.exclude_surface_checks {
        return Ok(());
    }
    let segments = fc
        .segments
        .iter()
        .map(|&sid| ctx.segment(sid).map(|seg| (sid, seg)))
        .collect::<Result<Vec<_>, _>>()?;

    check_fare_break(ctx, fc, &segments)?;
    check_embedded(ctx, &segments)
}

fn is_surface_sector(seg: &TravelSegment) -> bool {
    !seg.is_air() && seg.origin.city != seg.destination.city
}

fn restriction_matches(seg: &TravelSegment, entry: &SurfaceTransferEntry) -> bool {
    match entry.restriction {
        SurfaceRestriction::Either => true,
        SurfaceRestriction::Domestic => seg.is_domestic(),
        SurfaceRestriction::International => !seg.is_domestic(),
    }
}

fn fare_break_permitted(reference: &dyn ReferenceData, rule: &TransferRule, fc: &FareComponent) -> bool {
    rule.fare_break_surface != FareBreakSurface::NotPermitted
        && !reference.no_surface_at_fare_break(fc.governing_carrier)
}

fn check_fare_break(
    ctx: &RuleContext<'_>,
    fc: &FareComponent,
    segments: &[(SegmentId, &TravelSegment)],
) -> Result<(), Halt> {
    let rule = ctx.rule;
    let permitted = fare_break_permitted(ctx.reference, rule, fc);
    if permitted && rule.fare_break_surface_table.is_none() {
        return Ok(());
    }
    let table = rule
        .fare_break_surface_table
        .map(|t| ctx.reference.surface_table(t))
        .unwrap_or_default();

    let (Some(&first), Some(&last)) = (segments.first(), segments.last()) else {
        return Ok(());
    };
    let ends = if first.0 == last.0 { vec![first] } else { vec![first, last] };

    for (sid, seg) in ends {
        if !is_surface_sector(seg) {
            continue;
        }
        let at_origin = sid == first.0;
        let at_destination = sid == last.0;
        let matched = table.is_empty()
            || table.iter().any(|entry| {
                restriction_matches(seg, entry)
                    && orig_dest_matches(entry.orig_dest, at_origin, at_destination)
                    && fare_break_geo_matches(ctx.reference, seg, entry, at_origin)
            });

        if permitted && !matched {
            return Err(surface_failure("FARE BREAK SURFACE FAILED: ", sid, seg));
        }
        if !permitted && matched {
            return Err(surface_failure("FARE BREAK SURFACE NOT PERMITTED: ", sid, seg));
        }
    }
    Ok(())
}

fn orig_dest_matches(orig_dest: SurfaceOrigDest, at_origin: bool, at_destination: bool) -> bool {
    match orig_dest {
        SurfaceOrigDest::Either => true,
        SurfaceOrigDest::Origin => at_origin,
        SurfaceOrigDest::Destination => at_destination,
    }
}

/// The fare-break location is matched against the end of the sector that
/// touches the fare break, the surface location against the other end.
fn fare_break_geo_matches(
    reference: &dyn ReferenceData,
    seg: &TravelSegment,
    entry: &SurfaceTransferEntry,
    at_origin: bool,
) -> bool {
    let (fare_break, other) = if at_origin {
        (&seg.origin, &seg.destination)
    } else {
        (&seg.destination, &seg.origin)
    };
    match (&entry.fare_break_loc, &entry.surface_loc) {
        (Some(fb), Some(sl)) => in_loc(reference, fare_break, Some(fb)) && in_loc(reference, other, Some(sl)),
        (Some(fb), None) => in_loc(reference, fare_break, Some(fb)),
        (None, Some(sl)) => in_loc(reference, other, Some(sl)),
        (None, None) => true,
    }
}

/// An embedded sector matches in either orientation.
fn embedded_geo_matches(reference: &dyn ReferenceData, seg: &TravelSegment, entry: &SurfaceTransferEntry) -> bool {
    match (&entry.fare_break_loc, &entry.surface_loc) {
        (Some(a), Some(b)) => {
            (in_loc(reference, &seg.origin, Some(a)) && in_loc(reference, &seg.destination, Some(b)))
                || (in_loc(reference, &seg.destination, Some(a)) && in_loc(reference, &seg.origin, Some(b)))
        }
        (Some(a), None) => in_loc(reference, &seg.origin, Some(a)),
        (None, Some(b)) => in_loc(reference, &seg.destination, Some(b)),
        (None, None) => true,
    }
}

fn check_embedded(ctx: &RuleContext<'_>, segments: &[(SegmentId, &TravelSegment)]) -> Result<(), Halt> {
    if segments.len() <= 2 {
        return Ok(());
    }
    let rule = ctx.rule;
    let max = rule.embedded_surfaces.limit();
    let permitted = rule.embedded_surfaces.is_permitted();
    let inner = &segments[1..segments.len() - 1];

    // Round-the-world surfaces between areas need checking even without a table.
    let fits = max.is_none_or(|max| max > inner.len());
    if !ctx.round_the_world() && fits && rule.embedded_surface_table.is_none() {
        return Ok(());
    }
    let table = rule
        .embedded_surface_table
        .map(|t| ctx.reference.surface_table(t))
        .unwrap_or_default();

    let mut embedded = 0usize;
    for &(sid, seg) in inner {
        if !is_surface_sector(seg) {
            continue;
        }

        let mut matched = table.is_empty();
        let mut need_locations = false;
        if permitted {
            embedded += 1;
            if max.is_some_and(|max| embedded > max) {
                debug!(item = rule.item_no, embedded, "too many embedded surfaces");
                return Err(Halt::fail("MAX EMBEDDED SURFACES EXCEEDED"));
            }
            if ctx.round_the_world() && seg.origin.area != seg.destination.area {
                need_locations = true;
                matched = false;
            }
        }

        matched = matched
            || table.iter().any(|entry| {
                (!need_locations || entry.has_both_locations())
                    && restriction_matches(seg, entry)
                    && embedded_geo_matches(ctx.reference, seg, entry)
            });

        if permitted && !matched {
            return Err(surface_failure("EMBEDDED SURFACE FAILED: ", sid, seg));
        }
        if !permitted && matched {
            return Err(surface_failure("EMBEDDED SURFACE NOT PERMITTED: ", sid, seg));
        }
    }
    Ok(())
}

fn surface_failure(message: &str, sid: SegmentId, seg: &TravelSegment) -> Halt {
    debug!(segment = %sid, origin = %seg.origin.code, destination = %seg.destination.code, "{message}");
    Halt::fail(format!("{message}{}-{}", seg.origin.code, seg.destination.code))
}
