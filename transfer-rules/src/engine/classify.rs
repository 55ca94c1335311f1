//! Transfer classification.
//!
//! Decides which markups are transfers, whether each is a stopover or a
//! connection, how the inbound and outbound carriers pair up against the
//! governing carrier, and which transfer points are gateways.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{ComponentId, LocCode, SegmentId, TravelSegment};
use crate::ledger::TransferLedger;
use crate::record::CarrierPair;

use super::context::RuleContext;
use super::markup::{Markup, Markups, StopType};
use super::outcome::Halt;

/// Classify every markup in processing order.
pub(crate) fn identify_transfers(
    ctx: &RuleContext<'_>,
    markups: &mut Markups,
    ledger: &TransferLedger,
) -> Result<(), Halt> {
    let in_pricing_unit = ctx.pricing_unit().is_some();
    let fc_scope_real = ledger.fare_component_scope_initial || ctx.rule.max_transfers.is_none();

    for idx in markups.processing_order() {
        let Some(markup) = markups.get_mut(idx) else {
            continue;
        };

        if in_pricing_unit
            && markup.component != ctx.current
            && (fc_scope_real || !ledger.has_pricing_unit_scope(markup.component))
        {
            markup.transfer_type = None;
            markup.stop_type = StopType::None;
            continue;
        }

        if Some(markup.segment) == last_flown_segment(ctx, markup.component)? {
            continue;
        }

        let seg = ctx.segment(markup.segment)?;
        let next = markup.next_segment.map(|n| ctx.segment(n)).transpose()?;
        markup.stop_type = stop_type(ctx, markup, seg, next)?;
        markup.transfer_type = transfer_type(markup);
    }

    debug!(
        item = ctx.rule.item_no,
        transfers = markups.transfer_count(),
        "transfers identified"
    );
    Ok(())
}

fn last_flown_segment(ctx: &RuleContext<'_>, component: ComponentId) -> Result<Option<SegmentId>, Halt> {
    let fc = ctx.component(component)?;
    for &sid in fc.segments.iter().rev() {
        if ctx.segment(sid)?.is_air() {
            return Ok(Some(sid));
        }
    }
    Ok(None)
}

fn stop_type(
    ctx: &RuleContext<'_>,
    markup: &Markup,
    seg: &TravelSegment,
    next: Option<&TravelSegment>,
) -> Result<StopType, Halt> {
    let Some(next) = next else {
        return Ok(StopType::None);
    };

    if seg.forced_stopover {
        return Ok(StopType::Stopover);
    }
    if seg.forced_connection {
        return Ok(StopType::Connection);
    }

    let stopover = if seg.is_open() {
        match (seg.departure, next.departure) {
            (Some(a), Some(b)) => a.date() != b.date(),
            _ => false,
        }
    } else {
        let threshold = if markup.geo_travel_type.uses_international_stopover() {
            ctx.config.international_stopover()
        } else {
            ctx.config.domestic_stopover()
        };
        seg.ground_time_before(next).is_some_and(|ground| ground >= threshold)
    };

    if stopover || ctx.component(markup.component)?.is_forced_stopover(markup.segment) {
        Ok(StopType::Stopover)
    } else {
        Ok(StopType::Connection)
    }
}

fn transfer_type(markup: &Markup) -> Option<CarrierPair> {
    let out = markup.carrier_out?;
    let gov = markup.governing_carrier;
    let same = markup.carrier == out;

    Some(if markup.carrier == gov || out == gov {
        if same {
            CarrierPair::PrimePrime
        } else {
            CarrierPair::PrimeOther
        }
    } else if same {
        CarrierPair::SameSame
    } else {
        CarrierPair::OtherOther
    })
}

/// Flag markups whose segment arrives at an international gateway.
pub(crate) fn mark_gateways(ctx: &RuleContext<'_>, markups: &mut Markups) -> Result<(), Halt> {
    let components: Vec<ComponentId> = match ctx.pricing_unit() {
        Some(pu) => pu.fare_usages.iter().map(|fu| fu.component).collect(),
        None => vec![ctx.current],
    };

    let mut gateway_points: HashSet<(ComponentId, LocCode)> = HashSet::new();
    for component in components {
        let mut crossings = Vec::new();
        for &sid in &ctx.component(component)?.segments {
            let seg = ctx.segment(sid)?;
            let crosses = if ctx.round_the_world() {
                seg.origin.area != seg.destination.area
            } else {
                !seg.is_domestic()
            };
            if crosses {
                crossings.push(seg);
            }
        }
        if let (Some(first), Some(last)) = (crossings.first(), crossings.last()) {
            gateway_points.insert((component, first.origin.code));
            gateway_points.insert((component, last.destination.code));
        }
    }

    for idx in markups.processing_order() {
        let Some(markup) = markups.get_mut(idx) else {
            continue;
        };
        let dest = ctx.segment(markup.segment)?.destination.code;
        if gateway_points.contains(&(markup.component, dest)) {
            markup.gateway = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CarrierCode, FareComponent, FareDirection, GeoTravelType, Itinerary, Location, NationCode};
    use crate::engine::{ValidationConfig, ValidationScope};
    use crate::record::TransferRule;
    use crate::reference::StaticReferenceData;
    use chrono::{NaiveDate, NaiveDateTime};

    fn loc(code: &str, nation: &str) -> Location {
        let code = LocCode::parse(code).unwrap();
        Location::new(code, code, NationCode::parse(nation).unwrap(), 1)
    }

    fn cx(s: &str) -> CarrierCode {
        CarrierCode::parse(s).unwrap()
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn air(from: (&str, &str), to: (&str, &str), carrier: &str, dep: NaiveDateTime) -> TravelSegment {
        TravelSegment::air(
            loc(from.0, from.1),
            loc(to.0, to.1),
            cx(carrier),
            1,
            dep,
            dep + chrono::Duration::hours(2),
        )
    }

    fn classify(itin: &Itinerary, config: &ValidationConfig) -> Markups {
        let rule = TransferRule::new("ATP", 1);
        let refs = StaticReferenceData::new();
        let ctx = RuleContext {
            rule: &rule,
            itinerary: itin,
            reference: &refs,
            config,
            current: ComponentId(0),
            scope: ValidationScope::FareComponent,
        };
        let mut markups = Markups::for_component(itin, ComponentId(0)).unwrap();
        identify_transfers(&ctx, &mut markups, &TransferLedger::new()).unwrap();
        mark_gateways(&ctx, &mut markups).unwrap();
        markups
    }

    fn itinerary(segments: Vec<TravelSegment>, geo: GeoTravelType) -> Itinerary {
        let ids = (0..segments.len()).map(SegmentId).collect();
        let mut itin = Itinerary::new(segments);
        let mut fc = FareComponent::new(cx("AA"), FareDirection::Outbound, ids);
        fc.geo_travel_type = geo;
        itin.add_component(fc);
        itin
    }

    #[test]
    fn stopover_threshold_by_geography() {
        // Five hours on the ground in ORD.
        let segs = vec![
            air(("MEM", "US"), ("ORD", "US"), "AA", at(1, 6)),
            air(("ORD", "US"), ("MIA", "US"), "AA", at(1, 13)),
        ];
        let config = ValidationConfig::default();

        let domestic = classify(&itinerary(segs.clone(), GeoTravelType::Domestic), &config);
        assert_eq!(domestic.get(0).unwrap().stop_type, StopType::Stopover);

        let intl = classify(&itinerary(segs, GeoTravelType::International), &config);
        assert_eq!(intl.get(0).unwrap().stop_type, StopType::Connection);
        assert_eq!(intl.get(1).unwrap().stop_type, StopType::None);
        assert_eq!(intl.transfer_count(), 1);
    }

    #[test]
    fn forced_connection_wins() {
        let mut first = air(("MEM", "US"), ("ORD", "US"), "AA", at(1, 6));
        first.forced_connection = true;
        let segs = vec![first, air(("ORD", "US"), ("MIA", "US"), "AA", at(2, 6))];

        let markups = classify(&itinerary(segs, GeoTravelType::Domestic), &ValidationConfig::default());
        assert_eq!(markups.get(0).unwrap().stop_type, StopType::Connection);
    }

    #[test]
    fn carrier_pairs() {
        let segs = vec![
            air(("MEM", "US"), ("ORD", "US"), "AA", at(1, 6)),
            air(("ORD", "US"), ("DEN", "US"), "UA", at(1, 9)),
            air(("DEN", "US"), ("SEA", "US"), "UA", at(1, 12)),
            air(("SEA", "US"), ("ANC", "US"), "AS", at(1, 15)),
        ];
        let markups = classify(&itinerary(segs, GeoTravelType::Domestic), &ValidationConfig::default());
        let pairs: Vec<Option<CarrierPair>> = markups.iter().map(|m| m.transfer_type).collect();
        assert_eq!(
            pairs,
            vec![
                Some(CarrierPair::PrimeOther),
                Some(CarrierPair::SameSame),
                Some(CarrierPair::OtherOther),
                None
            ]
        );
    }

    #[test]
    fn gateway_is_arrival_at_crossing() {
        let segs = vec![
            air(("MEM", "US"), ("ORD", "US"), "AA", at(1, 6)),
            air(("ORD", "US"), ("LHR", "GB"), "AA", at(1, 9)),
            air(("LHR", "GB"), ("MAN", "GB"), "AA", at(2, 9)),
        ];
        let markups = classify(&itinerary(segs, GeoTravelType::International), &ValidationConfig::default());
        let gateways: Vec<bool> = markups.iter().map(|m| m.gateway).collect();
        assert_eq!(gateways, vec![true, true, false]);
    }
}
