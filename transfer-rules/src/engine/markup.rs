//! Per-segment working state.
//!
//! A [`Markup`] annotates one flown segment with everything the engine works
//! out about the transfer at its destination. [`Markups`] is the arena of
//! markups for one validation: stored in pricing-unit (itinerary) order, with
//! a separate processing order that puts fare usages validated against the
//! entire rule ahead of those validated for counting only.

use std::collections::VecDeque;

use crate::domain::{
    CarrierCode, ComponentId, DomainError, FareDirection, GeoTravelType, Itinerary, Location,
    PricingUnit, PricingUnitKind, SegmentId,
};
use crate::ledger::TransferLedger;
use crate::record::{CarrierPair, ChargeAppl, TransferRule};

use super::outcome::MatchResult;

/// Stopover classification of a transfer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopType {
    /// Not a transfer.
    #[default]
    None,
    Stopover,
    Connection,
}

/// Outcome of checking a markup or one of its sub-segment matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckResult {
    #[default]
    NotChecked,
    Pass,
    SoftPass,
    Fail,
    DoesNotApply,
    NeedRevalidation,
    Stop,
    /// Geography never matched in recurring scope.
    NotAccepted,
}

/// How one rule sub-segment fared against one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSegmentMatch {
    pub order_no: u32,
    pub transfer_type: MatchResult,
    pub stop_conn: MatchResult,
    pub gateway: MatchResult,
    pub restriction: MatchResult,
    pub geo: MatchResult,
    pub carrier_in: MatchResult,
    pub carrier_out: MatchResult,
    pub in_out: CheckResult,
    pub seg_check: CheckResult,
    /// Set when the match is chargeable.
    pub charge: Option<ChargeAppl>,
}

impl SubSegmentMatch {
    pub fn new(order_no: u32) -> Self {
        Self {
            order_no,
            transfer_type: MatchResult::NotChecked,
            stop_conn: MatchResult::NotChecked,
            gateway: MatchResult::NotChecked,
            restriction: MatchResult::NotChecked,
            geo: MatchResult::NotChecked,
            carrier_in: MatchResult::NotChecked,
            carrier_out: MatchResult::NotChecked,
            in_out: CheckResult::NotChecked,
            seg_check: CheckResult::NotChecked,
            charge: None,
        }
    }

    /// Combined carrier code for traces.
    pub fn carrier(&self) -> MatchResult {
        let either = |r| self.carrier_in == r || self.carrier_out == r;
        if either(MatchResult::NotMatch) {
            MatchResult::NotMatch
        } else if either(MatchResult::Match) {
            MatchResult::Match
        } else if either(MatchResult::DoesNotApply) {
            MatchResult::DoesNotApply
        } else {
            MatchResult::NotChecked
        }
    }
}

/// Working state for the transfer at the destination of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    pub segment: SegmentId,
    /// The next flown segment in pricing-unit order.
    pub next_segment: Option<SegmentId>,
    pub component: ComponentId,
    pub direction: FareDirection,
    pub carrier: CarrierCode,
    pub carrier_out: Option<CarrierCode>,
    pub governing_carrier: CarrierCode,
    pub geo_travel_type: GeoTravelType,
    /// Destination of a surface sector following this segment.
    pub alt_off_point: Option<Location>,
    pub validate_entire_rule: bool,
    pub stop_type: StopType,
    pub transfer_type: Option<CarrierPair>,
    pub type_match: MatchResult,
    pub gateway: bool,
    pub transfer_check: CheckResult,
    pub seg_check: CheckResult,
    pub fail_reason: Option<String>,
    pub matches: Vec<SubSegmentMatch>,
    pub charge_segment_specific: bool,
}

impl Markup {
    pub fn new(
        segment: SegmentId,
        component: ComponentId,
        carrier: CarrierCode,
        governing_carrier: CarrierCode,
        direction: FareDirection,
        geo_travel_type: GeoTravelType,
    ) -> Self {
        Self {
            segment,
            next_segment: None,
            component,
            direction,
            carrier,
            carrier_out: None,
            governing_carrier,
            geo_travel_type,
            alt_off_point: None,
            validate_entire_rule: true,
            stop_type: StopType::None,
            transfer_type: None,
            type_match: MatchResult::NotChecked,
            gateway: false,
            transfer_check: CheckResult::NotChecked,
            seg_check: CheckResult::NotChecked,
            fail_reason: None,
            matches: Vec::new(),
            charge_segment_specific: false,
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.transfer_type.is_some()
    }

    /// Record a failure of this transfer.
    pub fn fail(&mut self, reason: &str) {
        self.transfer_check = CheckResult::Fail;
        self.seg_check = CheckResult::Fail;
        self.fail_reason = Some(reason.to_string());
    }
}

/// Arena of markups for one validation.
#[derive(Debug, Clone, Default)]
pub struct Markups {
    items: Vec<Markup>,
    processing: Vec<usize>,
}

impl Markups {
    /// Markups for the flown segments of one fare component.
    pub fn for_component(itinerary: &Itinerary, component: ComponentId) -> Result<Self, DomainError> {
        let fc = itinerary.component(component)?;
        let last = fc.last_segment();
        let mut items: Vec<Markup> = Vec::new();

        for &sid in &fc.segments {
            let seg = itinerary.segment(sid)?;
            match seg.carrier() {
                Some(carrier) => {
                    if let Some(prev) = items.last_mut() {
                        prev.next_segment = Some(sid);
                        prev.carrier_out = Some(carrier);
                    }
                    items.push(Markup::new(
                        sid,
                        component,
                        carrier,
                        fc.governing_carrier,
                        fc.direction,
                        fc.geo_travel_type,
                    ));
                }
                None if Some(sid) != last => {
                    if let Some(prev) = items.last_mut() {
                        prev.alt_off_point = Some(seg.destination);
                    }
                }
                None => {}
            }
        }

        let processing = (0..items.len()).collect();
        Ok(Self { items, processing })
    }

    /// Markups for every fare usage of a pricing unit.
    ///
    /// Fare usages are expected in travel order. Resets the ledger's
    /// fare-component scope flags for the pass.
    pub fn for_pricing_unit(
        itinerary: &Itinerary,
        pu: &PricingUnit,
        current: ComponentId,
        rule: &TransferRule,
        ledger: &mut TransferLedger,
    ) -> Result<Self, DomainError> {
        ledger.fare_component_scope = ledger.fare_component_scope_initial;
        ledger.recurring_fc_scope = false;

        let half_round_trip = pu.kind != PricingUnitKind::OneWay;
        let fare_component_only = rule.max_transfers.is_none() || ledger.fare_component_scope;
        let current_len = itinerary.component(current)?.segments.len();

        let mut items: Vec<Markup> = Vec::new();
        let mut entire: VecDeque<usize> = VecDeque::new();
        let mut secondary: VecDeque<usize> = VecDeque::new();

        for fu in &pu.fare_usages {
            let fc = itinerary.component(fu.component)?;
            let same = fu.component == current;
            let swap = fu.inbound && same && !half_round_trip;
            let validate_entire = !((fare_component_only && !same)
                || !recurring_segments_allow_entire(rule, ledger, same, current_len));
            let direction = if fu.inbound {
                FareDirection::Inbound
            } else {
                FareDirection::Outbound
            };

            let last = fc.last_segment();
            let mut local: VecDeque<usize> = VecDeque::new();
            for &sid in &fc.segments {
                let seg = itinerary.segment(sid)?;
                match seg.carrier() {
                    Some(carrier) => {
                        if let Some(prev) = items.last_mut() {
                            prev.next_segment = Some(sid);
                            prev.carrier_out = Some(carrier);
                        }
                        let mut markup = Markup::new(
                            sid,
                            fu.component,
                            carrier,
                            fc.governing_carrier,
                            direction,
                            pu.geo_travel_type,
                        );
                        markup.validate_entire_rule = validate_entire;
                        items.push(markup);

                        let idx = items.len() - 1;
                        if fu.inbound && !swap {
                            local.push_front(idx);
                        } else {
                            local.push_back(idx);
                        }
                    }
                    None if Some(sid) != last => {
                        if let Some(prev) = items.last_mut() {
                            prev.alt_off_point = Some(seg.destination);
                        }
                    }
                    None => {}
                }
            }

            let target = if validate_entire { &mut entire } else { &mut secondary };
            if swap {
                for idx in local {
                    target.push_front(idx);
                }
            } else {
                target.extend(local);
            }
        }

        let processing = entire.into_iter().chain(secondary).collect();
        Ok(Self { items, processing })
    }

    /// All markups in pricing-unit order.
    pub fn iter(&self) -> impl Iterator<Item = &Markup> {
        self.items.iter()
    }

    /// Arena indices in processing order.
    pub fn processing_order(&self) -> Vec<usize> {
        self.processing.clone()
    }

    /// Markups in processing order.
    pub fn in_processing_order(&self) -> impl Iterator<Item = &Markup> {
        self.processing.iter().map(|&idx| &self.items[idx])
    }

    pub fn get(&self, idx: usize) -> Option<&Markup> {
        self.items.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Markup> {
        self.items.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Classified transfers.
    pub fn transfer_count(&self) -> usize {
        self.items.iter().filter(|m| m.is_transfer()).count()
    }
}

/// A sub-segment tied to one direction puts the ledger in recurring
/// fare-component scope; a single-segment current component has no
/// transfer of its own to validate against the entire rule.
fn recurring_segments_allow_entire(
    rule: &TransferRule,
    ledger: &mut TransferLedger,
    same: bool,
    current_len: usize,
) -> bool {
    for sub in &rule.segments {
        if !sub.in_out.spans_pricing_unit() {
            ledger.recurring_fc_scope = true;
            return false;
        } else if same && current_len == 1 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FareComponent, FareUsage, LocCode, NationCode, TravelSegment};
    use crate::record::{InOutPortion, RuleSubSegment, TransferCount};
    use chrono::NaiveDate;

    fn loc(code: &str) -> Location {
        let code = LocCode::parse(code).unwrap();
        Location::new(code, code, NationCode::parse("US").unwrap(), 1)
    }

    fn cx(s: &str) -> CarrierCode {
        CarrierCode::parse(s).unwrap()
    }

    fn air(from: &str, to: &str, carrier: &str, hour: u32) -> TravelSegment {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        TravelSegment::air(
            loc(from),
            loc(to),
            cx(carrier),
            100,
            day.and_hms_opt(hour, 0, 0).unwrap(),
            day.and_hms_opt(hour + 1, 0, 0).unwrap(),
        )
    }

    /// MEM-CHI-DFW out, DFW-CHI-MEM back.
    fn round_trip() -> (Itinerary, PricingUnit) {
        let mut itin = Itinerary::new(vec![
            air("MEM", "CHI", "AA", 8),
            air("CHI", "DFW", "UA", 10),
            air("DFW", "CHI", "AA", 14),
            air("CHI", "MEM", "AA", 17),
        ]);
        let out = itin.add_component(FareComponent::new(
            cx("AA"),
            FareDirection::Outbound,
            vec![SegmentId(0), SegmentId(1)],
        ));
        let back = itin.add_component(FareComponent::new(
            cx("AA"),
            FareDirection::Inbound,
            vec![SegmentId(2), SegmentId(3)],
        ));
        let pu = PricingUnit::new(
            PricingUnitKind::RoundTrip,
            GeoTravelType::Domestic,
            vec![FareUsage::outbound(out), FareUsage::inbound(back)],
        );
        (itin, pu)
    }

    #[test]
    fn component_markups_link_next_flight() {
        let mut itin = Itinerary::new(vec![
            air("MEM", "CHI", "AA", 8),
            TravelSegment::arunk(loc("CHI"), loc("MKE")),
            air("MKE", "MIA", "UA", 12),
        ]);
        let fc = itin.add_component(FareComponent::new(
            cx("AA"),
            FareDirection::Outbound,
            vec![SegmentId(0), SegmentId(1), SegmentId(2)],
        ));

        let markups = Markups::for_component(&itin, fc).unwrap();
        assert_eq!(markups.len(), 2);

        let first = markups.get(0).unwrap();
        assert_eq!(first.next_segment, Some(SegmentId(2)));
        assert_eq!(first.carrier_out, Some(cx("UA")));
        assert_eq!(first.alt_off_point.as_ref().map(|l| l.code.as_str()), Some("MKE"));
        assert_eq!(markups.get(1).unwrap().next_segment, None);
    }

    #[test]
    fn pricing_unit_links_across_components() {
        let (itin, pu) = round_trip();
        let mut rule = TransferRule::new("ATP", 1);
        rule.max_transfers = Some(TransferCount::Limited(3));
        let mut ledger = TransferLedger::for_pricing_unit(&pu);

        let markups = Markups::for_pricing_unit(&itin, &pu, ComponentId(0), &rule, &mut ledger).unwrap();
        assert_eq!(markups.len(), 4);
        assert_eq!(markups.get(1).unwrap().next_segment, Some(SegmentId(2)));
        assert_eq!(markups.get(2).unwrap().direction, FareDirection::Inbound);

        // Inbound usage processed last segment first.
        let order: Vec<SegmentId> = markups.in_processing_order().map(|m| m.segment).collect();
        assert_eq!(order, vec![SegmentId(0), SegmentId(1), SegmentId(3), SegmentId(2)]);
    }

    #[test]
    fn other_usages_are_secondary_without_max() {
        let (itin, pu) = round_trip();
        let rule = TransferRule::new("ATP", 1);
        let mut ledger = TransferLedger::for_pricing_unit(&pu);

        let markups = Markups::for_pricing_unit(&itin, &pu, ComponentId(1), &rule, &mut ledger).unwrap();
        let entire: Vec<bool> = markups.in_processing_order().map(|m| m.validate_entire_rule).collect();
        assert_eq!(entire, vec![true, true, false, false]);
        assert_eq!(markups.in_processing_order().next().map(|m| m.segment), Some(SegmentId(3)));
    }

    #[test]
    fn current_inbound_one_way_processed_in_reverse() {
        let mut itin = Itinerary::new(vec![
            air("DFW", "CHI", "AA", 8),
            air("CHI", "DEN", "AA", 11),
            air("DEN", "MEM", "AA", 14),
        ]);
        let back = itin.add_component(FareComponent::new(
            cx("AA"),
            FareDirection::Inbound,
            vec![SegmentId(0), SegmentId(1), SegmentId(2)],
        ));
        let pu = PricingUnit::new(PricingUnitKind::OneWay, GeoTravelType::Domestic, vec![FareUsage::inbound(back)]);
        let rule = TransferRule::new("ATP", 1);
        let mut ledger = TransferLedger::for_pricing_unit(&pu);

        let markups = Markups::for_pricing_unit(&itin, &pu, back, &rule, &mut ledger).unwrap();
        let order: Vec<SegmentId> = markups.in_processing_order().map(|m| m.segment).collect();
        assert_eq!(order, vec![SegmentId(2), SegmentId(1), SegmentId(0)]);

        // Storage stays in travel order.
        let stored: Vec<SegmentId> = markups.iter().map(|m| m.segment).collect();
        assert_eq!(stored, vec![SegmentId(0), SegmentId(1), SegmentId(2)]);
    }

    #[test]
    fn directional_sub_segment_sets_recurring_scope() {
        let (itin, pu) = round_trip();
        let mut rule = TransferRule::new("ATP", 1);
        rule.max_transfers = Some(TransferCount::Limited(2));
        let mut sub = RuleSubSegment::new(1);
        sub.in_out = InOutPortion::Outbound;
        rule.segments.push(sub);
        let mut ledger = TransferLedger::for_pricing_unit(&pu);

        let markups = Markups::for_pricing_unit(&itin, &pu, ComponentId(0), &rule, &mut ledger).unwrap();
        assert!(ledger.recurring_fc_scope);
        assert!(markups.iter().all(|m| !m.validate_entire_rule));
    }

    #[test]
    fn combined_carrier_code() {
        let mut m = SubSegmentMatch::new(1);
        assert_eq!(m.carrier(), MatchResult::NotChecked);
        m.carrier_in = MatchResult::DoesNotApply;
        m.carrier_out = MatchResult::Match;
        assert_eq!(m.carrier(), MatchResult::Match);
        m.carrier_in = MatchResult::NotMatch;
        assert_eq!(m.carrier(), MatchResult::NotMatch);
    }
}
