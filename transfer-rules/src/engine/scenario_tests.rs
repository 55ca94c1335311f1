//! End-to-end validation scenarios.

use chrono::NaiveDate;
use proptest::prelude::*;

use super::*;
use crate::domain::{
    CarrierCode, ComponentId, FareComponent, FareDirection, FareUsage, GeoTravelType, Itinerary,
    LocCode, Location, NationCode, PricingUnit, PricingUnitKind, SegmentId, TravelSegment,
};
use crate::ledger::{FAILED_SEGMENTS, TransferLedger};
use crate::record::{
    Applicability, CarrierPairLimits, ChargeAppl, ChargeColumn, FareBreakSurface, InOutApplication,
    InOutPortion, LocKey, LocType, RuleSubSegment, TransferCharges, TransferCount, TransferRule,
};
use crate::reference::StaticReferenceData;
use crate::surcharge::{ChargeTally, Surcharge};

fn loc(code: &str) -> Location {
    let code = LocCode::parse(code).unwrap();
    Location::new(code, code, NationCode::parse("US").unwrap(), 1)
}

fn cx(s: &str) -> CarrierCode {
    CarrierCode::parse(s).unwrap()
}

fn air(from: &str, to: &str, carrier: &str, hour: u32) -> TravelSegment {
    let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    TravelSegment::air(
        loc(from),
        loc(to),
        cx(carrier),
        400 + hour,
        day.and_hms_opt(hour, 0, 0).unwrap(),
        day.and_hms_opt(hour + 1, 0, 0).unwrap(),
    )
}

fn component(itin: &mut Itinerary, segments: std::ops::Range<usize>, direction: FareDirection) -> ComponentId {
    let mut fc = FareComponent::new(cx("AA"), direction, segments.map(SegmentId).collect());
    fc.one_way = true;
    fc.currency = "USD".into();
    itin.add_component(fc)
}

/// A single fare component priced one way.
fn one_way(segments: Vec<TravelSegment>) -> (Itinerary, PricingUnit) {
    let len = segments.len();
    let mut itin = Itinerary::new(segments);
    let fc = component(&mut itin, 0..len, FareDirection::Outbound);
    let pu = PricingUnit::new(PricingUnitKind::OneWay, GeoTravelType::Domestic, vec![FareUsage::outbound(fc)]);
    (itin, pu)
}

/// MEM-CHI-DFW out, DFW-CHI-MEM back, all on AA.
fn round_trip() -> (Itinerary, PricingUnit) {
    let mut itin = Itinerary::new(vec![
        air("MEM", "CHI", "AA", 8),
        air("CHI", "DFW", "AA", 10),
        air("DFW", "CHI", "AA", 14),
        air("CHI", "MEM", "AA", 16),
    ]);
    let out = component(&mut itin, 0..2, FareDirection::Outbound);
    let back = component(&mut itin, 2..4, FareDirection::Inbound);
    let pu = PricingUnit::new(
        PricingUnitKind::RoundTrip,
        GeoTravelType::Domestic,
        vec![FareUsage::outbound(out), FareUsage::inbound(back)],
    );
    (itin, pu)
}

fn city(code: &str) -> Option<LocKey> {
    Some(LocKey::new(LocType::City, code))
}

fn sub_segment(order_no: u32, applicability: Applicability, at: &str, charge: ChargeAppl) -> RuleSubSegment {
    let mut sub = RuleSubSegment::new(order_no);
    sub.applicability = applicability;
    sub.loc1 = city(at);
    sub.charge = charge;
    sub
}

fn usd_charges() -> TransferCharges {
    TransferCharges {
        first: Some(ChargeColumn {
            currency: "USD".into(),
            charge1: 5000,
            charge2: 2500,
            decimals: 2,
        }),
        second: None,
        max_charge1: TransferCount::Unlimited,
        max_charge2: TransferCount::Unlimited,
    }
}

struct Run {
    outcome: ValidationOutcome,
    surcharges: Vec<Surcharge>,
    trace: TraceBuffer,
    ledger: TransferLedger,
}

fn run_with(rule: &TransferRule, itin: &Itinerary, pu: &PricingUnit, ledger: TransferLedger) -> Run {
    run_configured(rule, itin, pu, ledger, &ValidationConfig::default())
}

fn run_configured(
    rule: &TransferRule,
    itin: &Itinerary,
    pu: &PricingUnit,
    mut ledger: TransferLedger,
    config: &ValidationConfig,
) -> Run {
    let reference = StaticReferenceData::new();
    let validator = TransferValidator::new(&reference, config);
    let mut tally = ChargeTally::new();
    let mut trace = TraceBuffer::new();
    let request = PricingUnitRequest {
        rule,
        itinerary: itin,
        pricing_unit: pu,
        component: pu.fare_usages[0].component,
        pax_type: "ADT",
    };

    let outcome = validator.validate_pricing_unit(&request, &mut ledger, &mut tally, &mut trace);
    Run {
        outcome,
        surcharges: tally.surcharges().to_vec(),
        trace,
        ledger,
    }
}

fn run(rule: &TransferRule, itin: &Itinerary, pu: &PricingUnit) -> Run {
    run_with(rule, itin, pu, TransferLedger::for_pricing_unit(pu))
}

#[test]
fn unrestricted_connection_passes() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 100);
    rule.min_transfers = Some(0);
    rule.max_transfers = Some(TransferCount::Unlimited);

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(result.surcharges.is_empty());
    assert!(result.ledger.passed(SegmentId(0)));
    assert!(result.trace.contains("TRANSFERS : PASS - NOT FINAL VALIDATION"));
}

#[test]
fn fare_component_pass_is_soft() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let rule = TransferRule::new("ATP", 100);
    let reference = StaticReferenceData::new();
    let config = ValidationConfig::default();
    let validator = TransferValidator::new(&reference, &config);

    let outcome = validator.validate_fare_component(
        &rule,
        &itin,
        pu.fare_usages[0].component,
        &mut TransferLedger::new(),
        &mut NullSink,
    );
    assert_eq!(outcome.verdict, Verdict::SoftPass);
}

#[test]
fn below_minimum_fails() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 101);
    rule.min_transfers = Some(2);

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail("MIN 2 TRANSFERS REQUIRED"));
    assert!(result.trace.contains("TRANSFERS : FAIL - MIN 2 TRANSFERS REQUIRED"));
}

#[test]
fn required_transfer_point_missing() {
    let (itin, pu) = one_way(vec![air("MEM", "DFW", "AA", 8), air("DFW", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 102);
    rule.segments
        .push(sub_segment(1, Applicability::Required, "CHI", ChargeAppl::NoCharge));

    let result = run(&rule, &itin, &pu);
    assert_eq!(
        result.outcome,
        ValidationOutcome::fail("TRANSFER REQUIRED BY RULE SEGMENT: 1")
    );
    assert!(result.trace.contains("GEO:NOT"));
}

#[test]
fn required_transfer_point_present() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 102);
    rule.segments
        .push(sub_segment(1, Applicability::Required, "CHI", ChargeAppl::NoCharge));

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(result.trace.contains("SEGMENT CHECK RESULT: PASS"));
}

#[test]
fn disallowed_pairing_cannot_meet_minimum() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "UA", 8), air("CHI", "MIA", "DL", 10)]);
    let mut rule = TransferRule::new("ATP", 103);
    rule.min_transfers = Some(1);
    rule.carrier_pairs = CarrierPairLimits {
        prime_prime: Some(TransferCount::Unlimited),
        ..CarrierPairLimits::default()
    };

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail("MIN 1 TRANSFERS REQUIRED"));
    assert!(result.trace.contains("TY:O/O  NOT MATCH"));
}

#[test]
fn zero_maximum_forbids_transfers() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 104);
    rule.max_transfers = Some(TransferCount::Limited(0));

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail("NO TRANSFERS PERMITTED"));

    let (itin, pu) = one_way(vec![air("MEM", "MIA", "AA", 8)]);
    assert_eq!(run(&rule, &itin, &pu).outcome, ValidationOutcome::pass());
}

#[test]
fn least_restrictive_provision_overrides_zero_maximum() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 104);
    rule.max_transfers = Some(TransferCount::Limited(0));

    let mut ledger = TransferLedger::for_pricing_unit(&pu);
    ledger.least_restrictive = Some(TransferCount::Limited(1));
    let result = run_with(&rule, &itin, &pu, ledger);
    assert_eq!(result.outcome.verdict, Verdict::Pass);
    assert!(!result.ledger.passed(SegmentId(0)));
}

#[test]
fn too_many_transfers() {
    let (itin, pu) = one_way(vec![
        air("MEM", "CHI", "AA", 6),
        air("CHI", "DFW", "AA", 8),
        air("DFW", "MIA", "AA", 10),
    ]);
    let mut rule = TransferRule::new("ATP", 105);
    rule.max_transfers = Some(TransferCount::Limited(1));

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail("MAX 1 TRANSFERS PERMITTED"));
}

#[test]
fn maximum_applies_despite_least_restrictive_provision() {
    let (itin, pu) = one_way(vec![
        air("MEM", "CHI", "AA", 6),
        air("CHI", "DFW", "AA", 8),
        air("DFW", "MIA", "AA", 10),
    ]);
    let mut rule = TransferRule::new("ATP", 105);
    rule.max_transfers = Some(TransferCount::Limited(1));

    let mut ledger = TransferLedger::for_pricing_unit(&pu);
    ledger.least_restrictive = Some(TransferCount::Unlimited);
    let result = run_with(&rule, &itin, &pu, ledger);
    assert_eq!(result.outcome, ValidationOutcome::fail("MAX 1 TRANSFERS PERMITTED"));
}

#[test]
fn out_or_return_exclusive() {
    let (itin, pu) = round_trip();
    let mut rule = TransferRule::new("ATP", 106);
    rule.max_transfers = Some(TransferCount::Unlimited);
    rule.in_out_application = InOutApplication::OutOrReturnExclusive;

    let result = run(&rule, &itin, &pu);
    assert_eq!(
        result.outcome,
        ValidationOutcome::fail("TRANSFERS PERMITTED OUT OR IN. NOT BOTH")
    );

    rule.in_out_application = InOutApplication::Combined;
    assert_eq!(run(&rule, &itin, &pu).outcome, ValidationOutcome::pass());
}

#[test]
fn round_the_world_allows_transfers_both_ways() {
    let (itin, pu) = round_trip();
    let mut rule = TransferRule::new("ATP", 106);
    rule.max_transfers = Some(TransferCount::Unlimited);
    rule.in_out_application = InOutApplication::OutOrReturnExclusive;

    let config = ValidationConfig {
        round_the_world: true,
        ..ValidationConfig::default()
    };
    let result = run_configured(&rule, &itin, &pu, TransferLedger::for_pricing_unit(&pu), &config);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(result.ledger.passed(SegmentId(0)));
}

#[test]
fn exclusivity_ignored_in_fare_component_scope() {
    let (itin, pu) = round_trip();
    let mut rule = TransferRule::new("ATP", 106);
    rule.max_transfers = Some(TransferCount::Unlimited);
    rule.in_out_application = InOutApplication::OutOrReturnExclusive;

    let mut ledger = TransferLedger::for_pricing_unit(&pu);
    ledger.fare_component_scope_initial = true;
    assert_eq!(run_with(&rule, &itin, &pu, ledger).outcome, ValidationOutcome::pass());
}

#[test]
fn not_permitted_off_point_stops_transfer() {
    let (itin, pu) = one_way(vec![
        air("MEM", "CHI", "AA", 8),
        TravelSegment::arunk(loc("CHI"), loc("MKE")),
        air("MKE", "MIA", "AA", 12),
    ]);
    let mut rule = TransferRule::new("ATP", 107);
    rule.segments
        .push(sub_segment(1, Applicability::NotPermitted, "MKE", ChargeAppl::NoCharge));
    rule.charges = usd_charges();

    let mut result = run(&rule, &itin, &pu);
    assert!(result.trace.contains("SEGMENT CHECK RESULT: STOP"));
    assert!(!result.ledger.passed(SegmentId(0)));
    assert!(result.surcharges.is_empty());

    let concluded = result.ledger.conclude(&pu, pu.fare_usages[0].component);
    assert_eq!(concluded, ValidationOutcome::fail(FAILED_SEGMENTS));
}

#[test]
fn not_permitted_transfer_point_fails_pricing_unit() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 108);
    rule.segments
        .push(sub_segment(1, Applicability::NotPermitted, "CHI", ChargeAppl::NoCharge));

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail(FAILED_SEGMENTS));
}

#[test]
fn matched_charge_registers_surcharge() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 109);
    rule.segments
        .push(sub_segment(1, Applicability::Permitted, "CHI", ChargeAppl::Charge1));
    rule.charges = usd_charges();

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert_eq!(result.surcharges.len(), 1);
    let charge = &result.surcharges[0];
    assert_eq!(charge.segment, SegmentId(0));
    assert_eq!(charge.amount, 5000);
    assert_eq!(charge.pax_type, "ADT");
    assert!(charge.is_charge1);
    assert!(charge.segment_specific);
}

#[test]
fn embedded_surface_not_permitted() {
    let (itin, pu) = one_way(vec![
        air("MEM", "CHI", "AA", 8),
        TravelSegment::arunk(loc("CHI"), loc("MKE")),
        air("MKE", "MIA", "AA", 12),
    ]);
    let mut rule = TransferRule::new("ATP", 110);
    rule.embedded_surfaces = crate::record::EmbeddedSurfaces::NotPermitted;
    rule.fare_break_surface = FareBreakSurface::Permitted;

    let reference = StaticReferenceData::new();
    let config = ValidationConfig::default();
    let validator = TransferValidator::new(&reference, &config);
    let outcome = validator.validate_fare_component(
        &rule,
        &itin,
        pu.fare_usages[0].component,
        &mut TransferLedger::new(),
        &mut NullSink,
    );
    assert_eq!(outcome, ValidationOutcome::fail("EMBEDDED SURFACE NOT PERMITTED: CHI-MKE"));
}

#[test]
fn undefined_travel_segment_indicator() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 111);
    let mut sub = RuleSubSegment::new(1);
    sub.tsi = Some(99);
    rule.segments.push(sub);

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail("TSI ERROR - SEG: 1"));
}

#[test]
fn other_component_accepted_by_least_restrictive_provision() {
    let (itin, pu) = round_trip();
    let mut rule = TransferRule::new("ATP", 112);
    rule.max_transfers = Some(TransferCount::Unlimited);
    let mut sub = RuleSubSegment::new(1);
    sub.in_out = InOutPortion::Outbound;
    rule.segments.push(sub);

    let mut ledger = TransferLedger::for_pricing_unit(&pu);
    ledger.least_restrictive = Some(TransferCount::Unlimited);
    let result = run_with(&rule, &itin, &pu, ledger);
    assert_eq!(result.outcome, ValidationOutcome::pass());

    let own = result.ledger.segment(SegmentId(0)).unwrap();
    assert!(own.passed);
    assert!(!own.passed_by_least_restrictive);
    let other = result.ledger.segment(SegmentId(2)).unwrap();
    assert!(other.passed);
    assert!(other.passed_by_least_restrictive);
    assert!(other.recurring_fc_scope);

    let result = run(&rule, &itin, &pu);
    let other = result.ledger.segment(SegmentId(2)).unwrap();
    assert!(other.passed);
    assert!(!other.passed_by_least_restrictive);
}

/// MEM-CHI, surface CHI-MKE, MKE-MIA.
fn surface_off_point() -> (Itinerary, PricingUnit) {
    one_way(vec![
        air("MEM", "CHI", "AA", 8),
        TravelSegment::arunk(loc("CHI"), loc("MKE")),
        air("MKE", "MIA", "AA", 12),
    ])
}

#[test]
fn permitted_point_must_cover_surface_off_point() {
    let (itin, pu) = surface_off_point();
    let mut rule = TransferRule::new("ATP", 113);
    rule.segments
        .push(sub_segment(1, Applicability::Permitted, "CHI", ChargeAppl::NoCharge));

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(!result.ledger.passed(SegmentId(0)));

    rule.segments[0].loc2 = city("MKE");
    let result = run(&rule, &itin, &pu);
    assert!(result.ledger.passed(SegmentId(0)));
}

#[test]
fn off_point_claimed_by_permitted_segment() {
    let (itin, pu) = surface_off_point();
    let mut rule = TransferRule::new("ATP", 114);
    rule.segments
        .push(sub_segment(1, Applicability::NotPermitted, "DFW", ChargeAppl::NoCharge));
    let mut chicago = sub_segment(2, Applicability::Permitted, "CHI", ChargeAppl::NoCharge);
    chicago.loc2 = city("MKE");
    rule.segments.push(chicago);

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(result.ledger.passed(SegmentId(0)));
    assert!(!result.trace.contains("SEGMENT CHECK RESULT: STOP"));

    rule.segments[1].applicability = Applicability::NotPermitted;
    let result = run(&rule, &itin, &pu);
    assert!(result.trace.contains("SEGMENT CHECK RESULT: STOP"));
    assert!(!result.ledger.passed(SegmentId(0)));
}

#[test]
fn transfer_between_two_points() {
    let (itin, pu) = one_way(vec![
        air("MEM", "CHI", "AA", 6),
        air("CHI", "DFW", "AA", 8),
        air("DFW", "MIA", "AA", 10),
    ]);
    let mut rule = TransferRule::new("ATP", 115);
    let mut sub = sub_segment(1, Applicability::Permitted, "CHI", ChargeAppl::Charge1);
    sub.loc2 = city("MIA");
    sub.between = true;
    rule.segments.push(sub);
    rule.charges = usd_charges();

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(!result.ledger.passed(SegmentId(0)));
    assert!(result.ledger.passed(SegmentId(1)));
    assert_eq!(result.surcharges.len(), 1);
    assert_eq!(result.surcharges[0].segment, SegmentId(1));
    assert_eq!(result.surcharges[0].amount, 5000);
}

#[test]
fn either_direction_segment_used_both_ways() {
    let (itin, pu) = round_trip();
    let mut rule = TransferRule::new("ATP", 116);
    rule.max_transfers = Some(TransferCount::Unlimited);
    let mut sub = RuleSubSegment::new(1);
    sub.in_out = InOutPortion::Either;
    rule.segments.push(sub);

    let result = run(&rule, &itin, &pu);
    assert_eq!(
        result.outcome,
        ValidationOutcome::fail(" TRANSFER ONLY PERMITTED ON \n  INBOUND OR OUTBOUND. NOT BOTH")
    );
    assert!(result.trace.contains("IN/OUT-ONLY"));
}

#[test]
fn directional_segment_geography_never_matched() {
    let (itin, pu) = one_way(vec![air("MEM", "CHI", "AA", 8), air("CHI", "MIA", "AA", 10)]);
    let mut rule = TransferRule::new("ATP", 117);
    let mut sub = sub_segment(1, Applicability::Permitted, "DFW", ChargeAppl::NoCharge);
    sub.in_out = InOutPortion::Outbound;
    rule.segments.push(sub);

    let result = run(&rule, &itin, &pu);
    assert_eq!(result.outcome, ValidationOutcome::fail("GEO NOT MATCH"));
    assert!(result.ledger.recurring_fc_scope);

    let mut ledger = TransferLedger::for_pricing_unit(&pu);
    ledger.relation_and = true;
    let result = run_with(&rule, &itin, &pu, ledger);
    assert_eq!(result.outcome, ValidationOutcome::pass());
    assert!(!result.ledger.passed(SegmentId(0)));
    assert!(result.trace.contains("SEGMENT CHECK RESULT: GEO NOT MATCH"));
}

fn carrier_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("AA"), Just("UA"), Just("DL")]
}

proptest! {
    #[test]
    fn validation_is_repeatable(
        carriers in proptest::collection::vec(carrier_strategy(), 1..6),
        max in proptest::option::of(0u16..4),
        min in proptest::option::of(0u16..3),
        charged in any::<bool>(),
    ) {
        let cities = ["MEM", "CHI", "DFW", "DEN", "PHX", "LAX", "SFO"];
        let segments = carriers
            .iter()
            .enumerate()
            .map(|(i, c)| air(cities[i], cities[i + 1], c, 6 + 2 * i as u32))
            .collect();
        let (itin, pu) = one_way(segments);

        let mut rule = TransferRule::new("ATP", 200);
        rule.max_transfers = max.map(TransferCount::Limited);
        rule.min_transfers = min;
        rule.charges = usd_charges();
        if charged {
            rule.segments.push(sub_segment(1, Applicability::Permitted, "DFW", ChargeAppl::Charge1));
        }

        let first = run(&rule, &itin, &pu);
        let second = run(&rule, &itin, &pu);
        prop_assert_eq!(first.outcome, second.outcome);
        prop_assert_eq!(first.surcharges, second.surcharges);
    }
}
