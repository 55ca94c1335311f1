//! Counter ledger shared across rule items.
//!
//! One ledger lives for one pricing attempt. Every rule item tried against
//! the fare path reads and writes it: which segments are transfers, which
//! passed, which rule item claimed them, and the running sub-segment match
//! counters. It is passed by `&mut` into each validation call and is never
//! shared between threads.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::domain::{ComponentId, FareDirection, PricingUnit, SegmentId};
use crate::engine::ValidationOutcome;
use crate::record::TransferCount;

/// Reason given when a pricing unit fails its final check.
pub const FAILED_SEGMENTS: &str = "SEE ABOVE FOR FAILED SEGMENTS";

/// Who claimed a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOwner {
    /// A rule item, by item number.
    Item(u32),
    /// Counted for a component outside the validated scope.
    OutOfScope,
}

/// A rule item's claim on a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleItemClaim {
    pub owner: ClaimOwner,
    pub tentative: bool,
}

/// Which maximum a transfer exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxExceeded {
    Total,
    InOut,
}

/// Everything the ledger knows about one travel segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentState {
    pub component: ComponentId,
    pub is_transfer: bool,
    pub validate_entire_rule: bool,
    pub passed: bool,
    pub passed_by_least_restrictive: bool,
    pub recurring_fc_scope: bool,
    pub claim: Option<RuleItemClaim>,
    pub max_exceeded: Option<MaxExceeded>,
    pub no_match_validation: bool,
}

impl SegmentState {
    fn new(component: ComponentId) -> Self {
        Self {
            component,
            is_transfer: false,
            validate_entire_rule: true,
            passed: false,
            passed_by_least_restrictive: false,
            recurring_fc_scope: false,
            claim: None,
            max_exceeded: None,
            no_match_validation: false,
        }
    }
}

/// Counter bucket for one sub-segment, optionally per containing location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub order_no: u32,
    pub location: Option<String>,
}

/// Matches counted for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionCounts {
    pub total: u16,
    pub outbound: u16,
    pub inbound: u16,
}

impl DirectionCounts {
    pub fn record(&mut self, direction: FareDirection) {
        self.total += 1;
        match direction {
            FareDirection::Outbound => self.outbound += 1,
            FareDirection::Inbound => self.inbound += 1,
            FareDirection::Unknown => {}
        }
    }
}

/// Shared state across the rule items of one pricing attempt.
#[derive(Debug, Clone, Default)]
pub struct TransferLedger {
    segments: BTreeMap<SegmentId, SegmentState>,
    pricing_unit_scope: HashSet<ComponentId>,
    counters: HashMap<CounterKey, DirectionCounts>,

    /// Transfers validated per fare component, as set up by the caller.
    pub fare_component_scope_initial: bool,
    /// Transfers validated per fare component for the current pass.
    pub fare_component_scope: bool,
    /// A recurring sub-segment forces per-component validation.
    pub recurring_fc_scope: bool,
    /// Limit granted by the least restrictive provision, when it applies.
    pub least_restrictive: Option<TransferCount>,
    pub relation_and: bool,
    pub relation_or: bool,
    /// Unmatched transfers do not fail the pricing unit.
    pub ignore_no_match: bool,
    /// Set by the caller when the pricing unit already failed elsewhere.
    pub transfer_fails_pu: bool,

    item_no: u32,
    component: Option<ComponentId>,
}

impl TransferLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger where every fare usage of `pu` has pricing-unit scope.
    pub fn for_pricing_unit(pu: &PricingUnit) -> Self {
        let mut ledger = Self::new();
        ledger.set_pricing_unit_scope(pu.fare_usages.iter().map(|fu| fu.component));
        ledger
    }

    pub fn set_pricing_unit_scope(&mut self, components: impl IntoIterator<Item = ComponentId>) {
        self.pricing_unit_scope = components.into_iter().collect();
    }

    pub fn has_pricing_unit_scope(&self, component: ComponentId) -> bool {
        self.pricing_unit_scope.contains(&component)
    }

    /// Begin validating `item_no` for `component`; resets the match counters.
    pub fn start_pass(&mut self, item_no: u32, component: ComponentId) {
        self.item_no = item_no;
        self.component = Some(component);
        self.counters.clear();
    }

    pub fn item_no(&self) -> u32 {
        self.item_no
    }

    pub fn counts(&self, key: &CounterKey) -> DirectionCounts {
        self.counters.get(key).copied().unwrap_or_default()
    }

    pub fn record_match(&mut self, key: CounterKey, direction: FareDirection) {
        self.counters.entry(key).or_default().record(direction);
    }

    /// Matches of sub-segment `order_no` summed over its location buckets.
    pub fn total_matches(&self, order_no: u32) -> u16 {
        self.counters
            .iter()
            .filter(|(key, _)| key.order_no == order_no)
            .map(|(_, counts)| counts.total)
            .sum()
    }

    fn state_mut(&mut self, seg: SegmentId, component: ComponentId) -> &mut SegmentState {
        self.segments
            .entry(seg)
            .or_insert_with(|| SegmentState::new(component))
    }

    pub fn segment(&self, seg: SegmentId) -> Option<&SegmentState> {
        self.segments.get(&seg)
    }

    pub fn set_is_transfer(&mut self, seg: SegmentId, component: ComponentId, entire_rule: bool) {
        let state = self.state_mut(seg, component);
        state.is_transfer = true;
        state.validate_entire_rule = entire_rule;
    }

    pub fn is_transfer(&self, seg: SegmentId) -> bool {
        self.segments.get(&seg).is_some_and(|s| s.is_transfer)
    }

    pub fn set_passed(
        &mut self,
        seg: SegmentId,
        component: ComponentId,
        by_least_restrictive: bool,
        recurring_fc_scope: bool,
    ) {
        let state = self.state_mut(seg, component);
        state.passed = true;
        state.passed_by_least_restrictive = by_least_restrictive;
        state.recurring_fc_scope = recurring_fc_scope;
    }

    pub fn passed(&self, seg: SegmentId) -> bool {
        self.segments.get(&seg).is_some_and(|s| s.passed)
    }

    /// Record `owner` as the claimant of `seg`.
    ///
    /// An existing claim is only replaced when it is tentative and the new
    /// one is not. Any change of owner clears the passed flag.
    pub fn claim(&mut self, seg: SegmentId, component: ComponentId, owner: ClaimOwner, tentative: bool) {
        let state = self.state_mut(seg, component);
        let replace = match state.claim {
            Some(existing) => existing.tentative && !tentative,
            None => true,
        };
        if replace {
            state.claim = Some(RuleItemClaim { owner, tentative });
            state.passed = false;
        }
    }

    pub fn claim_of(&self, seg: SegmentId) -> Option<RuleItemClaim> {
        self.segments.get(&seg).and_then(|s| s.claim)
    }

    pub fn set_max_exceeded(&mut self, seg: SegmentId, component: ComponentId, kind: MaxExceeded) {
        self.state_mut(seg, component).max_exceeded = Some(kind);
    }

    /// Transfers of other pricing-unit-scoped usages that never passed are
    /// judged by their own rule items, not by the current one.
    fn mark_no_match_validation(&mut self, current: ComponentId) {
        let scope = &self.pricing_unit_scope;
        for state in self.segments.values_mut() {
            if scope.contains(&state.component)
                && state.is_transfer
                && !state.passed
                && state.component != current
                && state.validate_entire_rule
            {
                state.no_match_validation = true;
            }
        }
    }

    /// Every transfer relevant to `current` passed and is owned.
    pub fn check_all_passed(&self, current: ComponentId) -> bool {
        if self.ignore_no_match {
            return true;
        }

        let mut count: u16 = 0;
        for state in self.segments.values().filter(|s| s.is_transfer) {
            if !state.passed {
                if state.component != current && state.claim.is_none() {
                    continue;
                }
                if !state.no_match_validation {
                    return false;
                }
            }

            match self.least_restrictive {
                None if state.claim.is_none() => return false,
                None => {}
                Some(limit) => {
                    count += 1;
                    if limit.is_exceeded_by(count) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Final pricing-unit result once every rule item has been tried.
    pub fn conclude(&mut self, pu: &PricingUnit, current: ComponentId) -> ValidationOutcome {
        if pu.usage_of(current).is_some() {
            self.mark_no_match_validation(current);
        }

        if !self.check_all_passed(current) || self.transfer_fails_pu {
            debug!(component = %current, "pricing unit transfers failed");
            return ValidationOutcome::fail(FAILED_SEGMENTS);
        }
        ValidationOutcome::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FareUsage, GeoTravelType, PricingUnitKind};
    use crate::engine::Verdict;

    const FC0: ComponentId = ComponentId(0);
    const FC1: ComponentId = ComponentId(1);

    fn round_trip() -> PricingUnit {
        PricingUnit::new(
            PricingUnitKind::RoundTrip,
            GeoTravelType::Domestic,
            vec![FareUsage::outbound(FC0), FareUsage::inbound(FC1)],
        )
    }

    #[test]
    fn counters_reset_per_pass() {
        let mut ledger = TransferLedger::new();
        let key = CounterKey {
            order_no: 1,
            location: None,
        };

        ledger.start_pass(100, FC0);
        ledger.record_match(key.clone(), FareDirection::Outbound);
        ledger.record_match(key.clone(), FareDirection::Inbound);
        ledger.record_match(key.clone(), FareDirection::Unknown);
        assert_eq!(
            ledger.counts(&key),
            DirectionCounts {
                total: 3,
                outbound: 1,
                inbound: 1
            }
        );

        let tokyo = CounterKey {
            order_no: 1,
            location: Some("TYO".to_string()),
        };
        ledger.record_match(tokyo, FareDirection::Outbound);
        assert_eq!(ledger.total_matches(1), 4);
        assert_eq!(ledger.total_matches(2), 0);

        ledger.start_pass(200, FC0);
        assert_eq!(ledger.counts(&key), DirectionCounts::default());
        assert_eq!(ledger.item_no(), 200);

        ledger.record_match(key.clone(), FareDirection::Outbound);
        ledger.start_pass(200, FC0);
        assert_eq!(ledger.total_matches(1), 0);
    }

    #[test]
    fn claims_only_override_tentative() {
        let mut ledger = TransferLedger::new();
        let seg = SegmentId(0);

        ledger.claim(seg, FC0, ClaimOwner::Item(1), true);
        ledger.set_passed(seg, FC0, false, false);
        ledger.claim(seg, FC0, ClaimOwner::Item(2), false);
        assert_eq!(ledger.claim_of(seg).map(|c| c.owner), Some(ClaimOwner::Item(2)));
        assert!(!ledger.passed(seg));

        ledger.claim(seg, FC0, ClaimOwner::Item(3), false);
        assert_eq!(ledger.claim_of(seg).map(|c| c.owner), Some(ClaimOwner::Item(2)));
    }

    #[test]
    fn all_passed_requires_owned_transfers() {
        let mut ledger = TransferLedger::for_pricing_unit(&round_trip());
        let seg = SegmentId(0);
        ledger.set_is_transfer(seg, FC0, true);
        assert!(!ledger.check_all_passed(FC0));

        ledger.claim(seg, FC0, ClaimOwner::Item(5), false);
        ledger.set_passed(seg, FC0, false, false);
        assert!(ledger.check_all_passed(FC0));
    }

    #[test]
    fn unowned_transfers_of_other_components_are_ignored() {
        let mut ledger = TransferLedger::for_pricing_unit(&round_trip());
        ledger.set_is_transfer(SegmentId(3), FC1, true);
        assert!(ledger.check_all_passed(FC0));
        assert!(!ledger.check_all_passed(FC1));
    }

    #[test]
    fn least_restrictive_limit() {
        let mut ledger = TransferLedger::new();
        ledger.least_restrictive = Some(TransferCount::Limited(1));
        for seg in [SegmentId(0), SegmentId(1)] {
            ledger.set_is_transfer(seg, FC0, true);
            ledger.set_passed(seg, FC0, true, false);
        }
        assert!(!ledger.check_all_passed(FC0));

        ledger.least_restrictive = Some(TransferCount::Unlimited);
        assert!(ledger.check_all_passed(FC0));
    }

    #[test]
    fn conclude_marks_other_usages() {
        let pu = round_trip();
        let mut ledger = TransferLedger::for_pricing_unit(&pu);
        let inbound_seg = SegmentId(3);
        ledger.set_is_transfer(inbound_seg, FC1, true);
        ledger.claim(inbound_seg, FC1, ClaimOwner::Item(9), false);

        assert!(!ledger.check_all_passed(FC0));
        assert_eq!(ledger.conclude(&pu, FC0), ValidationOutcome::pass());

        let own_seg = SegmentId(0);
        ledger.set_is_transfer(own_seg, FC0, true);
        let outcome = ledger.conclude(&pu, FC0);
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(outcome.reason.as_deref(), Some(FAILED_SEGMENTS));
    }

    #[test]
    fn ignore_no_match_passes() {
        let pu = round_trip();
        let mut ledger = TransferLedger::for_pricing_unit(&pu);
        ledger.set_is_transfer(SegmentId(0), FC0, true);
        ledger.ignore_no_match = true;
        assert_eq!(ledger.conclude(&pu, FC0), ValidationOutcome::pass());
    }
}
