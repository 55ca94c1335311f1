//! Validation entry points.
//!
//! A rule item is validated twice during pricing: once per fare component,
//! where only the component is known and a pass is tentative, and once per
//! pricing unit, where the full set of fare usages is known and the result
//! is final for this rule item.

use tracing::debug;

use crate::domain::{ComponentId, Itinerary, PricingUnit, TravelSegment};
use crate::ledger::TransferLedger;
use crate::record::{TransferRule, UnavailableTag};
use crate::reference::ReferenceData;
use crate::surcharge::SurchargeAccumulator;

use super::classify::{identify_transfers, mark_gateways};
use super::config::ValidationConfig;
use super::context::{RuleContext, ValidationScope, internal};
use super::counts::{check_max, check_max_in_out, check_min};
use super::diagnostics::{self, DiagnosticSink};
use super::markup::Markups;
use super::matcher::match_sub_segments;
use super::outcome::{Halt, ValidationOutcome};
use super::surcharges::register_surcharges;
use super::surface::check_surface_sectors;
use super::transfer_type::filter_transfer_types;

/// One rule item against one fare usage of a priced fare path.
#[derive(Debug, Clone, Copy)]
pub struct PricingUnitRequest<'a> {
    pub rule: &'a TransferRule,
    pub itinerary: &'a Itinerary,
    pub pricing_unit: &'a PricingUnit,
    /// The fare component whose rule is being validated.
    pub component: ComponentId,
    pub pax_type: &'a str,
}

/// Validates transfer rule items against itineraries.
pub struct TransferValidator<'a> {
    reference: &'a dyn ReferenceData,
    config: &'a ValidationConfig,
}

impl<'a> TransferValidator<'a> {
    pub fn new(reference: &'a dyn ReferenceData, config: &'a ValidationConfig) -> Self {
        Self { reference, config }
    }

    /// Validate `rule` for a fare component on its own.
    ///
    /// Never returns a final pass: a pass is reported as soft-pass, to be
    /// confirmed by [`validate_pricing_unit`](Self::validate_pricing_unit).
    pub fn validate_fare_component(
        &self,
        rule: &TransferRule,
        itinerary: &Itinerary,
        component: ComponentId,
        ledger: &mut TransferLedger,
        sink: &mut dyn DiagnosticSink,
    ) -> ValidationOutcome {
        debug!(item = rule.item_no, component = %component, "validating fare component transfers");
        diagnostics::header(sink, rule);

        let ctx = self.context(rule, itinerary, component, ValidationScope::FareComponent);
        let mut markups = Markups::default();
        let outcome = self
            .run_fare_component(&ctx, &mut markups, ledger)
            .unwrap_or_else(ValidationOutcome::from);

        self.finish(sink, &ctx, &markups, outcome)
    }

    /// Validate `rule` for one fare usage of a complete pricing unit.
    ///
    /// Registers surcharges with `accumulator` when the rule item passes.
    pub fn validate_pricing_unit(
        &self,
        request: &PricingUnitRequest<'_>,
        ledger: &mut TransferLedger,
        accumulator: &mut dyn SurchargeAccumulator,
        sink: &mut dyn DiagnosticSink,
    ) -> ValidationOutcome {
        let rule = request.rule;
        debug!(
            item = rule.item_no,
            component = %request.component,
            fare_usages = request.pricing_unit.fare_usages.len(),
            "validating pricing unit transfers"
        );
        diagnostics::header(sink, rule);

        let ctx = self.context(
            rule,
            request.itinerary,
            request.component,
            ValidationScope::PricingUnit(request.pricing_unit),
        );
        let mut markups = Markups::default();
        let outcome = self
            .run_pricing_unit(&ctx, &mut markups, ledger, request.pax_type, accumulator)
            .unwrap_or_else(ValidationOutcome::from);

        self.finish(sink, &ctx, &markups, outcome)
    }

    fn context<'b>(
        &'b self,
        rule: &'b TransferRule,
        itinerary: &'b Itinerary,
        current: ComponentId,
        scope: ValidationScope<'b>,
    ) -> RuleContext<'b> {
        RuleContext {
            rule,
            itinerary,
            reference: self.reference,
            config: self.config,
            current,
            scope,
        }
    }

    fn finish(
        &self,
        sink: &mut dyn DiagnosticSink,
        ctx: &RuleContext<'_>,
        markups: &Markups,
        outcome: ValidationOutcome,
    ) -> ValidationOutcome {
        if !markups.is_empty() {
            diagnostics::breakdown(sink, ctx, markups);
        }
        diagnostics::verdict(sink, &outcome);
        debug!(
            item = ctx.rule.item_no,
            verdict = %outcome.verdict,
            reason = outcome.reason.as_deref().unwrap_or_default(),
            "transfers validated"
        );
        outcome
    }

    fn run_fare_component(
        &self,
        ctx: &RuleContext<'_>,
        markups: &mut Markups,
        ledger: &mut TransferLedger,
    ) -> Result<ValidationOutcome, Halt> {
        let rule = ctx.rule;
        self.check_preconditions(rule)?;

        *markups = Markups::for_component(ctx.itinerary, ctx.current).map_err(internal)?;
        check_surface_sectors(ctx)?;

        let fc = ctx.component(ctx.current)?;
        let needs_minimum = rule.min_transfers.is_some_and(|min| min > 0);
        if needs_minimum && !fc.one_way && !self.config.full_fare_market_validation {
            debug!(item = rule.item_no, "minimum on a round trip fare, revalidate for the pricing unit");
            ledger.ignore_no_match = true;
            return Ok(ValidationOutcome::soft_pass());
        }
        if rule.has_tsi() {
            debug!(item = rule.item_no, "travel segment indicator, revalidate for the pricing unit");
            ledger.ignore_no_match = true;
            return Ok(ValidationOutcome::soft_pass());
        }

        ledger.start_pass(rule.item_no, ctx.current);
        process_transfers(ctx, markups, ledger)?;
        Ok(ValidationOutcome::soft_pass())
    }

    fn run_pricing_unit(
        &self,
        ctx: &RuleContext<'_>,
        markups: &mut Markups,
        ledger: &mut TransferLedger,
        pax_type: &str,
        accumulator: &mut dyn SurchargeAccumulator,
    ) -> Result<ValidationOutcome, Halt> {
        let rule = ctx.rule;
        self.check_preconditions(rule)?;

        let fc = ctx.component(ctx.current)?;
        if self.config.validate_surfaces_for_fare_path || fc.pricing_unit_rule_validation || ledger.relation_or {
            check_surface_sectors(ctx)?;
        }

        let Some(pu) = ctx.pricing_unit() else {
            return Ok(ValidationOutcome::skip(None));
        };
        ledger.start_pass(rule.item_no, ctx.current);
        *markups = Markups::for_pricing_unit(ctx.itinerary, pu, ctx.current, rule, ledger).map_err(internal)?;

        process_transfers(ctx, markups, ledger)?;
        register_surcharges(ctx, markups, ledger, pax_type, accumulator)?;
        Ok(ValidationOutcome::pass())
    }

    fn check_preconditions(&self, rule: &TransferRule) -> Result<(), Halt> {
        match rule.unavailable {
            UnavailableTag::NotAvailable => return Err(Halt::skip("R3 NOT AVAILABLE FOR USE")),
            UnavailableTag::TextOnly => return Err(Halt::skip("TEXT PURPOSE ONLY")),
            UnavailableTag::Available => {}
        }

        if self.config.round_the_world
            && rule.max_transfers.is_none()
            && (rule.out_max.is_some() || rule.in_max.is_some())
        {
            return Err(Halt::skip("MAX NOT SPECIFIED FOR RTW"));
        }
        Ok(())
    }
}

/// Classify, filter and count the transfers of one validation.
fn process_transfers(
    ctx: &RuleContext<'_>,
    markups: &mut Markups,
    ledger: &mut TransferLedger,
) -> Result<(), Halt> {
    identify_transfers(ctx, markups, ledger)?;
    if ctx.rule.has_gateway_restriction() {
        mark_gateways(ctx, markups)?;
    }
    filter_transfer_types(ctx, markups);
    debug!(item = ctx.rule.item_no, transfers = markups.transfer_count(), "transfers classified");

    check_max(ctx, markups)?;
    if !ctx.rule.segments.is_empty() {
        match_sub_segments(ctx, markups, ledger)?;
    }
    check_min(ctx, markups)?;
    check_max_in_out(ctx, markups, ledger)
}

/// Result for a fare component with no transfer rule at all.
///
/// Travel within the US and Canada may not begin or end with a surface
/// sector; anything else is left unrestricted.
pub fn system_default_assumption(itinerary: &Itinerary, component: ComponentId) -> ValidationOutcome {
    let fc = match itinerary.component(component) {
        Ok(fc) => fc,
        Err(err) => return internal(err).into(),
    };
    if !fc.within_us_ca {
        return ValidationOutcome::skip(None);
    }

    let is_air = |sid| {
        itinerary
            .segment(sid)
            .is_ok_and(TravelSegment::is_air)
    };
    let air_ends = fc.first_segment().is_some_and(is_air) && fc.last_segment().is_some_and(is_air);
    if air_ends {
        ValidationOutcome::skip(None)
    } else {
        ValidationOutcome::fail("SURFACE SECTOR AT FARE BREAK")
    }
}
