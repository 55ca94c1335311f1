//! Surcharge hand-off for accepted transfers.

use tracing::{debug, warn};

use crate::ledger::{ClaimOwner, TransferLedger};
use crate::record::ChargeAppl;
use crate::surcharge::{SurchargeAccumulator, SurchargeRequest};

use super::context::RuleContext;
use super::markup::{CheckResult, Markup, Markups};
use super::outcome::{Halt, INTERNAL_ERROR};

/// Register a surcharge for every transfer of the current component that
/// passed and is owned by this rule item.
///
/// Markups are walked in pricing-unit order so charge 1 goes to the earliest
/// transfers.
pub(crate) fn register_surcharges(
    ctx: &RuleContext<'_>,
    markups: &Markups,
    ledger: &TransferLedger,
    pax_type: &str,
    accumulator: &mut dyn SurchargeAccumulator,
) -> Result<(), Halt> {
    let rule = ctx.rule;
    let fare_currency = ctx.component(ctx.current)?.currency.as_str();

    accumulator.begin_rule(rule);
    if ledger.fare_component_scope {
        accumulator.reset_counts();
    }

    for markup in markups.iter().filter(|m| m.component == ctx.current) {
        let seg = markup.segment;
        let owned = ledger
            .claim_of(seg)
            .is_some_and(|c| c.owner == ClaimOwner::Item(rule.item_no));
        if !ledger.is_transfer(seg) || !ledger.passed(seg) || !owned {
            continue;
        }

        for (segment_specific, force_charge2) in chargeable(markup) {
            let request = SurchargeRequest {
                segment: seg,
                component: markup.component,
                pax_type,
                fare_currency,
                segment_specific,
                force_charge2,
            };
            if let Err(err) = accumulator.add_surcharge(rule, &request) {
                warn!(segment = %seg, error = %err, "surcharge not registered");
                return Err(Halt::fail(INTERNAL_ERROR));
            }
            debug!(segment = %seg, item = rule.item_no, force_charge2, "surcharge registered");
        }
    }
    Ok(())
}

/// Charges of one transfer as `(segment_specific, force_charge2)` pairs.
///
/// Every passing charge-1 or charge-2 match registers one; without any, the
/// transfer registers a single default charge.
fn chargeable(markup: &Markup) -> Vec<(bool, bool)> {
    let charges: Vec<(bool, bool)> = markup
        .matches
        .iter()
        .filter(|m| m.seg_check == CheckResult::Pass)
        .filter_map(|m| {
            let segment_specific = m.geo.is_satisfied();
            match m.charge {
                Some(ChargeAppl::Charge1) => Some((segment_specific, false)),
                Some(ChargeAppl::Charge2) => Some((segment_specific, true)),
                Some(ChargeAppl::NoCharge) | None => None,
            }
        })
        .collect();

    if charges.is_empty() {
        vec![(markup.charge_segment_specific, false)]
    } else {
        charges
    }
}
