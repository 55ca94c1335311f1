//! Record-level transfer count checks.
//!
//! The minimum and total maximum look only at classified transfers. The
//! in/out pass walks them once more in processing order, counting the ones
//! the matcher accepted against the directional and per-pairing maxima, and
//! records in the ledger which rule item claims each of them.

use tracing::debug;

use crate::domain::FareDirection;
use crate::ledger::{ClaimOwner, MaxExceeded, TransferLedger};
use crate::record::{CarrierPair, CarrierPairLimits, InOutApplication, TransferCount};

use super::context::RuleContext;
use super::markup::{CheckResult, Markups};
use super::outcome::{Halt, MatchResult};

/// Fail when fewer transfers exist than the record's minimum.
pub(crate) fn check_min(ctx: &RuleContext<'_>, markups: &Markups) -> Result<(), Halt> {
    let Some(min) = ctx.rule.min_transfers else {
        return Ok(());
    };
    let max_coded = ctx.rule.max_transfers.is_some();

    let count = markups
        .in_processing_order()
        .filter(|m| m.is_transfer() && m.type_match != MatchResult::NotMatch)
        .filter(|m| max_coded || m.component == ctx.current)
        .count();

    if count < usize::from(min) {
        debug!(item = ctx.rule.item_no, count, min, "too few transfers");
        return Err(Halt::fail(format!("MIN {min} TRANSFERS REQUIRED")));
    }
    Ok(())
}

/// Fail when more transfers exist than the record's maximum.
///
/// A maximum of zero is left to the in/out pass, which reports it as
/// "NO TRANSFERS PERMITTED" and honours the least restrictive provision.
/// Any other numeric maximum applies regardless of that provision.
pub(crate) fn check_max(ctx: &RuleContext<'_>, markups: &Markups) -> Result<(), Halt> {
    let Some(max) = ctx.rule.max_limit().limit() else {
        return Ok(());
    };
    if max == 0 {
        return Ok(());
    }

    let count = markups.transfer_count();
    if count > usize::from(max) {
        debug!(item = ctx.rule.item_no, count, max, "too many transfers");
        return Err(Halt::fail(format!("MAX {max} TRANSFERS PERMITTED")));
    }
    Ok(())
}

/// Running counters of the in/out pass.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    total: u16,
    outbound: u16,
    inbound: u16,
    prime_prime: u16,
    same_same: u16,
    prime_other: u16,
    other_other: u16,
}

impl Tally {
    /// Count one more transfer of `pair`; returns the new pairing count.
    fn add_pair(&mut self, pair: CarrierPair) -> u16 {
        let slot = match pair {
            CarrierPair::PrimePrime => &mut self.prime_prime,
            CarrierPair::SameSame => &mut self.same_same,
            CarrierPair::PrimeOther => &mut self.prime_other,
            CarrierPair::OtherOther => &mut self.other_other,
        };
        *slot += 1;
        *slot
    }
}

/// Per-pairing maximum. With any pairing coded, an uncoded one allows none.
fn pair_limit(limits: &CarrierPairLimits, pair: CarrierPair) -> TransferCount {
    if limits.all_blank() {
        TransferCount::Unlimited
    } else {
        limits.limit(pair).unwrap_or(TransferCount::Limited(0))
    }
}

/// Check outbound, inbound and per-pairing maxima and claim the transfers
/// that fit inside them.
pub(crate) fn check_max_in_out(
    ctx: &RuleContext<'_>,
    markups: &mut Markups,
    ledger: &mut TransferLedger,
) -> Result<(), Halt> {
    let rule = ctx.rule;
    let item = ClaimOwner::Item(rule.item_no);
    let max = rule.max_limit();
    let (out_max, in_max) = if ctx.round_the_world() {
        (TransferCount::Unlimited, TransferCount::Unlimited)
    } else {
        (rule.out_max.unwrap_or_default(), rule.in_max.unwrap_or_default())
    };
    let fc_vs_pu = rule.has_numeric_max() && rule.segments.is_empty();
    let exclusive = rule.in_out_application == InOutApplication::OutOrReturnExclusive
        && !ledger.fare_component_scope
        && !ctx.round_the_world();

    let mut tally = Tally::default();
    let mut transfer_outbound = false;
    let mut transfer_inbound = false;
    let mut last_component = None;

    for pos in markups.processing_order() {
        let Some(markup) = markups.get_mut(pos) else {
            continue;
        };
        let Some(pair) = markup.transfer_type else {
            continue;
        };
        let (seg, component) = (markup.segment, markup.component);
        let entire = markup.validate_entire_rule || component == ctx.current;
        let type_matched = markup.type_match == MatchResult::Match;

        if ctx.pricing_unit().is_some() {
            match last_component {
                None => last_component = Some(component),
                Some(last) if last != component => {
                    if entire && (ledger.fare_component_scope || fc_vs_pu) {
                        last_component = Some(component);
                        tally.total = 0;
                    }
                }
                Some(_) => {}
            }
        }

        ledger.set_is_transfer(seg, component, entire);

        if type_matched || !entire {
            if let Some(claim) = ledger.claim_of(seg) {
                if claim.owner == item || (!claim.tentative && ledger.passed(seg)) {
                    continue;
                }
            }
        }

        if type_matched && entire {
            let unknown_limited = markup.direction == FareDirection::Unknown
                && (!out_max.is_unlimited() || !in_max.is_unlimited());
            if markup.transfer_check == CheckResult::SoftPass || unknown_limited {
                ledger.claim(seg, component, item, false);
                ledger.set_passed(seg, component, false, ledger.recurring_fc_scope);
                continue;
            }
        }

        if markup.transfer_check == CheckResult::Fail {
            continue;
        }

        let seg_ok = markup.seg_check == CheckResult::Pass || markup.matches.is_empty();
        if !((seg_ok && type_matched) || !entire) {
            continue;
        }

        let mut next = tally;
        if seg_ok && type_matched && !(max == TransferCount::Limited(0) && !entire) {
            next.total += 1;
        }

        let least_restrictive_none = matches!(ledger.least_restrictive, None | Some(TransferCount::Limited(0)));
        if max == TransferCount::Limited(0) && next.total > 0 && least_restrictive_none {
            return Err(Halt::fail("NO TRANSFERS PERMITTED"));
        }

        let mut by_least_restrictive = false;
        if entire {
            match markup.direction {
                FareDirection::Outbound => {
                    next.outbound += 1;
                    transfer_outbound = true;
                }
                FareDirection::Inbound => {
                    next.inbound += 1;
                    transfer_inbound = true;
                }
                FareDirection::Unknown => {}
            }
            let pair_count = next.add_pair(pair);

            if exclusive && transfer_outbound && transfer_inbound {
                return Err(Halt::fail("TRANSFERS PERMITTED OUT OR IN. NOT BOTH"));
            }

            if max.is_exceeded_by(next.total) {
                ledger.set_max_exceeded(seg, component, MaxExceeded::Total);
                continue;
            }
            if out_max.is_exceeded_by(next.outbound) || in_max.is_exceeded_by(next.inbound) {
                ledger.set_max_exceeded(seg, component, MaxExceeded::InOut);
                continue;
            }
            if pair_limit(&rule.carrier_pairs, pair).is_exceeded_by(pair_count) {
                continue;
            }

            ledger.claim(seg, component, item, false);
        } else if let Some(limit) = ledger.least_restrictive {
            if limit.is_exceeded_by(next.total) {
                continue;
            }
            by_least_restrictive = true;
        } else {
            if max.is_exceeded_by(next.total) {
                continue;
            }
            let owner = if component != ctx.current && ledger.fare_component_scope {
                ClaimOwner::OutOfScope
            } else {
                item
            };
            ledger.claim(seg, component, owner, false);
        }

        markup.transfer_check = CheckResult::Pass;
        ledger.set_passed(seg, component, by_least_restrictive, ledger.recurring_fc_scope);
        tally = next;
    }

    Ok(())
}
