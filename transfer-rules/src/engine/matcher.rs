//! Rule sub-segment matching.
//!
//! Every transfer is tried against the rule's sub-segments in order; the
//! first one whose predicates all hold claims it. Predicates run as a fixed
//! pipeline so each one's `MatchResult` is recorded on the markup for the
//! trace, and a sub-segment that fails a predicate either hands the transfer
//! to the next sub-segment or ends matching for it.

use std::collections::HashSet;

use tracing::trace;

use crate::domain::{ComponentId, FareDirection, Location};
use crate::ledger::{ClaimOwner, CounterKey, DirectionCounts, FAILED_SEGMENTS, TransferLedger};
use crate::record::{Applicability, ChargeAppl, InOutPortion, Restriction, RuleSubSegment};

use super::context::RuleContext;
use super::geo::{BetweenWindows, match_geo, tsi_geo, tsi_segments};
use super::markup::{CheckResult, Markup, Markups, SubSegmentMatch};
use super::outcome::{Halt, MatchResult};
use super::predicate::{carrier_match, direct_carrier_match, restriction_match, stop_conn_match};

const IN_OUT_ONLY: &str = "IN/OUT-ONLY";
const IN_OUT_ONLY_REASON: &str = " TRANSFER ONLY PERMITTED ON \n  INBOUND OR OUTBOUND. NOT BOTH";

/// Per-call state of one rule sub-segment.
struct SubSegmentPlan {
    index: usize,
    bucket: CounterKey,
    windows: BetweenWindows,
}

/// Charge groups closed for the current transfer.
#[derive(Debug, Default)]
struct ChargeGroups {
    ignored: HashSet<ChargeAppl>,
}

impl ChargeGroups {
    fn ignore(&mut self, charge: ChargeAppl) {
        if charge != ChargeAppl::NoCharge {
            self.ignored.insert(charge);
        }
    }

    fn is_open(&self, charge: ChargeAppl) -> bool {
        !self.ignored.contains(&charge)
    }
}

/// What to do after one sub-segment.
enum Flow {
    /// Try the next sub-segment.
    Next,
    /// Matching for this transfer is finished.
    Done,
    Halt(Halt),
}

/// Outcome of the directional ceilings.
enum Directionality {
    Proceed,
    Fail,
    /// Hand the transfer to the next sub-segment.
    Next,
    /// The transfer can match no further sub-segment.
    Done,
}

/// One transfer being tried against the sub-segments.
struct Attempt<'a> {
    markup: &'a mut Markup,
    /// Position of the markup in pricing-unit order.
    pos: usize,
    ledger: &'a mut TransferLedger,
    groups: &'a mut ChargeGroups,
    /// Claimed by another rule item: charge it, but do not count it.
    charge_calc_only: bool,
}

/// Flags over the sub-segments in play.
struct Applicabilities {
    all_not_permitted: bool,
    none_not_permitted: bool,
    geo_restrictions: bool,
}

/// Match every transfer against the rule's sub-segments.
pub(crate) fn match_sub_segments(
    ctx: &RuleContext<'_>,
    markups: &mut Markups,
    ledger: &mut TransferLedger,
) -> Result<(), Halt> {
    let rule = ctx.rule;
    let mut plans = Vec::new();
    for (index, sub) in rule.segments.iter().enumerate() {
        if ctx.round_the_world() && !sub.in_out.is_blank() {
            continue;
        }
        let windows = if sub.between {
            BetweenWindows::scan(ctx, sub, markups)?
        } else {
            BetweenWindows::default()
        };
        plans.push(SubSegmentPlan {
            index,
            bucket: CounterKey {
                order_no: sub.order_no,
                location: None,
            },
            windows,
        });
    }
    if plans.is_empty() {
        return Ok(());
    }

    let flags = Applicabilities {
        all_not_permitted: plans.iter().all(|p| rule.segments[p.index].is_not_permitted()),
        none_not_permitted: plans.iter().all(|p| !rule.segments[p.index].is_not_permitted()),
        geo_restrictions: plans.iter().any(|p| rule.segments[p.index].has_geo()),
    };

    let mut validate_outbound = true;
    let mut validate_inbound = true;
    let mut validate_entire = true;

    for pos in markups.processing_order() {
        let Some(markup) = markups.get_mut(pos) else {
            continue;
        };
        if !markup.is_transfer() || markup.type_match == MatchResult::NotMatch {
            continue;
        }

        if ctx.pricing_unit().is_none() && !markup.validate_entire_rule {
            markup.seg_check = CheckResult::DoesNotApply;
            match markup.direction {
                FareDirection::Outbound => validate_outbound = false,
                FareDirection::Inbound => validate_inbound = false,
                FareDirection::Unknown => {}
            }
            validate_entire = false;
            continue;
        }

        let charge_calc_only = ledger
            .claim_of(markup.segment)
            .is_some_and(|c| c.owner != ClaimOwner::Item(rule.item_no) && !c.tentative);

        let mut groups = ChargeGroups::default();
        for k in 0..plans.len() {
            let attempt = Attempt {
                markup: &mut *markup,
                pos,
                ledger: &mut *ledger,
                groups: &mut groups,
                charge_calc_only,
            };
            let (tism, flow) = evaluate(ctx, &mut plans, k, attempt);
            markup.matches.push(tism);
            match flow {
                Flow::Next => continue,
                Flow::Done => break,
                Flow::Halt(halt) => return Err(halt),
            }
        }

        trace!(
            segment = %markup.segment,
            seg_check = ?markup.seg_check,
            matches = markup.matches.len(),
            "sub-segments matched"
        );

        if flags.geo_restrictions {
            if flags.all_not_permitted {
                if implicit_match(markup) {
                    markup.seg_check = CheckResult::Pass;
                    markup.charge_segment_specific = true;
                }
            } else if markup.seg_check == CheckResult::NeedRevalidation {
                let geo_never_matched = markup
                    .matches
                    .iter()
                    .all(|m| matches!(m.geo, MatchResult::NotMatch | MatchResult::NotChecked));
                if geo_never_matched && ledger.recurring_fc_scope && markup.component == ctx.current {
                    if !ledger.relation_and {
                        markup.fail("GEO NOT MATCH");
                        return Err(Halt::fail("GEO NOT MATCH"));
                    }
                    markup.seg_check = CheckResult::NotAccepted;
                }
            }
        }
    }

    let current_usage = ctx.current_usage();
    for plan in &plans {
        let sub = &rule.segments[plan.index];
        if sub.applicability != Applicability::Required {
            continue;
        }

        let counts = ledger.counts(&plan.bucket);
        let skip_direction = match sub.in_out {
            InOutPortion::Outbound => !validate_outbound,
            InOutPortion::Inbound => !validate_inbound,
            InOutPortion::Either => counts.inbound > 0 || counts.outbound > 0 || !validate_entire,
            InOutPortion::Blank | InOutPortion::Both => false,
        };
        if skip_direction {
            continue;
        }

        if let Some(fu) = current_usage {
            let other_direction = (fu.inbound && sub.in_out == InOutPortion::Outbound)
                || (!fu.inbound && sub.in_out == InOutPortion::Inbound);
            if rule.max_transfers.is_none() && other_direction {
                continue;
            }
        }

        if ledger.total_matches(sub.order_no) == 0 {
            return Err(Halt::fail(format!(
                "TRANSFER REQUIRED BY RULE SEGMENT: {}",
                sub.order_no
            )));
        }
    }

    Ok(())
}

/// Run the predicate pipeline of sub-segment `k` against one transfer.
fn evaluate(
    ctx: &RuleContext<'_>,
    plans: &mut [SubSegmentPlan],
    k: usize,
    attempt: Attempt<'_>,
) -> (SubSegmentMatch, Flow) {
    let Attempt {
        markup,
        pos,
        ledger,
        groups,
        charge_calc_only,
    } = attempt;
    let rule = ctx.rule;
    let sub = &rule.segments[plans[k].index];
    let mut tism = SubSegmentMatch::new(sub.order_no);
    let in_pricing_unit = ctx.pricing_unit().is_some();
    let not_permitted = sub.is_not_permitted();

    macro_rules! revalidate {
        ($seg_check:expr, $flow:expr) => {{
            markup.seg_check = CheckResult::NeedRevalidation;
            tism.seg_check = $seg_check;
            return (tism, $flow);
        }};
    }

    if !groups.is_open(sub.charge) {
        revalidate!(CheckResult::DoesNotApply, Flow::Next);
    }

    if in_pricing_unit
        && !markup.validate_entire_rule
        && ledger.recurring_fc_scope
        && markup.component != ctx.current
        && !rule.is_recurring_for_pricing_unit(sub)
    {
        revalidate!(CheckResult::DoesNotApply, Flow::Next);
    }

    if sub.transfer_types.any() {
        tism.transfer_type = match markup.transfer_type {
            Some(pair) => MatchResult::from_bool(sub.transfer_types.allows(pair)),
            None => MatchResult::DoesNotApply,
        };
        if tism.transfer_type == MatchResult::NotMatch {
            revalidate!(CheckResult::DoesNotApply, Flow::Next);
        }
    }

    if sub.checks_in_out() {
        match (markup.direction, sub.in_out) {
            (FareDirection::Unknown, _) => {
                markup.transfer_check = CheckResult::SoftPass;
                markup.seg_check = CheckResult::SoftPass;
                tism.seg_check = CheckResult::Pass;
                return (tism, Flow::Done);
            }
            (FareDirection::Inbound, InOutPortion::Outbound)
            | (FareDirection::Outbound, InOutPortion::Inbound) => {
                revalidate!(CheckResult::Pass, Flow::Next);
            }
            _ => {}
        }
    }

    if sub.gateway_only {
        if markup.gateway {
            tism.gateway = MatchResult::Match;
        } else {
            tism.gateway = MatchResult::NotMatch;
            revalidate!(CheckResult::DoesNotApply, Flow::Next);
        }
    }

    let seg = match ctx.segment(markup.segment) {
        Ok(seg) => seg,
        Err(halt) => return (tism, Flow::Halt(halt)),
    };
    let next = match markup.next_segment.map(|n| ctx.segment(n)).transpose() {
        Ok(next) => next,
        Err(halt) => return (tism, Flow::Halt(halt)),
    };

    if sub.restriction != Restriction::Blank {
        tism.restriction = restriction_match(sub.restriction, seg, next);
        if tism.restriction == MatchResult::NotMatch {
            revalidate!(CheckResult::DoesNotApply, Flow::Next);
        }
    }

    tism.stop_conn = stop_conn_match(sub.stop_conn, markup.stop_type);
    if tism.stop_conn == MatchResult::NotMatch {
        revalidate!(CheckResult::Pass, Flow::Next);
    }

    let (carrier_in, carrier_out) = carrier_match(ctx.reference, sub, markup);
    tism.carrier_in = carrier_in;
    tism.carrier_out = carrier_out;
    if carrier_in == MatchResult::NotMatch || carrier_out == MatchResult::NotMatch {
        revalidate!(CheckResult::Pass, Flow::Next);
    }

    plans[k].bucket = bucket_for(ctx, sub, &seg.destination);
    let counts = ledger.counts(&plans[k].bucket);

    match directionality(sub, markup.direction, counts) {
        Directionality::Proceed => {
            if sub.checks_in_out() {
                tism.in_out = CheckResult::Pass;
            }
        }
        Directionality::Fail => {
            markup.fail(IN_OUT_ONLY);
            tism.seg_check = CheckResult::Fail;
            tism.in_out = CheckResult::Fail;
            return (tism, Flow::Halt(Halt::fail(IN_OUT_ONLY_REASON)));
        }
        Directionality::Next => revalidate!(CheckResult::DoesNotApply, Flow::Next),
        Directionality::Done => revalidate!(CheckResult::Pass, Flow::Done),
    }

    let fare_component = if in_pricing_unit
        && (markup.validate_entire_rule
            || (ledger.recurring_fc_scope && markup.component == ctx.current))
    {
        markup.component
    } else {
        ctx.current
    };

    let geo = if sub.between {
        let geo = if sub.has_loc_or_zone() {
            plans[k].windows.matches(pos, markup.direction)
        } else {
            MatchResult::DoesNotApply
        };
        if geo.is_satisfied() && not_permitted && sub.charge == ChargeAppl::NoCharge {
            tism.geo = geo;
            revalidate!(CheckResult::Pass, Flow::Done);
        }
        geo
    } else {
        let main = match main_geo(ctx, markup, &seg.destination, sub, fare_component) {
            Ok(geo) => geo,
            Err(halt) => {
                markup.transfer_check = CheckResult::Fail;
                markup.seg_check = CheckResult::Fail;
                tism.seg_check = CheckResult::Fail;
                return (tism, Flow::Halt(halt));
            }
        };

        if not_permitted && main.is_satisfied() {
            if sub.charge == ChargeAppl::NoCharge {
                tism.geo = main;
                if in_pricing_unit && sub.in_out.is_blank() && main == MatchResult::Match {
                    markup.transfer_check = CheckResult::Fail;
                    markup.seg_check = CheckResult::Fail;
                    tism.seg_check = CheckResult::Fail;
                    return (tism, Flow::Halt(Halt::fail(FAILED_SEGMENTS)));
                }
                revalidate!(CheckResult::Pass, Flow::Done);
            }
            main
        } else if markup.alt_off_point.is_some()
            && ((!not_permitted && main == MatchResult::Match)
                || (not_permitted && main != MatchResult::Match))
        {
            match alt_geo(ctx, markup, plans, k, ledger, fare_component) {
                Ok((alt, matched)) => {
                    combine_alt(ctx, plans, not_permitted, main, alt, matched)
                }
                Err(halt) => {
                    markup.transfer_check = CheckResult::Fail;
                    markup.seg_check = CheckResult::Fail;
                    tism.seg_check = CheckResult::Fail;
                    return (tism, Flow::Halt(halt));
                }
            }
        } else {
            main
        }
    };
    tism.geo = geo;

    if geo == MatchResult::NotMatch && !not_permitted && all_permitted(ctx, plans) {
        revalidate!(CheckResult::DoesNotApply, Flow::Next);
    }

    if not_permitted && geo.is_satisfied() {
        if sub.charge == ChargeAppl::NoCharge {
            markup.seg_check = CheckResult::Stop;
            tism.seg_check = CheckResult::Fail;
            return (tism, Flow::Done);
        }
        groups.ignore(sub.charge);
        revalidate!(CheckResult::DoesNotApply, Flow::Next);
    }

    let counts = ledger.counts(&plans[k].bucket);
    if !not_permitted && sub.in_out == InOutPortion::Either {
        let mixed = (markup.direction == FareDirection::Outbound && counts.inbound > 0)
            || (markup.direction == FareDirection::Inbound && counts.outbound > 0);
        if mixed {
            markup.fail(IN_OUT_ONLY);
            tism.seg_check = CheckResult::Fail;
            tism.in_out = CheckResult::Fail;
            return (tism, Flow::Halt(Halt::fail(IN_OUT_ONLY_REASON)));
        }
    }

    if !not_permitted && sub.max_transfers.limit() == Some(counts.total) {
        if sub.charge == ChargeAppl::NoCharge {
            revalidate!(CheckResult::Pass, Flow::Done);
        }
        if sub.applicability == Applicability::Permitted {
            groups.ignore(sub.charge);
        }
        revalidate!(CheckResult::DoesNotApply, Flow::Next);
    }

    if !geo.is_satisfied() {
        return (tism, Flow::Next);
    }

    if sub.charge != ChargeAppl::NoCharge {
        tism.charge = Some(sub.charge);
    }
    if !charge_calc_only {
        ledger.record_match(plans[k].bucket.clone(), markup.direction);
    }

    tism.seg_check = CheckResult::Pass;
    markup.seg_check = CheckResult::Pass;
    markup.charge_segment_specific = true;
    (tism, Flow::Done)
}

fn all_permitted(ctx: &RuleContext<'_>, plans: &[SubSegmentPlan]) -> bool {
    plans.iter().all(|p| !ctx.rule.segments[p.index].is_not_permitted())
}

/// Location-type-only permitted sub-segments count per containing location.
fn bucket_for(ctx: &RuleContext<'_>, sub: &RuleSubSegment, loc: &Location) -> CounterKey {
    let location = match &sub.loc1 {
        Some(key) if sub.is_loc_type_only() && sub.applicability == Applicability::Permitted => {
            Some(ctx.reference.loc_of_type(loc, key.loc_type).unwrap_or_default())
        }
        _ => None,
    };
    CounterKey {
        order_no: sub.order_no,
        location,
    }
}

/// Directional ceilings of a sub-segment against the counts so far.
fn directionality(sub: &RuleSubSegment, direction: FareDirection, counts: DirectionCounts) -> Directionality {
    let at_ceiling = |count: u16| sub.max_transfers.limit() == Some(count);
    let reached = match sub.in_out {
        InOutPortion::Blank => return Directionality::Proceed,
        InOutPortion::Either => {
            if counts.inbound > 0 && counts.outbound > 0 {
                return if sub.charge == ChargeAppl::NoCharge {
                    Directionality::Fail
                } else {
                    Directionality::Next
                };
            }
            false
        }
        InOutPortion::Both => match direction {
            FareDirection::Outbound => at_ceiling(counts.outbound),
            FareDirection::Inbound => at_ceiling(counts.inbound),
            FareDirection::Unknown => false,
        },
        InOutPortion::Outbound => at_ceiling(counts.outbound),
        InOutPortion::Inbound => at_ceiling(counts.inbound),
    };

    if !reached || sub.is_not_permitted() {
        Directionality::Proceed
    } else if sub.charge == ChargeAppl::NoCharge {
        Directionality::Done
    } else {
        Directionality::Next
    }
}

/// Geography of the transfer point itself: TSI, or loc/zone match.
fn main_geo(
    ctx: &RuleContext<'_>,
    markup: &Markup,
    dest: &Location,
    sub: &RuleSubSegment,
    fare_component: ComponentId,
) -> Result<MatchResult, Halt> {
    match sub.tsi {
        Some(tsi) => match tsi_segments(ctx, sub, tsi, fare_component)? {
            Some(selected) => tsi_geo(&selected, markup, sub, tsi),
            None => Ok(MatchResult::NotMatch),
        },
        None => Ok(match_geo(ctx.reference, dest, sub)),
    }
}

/// Geography of the surface off-point following the transfer.
///
/// Tries sub-segment `k` first, then every other sub-segment that could
/// still accept the transfer. Returns the match and the sub-segment that
/// produced it.
fn alt_geo(
    ctx: &RuleContext<'_>,
    markup: &Markup,
    plans: &mut [SubSegmentPlan],
    k: usize,
    ledger: &TransferLedger,
    fare_component: ComponentId,
) -> Result<(MatchResult, Option<usize>), Halt> {
    let Some(alt) = markup.alt_off_point.as_ref() else {
        return Ok((MatchResult::NotMatch, None));
    };

    let mut geo = alt_point_geo(ctx, markup, alt, &ctx.rule.segments[plans[k].index], fare_component)?
        .unwrap_or(MatchResult::NotMatch);
    if geo == MatchResult::Match {
        return Ok((geo, Some(k)));
    }
    if geo == MatchResult::DoesNotApply {
        return Ok((geo, None));
    }

    for j in 0..plans.len() {
        if j == k {
            continue;
        }
        let other = &ctx.rule.segments[plans[j].index];
        plans[j].bucket = bucket_for(ctx, other, alt);
        let counts = ledger.counts(&plans[j].bucket);

        if let Some(max) = other.max_transfers.limit() {
            if counts.total == max {
                continue;
            }
            let directional_ceiling = match other.in_out {
                InOutPortion::Inbound => counts.inbound == max,
                InOutPortion::Outbound => counts.outbound == max,
                _ => false,
            };
            if directional_ceiling {
                continue;
            }
        }

        let wrong_direction = matches!(
            (other.in_out, markup.direction),
            (InOutPortion::Outbound, FareDirection::Inbound) | (InOutPortion::Inbound, FareDirection::Outbound)
        );
        if wrong_direction || stop_conn_match(other.stop_conn, markup.stop_type) == MatchResult::NotMatch {
            continue;
        }

        let combined = carrier_match(ctx.reference, other, markup);
        let direct = direct_carrier_match(ctx.reference, other, Some(markup.carrier), markup.carrier_out);
        if [combined.0, combined.1, direct.0, direct.1].contains(&MatchResult::NotMatch) {
            continue;
        }
        if !matches!(directionality(other, markup.direction, counts), Directionality::Proceed) {
            continue;
        }

        if let Some(found) = alt_point_geo(ctx, markup, alt, other, fare_component)? {
            geo = found;
        }
        if geo == MatchResult::Match {
            return Ok((geo, Some(j)));
        }
        if geo == MatchResult::DoesNotApply {
            return Ok((geo, None));
        }
    }

    Ok((geo, None))
}

/// Match a sub-segment against the surface off-point. A TSI matches when it
/// selects the next flight by origin; `None` when it selects nothing.
fn alt_point_geo(
    ctx: &RuleContext<'_>,
    markup: &Markup,
    alt: &Location,
    sub: &RuleSubSegment,
    fare_component: ComponentId,
) -> Result<Option<MatchResult>, Halt> {
    let Some(tsi) = sub.tsi else {
        return Ok(Some(match_geo(ctx.reference, alt, sub)));
    };
    let selected = tsi_segments(ctx, sub, tsi, fare_component)?.unwrap_or_default();
    let next_origin = markup
        .next_segment
        .and_then(|n| selected.iter().find(|m| m.segment == n))
        .is_some_and(|m| m.orig_match);
    Ok(next_origin.then_some(MatchResult::Match))
}

/// Fold the off-point result into the transfer point result.
///
/// A not-permitted sub-segment is satisfied by either point, unless the
/// off-point matched a permitted sub-segment instead. Any other sub-segment
/// needs both points.
fn combine_alt(
    ctx: &RuleContext<'_>,
    plans: &[SubSegmentPlan],
    not_permitted: bool,
    main: MatchResult,
    alt: MatchResult,
    matched: Option<usize>,
) -> MatchResult {
    if not_permitted {
        let matched_permitted =
            matched.is_some_and(|j| !ctx.rule.segments[plans[j].index].is_not_permitted());
        if matched_permitted && main == MatchResult::NotMatch && alt == MatchResult::Match {
            MatchResult::NotMatch
        } else if main == MatchResult::Match || alt == MatchResult::Match {
            MatchResult::Match
        } else {
            main
        }
    } else if main == MatchResult::Match && alt == MatchResult::Match {
        MatchResult::Match
    } else {
        MatchResult::NotMatch
    }
}

/// With every sub-segment not permitted, a transfer none of them caught is
/// accepted.
fn implicit_match(markup: &Markup) -> bool {
    let carrier_ok = |r: MatchResult| {
        matches!(r, MatchResult::Match | MatchResult::NotChecked | MatchResult::DoesNotApply)
    };
    !markup
        .matches
        .iter()
        .any(|m| m.geo.is_satisfied() && carrier_ok(m.carrier_in) && carrier_ok(m.carrier_out))
}
