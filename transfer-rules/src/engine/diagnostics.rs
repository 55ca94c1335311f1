//! Human-readable validation trace.
//!
//! Rendering is skipped entirely unless the sink is active. Field order
//! follows the established trace layout: segment number, carrier and flight,
//! date, city pair, times, then the classification codes.

use std::fmt::{self, Write as _};

use serde::Serialize;
use serde_json::Value;

use crate::domain::{CarrierCode, ComponentId, FareDirection, SegmentId, TravelSegment};
use crate::record::{
    CarrierPair, EmbeddedSurfaces, FareBreakSurface, InOutApplication, LocKey, TransferCount,
    TransferRule,
};

use super::context::RuleContext;
use super::markup::{CheckResult, Markup, Markups, StopType};
use super::outcome::{MatchResult, ValidationOutcome, Verdict};

/// Receives trace lines.
pub trait DiagnosticSink {
    /// Whether lines are wanted at all.
    fn is_active(&self) -> bool;

    fn line(&mut self, text: &str);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn is_active(&self) -> bool {
        false
    }

    fn line(&mut self, _text: &str) {}
}

/// A sink that keeps every line in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceBuffer {
    lines: Vec<String>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl DiagnosticSink for TraceBuffer {
    fn is_active(&self) -> bool {
        true
    }

    fn line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

impl fmt::Display for TraceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn count(value: Option<TransferCount>) -> String {
    match value {
        None => String::new(),
        Some(TransferCount::Unlimited) => TransferCount::UNLIMITED.to_string(),
        Some(TransferCount::Limited(n)) => format!("{n:02}"),
    }
}

fn pair_flag(rule: &TransferRule, pair: CarrierPair) -> (&'static str, String) {
    match rule.carrier_pairs.limit(pair) {
        Some(max) => (pair.code(), count(Some(max))),
        None => (" ", String::new()),
    }
}

/// Rule item summary: counts, carrier pairings and sub-segments.
pub(crate) fn header(sink: &mut dyn DiagnosticSink, rule: &TransferRule) {
    if !sink.is_active() {
        return;
    }

    sink.line(" ");
    sink.line(&format!("---TRANSFER RULE DATA--- ITEM {} {}", rule.item_no, rule.vendor));
    let or = match rule.in_out_application {
        InOutApplication::Combined => " ",
        InOutApplication::OutOrReturnExclusive => "X",
    };
    sink.line(&format!(
        "TRANSFERS..... MIN:{:>3}  MAX:{:>3}  OR: {:>3}  OUT:{:>3}  IN: {:>3}",
        rule.min_transfers.map(|n| format!("{n:02}")).unwrap_or_default(),
        count(rule.max_transfers),
        or,
        count(rule.out_max),
        count(rule.in_max),
    ));

    let (pp, pp_max) = pair_flag(rule, CarrierPair::PrimePrime);
    let (ss, ss_max) = pair_flag(rule, CarrierPair::SameSame);
    let (po, po_max) = pair_flag(rule, CarrierPair::PrimeOther);
    let (oo, oo_max) = pair_flag(rule, CarrierPair::OtherOther);
    sink.line(&format!("ONLINE........ PRI/PRI: {pp}{pp_max:>7}     SME/SME: {ss}{ss_max:>7}"));
    sink.line(&format!("INTERLINE..... PRI/OTH: {po}{po_max:>7}     OTH/OTH: {oo}{oo_max:>7}"));

    let fare_break = match rule.fare_break_surface {
        FareBreakSurface::Permitted => "Y",
        FareBreakSurface::NotPermitted => "N",
    };
    let embedded = match rule.embedded_surfaces {
        EmbeddedSurfaces::Unlimited => "Y".to_string(),
        EmbeddedSurfaces::NotPermitted => "N".to_string(),
        EmbeddedSurfaces::Max(n) => n.to_string(),
    };
    let table = |t: Option<u32>| t.map(|t| t.to_string()).unwrap_or_default();
    sink.line(" ");
    sink.line(&format!(
        "   FARE BREAK SURFACE.:     {fare_break:<4}{:>7}",
        table(rule.fare_break_surface_table)
    ));
    sink.line(&format!(
        "   EMBEDDED SURFACE...:     {embedded:<4}{:>7}",
        table(rule.embedded_surface_table)
    ));

    if rule.segments.is_empty() {
        return;
    }
    sink.line(" ");
    sink.line("SEG APL LOC1     LOC2     ZONE TSI CXRIN CXROUT SC IO RS CHG MAX GW");
    for sub in &rule.segments {
        let loc = |k: &Option<LocKey>| {
            k.as_ref()
                .map(|k| format!("{} {}", filed(&k.loc_type), k.code))
                .unwrap_or_default()
        };
        let cxr = |c: Option<CarrierCode>, t: Option<u32>| match (c, t) {
            (Some(c), _) => c.to_string(),
            (None, Some(t)) => format!("T{t}"),
            (None, None) => String::new(),
        };
        sink.line(&format!(
            "{:>3} {:<3} {:<8} {:<8} {:>4} {:>3} {:<5} {:<6} {:<2} {:<2} {:<2} {:<3} {:>3} {}",
            sub.order_no,
            filed(&sub.applicability),
            loc(&sub.loc1),
            loc(&sub.loc2),
            table(sub.zone_table),
            sub.tsi.map(|t| t.to_string()).unwrap_or_default(),
            cxr(sub.carrier_in, sub.carrier_in_table),
            cxr(sub.carrier_out, sub.carrier_out_table),
            filed(&sub.stop_conn),
            filed(&sub.in_out),
            filed(&sub.restriction),
            filed(&sub.charge),
            count(Some(sub.max_transfers)),
            if sub.gateway_only { "Y" } else { "" },
        ));
    }
}

/// The filed letter of an indicator, blank for the default.
fn filed<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

fn travel_segment(sid: SegmentId, seg: &TravelSegment, numbered: bool) -> String {
    let mut out = if numbered {
        format!("{:>3} ", sid.number())
    } else {
        "    ".to_string()
    };
    match seg.flight() {
        Some(flight) => {
            let date = seg
                .departure
                .map(|d| d.format("%d%b").to_string().to_uppercase())
                .unwrap_or_else(|| "OPEN ".to_string());
            let time = |t: Option<chrono::NaiveDateTime>| {
                t.map(|t| t.format("%H%M").to_string()).unwrap_or_else(|| "----".to_string())
            };
            let _ = write!(
                out,
                "{:<3}{:>4} {} {}{} {} {} ",
                flight.carrier,
                flight.number,
                date,
                seg.origin.code,
                seg.destination.code,
                time(seg.departure),
                time(seg.arrival),
            );
        }
        None => {
            let _ = write!(out, "{:<14}{}{}", "ARNK", seg.origin.code, seg.destination.code);
        }
    }
    out
}

fn transfer_detail(markup: &Markup) -> String {
    let stop = match markup.stop_type {
        StopType::Stopover => "SO ",
        StopType::Connection => "CX ",
        StopType::None => "   ",
    };
    let gateway = if markup.gateway { "GW " } else { "   " };
    let pair = match markup.transfer_type {
        Some(pair) => format!("TY:{} ", pair.code()),
        None => "       ".to_string(),
    };
    let type_match = match markup.type_match {
        MatchResult::NotChecked => " --------- ",
        MatchResult::Match => " MATCH     ",
        MatchResult::NotMatch => " NOT MATCH ",
        MatchResult::DoesNotApply => " N/A       ",
    };
    let check = match markup.transfer_check {
        CheckResult::NotChecked => "---- ".to_string(),
        CheckResult::Pass => "PASS ".to_string(),
        CheckResult::SoftPass => "SOFT ".to_string(),
        CheckResult::Fail => format!("FAIL {}", markup.fail_reason.as_deref().unwrap_or_default()),
        _ => "ERR  ".to_string(),
    };
    format!("{stop}{gateway}{pair}{type_match}{check}")
}

fn in_out_code(result: CheckResult) -> &'static str {
    match result {
        CheckResult::Fail => "FAIL ",
        CheckResult::Pass => "PASS ",
        CheckResult::DoesNotApply => "N/A  ",
        _ => "---- ",
    }
}

fn seg_check_text(result: CheckResult) -> &'static str {
    match result {
        CheckResult::Pass => "PASS",
        CheckResult::SoftPass => "SOFTPASS",
        CheckResult::Fail => "FAIL",
        CheckResult::Stop => "STOP",
        CheckResult::NotChecked => "NOT CHECKED",
        CheckResult::DoesNotApply => "N/A",
        CheckResult::NeedRevalidation => "NEED REVALIDATION",
        CheckResult::NotAccepted => "GEO NOT MATCH",
    }
}

fn sub_segment_lines(sink: &mut dyn DiagnosticSink, markup: &Markup) {
    if markup.matches.is_empty() {
        return;
    }
    for m in &markup.matches {
        sink.line(&format!(
            "   {:>2}:TY:{} SC:{} GW:{} RS:{} GEO:{} CXR:{} IO:{}",
            m.order_no,
            m.transfer_type.code(),
            m.stop_conn.code(),
            m.gateway.code(),
            m.restriction.code(),
            m.geo.code(),
            m.carrier().code(),
            in_out_code(m.in_out),
        ));
    }
    sink.line(&format!("    - SEGMENT CHECK RESULT: {}", seg_check_text(markup.seg_check)));
    sink.line(" ");
}

/// Per-component breakdown of every segment and its transfer.
pub(crate) fn breakdown(sink: &mut dyn DiagnosticSink, ctx: &RuleContext<'_>, markups: &Markups) {
    if !sink.is_active() {
        return;
    }

    let usages: Vec<(ComponentId, FareDirection)> = match ctx.pricing_unit() {
        Some(pu) => pu
            .fare_usages
            .iter()
            .map(|fu| {
                let dir = if fu.inbound { FareDirection::Inbound } else { FareDirection::Outbound };
                (fu.component, dir)
            })
            .collect(),
        None => match ctx.itinerary.component(ctx.current) {
            Ok(fc) => vec![(ctx.current, fc.direction)],
            Err(_) => return,
        },
    };

    sink.line("---PRICING UNIT ITEM BREAKDOWN---");
    for (n, (component, direction)) in usages.into_iter().enumerate() {
        let Ok(segments) = ctx.itinerary.component_segments(component) else {
            continue;
        };
        let air = segments.iter().filter(|(_, s)| s.is_air()).count();
        let offpoints = match air {
            0 | 1 => " NO OFFPOINTS".to_string(),
            2 => "  1 OFFPOINT ".to_string(),
            n => format!("{:>3} OFFPOINTS", n - 1),
        };
        let dir = match direction {
            FareDirection::Inbound => ".IN.  ",
            FareDirection::Outbound => ".OUT. ",
            FareDirection::Unknown => "      ",
        };
        let (origin, destination) = match (segments.first(), segments.last()) {
            (Some((_, first)), Some((_, last))) => (first.origin.code.to_string(), last.destination.code.to_string()),
            _ => (String::new(), String::new()),
        };
        sink.line(&format!(
            "FARECOMP-{} : {dir}{offpoints} FROM {origin} TO {destination}",
            n + 1
        ));

        for (sid, seg) in segments {
            match markups.iter().find(|m| m.segment == sid) {
                Some(markup) => {
                    sink.line(&format!("{}{}", travel_segment(sid, seg, true), transfer_detail(markup)));
                    sub_segment_lines(sink, markup);
                }
                None => sink.line(&travel_segment(sid, seg, false)),
            }
        }
        sink.line(" ");
    }
}

/// Closing line with the verdict.
pub(crate) fn verdict(sink: &mut dyn DiagnosticSink, outcome: &ValidationOutcome) {
    if !sink.is_active() {
        return;
    }
    let text = match outcome.verdict {
        Verdict::Pass => "PASS - NOT FINAL VALIDATION".to_string(),
        Verdict::SoftPass => "SOFTPASS".to_string(),
        Verdict::Skip => "SKIP".to_string(),
        Verdict::Fail => format!("FAIL - {}", outcome.reason.as_deref().unwrap_or_default()),
    };
    sink.line(&format!("TRANSFERS : {text}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LocCode, Location, NationCode};
    use crate::record::{Applicability, RuleSubSegment};
    use chrono::NaiveDate;

    fn loc(code: &str) -> Location {
        let code = LocCode::parse(code).unwrap();
        Location::new(code, code, NationCode::parse("US").unwrap(), 1)
    }

    #[test]
    fn null_sink_renders_nothing() {
        let mut sink = NullSink;
        header(&mut sink, &TransferRule::new("ATP", 1));
        verdict(&mut sink, &ValidationOutcome::pass());
        assert!(!sink.is_active());
    }

    #[test]
    fn header_counts() {
        let mut rule = TransferRule::new("ATP", 77);
        rule.min_transfers = Some(1);
        rule.max_transfers = Some(TransferCount::Unlimited);
        rule.carrier_pairs.prime_prime = Some(TransferCount::Limited(2));
        let mut sub = RuleSubSegment::new(1);
        sub.applicability = Applicability::Required;
        rule.segments.push(sub);

        let mut trace = TraceBuffer::new();
        header(&mut trace, &rule);
        assert!(trace.contains("ITEM 77 ATP"));
        assert!(trace.contains("TRANSFERS..... MIN: 01  MAX: XX"));
        assert!(trace.contains("PRI/PRI: P/P     02"));
        assert!(trace.lines().iter().any(|l| l.starts_with("  1 R  ")));
    }

    #[test]
    fn segment_line_layout() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let seg = TravelSegment::air(
            loc("MEM"),
            loc("CHI"),
            CarrierCode::parse("AA").unwrap(),
            123,
            day.and_hms_opt(8, 5, 0).unwrap(),
            day.and_hms_opt(9, 40, 0).unwrap(),
        );
        assert_eq!(
            travel_segment(SegmentId(0), &seg, true),
            "  1 AA  123 09MAR MEMCHI 0805 0940 "
        );

        let arunk = TravelSegment::arunk(loc("CHI"), loc("MKE"));
        assert_eq!(travel_segment(SegmentId(1), &arunk, false), "    ARNK          CHIMKE");
    }

    #[test]
    fn verdict_lines() {
        let mut trace = TraceBuffer::new();
        verdict(&mut trace, &ValidationOutcome::pass());
        verdict(&mut trace, &ValidationOutcome::fail("MIN 2 TRANSFERS REQUIRED"));
        assert_eq!(
            trace.lines(),
            [
                "TRANSFERS : PASS - NOT FINAL VALIDATION".to_string(),
                "TRANSFERS : FAIL - MIN 2 TRANSFERS REQUIRED".to_string(),
            ]
        );
    }
}
