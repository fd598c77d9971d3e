//! Ghép các bước thành một lần phân tích hoàn chỉnh.

use chrono::{Datelike, NaiveDate};

use crate::classify::{classify_events, EffectGroup};
use crate::episode::{merge_episodes, sort_chronologically};
use crate::metrics::compute_metrics;
use crate::normalize::normalize_records;
use crate::ranking::{build_views, rank_patterns};
use crate::yearly::aggregate_by_year;
use crate::{
    AnalysisSummary, AnalyzerConfig, DispensingEvent, EffectPattern, MedicationShare,
    PatternAnalysis, PriorityBreakdown, RawVisitRecord, YearlyPattern,
};

/// Run the full pipeline over raw records.
///
/// `as_of` is the reference day for recency; the result depends only on the
/// arguments. Empty or fully filtered input yields an empty analysis.
pub fn analyze(
    records: &[RawVisitRecord],
    config: &AnalyzerConfig,
    as_of: NaiveDate,
) -> PatternAnalysis {
    let events = normalize_records(records, config);
    analyze_events(&events, config, as_of)
}

/// Run the pipeline over already normalized events.
pub fn analyze_events(
    events: &[DispensingEvent],
    config: &AnalyzerConfig,
    as_of: NaiveDate,
) -> PatternAnalysis {
    if events.is_empty() {
        return PatternAnalysis::empty(as_of);
    }

    let patterns: Vec<EffectPattern> = classify_events(events)
        .into_iter()
        .filter_map(build_pattern)
        .collect();
    let patterns = rank_patterns(patterns, as_of);
    let yearly = aggregate_by_year(events);
    let views = build_views(&patterns, config, as_of);
    let summary = summarize(&patterns, &yearly, events.len());

    tracing::debug!(
        %as_of,
        patterns = patterns.len(),
        years = yearly.len(),
        top = summary.top_priority_effect.as_deref().unwrap_or("-"),
        "medication pattern analysis finished"
    );

    PatternAnalysis {
        as_of,
        patterns,
        yearly,
        views,
        summary,
    }
}

fn build_pattern(group: EffectGroup) -> Option<EffectPattern> {
    let effect = group.label().to_string();
    let mut events = group.events;
    sort_chronologically(&mut events);

    let merge = merge_episodes(&events);
    let metrics = compute_metrics(&merge)?;
    let first_date = events.first()?.start_date;
    let last_date = events.last()?.start_date;
    let last_episode_end_date = merge.episodes.last()?.end_date;

    let mut years_present: Vec<i32> = events.iter().map(|event| event.start_date.year()).collect();
    years_present.dedup();

    Some(EffectPattern {
        effect,
        total_days: metrics.total_days,
        event_count: events.len() as u32,
        first_date,
        last_date,
        last_episode_end_date,
        years_present,
        medication_breakdown: medication_breakdown(&events),
        episodes: merge.episodes,
        gaps: merge.gaps,
        total_period: metrics.total_period,
        consumption_density: metrics.consumption_density,
        restart_count: metrics.restart_count,
        average_gap_days: metrics.average_gap_days,
        priority: PriorityBreakdown::default(),
        priority_score: 0.0,
    })
}

fn medication_breakdown(events: &[DispensingEvent]) -> Vec<MedicationShare> {
    let mut shares: Vec<MedicationShare> = Vec::new();

    for event in events {
        let Some(name) = event.drug_name.as_deref() else {
            continue;
        };
        match shares.iter_mut().find(|share| share.drug_name == name) {
            Some(share) => {
                share.event_count += 1;
                share.total_days = share.total_days.saturating_add(event.duration_days);
            }
            None => shares.push(MedicationShare {
                drug_name: name.to_string(),
                event_count: 1,
                total_days: event.duration_days,
            }),
        }
    }

    shares.sort_by(|a, b| {
        b.total_days
            .cmp(&a.total_days)
            .then_with(|| b.event_count.cmp(&a.event_count))
            .then_with(|| a.drug_name.cmp(&b.drug_name))
    });
    shares
}

fn summarize(
    patterns: &[EffectPattern],
    yearly: &[YearlyPattern],
    total_dispensings: usize,
) -> AnalysisSummary {
    let mut longest: Option<&EffectPattern> = None;
    for pattern in patterns {
        if longest.map_or(true, |best| pattern.total_days > best.total_days) {
            longest = Some(pattern);
        }
    }

    AnalysisSummary {
        distinct_years: yearly.len(),
        total_dispensings,
        distinct_effects: patterns.len(),
        top_priority_effect: patterns.first().map(|pattern| pattern.effect.clone()),
        longest_duration_effect: longest.map(|pattern| pattern.effect.clone()),
    }
}
