//! Điểm ưu tiên tổng hợp và thứ tự các nhóm tác dụng.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::{AnalyzerConfig, EffectPattern, PatternViews, PriorityBreakdown};

pub const DURATION_WEIGHT: f64 = 0.35;
pub const FREQUENCY_WEIGHT: f64 = 0.25;
pub const RECENCY_WEIGHT: f64 = 0.20;
pub const CONTINUITY_WEIGHT: f64 = 0.15;
pub const RESTART_WEIGHT: f64 = 0.05;

const DURATION_SCALE_DAYS: f64 = 365.0;
const FREQUENCY_SCALE_EVENTS: f64 = 50.0;
const RECENCY_WINDOW_DAYS: f64 = 365.0;
const RESTART_SCALE: f64 = 10.0;

impl PriorityBreakdown {
    /// Weighted sum of the features.
    pub fn score(&self) -> f64 {
        self.duration * DURATION_WEIGHT
            + self.frequency * FREQUENCY_WEIGHT
            + self.recency * RECENCY_WEIGHT
            + self.continuity * CONTINUITY_WEIGHT
            + self.restart_penalty * RESTART_WEIGHT
    }
}

/// Normalized ranking features of one pattern.
///
/// Recency is floored at zero but has no upper bound, so an episode ending
/// after `as_of` scores above 1.0.
pub fn priority_breakdown(pattern: &EffectPattern, as_of: NaiveDate) -> PriorityBreakdown {
    let days_since_end = (as_of - pattern.last_episode_end_date).num_days() as f64;

    PriorityBreakdown {
        duration: f64::from(pattern.total_days) / DURATION_SCALE_DAYS,
        frequency: f64::from(pattern.event_count) / FREQUENCY_SCALE_EVENTS,
        recency: (RECENCY_WINDOW_DAYS - days_since_end).max(0.0) / RECENCY_WINDOW_DAYS,
        continuity: pattern.consumption_density,
        restart_penalty: (1.0 - f64::from(pattern.restart_count) / RESTART_SCALE).max(0.0),
    }
}

/// Score every pattern and sort by descending priority.
///
/// Ties fall back to longer total duration, then effect name.
pub fn rank_patterns(mut patterns: Vec<EffectPattern>, as_of: NaiveDate) -> Vec<EffectPattern> {
    for pattern in &mut patterns {
        pattern.priority = priority_breakdown(pattern, as_of);
        pattern.priority_score = pattern.priority.score();
    }

    patterns.sort_by(compare_priority);
    patterns
}

fn compare_priority(a: &EffectPattern, b: &EffectPattern) -> Ordering {
    b.priority_score
        .total_cmp(&a.priority_score)
        .then_with(|| b.total_days.cmp(&a.total_days))
        .then_with(|| a.effect.cmp(&b.effect))
}

/// Build the presentation lists from ranked patterns.
pub fn build_views(
    ranked: &[EffectPattern],
    config: &AnalyzerConfig,
    as_of: NaiveDate,
) -> PatternViews {
    let leading = ranked
        .iter()
        .take(config.leading_count)
        .map(|pattern| pattern.effect.clone())
        .collect();

    let long_term = ranked
        .iter()
        .filter(|pattern| pattern.total_days >= config.long_term_min_days)
        .map(|pattern| pattern.effect.clone())
        .collect();

    let window = i64::from(config.recent_window_days);
    let mut recent: Vec<&EffectPattern> = ranked
        .iter()
        .filter(|pattern| (as_of - pattern.last_date).num_days() <= window)
        .collect();
    recent.sort_by(|a, b| b.last_date.cmp(&a.last_date));

    PatternViews {
        leading,
        long_term,
        recent: recent
            .into_iter()
            .map(|pattern| pattern.effect.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TotalPeriod;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pattern(effect: &str, total_days: u32, event_count: u32, last: NaiveDate) -> EffectPattern {
        EffectPattern {
            effect: effect.to_string(),
            total_days,
            event_count,
            first_date: date(2020, 1, 1),
            last_date: last,
            last_episode_end_date: last,
            years_present: vec![2020],
            episodes: Vec::new(),
            gaps: Vec::new(),
            total_period: TotalPeriod {
                start_date: date(2020, 1, 1),
                end_date: last,
                days: (last - date(2020, 1, 1)).num_days(),
            },
            consumption_density: 0.5,
            restart_count: 0,
            average_gap_days: 0.0,
            medication_breakdown: Vec::new(),
            priority: PriorityBreakdown::default(),
            priority_score: 0.0,
        }
    }

    #[test]
    fn breakdown_follows_feature_formulas() {
        let as_of = date(2024, 1, 1);
        let mut p = pattern("statin", 365, 25, date(2023, 7, 5));
        p.restart_count = 3;

        let breakdown = priority_breakdown(&p, as_of);

        assert_eq!(breakdown.duration, 1.0);
        assert_eq!(breakdown.frequency, 0.5);
        assert!((breakdown.recency - 185.0 / 365.0).abs() < 1e-12);
        assert_eq!(breakdown.continuity, 0.5);
        assert!((breakdown.restart_penalty - 0.7).abs() < 1e-12);

        let expected = 0.35 + 0.5 * 0.25 + (185.0 / 365.0) * 0.20 + 0.5 * 0.15 + 0.7 * 0.05;
        assert!((breakdown.score() - expected).abs() < 1e-12);
    }

    #[test]
    fn stale_episode_has_zero_recency_and_many_restarts_zero_penalty() {
        let mut p = pattern("antacid", 10, 1, date(2019, 1, 1));
        p.restart_count = 14;

        let breakdown = priority_breakdown(&p, date(2024, 1, 1));

        assert_eq!(breakdown.recency, 0.0);
        assert_eq!(breakdown.restart_penalty, 0.0);
    }

    #[test]
    fn future_episode_end_pushes_recency_above_one() {
        let p = pattern("insulin", 30, 1, date(2024, 3, 1));

        let breakdown = priority_breakdown(&p, date(2024, 1, 1));

        assert!(breakdown.recency > 1.0);
    }

    #[test]
    fn ranks_by_descending_score_with_stable_ties() {
        let as_of = date(2024, 1, 1);
        let patterns = vec![
            pattern("b-effect", 30, 1, date(2023, 12, 1)),
            pattern("long", 400, 20, date(2023, 12, 1)),
            pattern("a-effect", 30, 1, date(2023, 12, 1)),
        ];

        let ranked = rank_patterns(patterns, as_of);

        let names: Vec<&str> = ranked.iter().map(|p| p.effect.as_str()).collect();
        assert_eq!(names, ["long", "a-effect", "b-effect"]);
        for pair in ranked.windows(2) {
            assert!(pair[0].priority_score >= pair[1].priority_score);
        }
    }

    #[test]
    fn views_split_leading_long_term_and_recent() {
        let as_of = date(2024, 1, 1);
        let config = AnalyzerConfig {
            leading_count: 2,
            ..AnalyzerConfig::default()
        };
        let ranked = rank_patterns(
            vec![
                pattern("old-long", 500, 30, date(2021, 6, 1)),
                pattern("recent-short", 20, 2, date(2023, 11, 1)),
                pattern("recent-latest", 10, 1, date(2023, 12, 20)),
                pattern("edge", 180, 1, date(2023, 1, 1)),
            ],
            as_of,
        );

        let views = build_views(&ranked, &config, as_of);

        assert_eq!(views.leading.len(), 2);
        assert_eq!(views.leading[0], ranked[0].effect);
        assert_eq!(views.long_term.len(), 2);
        assert!(views.long_term.contains(&"old-long".to_string()));
        assert!(views.long_term.contains(&"edge".to_string()));
        assert_eq!(views.recent, ["recent-latest", "recent-short", "edge"]);
    }
}
