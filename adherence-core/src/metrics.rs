//! Chỉ số liên tục của một nhóm tác dụng.

use serde::{Deserialize, Serialize};

use crate::episode::EpisodeMerge;
use crate::TotalPeriod;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryMetrics {
    pub total_days: u32,
    pub total_period: TotalPeriod,
    /// Không giới hạn trên: có thể vượt 1.0 khi các lần cấp phát chồng lấn.
    pub consumption_density: f64,
    pub restart_count: u32,
    pub average_gap_days: f64,
}

/// Derive continuity metrics from merged episodes. Returns `None` when there is
/// no episode to measure.
pub fn compute_metrics(merge: &EpisodeMerge) -> Option<CategoryMetrics> {
    let first = merge.episodes.first()?;
    let last = merge.episodes.last()?;

    let total_days = merge
        .episodes
        .iter()
        .fold(0u32, |sum, episode| sum.saturating_add(episode.cumulative_days));

    let total_period = TotalPeriod {
        start_date: first.start_date,
        end_date: last.end_date,
        days: (last.end_date - first.start_date).num_days(),
    };

    let consumption_density = if total_period.days > 0 {
        f64::from(total_days) / total_period.days as f64
    } else {
        0.0
    };

    let average_gap_days = if merge.gaps.is_empty() {
        0.0
    } else {
        merge.gaps.iter().map(|gap| gap.days as f64).sum::<f64>() / merge.gaps.len() as f64
    };

    Some(CategoryMetrics {
        total_days,
        total_period,
        consumption_density,
        restart_count: merge.gaps.len() as u32,
        average_gap_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::merge_episodes;
    use crate::{DispensingEvent, TreatmentEpisode};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(start: NaiveDate, days: u32) -> DispensingEvent {
        DispensingEvent {
            effect_label: Some("hypertension".to_string()),
            drug_name: None,
            start_date: start,
            duration_days: days,
        }
    }

    #[test]
    fn computes_period_density_and_gaps() {
        let merge = merge_episodes(&[
            event(date(2022, 1, 1), 30),
            event(date(2022, 2, 15), 30),
            event(date(2023, 6, 1), 20),
        ]);

        let metrics = compute_metrics(&merge).unwrap();

        assert_eq!(metrics.total_days, 80);
        assert_eq!(metrics.total_period.start_date, date(2022, 1, 1));
        assert_eq!(metrics.total_period.end_date, date(2023, 6, 21));
        assert_eq!(metrics.total_period.days, 536);
        assert!((metrics.consumption_density - 80.0 / 536.0).abs() < 1e-12);
        assert_eq!(metrics.restart_count, 1);
        assert_eq!(metrics.average_gap_days, 441.0);
    }

    #[test]
    fn single_event_is_fully_continuous() {
        let merge = merge_episodes(&[event(date(2024, 3, 1), 28)]);

        let metrics = compute_metrics(&merge).unwrap();

        assert_eq!(metrics.total_period.days, 28);
        assert_eq!(metrics.consumption_density, 1.0);
        assert_eq!(metrics.restart_count, 0);
        assert_eq!(metrics.average_gap_days, 0.0);
    }

    #[test]
    fn density_is_not_clamped_for_overlapping_fills() {
        let merge = merge_episodes(&[event(date(2024, 1, 1), 30), event(date(2024, 1, 2), 30)]);

        let metrics = compute_metrics(&merge).unwrap();

        assert_eq!(metrics.total_period.days, 31);
        assert!(metrics.consumption_density > 1.0);
    }

    #[test]
    fn zero_length_period_has_zero_density() {
        let day = date(2024, 1, 1);
        let merge = EpisodeMerge {
            episodes: vec![TreatmentEpisode {
                start_date: day,
                end_date: day,
                cumulative_days: 10,
                event_count: 1,
                gap_before_days: None,
            }],
            gaps: Vec::new(),
        };

        let metrics = compute_metrics(&merge).unwrap();

        assert_eq!(metrics.total_period.days, 0);
        assert_eq!(metrics.consumption_density, 0.0);
    }

    #[test]
    fn no_episodes_yields_none() {
        assert!(compute_metrics(&EpisodeMerge::default()).is_none());
    }
}
