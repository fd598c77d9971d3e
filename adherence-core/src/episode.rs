//! Gộp các lần cấp phát thành đợt điều trị và khoảng ngắt quãng.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{DispensingEvent, GapPeriod, TreatmentEpisode};

/// Maximum gap, in days, between an episode's coverage end and the next
/// dispensing for the two to belong to the same episode.
pub const EPISODE_GAP_THRESHOLD_DAYS: i64 = 30;

/// Đợt điều trị và khoảng ngắt của một nhóm tác dụng.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeMerge {
    pub episodes: Vec<TreatmentEpisode>,
    pub gaps: Vec<GapPeriod>,
}

/// Sort events by start date. Stable, so same-day events keep arrival order.
pub fn sort_chronologically(events: &mut [DispensingEvent]) {
    events.sort_by_key(|event| event.start_date);
}

/// Merge a chronologically sorted event list into episodes.
///
/// An event whose start lies at most [`EPISODE_GAP_THRESHOLD_DAYS`] after the
/// current episode's coverage end joins that episode, and the coverage end is
/// replaced by the event's own end. Otherwise the episode closes and a gap is
/// recorded.
pub fn merge_episodes(events: &[DispensingEvent]) -> EpisodeMerge {
    events
        .iter()
        .fold(MergeAccumulator::default(), MergeAccumulator::push)
        .finish()
}

/// Ngày kết thúc bao phủ của một lần cấp phát.
pub fn coverage_end(event: &DispensingEvent) -> NaiveDate {
    event
        .start_date
        .checked_add_days(Days::new(u64::from(event.duration_days)))
        .unwrap_or(NaiveDate::MAX)
}

#[derive(Default)]
struct MergeAccumulator {
    episodes: Vec<TreatmentEpisode>,
    gaps: Vec<GapPeriod>,
    current: Option<TreatmentEpisode>,
}

impl MergeAccumulator {
    fn push(mut self, event: &DispensingEvent) -> Self {
        let event_end = coverage_end(event);

        let Some(mut current) = self.current.take() else {
            self.current = Some(open_episode(event, event_end, None));
            return self;
        };

        let gap = (event.start_date - current.end_date).num_days();
        if gap <= EPISODE_GAP_THRESHOLD_DAYS {
            tracing::trace!(gap, start = %event.start_date, "merging dispensing into episode");
            current.cumulative_days = current.cumulative_days.saturating_add(event.duration_days);
            current.event_count += 1;
            current.end_date = event_end;
            self.current = Some(current);
        } else {
            tracing::trace!(gap, start = %event.start_date, "gap exceeds threshold, new episode");
            self.gaps.push(GapPeriod {
                start_date: current.end_date,
                end_date: event.start_date,
                days: gap,
            });
            self.episodes.push(current);
            self.current = Some(open_episode(event, event_end, Some(gap)));
        }

        self
    }

    fn finish(mut self) -> EpisodeMerge {
        if let Some(current) = self.current {
            self.episodes.push(current);
        }
        EpisodeMerge {
            episodes: self.episodes,
            gaps: self.gaps,
        }
    }
}

fn open_episode(
    event: &DispensingEvent,
    end_date: NaiveDate,
    gap_before_days: Option<i64>,
) -> TreatmentEpisode {
    TreatmentEpisode {
        start_date: event.start_date,
        end_date,
        cumulative_days: event.duration_days,
        event_count: 1,
        gap_before_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn merges_close_events_and_splits_on_long_gap() {
        let events = vec![
            event(date(2022, 1, 1), 30),
            event(date(2022, 2, 15), 30),
            event(date(2023, 6, 1), 20),
        ];

        let merged = merge_episodes(&events);

        assert_eq!(merged.episodes.len(), 2);
        let first = &merged.episodes[0];
        assert_eq!(first.start_date, date(2022, 1, 1));
        assert_eq!(first.end_date, date(2022, 3, 17));
        assert_eq!(first.cumulative_days, 60);
        assert_eq!(first.event_count, 2);
        assert_eq!(first.gap_before_days, None);

        let second = &merged.episodes[1];
        assert_eq!(second.start_date, date(2023, 6, 1));
        assert_eq!(second.end_date, date(2023, 6, 21));
        assert_eq!(second.cumulative_days, 20);
        assert_eq!(second.gap_before_days, Some(441));

        assert_eq!(
            merged.gaps,
            vec![GapPeriod {
                start_date: date(2022, 3, 17),
                end_date: date(2023, 6, 1),
                days: 441,
            }]
        );
    }

    #[test]
    fn gap_of_exactly_thirty_days_merges() {
        // coverage ends 2024-01-11, next fill 30 days later
        let events = vec![event(date(2024, 1, 1), 10), event(date(2024, 2, 10), 10)];

        let merged = merge_episodes(&events);

        assert_eq!(merged.episodes.len(), 1);
        assert!(merged.gaps.is_empty());
        assert_eq!(merged.episodes[0].cumulative_days, 20);
    }

    #[test]
    fn gap_of_thirty_one_days_splits() {
        let events = vec![event(date(2024, 1, 1), 10), event(date(2024, 2, 11), 10)];

        let merged = merge_episodes(&events);

        assert_eq!(merged.episodes.len(), 2);
        assert_eq!(merged.gaps.len(), 1);
        assert_eq!(merged.gaps[0].days, 31);
    }

    #[test]
    fn coverage_end_is_overwritten_not_extended() {
        // second fill overlaps the first and ends earlier
        let events = vec![event(date(2024, 1, 1), 90), event(date(2024, 1, 10), 5)];

        let merged = merge_episodes(&events);

        let episode = &merged.episodes[0];
        assert_eq!(episode.end_date, date(2024, 1, 15));
        assert_eq!(episode.cumulative_days, 95);
    }

    #[test]
    fn overlapping_fills_have_negative_gap_and_merge() {
        let events = vec![event(date(2024, 1, 1), 30), event(date(2024, 1, 20), 30)];

        let merged = merge_episodes(&events);

        assert_eq!(merged.episodes.len(), 1);
        assert_eq!(merged.episodes[0].end_date, date(2024, 2, 19));
    }

    #[test]
    fn episodes_are_ordered_and_restart_count_matches_gaps() {
        let mut events = vec![
            event(date(2021, 5, 1), 14),
            event(date(2020, 1, 1), 30),
            event(date(2020, 6, 1), 30),
            event(date(2020, 1, 25), 30),
        ];
        sort_chronologically(&mut events);

        let merged = merge_episodes(&events);

        assert_eq!(merged.episodes.len(), 3);
        assert_eq!(merged.gaps.len(), merged.episodes.len() - 1);
        for pair in merged.episodes.windows(2) {
            assert!(pair[0].start_date <= pair[1].start_date);
            assert!(pair[0].end_date <= pair[1].start_date);
        }
    }

    #[test]
    fn empty_input_yields_no_episodes() {
        assert_eq!(merge_episodes(&[]), EpisodeMerge::default());
    }
}
