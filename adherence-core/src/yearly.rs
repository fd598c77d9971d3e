//! Tổng hợp lần cấp phát theo năm, độc lập với việc gộp đợt điều trị.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::classify::CategoryKey;
use crate::{DispensingEvent, YearlyPattern};

#[derive(Default)]
struct YearAccumulator {
    effects: Vec<String>,
    event_count: u32,
    total_days: u32,
}

impl YearAccumulator {
    fn push(&mut self, effect: &str, duration_days: u32) {
        if !self.effects.iter().any(|known| known == effect) {
            self.effects.push(effect.to_string());
        }
        self.event_count += 1;
        self.total_days = self.total_days.saturating_add(duration_days);
    }
}

/// Bucket raw events by the calendar year of their start date.
///
/// Durations are summed as dispensed, without merging. Years come out
/// ascending and effects in first-seen order within each year.
pub fn aggregate_by_year(events: &[DispensingEvent]) -> Vec<YearlyPattern> {
    let mut years: BTreeMap<i32, YearAccumulator> = BTreeMap::new();

    for event in events {
        let Some(key) = CategoryKey::resolve(event) else {
            continue;
        };
        years
            .entry(event.start_date.year())
            .or_default()
            .push(key.label(), event.duration_days);
    }

    years
        .into_iter()
        .map(|(year, acc)| YearlyPattern {
            year,
            effects_present: acc.effects,
            event_count: acc.event_count,
            total_days: acc.total_days,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(effect: &str, y: i32, m: u32, days: u32) -> DispensingEvent {
        DispensingEvent {
            effect_label: Some(effect.to_string()),
            drug_name: None,
            start_date: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            duration_days: days,
        }
    }

    #[test]
    fn buckets_raw_events_by_year() {
        let events = vec![
            event("statin", 2023, 12, 90),
            event("antihypertensive", 2022, 3, 30),
            event("statin", 2022, 1, 30),
            event("statin", 2022, 2, 30),
            event("statin", 2024, 1, 90),
        ];

        let yearly = aggregate_by_year(&events);

        assert_eq!(yearly.len(), 3);
        assert_eq!(yearly[0].year, 2022);
        assert_eq!(yearly[0].effects_present, ["antihypertensive", "statin"]);
        assert_eq!(yearly[0].event_count, 3);
        assert_eq!(yearly[0].total_days, 90);
        assert_eq!(yearly[1].year, 2023);
        assert_eq!(yearly[1].effects_present, ["statin"]);
        // 2023-12 fill spilling into 2024 is not split across years
        assert_eq!(yearly[1].total_days, 90);
        assert_eq!(yearly[2].year, 2024);
    }

    #[test]
    fn unlabeled_events_use_drug_name() {
        let events = vec![DispensingEvent {
            effect_label: None,
            drug_name: Some("metformin".to_string()),
            start_date: NaiveDate::from_ymd_opt(2021, 4, 2).unwrap(),
            duration_days: 28,
        }];

        assert_eq!(aggregate_by_year(&events)[0].effects_present, ["metformin"]);
    }

    #[test]
    fn empty_input_yields_no_years() {
        assert!(aggregate_by_year(&[]).is_empty());
    }
}
