//! Lọc bản ghi cấp phát tại nhà thuốc và chuẩn hóa từng dòng thuốc.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{AnalyzerConfig, DispensingEvent, DurationValue, RawMedicationLine, RawVisitRecord};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%Y.%m.%d", "%Y/%m/%d"];

// Longer suffixes first so "days" is not cut down to "day".
const DAY_SUFFIXES: [&str; 5] = ["days", "day", "ngày", "일", "d"];

/// Convert raw visit records into dispensing events.
///
/// Records that are not pharmacy dispensing are skipped. Medication lines with
/// an unparsable date, a missing or non-positive duration, or neither an effect
/// label nor a drug name are dropped silently.
pub fn normalize_records(
    records: &[RawVisitRecord],
    config: &AnalyzerConfig,
) -> Vec<DispensingEvent> {
    let mut events = Vec::new();
    let mut skipped_records = 0usize;
    let mut dropped_lines = 0usize;

    for record in records {
        if !is_pharmacy_dispensing(record, config) {
            skipped_records += 1;
            continue;
        }

        for line in &record.medications {
            match normalize_line(line, record.visit_date.as_deref()) {
                Some(event) => events.push(event),
                None => dropped_lines += 1,
            }
        }
    }

    tracing::debug!(
        records = records.len(),
        skipped_records,
        dropped_lines,
        events = events.len(),
        "normalized dispensing records"
    );

    events
}

/// Whether a record was dispensed by a pharmacy.
pub fn is_pharmacy_dispensing(record: &RawVisitRecord, config: &AnalyzerConfig) -> bool {
    let type_matches = non_empty(record.treatment_type.as_deref()).is_some_and(|kind| {
        config
            .dispensed_treatment_types
            .iter()
            .any(|tag| tag.trim().to_lowercase() == kind.to_lowercase())
    });
    if type_matches {
        return true;
    }

    non_empty(record.source_name.as_deref()).is_some_and(|source| {
        let source = source.to_lowercase();
        config
            .pharmacy_markers
            .iter()
            .map(|marker| marker.trim().to_lowercase())
            .filter(|marker| !marker.is_empty())
            .any(|marker| source.contains(&marker))
    })
}

fn normalize_line(line: &RawMedicationLine, visit_date: Option<&str>) -> Option<DispensingEvent> {
    let effect_label = non_empty(line.effect.as_deref()).map(str::to_string);
    let drug_name = non_empty(line.drug_name.as_deref()).map(str::to_string);
    if effect_label.is_none() && drug_name.is_none() {
        return None;
    }

    let raw_date = non_empty(line.start_date.as_deref()).or_else(|| non_empty(visit_date))?;
    let start_date = parse_dispensing_date(raw_date)?;
    let duration_days = line.duration_days.as_ref().and_then(parse_duration_days)?;

    Some(DispensingEvent {
        effect_label,
        drug_name,
        start_date,
        duration_days,
    })
}

/// Parse a dispensing date. Accepts the common pharmacy claim formats and
/// RFC 3339 timestamps, keeping only the calendar date.
pub fn parse_dispensing_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Parse a duration into a positive number of days.
pub fn parse_duration_days(value: &DurationValue) -> Option<u32> {
    match value {
        DurationValue::Days(days) => positive_days(*days),
        DurationValue::Text(text) => {
            let mut cleaned = text.trim().to_lowercase();
            if let Some(suffix) = DAY_SUFFIXES.iter().find(|s| cleaned.ends_with(*s)) {
                cleaned.truncate(cleaned.len() - suffix.len());
            }
            cleaned.trim().parse::<f64>().ok().and_then(positive_days)
        }
    }
}

fn positive_days(days: f64) -> Option<u32> {
    if !days.is_finite() {
        return None;
    }
    let whole = days.trunc();
    if whole < 1.0 || whole > f64::from(u32::MAX) {
        return None;
    }
    Some(whole as u32)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}
