//! Dispensing-history JSON to `PatternAnalysis` converter.
//!
//! Upstream services deliver visit records in loosely specified shapes:
//! camelCase or snake_case keys, dates as strings or numbers, durations with or
//! without units. This crate reads them into [`RawVisitRecord`] values and runs
//! the analyzer.

use adherence_core::{
    analyze, parse_dispensing_date, AdherenceError, AnalyzerConfig, DurationValue,
    PatternAnalysis, RawMedicationLine, RawVisitRecord,
};
use chrono::NaiveDate;
use serde_json::Value;

const RECORD_LIST_FIELDS: [&str; 3] = ["records", "visits", "data"];

const TREATMENT_TYPE_FIELDS: [&str; 3] = ["treatmentType", "treatment_type", "type"];
const SOURCE_NAME_FIELDS: [&str; 4] = ["sourceName", "source_name", "institution", "provider"];
const VISIT_DATE_FIELDS: [&str; 3] = ["visitDate", "visit_date", "date"];
const MEDICATION_LIST_FIELDS: [&str; 3] = ["medications", "medicationList", "items"];

const EFFECT_FIELDS: [&str; 4] = ["effect", "effectLabel", "effect_label", "efficacy"];
const DRUG_NAME_FIELDS: [&str; 4] = ["drugName", "drug_name", "medicationName", "name"];
const START_DATE_FIELDS: [&str; 4] = ["startDate", "start_date", "dispensedDate", "date"];
const DURATION_FIELDS: [&str; 4] = ["durationDays", "duration_days", "duration", "days"];

/// Analyze dispensing history from a JSON string.
pub fn analyze_records_str(
    records_json: &str,
    config: &AnalyzerConfig,
    as_of: NaiveDate,
) -> Result<PatternAnalysis, AdherenceError> {
    let value: Value =
        serde_json::from_str(records_json).map_err(|err| AdherenceError::Parse(err.to_string()))?;
    analyze_records_value(&value, config, as_of)
}

/// Analyze dispensing history from a `serde_json::Value`.
pub fn analyze_records_value(
    records: &Value,
    config: &AnalyzerConfig,
    as_of: NaiveDate,
) -> Result<PatternAnalysis, AdherenceError> {
    config.validate()?;
    let records = parse_records_value(records)?;
    Ok(analyze(&records, config, as_of))
}

/// Read visit records from either a top-level array or an object wrapping one.
///
/// Entries that are not JSON objects are skipped.
pub fn parse_records_value(value: &Value) -> Result<Vec<RawVisitRecord>, AdherenceError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(_) => RECORD_LIST_FIELDS
            .iter()
            .find_map(|field| value.get(*field).and_then(Value::as_array))
            .ok_or(AdherenceError::MissingData)?,
        other => {
            return Err(AdherenceError::Parse(format!(
                "Expected an array of records, received {}",
                value_kind(other)
            )))
        }
    };

    let records: Vec<RawVisitRecord> = entries.iter().filter_map(parse_record).collect();
    if records.len() != entries.len() {
        tracing::debug!(
            skipped = entries.len() - records.len(),
            "skipped non-object record entries"
        );
    }
    Ok(records)
}

/// Parse the reference date used for recency.
pub fn parse_as_of(value: &str) -> Result<NaiveDate, AdherenceError> {
    parse_dispensing_date(value)
        .ok_or_else(|| AdherenceError::InvalidConfig(format!("invalid as-of date: {value}")))
}

fn parse_record(entry: &Value) -> Option<RawVisitRecord> {
    if !entry.is_object() {
        return None;
    }

    let medications = MEDICATION_LIST_FIELDS
        .iter()
        .find_map(|field| entry.get(*field).and_then(Value::as_array))
        .map(|lines| lines.iter().filter_map(parse_line).collect())
        .unwrap_or_default();

    Some(RawVisitRecord {
        treatment_type: extract_label(entry, &TREATMENT_TYPE_FIELDS),
        source_name: extract_label(entry, &SOURCE_NAME_FIELDS),
        visit_date: extract_scalar(entry, &VISIT_DATE_FIELDS),
        medications,
    })
}

fn parse_line(line: &Value) -> Option<RawMedicationLine> {
    if !line.is_object() {
        return None;
    }

    Some(RawMedicationLine {
        effect: extract_label(line, &EFFECT_FIELDS),
        drug_name: extract_label(line, &DRUG_NAME_FIELDS),
        start_date: extract_scalar(line, &START_DATE_FIELDS),
        duration_days: extract_duration(line, &DURATION_FIELDS),
    })
}

/// First non-empty text among `fields`. Accepts plain strings and coded
/// objects carrying `text`, `display` or `name`.
fn extract_label(value: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| value.get(*field))
        .find_map(label_text)
}

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Object(_) => ["text", "display", "name"]
            .iter()
            .filter_map(|key| value.get(*key).and_then(Value::as_str))
            .find_map(non_empty),
        _ => None,
    }
}

/// First string or number among `fields`, as text. Dates such as `20230105`
/// often arrive as numbers.
fn extract_scalar(value: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| value.get(*field))
        .find_map(|candidate| match candidate {
            Value::String(text) => non_empty(text),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}

fn extract_duration(value: &Value, fields: &[&str]) -> Option<DurationValue> {
    fields
        .iter()
        .filter_map(|field| value.get(*field))
        .find_map(|candidate| match candidate {
            Value::Number(number) => number.as_f64().map(DurationValue::Days),
            Value::String(text) => non_empty(text).map(DurationValue::Text),
            _ => None,
        })
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
