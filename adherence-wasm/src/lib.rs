//! Bridge WASM <-> JavaScript cho bộ phân tích mẫu hình dùng thuốc.

use adherence_core::{AdherenceError, AnalyzerConfig};
use adherence_records::parse_as_of;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsAnalyzerConfig {
    #[serde(default)]
    leading_count: Option<usize>,
    #[serde(default)]
    long_term_min_days: Option<u32>,
    #[serde(default)]
    recent_window_days: Option<u32>,
    #[serde(default)]
    dispensed_treatment_types: Option<Vec<String>>,
    #[serde(default)]
    pharmacy_markers: Option<Vec<String>>,
}

impl From<JsAnalyzerConfig> for AnalyzerConfig {
    fn from(cfg: JsAnalyzerConfig) -> Self {
        let mut base = AnalyzerConfig::default();
        if let Some(count) = cfg.leading_count {
            base.leading_count = count;
        }
        if let Some(days) = cfg.long_term_min_days {
            base.long_term_min_days = days;
        }
        if let Some(days) = cfg.recent_window_days {
            base.recent_window_days = days;
        }
        if let Some(types) = cfg.dispensed_treatment_types {
            base.dispensed_treatment_types = types;
        }
        if let Some(markers) = cfg.pharmacy_markers {
            base.pharmacy_markers = markers;
        }
        base
    }
}

/// Phân tích lịch sử cấp phát. `as_of` dạng `YYYY-MM-DD`, mặc định là hôm nay.
#[wasm_bindgen(js_name = analyzeRecords)]
pub fn analyze_records(
    input_records: JsValue,
    config: Option<JsValue>,
    as_of: Option<String>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let records_value = from_value::<serde_json::Value>(input_records)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách bản ghi: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsAnalyzerConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            AnalyzerConfig::from(cfg)
        }
        None => AnalyzerConfig::default(),
    };

    let as_of = resolve_as_of(as_of.as_deref())
        .map_err(|err| JsValue::from_str(&format_adherence_error(err)))?;

    let analysis = adherence_records::analyze_records_value(&records_value, &cfg, as_of)
        .map_err(|err| JsValue::from_str(&format_adherence_error(err)))?;

    to_value(&analysis)
        .map_err(|err| JsValue::from_str(&format!("Không serialize kết quả: {err}")))
}

fn resolve_as_of(as_of: Option<&str>) -> Result<NaiveDate, AdherenceError> {
    match as_of {
        Some(value) => parse_as_of(value),
        None => Ok(Utc::now().date_naive()),
    }
}

fn format_adherence_error(err: AdherenceError) -> String {
    format!("Adherence error: {err}")
}
