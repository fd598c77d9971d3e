//! Logic lõi phân tích mẫu hình dùng thuốc từ lịch sử cấp phát tại nhà thuốc.
//!
//! Luồng xử lý một chiều: bản ghi thô → sự kiện cấp phát → nhóm theo tác dụng →
//! đợt điều trị/khoảng ngắt → chỉ số → xếp hạng ưu tiên.

pub mod analysis;
pub mod classify;
pub mod episode;
pub mod format;
pub mod metrics;
pub mod normalize;
pub mod ranking;
pub mod yearly;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use analysis::{analyze, analyze_events};
pub use classify::{classify_events, CategoryKey, EffectGroup};
pub use episode::{
    coverage_end, merge_episodes, sort_chronologically, EpisodeMerge, EPISODE_GAP_THRESHOLD_DAYS,
};
pub use format::{
    continuity_label, describe_analysis, describe_pattern, ContinuityLabel, DurationParts,
    PatternDescription,
};
pub use metrics::{compute_metrics, CategoryMetrics};
pub use normalize::{
    is_pharmacy_dispensing, normalize_records, parse_dispensing_date, parse_duration_days,
};
pub use ranking::{build_views, priority_breakdown, rank_patterns};
pub use yearly::aggregate_by_year;

/// Cấu hình các ngưỡng hiển thị và nhận diện bản ghi nhà thuốc.
///
/// Trường bị thiếu khi đọc từ JSON lấy giá trị mặc định.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Số nhóm tác dụng đứng đầu được đưa vào danh sách "nổi bật".
    pub leading_count: usize,
    /// Tổng số ngày dùng tối thiểu để coi là dùng thuốc dài hạn.
    pub long_term_min_days: u32,
    /// Khoảng thời gian (ngày) coi là "gần đây" tính từ ngày phân tích.
    pub recent_window_days: u32,
    /// Các giá trị loại điều trị biểu thị cấp phát tại nhà thuốc.
    pub dispensed_treatment_types: Vec<String>,
    /// Từ khóa trong tên cơ sở cho biết đó là nhà thuốc.
    pub pharmacy_markers: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            leading_count: 5,
            long_term_min_days: 180,
            recent_window_days: 365,
            dispensed_treatment_types: vec![
                "dispensed".to_string(),
                "pharmacy".to_string(),
                "처방조제".to_string(),
            ],
            pharmacy_markers: vec![
                "pharmacy".to_string(),
                "drugstore".to_string(),
                "약국".to_string(),
            ],
        }
    }
}

impl AnalyzerConfig {
    /// Kiểm tra cấu hình trước khi chạy phân tích.
    pub fn validate(&self) -> Result<(), AdherenceError> {
        if self.leading_count == 0 {
            return Err(AdherenceError::InvalidConfig(
                "leading_count must be at least 1".to_string(),
            ));
        }
        if self.dispensed_treatment_types.is_empty() && self.pharmacy_markers.is_empty() {
            return Err(AdherenceError::InvalidConfig(
                "no treatment type or pharmacy marker configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bản ghi khám/cấp phát thô do dịch vụ phía trên cung cấp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawVisitRecord {
    pub treatment_type: Option<String>,
    pub source_name: Option<String>,
    pub visit_date: Option<String>,
    #[serde(default)]
    pub medications: Vec<RawMedicationLine>,
}

/// Một dòng thuốc trong bản ghi cấp phát.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawMedicationLine {
    pub effect: Option<String>,
    pub drug_name: Option<String>,
    pub start_date: Option<String>,
    pub duration_days: Option<DurationValue>,
}

/// Số ngày dùng thuốc có thể đến dưới dạng số hoặc chuỗi.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DurationValue {
    Days(f64),
    Text(String),
}

/// Một lần cấp phát đã chuẩn hóa. Luôn có `duration_days > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispensingEvent {
    pub effect_label: Option<String>,
    pub drug_name: Option<String>,
    pub start_date: NaiveDate,
    pub duration_days: u32,
}

/// Đợt điều trị: chuỗi lần cấp phát liền mạch trong cùng nhóm tác dụng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreatmentEpisode {
    pub start_date: NaiveDate,
    /// Ngày bắt đầu của lần cấp phát gần nhất cộng số ngày của chính lần đó.
    pub end_date: NaiveDate,
    /// Tổng số ngày danh nghĩa của mọi lần cấp phát đã gộp.
    pub cumulative_days: u32,
    pub event_count: u32,
    pub gap_before_days: Option<i64>,
}

/// Khoảng ngắt quãng giữa hai đợt điều trị.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GapPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
}

/// Toàn bộ khoảng quan sát của một nhóm tác dụng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
}

/// Phân bổ theo từng tên thuốc trong một nhóm tác dụng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationShare {
    pub drug_name: String,
    pub event_count: u32,
    pub total_days: u32,
}

/// Giá trị từng thành phần trước khi nhân trọng số.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorityBreakdown {
    pub duration: f64,
    pub frequency: f64,
    pub recency: f64,
    pub continuity: f64,
    pub restart_penalty: f64,
}

/// Mẫu hình dùng thuốc của một nhóm tác dụng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectPattern {
    pub effect: String,
    pub total_days: u32,
    pub event_count: u32,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_episode_end_date: NaiveDate,
    pub years_present: Vec<i32>,
    pub episodes: Vec<TreatmentEpisode>,
    pub gaps: Vec<GapPeriod>,
    pub total_period: TotalPeriod,
    pub consumption_density: f64,
    pub restart_count: u32,
    pub average_gap_days: f64,
    pub medication_breakdown: Vec<MedicationShare>,
    pub priority: PriorityBreakdown,
    pub priority_score: f64,
}

/// Tổng hợp theo năm dương lịch, tính trên sự kiện chưa gộp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearlyPattern {
    pub year: i32,
    pub effects_present: Vec<String>,
    pub event_count: u32,
    pub total_days: u32,
}

/// Các danh sách trình bày, chứa tên nhóm tác dụng.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternViews {
    pub leading: Vec<String>,
    pub long_term: Vec<String>,
    pub recent: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub distinct_years: usize,
    pub total_dispensings: usize,
    pub distinct_effects: usize,
    pub top_priority_effect: Option<String>,
    pub longest_duration_effect: Option<String>,
}

/// Kết quả phân tích cuối cùng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternAnalysis {
    pub as_of: NaiveDate,
    pub patterns: Vec<EffectPattern>,
    pub yearly: Vec<YearlyPattern>,
    pub views: PatternViews,
    pub summary: AnalysisSummary,
}

impl PatternAnalysis {
    /// Kết quả rỗng cho đầu vào không có lần cấp phát nào.
    pub fn empty(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            patterns: Vec::new(),
            yearly: Vec::new(),
            views: PatternViews::default(),
            summary: AnalysisSummary::default(),
        }
    }

    /// Tra cứu mẫu hình theo tên nhóm tác dụng.
    pub fn pattern(&self, effect: &str) -> Option<&EffectPattern> {
        self.patterns.iter().find(|pattern| pattern.effect == effect)
    }

    pub fn leading(&self) -> Vec<&EffectPattern> {
        self.resolve(&self.views.leading)
    }

    pub fn long_term(&self) -> Vec<&EffectPattern> {
        self.resolve(&self.views.long_term)
    }

    pub fn recent(&self) -> Vec<&EffectPattern> {
        self.resolve(&self.views.recent)
    }

    fn resolve(&self, names: &[String]) -> Vec<&EffectPattern> {
        names.iter().filter_map(|name| self.pattern(name)).collect()
    }
}

/// Lỗi chung ở các lớp bao quanh phân tích.
#[derive(Debug, thiserror::Error)]
pub enum AdherenceError {
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Cấu hình không hợp lệ: {0}")]
    InvalidConfig(String),
}
