//! Chuyển chỉ số thành mô tả định tính để hiển thị.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::{EffectPattern, PatternAnalysis};

const DAYS_PER_MONTH: u32 = 30;

/// Mức độ liên tục dựa trên mật độ sử dụng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityLabel {
    Continuous,
    Periodic,
    Intermittent,
    Occasional,
}

impl ContinuityLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Periodic => "periodic",
            Self::Intermittent => "intermittent",
            Self::Occasional => "occasional",
        }
    }
}

impl fmt::Display for ContinuityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn continuity_label(density: f64) -> ContinuityLabel {
    if density >= 0.8 {
        ContinuityLabel::Continuous
    } else if density >= 0.5 {
        ContinuityLabel::Periodic
    } else if density >= 0.3 {
        ContinuityLabel::Intermittent
    } else {
        ContinuityLabel::Occasional
    }
}

/// Số ngày tách thành tháng (30 ngày) và ngày lẻ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DurationParts {
    pub months: u32,
    pub days: u32,
}

impl DurationParts {
    pub fn from_days(total: u32) -> Self {
        Self {
            months: total / DAYS_PER_MONTH,
            days: total % DAYS_PER_MONTH,
        }
    }
}

impl fmt::Display for DurationParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.months, self.days) {
            (0, days) => write!(f, "{}", plural(days, "day")),
            (months, 0) => write!(f, "{}", plural(months, "month")),
            (months, days) => write!(f, "{} {}", plural(months, "month"), plural(days, "day")),
        }
    }
}

fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Mô tả văn bản của một mẫu hình.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternDescription {
    pub effect: String,
    pub continuity: ContinuityLabel,
    pub duration: String,
    pub restarts: String,
    pub period: String,
}

pub fn describe_pattern(pattern: &EffectPattern) -> PatternDescription {
    let restarts = match pattern.restart_count {
        0 => "no interruptions".to_string(),
        count => format!(
            "{}, average gap {}",
            plural(count, "restart"),
            plural(pattern.average_gap_days.round() as u32, "day")
        ),
    };

    PatternDescription {
        effect: pattern.effect.clone(),
        continuity: continuity_label(pattern.consumption_density),
        duration: DurationParts::from_days(pattern.total_days).to_string(),
        restarts,
        period: format!(
            "{} to {}",
            pattern.total_period.start_date, pattern.total_period.end_date
        ),
    }
}

/// Plain-text report of a whole analysis.
pub fn describe_analysis(analysis: &PatternAnalysis) -> String {
    let summary = &analysis.summary;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "As of {}: {} dispensings, {} effects over {}",
        analysis.as_of,
        summary.total_dispensings,
        summary.distinct_effects,
        plural(summary.distinct_years as u32, "year")
    );

    if analysis.patterns.is_empty() {
        out.push_str("No pharmacy dispensing history.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "Top priority: {} | Longest: {}",
        summary.top_priority_effect.as_deref().unwrap_or("-"),
        summary.longest_duration_effect.as_deref().unwrap_or("-")
    );

    for (rank, pattern) in analysis.patterns.iter().enumerate() {
        let description = describe_pattern(pattern);
        let _ = writeln!(
            out,
            "{}. {} (score {:.2}): {}, {}, {}, {}",
            rank + 1,
            description.effect,
            pattern.priority_score,
            description.continuity,
            description.duration,
            description.restarts,
            description.period
        );
    }

    out.push_str("By year:\n");
    for year in &analysis.yearly {
        let _ = writeln!(
            out,
            "{}: {}, {} ({})",
            year.year,
            plural(year.event_count, "dispensing"),
            plural(year.total_days, "day"),
            year.effects_present.join(", ")
        );
    }

    out
}
