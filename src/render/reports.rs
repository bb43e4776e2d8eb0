use crate::render::scale::BadgeColor;
use crate::utils::error::{DashboardError, Result};
use std::fmt;

/// 報告彈出視窗的種類。內容都是靜態的，數值由模型團隊離線提供。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Explainability,
    Fairness,
    DutySheet,
    MajorEvents,
    AllocationExplanation,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Explainability,
        ReportKind::Fairness,
        ReportKind::DutySheet,
        ReportKind::MajorEvents,
        ReportKind::AllocationExplanation,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::Explainability => "explainability",
            ReportKind::Fairness => "fairness",
            ReportKind::DutySheet => "duty-sheet",
            ReportKind::MajorEvents => "major-events",
            ReportKind::AllocationExplanation => "allocation",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Explainability => "Explainability Report",
            ReportKind::Fairness => "Fairness Check",
            ReportKind::DutySheet => "Duty Sheet",
            ReportKind::MajorEvents => "Major Events & Police Presence",
            ReportKind::AllocationExplanation => "How Allocation Works",
        }
    }

    /// 值班表彈窗的內容是即時的值班表，不是靜態段落
    pub fn embeds_duty_sheet(self) -> bool {
        matches!(self, ReportKind::DutySheet)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for ReportKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| DashboardError::InvalidConfigValueError {
                field: "report".to_string(),
                value: s.to_string(),
                reason: format!(
                    "Valid reports: {}",
                    ReportKind::ALL.map(|k| k.slug()).join(", ")
                ),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Paragraphs(Vec<String>),
    Bullets(Vec<String>),
    Scores(Vec<Score>),
}

/// 帶顏色標記的分數（0..=1）
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub label: String,
    pub value: f64,
    pub as_percent: bool,
}

impl Score {
    fn ratio(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
            as_percent: false,
        }
    }

    fn percent(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
            as_percent: true,
        }
    }

    /// 0.85 以上綠色，其餘黃色
    pub fn color(&self) -> BadgeColor {
        if self.value >= 0.85 {
            BadgeColor::Green
        } else {
            BadgeColor::Yellow
        }
    }

    pub fn formatted(&self) -> String {
        if self.as_percent {
            format!("{:.0}%", self.value * 100.0)
        } else {
            format!("{:.2}", self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub heading: Option<String>,
    pub body: SectionBody,
}

impl ReportSection {
    fn paragraphs(heading: Option<&str>, lines: &[&str]) -> Self {
        Self {
            heading: heading.map(str::to_string),
            body: SectionBody::Paragraphs(lines.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn bullets(heading: &str, items: &[&str]) -> Self {
        Self {
            heading: Some(heading.to_string()),
            body: SectionBody::Bullets(items.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn scores(heading: &str, scores: Vec<Score>) -> Self {
        Self {
            heading: Some(heading.to_string()),
            body: SectionBody::Scores(scores),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popout {
    pub kind: ReportKind,
    pub title: String,
    pub description: String,
    /// 按鈕上的兩行預覽
    pub preview: Vec<String>,
    pub sections: Vec<ReportSection>,
}

pub fn popout(kind: ReportKind) -> Popout {
    let (preview, sections) = match kind {
        ReportKind::Explainability => (
            vec!["Model: LightGBM", "Top feature: Previous incidents"],
            explainability_sections(),
        ),
        ReportKind::Fairness => (
            vec!["Equal Opportunity: 0.92", "Demographic Parity: 0.89"],
            fairness_sections(),
        ),
        ReportKind::DutySheet => (
            vec!["High priority areas: 3", "Units allocated: 24/32"],
            Vec::new(),
        ),
        ReportKind::MajorEvents => (vec!["Upcoming events: 2"], major_events_sections()),
        ReportKind::AllocationExplanation => (
            vec!["See detailed information on how allocation works"],
            allocation_sections(),
        ),
    };

    Popout {
        kind,
        title: kind.title().to_string(),
        description: format!("Detailed information for {}", kind.title().to_lowercase()),
        preview: preview.iter().map(|s| s.to_string()).collect(),
        sections,
    }
}

fn explainability_sections() -> Vec<ReportSection> {
    vec![
        ReportSection::paragraphs(
            None,
            &["This report explains how the prediction model works and how it arrived at its predictions."],
        ),
        ReportSection::bullets(
            "Key Factors Influencing Predictions",
            &[
                "Previous burglary incidents in the area (Importance: 0.32)",
                "Proximity to transport hubs (Importance: 0.24)",
                "Population density (Importance: 0.18)",
                "Time of year and holiday periods (Importance: 0.15)",
                "Lighting and visibility conditions (Importance: 0.11)",
            ],
        ),
        ReportSection::paragraphs(
            Some("Model Architecture"),
            &[
                "LightGBM with gradient boosting and 500 estimators",
                "Trained on 5 years of historical data with cross-validation",
            ],
        ),
        ReportSection::paragraphs(
            Some("Feature Engineering"),
            &[
                "Data preprocessed using temporal and spatial aggregation",
                "Includes derived features from geographical and time-based patterns",
            ],
        ),
        ReportSection::paragraphs(
            Some("Important Disclaimer"),
            &["This model is predictive only and should be used as one of several tools to guide resource allocation decisions."],
        ),
    ]
}

fn fairness_sections() -> Vec<ReportSection> {
    vec![
        ReportSection::paragraphs(
            None,
            &["This report analyzes the fairness of our predictive model across different demographics and areas."],
        ),
        ReportSection::scores(
            "Fairness Metrics",
            vec![
                Score::ratio("Equal Opportunity", 0.92),
                Score::ratio("Demographic Parity", 0.89),
                Score::ratio("Predictive Parity", 0.78),
                Score::ratio("Treatment Equality", 0.94),
            ],
        ),
        ReportSection::paragraphs(
            Some("Demographic Distribution Analysis"),
            &["The model has been evaluated across different demographic groups to ensure fair predictions."],
        ),
        ReportSection::scores(
            "Area-Based Fairness",
            vec![
                Score::percent("Westminster", 0.95),
                Score::percent("Camden", 0.92),
                Score::percent("Hackney", 0.83),
                Score::percent("Southwark", 0.88),
                Score::percent("Tower Hamlets", 0.81),
            ],
        ),
    ]
}

fn major_events_sections() -> Vec<ReportSection> {
    vec![
        ReportSection::paragraphs(
            None,
            &["Large public events change where officers are deployed and can leave residential areas with thinner cover."],
        ),
        ReportSection::bullets(
            "Planning Notes",
            &[
                "Events drawing officers away from a ward are flagged on the duty sheet",
                "Tier 1 areas keep their minimum patrol hours during event weekends",
                "Event schedules are supplied by the operations team and are not predicted",
            ],
        ),
    ]
}

fn allocation_sections() -> Vec<ReportSection> {
    vec![
        ReportSection::paragraphs(
            None,
            &[
                "Weekly patrol hours are assigned to each LSOA by the prediction service from the February 2025 forecast.",
                "Areas are ranked by predicted burglaries per km² and grouped into three tiers.",
            ],
        ),
        ReportSection::bullets(
            "Tiers",
            &[
                "Tier 1: highest predicted risk, receives the largest share of hours",
                "Tier 2: elevated risk, regular scheduled patrols",
                "Tier 3: baseline cover",
            ],
        ),
        ReportSection::paragraphs(
            Some("Limits"),
            &["The allocation is a recommendation. Local knowledge and operational needs take precedence."],
        ),
    ]
}

/// 一組回歸評估指標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub title: String,
    pub metrics: RegressionMetrics,
}

pub fn prediction_metrics() -> Vec<MetricCard> {
    vec![
        MetricCard {
            title: "Time-based Model (Last Month Hold-out)".to_string(),
            metrics: RegressionMetrics {
                mse: 0.4158,
                rmse: 0.6448,
                mae: 0.3183,
                r2: 0.6707,
            },
        },
        MetricCard {
            title: "Random 80/20 Split (LightGBM)".to_string(),
            metrics: RegressionMetrics {
                mse: 0.8619,
                rmse: 0.9284,
                mae: 0.5134,
                r2: 0.6194,
            },
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitChange {
    pub label: String,
    pub current: u32,
    pub recommended: u32,
}

/// 警力配置建議（由服務端計算，這裡只是展示用的固定值）
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSummary {
    pub current_budget: u64,
    pub optimized_budget: u64,
    pub units: Vec<UnitChange>,
}

impl AllocationSummary {
    pub fn savings(&self) -> u64 {
        self.current_budget.saturating_sub(self.optimized_budget)
    }

    pub fn savings_percent(&self) -> f64 {
        if self.current_budget == 0 {
            return 0.0;
        }
        self.savings() as f64 / self.current_budget as f64 * 100.0
    }
}

pub fn allocation_summary() -> AllocationSummary {
    let unit = |label: &str, current, recommended| UnitChange {
        label: label.to_string(),
        current,
        recommended,
    };
    AllocationSummary {
        current_budget: 1_250_000,
        optimized_budget: 1_125_000,
        units: vec![
            unit("Patrol Units", 28, 32),
            unit("Investigation Units", 15, 12),
            unit("Community Support", 10, 14),
        ],
    }
}

/// 英鎊金額加千分位，例如 `£1,250,000`
pub fn format_pounds(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("£{}", out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_report_has_title_and_preview() {
        for kind in ReportKind::ALL {
            let popout = popout(kind);
            assert!(!popout.title.is_empty());
            assert!(!popout.preview.is_empty());
            assert_eq!(popout.kind, kind);
            if !kind.embeds_duty_sheet() {
                assert!(!popout.sections.is_empty(), "{} has no body", kind);
            }
        }
    }

    #[test]
    fn test_report_kind_from_str() {
        assert_eq!("fairness".parse::<ReportKind>().unwrap(), ReportKind::Fairness);
        assert_eq!(" Duty-Sheet ".parse::<ReportKind>().unwrap(), ReportKind::DutySheet);
        let err = "weather".parse::<ReportKind>().unwrap_err();
        assert!(err.to_string().contains("explainability"));
    }

    #[test]
    fn test_fairness_scores_are_colored() {
        let fairness = popout(ReportKind::Fairness);
        let scores: Vec<&Score> = fairness
            .sections
            .iter()
            .filter_map(|s| match &s.body {
                SectionBody::Scores(scores) => Some(scores),
                _ => None,
            })
            .flatten()
            .collect();

        let predictive = scores.iter().find(|s| s.label == "Predictive Parity").unwrap();
        assert_eq!(predictive.color(), BadgeColor::Yellow);
        assert_eq!(predictive.formatted(), "0.78");

        let westminster = scores.iter().find(|s| s.label == "Westminster").unwrap();
        assert_eq!(westminster.color(), BadgeColor::Green);
        assert_eq!(westminster.formatted(), "95%");
    }

    #[test]
    fn test_prediction_metrics_values() {
        let cards = prediction_metrics();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].metrics.r2, 0.6707);
        assert_eq!(cards[1].metrics.rmse, 0.9284);
    }

    #[test]
    fn test_allocation_savings() {
        let summary = allocation_summary();
        assert_eq!(summary.savings(), 125_000);
        assert!((summary.savings_percent() - 10.0).abs() < 1e-9);
        assert_eq!(format_pounds(summary.current_budget), "£1,250,000");
        assert_eq!(format_pounds(999), "£999");
        assert_eq!(format_pounds(0), "£0");
    }
}
