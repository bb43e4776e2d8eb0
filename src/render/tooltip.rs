use crate::domain::model::FeatureProperties;
use std::fmt;

/// 產生 tooltip 時需要的地圖狀態
#[derive(Debug, Clone, Copy)]
pub struct TooltipContext<'a> {
    pub is_prediction: bool,
    /// 目前篩選的年月，例如 "March 2024"
    pub period_label: &'a str,
    /// 上色用的欄位（`crime_count` 或 `pred_per_km2`）
    pub value_field: &'a str,
}

impl TooltipContext<'_> {
    pub fn value_label(&self) -> String {
        if self.is_prediction {
            "February 2025 Prediction:".to_string()
        } else {
            format!("Burglaries in {}:", self.period_label)
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        if self.is_prediction {
            format!("{:.2}", value)
        } else {
            format!("{}", value.round() as i64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipLine {
    pub label: String,
    pub value: String,
}

impl TooltipLine {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tooltip {
    pub lines: Vec<TooltipLine>,
}

impl Tooltip {
    fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.lines.push(TooltipLine::new(label, value));
    }

    fn push_optional(&mut self, label: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(label, value);
        }
    }

    pub fn line(&self, label: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.label == label)
            .map(|line| line.value.as_str())
    }
}

impl fmt::Display for Tooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} {}", line.label, line.value)?;
        }
        Ok(())
    }
}

/// 顯示值的優先順序：`display_value`，其次非零的 `crime_count`，最後才是上色欄位
pub fn display_value(properties: &FeatureProperties, value_field: &str) -> f64 {
    if let Some(value) = properties.number("display_value") {
        return value;
    }
    properties
        .number("crime_count")
        .filter(|count| *count != 0.0)
        .unwrap_or_else(|| properties.value_for(value_field))
}

/// 資料層 feature 的 tooltip
pub fn feature_tooltip(properties: &FeatureProperties, ctx: &TooltipContext<'_>) -> Tooltip {
    let mut tooltip = Tooltip::default();

    let area_code = properties
        .text("area_code")
        .or_else(|| properties.text("LSOA21CD"))
        .unwrap_or("Unknown");
    tooltip.push("LSOA Code:", area_code);
    tooltip.push_optional(
        "Name:",
        properties.text("name").or_else(|| properties.text("LSOA21NM")),
    );

    let value = display_value(properties, ctx.value_field);
    tooltip.push(ctx.value_label(), ctx.format_value(value));

    if let Some(area) = properties.number("area_km2").filter(|a| *a != 0.0) {
        tooltip.push("Area:", format!("{:.3} km²", area));
    }
    tooltip
}

/// 邊界層的 tooltip。帶 `NAME` 且沒有 `LSOA21CD` 的是 ward 邊界。
pub fn boundary_tooltip(properties: &FeatureProperties, ctx: &TooltipContext<'_>) -> Tooltip {
    let mut tooltip = Tooltip::default();

    let is_ward = properties.text("NAME").is_some() && !properties.has("LSOA21CD");
    if is_ward {
        tooltip.push("Ward:", properties.text("NAME").unwrap_or("Unknown"));
        tooltip.push_optional("Borough:", properties.text("BOROUGH"));
        tooltip.push_optional("Code:", properties.text("GSS_CODE"));
    } else {
        tooltip.push_optional("LSOA Code:", properties.text("LSOA21CD"));
        tooltip.push_optional("Name:", properties.text("LSOA21NM"));
        tooltip.push_optional("Local Authority:", properties.text("LAD20NM"));
    }

    let crime_count = properties.value_for("crime_count");
    tooltip.push(ctx.value_label(), ctx.format_value(crime_count));
    tooltip
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> FeatureProperties {
        serde_json::from_value(value).unwrap()
    }

    const PAST: TooltipContext<'static> = TooltipContext {
        is_prediction: false,
        period_label: "March 2024",
        value_field: "crime_count",
    };

    const PREDICTED: TooltipContext<'static> = TooltipContext {
        is_prediction: true,
        period_label: "February 2025",
        value_field: "pred_per_km2",
    };

    #[test]
    fn test_past_feature_tooltip() {
        let tooltip = feature_tooltip(
            &props(json!({
                "area_code": "E01000001",
                "name": "City of London 001A",
                "crime_count": 6.6,
                "area_km2": 0.25
            })),
            &PAST,
        );

        assert_eq!(tooltip.line("LSOA Code:"), Some("E01000001"));
        assert_eq!(tooltip.line("Name:"), Some("City of London 001A"));
        assert_eq!(tooltip.line("Burglaries in March 2024:"), Some("7"));
        assert_eq!(tooltip.line("Area:"), Some("0.250 km²"));
    }

    #[test]
    fn test_prediction_feature_tooltip_uses_two_decimals() {
        let tooltip = feature_tooltip(
            &props(json!({"LSOA21CD": "E01000002", "pred_per_km2": 3.14159})),
            &PREDICTED,
        );

        assert_eq!(tooltip.line("LSOA Code:"), Some("E01000002"));
        assert_eq!(tooltip.line("Name:"), None);
        assert_eq!(tooltip.line("February 2025 Prediction:"), Some("3.14"));
        assert_eq!(tooltip.line("Area:"), None);
    }

    #[test]
    fn test_feature_tooltip_fallbacks() {
        let tooltip = feature_tooltip(&props(json!({})), &PAST);
        assert_eq!(tooltip.line("LSOA Code:"), Some("Unknown"));
        assert_eq!(tooltip.line("Burglaries in March 2024:"), Some("0"));
    }

    #[test]
    fn test_display_value_precedence() {
        let explicit_zero = props(json!({"display_value": 0, "crime_count": 5}));
        assert_eq!(display_value(&explicit_zero, "crime_count"), 0.0);

        let zero_count = props(json!({"crime_count": 0, "pred_per_km2": 2.5}));
        assert_eq!(display_value(&zero_count, "pred_per_km2"), 2.5);

        let count = props(json!({"crime_count": 4, "pred_per_km2": 2.5}));
        assert_eq!(display_value(&count, "pred_per_km2"), 4.0);
    }

    #[test]
    fn test_ward_boundary_tooltip() {
        let tooltip = boundary_tooltip(
            &props(json!({
                "NAME": "Aldersgate",
                "BOROUGH": "City of London",
                "GSS_CODE": "E05009288",
                "crime_count": 12
            })),
            &PAST,
        );

        let rendered = tooltip.to_string();
        assert_eq!(
            rendered,
            "Ward: Aldersgate\nBorough: City of London\nCode: E05009288\nBurglaries in March 2024: 12"
        );
    }

    #[test]
    fn test_lsoa_boundary_tooltip() {
        let tooltip = boundary_tooltip(
            &props(json!({
                "NAME": "ignored because LSOA21CD is present",
                "LSOA21CD": "E01000001",
                "LSOA21NM": "City of London 001A",
                "LAD20NM": "City of London",
                "crime_count": 1.234
            })),
            &PREDICTED,
        );

        assert_eq!(tooltip.line("Ward:"), None);
        assert_eq!(tooltip.line("LSOA Code:"), Some("E01000001"));
        assert_eq!(tooltip.line("Local Authority:"), Some("City of London"));
        assert_eq!(tooltip.line("February 2025 Prediction:"), Some("1.23"));
    }
}
