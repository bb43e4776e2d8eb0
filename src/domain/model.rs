use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::{validate_non_negative, Validate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// GeoJSON feature 的屬性。後端欄位不固定，保留原始 JSON 值再按需取用。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureProperties {
    pub data: HashMap<String, serde_json::Value>,
}

impl FeatureProperties {
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.data.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            // 後端偶爾把數字寫成字串
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 非空字串才算有值
    pub fn text(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|v| !v.is_null())
    }

    /// 地圖上色用的數值；缺值時為 0
    pub fn value_for(&self, field: &str) -> f64 {
        self.number(field).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_tag")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
}

fn feature_collection_tag() -> String {
    "FeatureCollection".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// 邊界類型由第一個 feature 是否帶 `LSOA21CD` 判斷
    pub fn boundary_type(&self) -> BoundaryType {
        match self.features.first() {
            Some(f) if f.properties.has("LSOA21CD") => BoundaryType::Lsoa,
            _ => BoundaryType::Ward,
        }
    }
}

/// `/api/past-burglaries` 與 `/api/predicted-burglaries` 的回應
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: FeatureCollection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ward_boundaries: FeatureCollection,
    pub max_value: f64,
    #[serde(default)]
    pub time_label: String,
    #[serde(default)]
    pub boundary_count: Option<usize>,
    #[serde(default)]
    pub detail_level: Option<String>,
    #[serde(default)]
    pub is_prediction: Option<bool>,
    #[serde(default)]
    pub data_source: Option<String>,
}

impl MapData {
    /// 後端沒給 boundaryCount 時以邊界數量代替
    pub fn boundary_count(&self) -> usize {
        self.boundary_count.unwrap_or_else(|| self.ward_boundaries.len())
    }
}

impl Validate for MapData {
    fn validate(&self) -> Result<()> {
        validate_non_negative("maxValue", self.max_value)?;
        for (index, feature) in self.features.features.iter().enumerate() {
            for key in ["crime_count", "display_value", "pred_per_km2", "area_km2"] {
                if let Some(value) = feature.properties.number(key) {
                    validate_non_negative(&format!("features[{}].{}", index, key), value)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutySheetRow {
    pub lsoa_code: String,
    pub ward_code: String,
    pub ward_name: String,
    pub hours_per_week: f64,
    pub tier: String,
    pub lsoa_name: String,
}

impl DutySheetRow {
    pub fn tier(&self) -> Tier {
        Tier::parse(&self.tier)
    }
}

impl Validate for DutySheetRow {
    fn validate(&self) -> Result<()> {
        if self.lsoa_code.trim().is_empty() {
            return Err(DashboardError::ValidationError {
                message: format!("duty sheet row for ward '{}' has no LSOA code", self.ward_name),
            });
        }
        validate_non_negative(
            &format!("{}.hours_per_week", self.lsoa_code),
            self.hours_per_week,
        )
    }
}

/// `/api/duty-sheet` 的回應
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DutySheetResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub duty_sheet: Vec<DutySheetRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
    Other(String),
}

impl Tier {
    /// 必須完全相符；前後空白或大小寫不同都歸為 `Other`
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Tier 1" => Tier::Tier1,
            "Tier 2" => Tier::Tier2,
            "Tier 3" => Tier::Tier3,
            other => Tier::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Tier1 => write!(f, "Tier 1"),
            Tier::Tier2 => write!(f, "Tier 2"),
            Tier::Tier3 => write!(f, "Tier 3"),
            Tier::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryLevel {
    Ward,
    #[serde(rename = "LSOA")]
    Lsoa,
}

impl BoundaryLevel {
    /// Ward 用低細節（全部 ward），LSOA 用高細節（全部 LSOA）
    pub fn detail(self) -> DetailLevel {
        match self {
            BoundaryLevel::Ward => DetailLevel::Low,
            BoundaryLevel::Lsoa => DetailLevel::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryLevel::Ward => "Ward",
            BoundaryLevel::Lsoa => "LSOA",
        }
    }
}

impl fmt::Display for BoundaryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BoundaryLevel {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ward" => Ok(BoundaryLevel::Ward),
            "lsoa" => Ok(BoundaryLevel::Lsoa),
            other => Err(DashboardError::InvalidConfigValueError {
                field: "level".to_string(),
                value: other.to_string(),
                reason: "Valid levels: Ward, LSOA".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailLevel {
    Low,
    Medium,
    High,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::Medium => "medium",
            DetailLevel::High => "high",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryType {
    Ward,
    Lsoa,
}

impl BoundaryType {
    pub fn label(self) -> &'static str {
        match self {
            BoundaryType::Ward => "Ward Boundaries",
            BoundaryType::Lsoa => "LSOA Boundaries",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapEndpoint {
    PastBurglaries,
    PredictedBurglaries,
}

impl MapEndpoint {
    pub const ALL: [MapEndpoint; 2] = [MapEndpoint::PastBurglaries, MapEndpoint::PredictedBurglaries];

    pub fn path(self) -> &'static str {
        match self {
            MapEndpoint::PastBurglaries => "past-burglaries",
            MapEndpoint::PredictedBurglaries => "predicted-burglaries",
        }
    }

    /// 上色所用的屬性欄位
    pub fn value_field(self) -> &'static str {
        match self {
            MapEndpoint::PastBurglaries => "crime_count",
            MapEndpoint::PredictedBurglaries => "pred_per_km2",
        }
    }

    pub fn legend_title(self) -> &'static str {
        match self {
            MapEndpoint::PastBurglaries => "Past Burglaries",
            MapEndpoint::PredictedBurglaries => "Predicted Burglaries",
        }
    }

    pub fn is_prediction(self) -> bool {
        matches!(self, MapEndpoint::PredictedBurglaries)
    }

    /// 預測圖固定顯示 2025 年 2 月，不跟隨篩選的年月
    pub fn fixed_period(self) -> Option<(i32, u32)> {
        match self {
            MapEndpoint::PastBurglaries => None,
            MapEndpoint::PredictedBurglaries => Some((2025, 2)),
        }
    }
}

impl fmt::Display for MapEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl std::str::FromStr for MapEndpoint {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "past-burglaries" | "past" => Ok(MapEndpoint::PastBurglaries),
            "predicted-burglaries" | "predicted" => Ok(MapEndpoint::PredictedBurglaries),
            other => Err(DashboardError::InvalidConfigValueError {
                field: "endpoint".to_string(),
                value: other.to_string(),
                reason: "Valid endpoints: past-burglaries, predicted-burglaries".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_map_json() -> serde_json::Value {
        json!({
            "features": {
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": {"type": "Polygon", "coordinates": []},
                        "properties": {"area_code": "E01000001", "crime_count": 7, "display_value": 7}
                    }
                ]
            },
            "wardBoundaries": {
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"LSOA21CD": "E01000001", "LSOA21NM": "City of London 001A"}}
                ]
            },
            "maxValue": 30.0,
            "timeLabel": "March 2024",
            "detailLevel": "high",
            "boundaryCount": 1,
            "isPrediction": false
        })
    }

    #[test]
    fn test_map_data_deserializes_backend_payload() {
        let data: MapData = serde_json::from_value(sample_map_json()).unwrap();

        assert_eq!(data.features.len(), 1);
        assert_eq!(data.max_value, 30.0);
        assert_eq!(data.time_label, "March 2024");
        assert_eq!(data.boundary_count(), 1);
        assert_eq!(data.detail_level.as_deref(), Some("high"));
        assert_eq!(data.ward_boundaries.boundary_type(), BoundaryType::Lsoa);
        assert_eq!(
            data.features.features[0].properties.number("crime_count"),
            Some(7.0)
        );
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_null_boundaries_become_empty_collection() {
        let data: MapData = serde_json::from_value(json!({
            "features": {"type": "FeatureCollection", "features": []},
            "wardBoundaries": null,
            "maxValue": 40.0,
            "timeLabel": "February 2025 Predictions"
        }))
        .unwrap();

        assert!(data.ward_boundaries.is_empty());
        assert_eq!(data.boundary_count(), 0);
        assert_eq!(data.ward_boundaries.boundary_type(), BoundaryType::Ward);
    }

    #[test]
    fn test_negative_values_fail_validation() {
        let mut payload = sample_map_json();
        payload["features"]["features"][0]["properties"]["crime_count"] = json!(-3);
        let data: MapData = serde_json::from_value(payload).unwrap();
        assert!(data.validate().is_err());

        let row = DutySheetRow {
            lsoa_code: "E01000001".to_string(),
            ward_code: "E05009288".to_string(),
            ward_name: "Aldersgate".to_string(),
            hours_per_week: -1.0,
            tier: "Tier 1".to_string(),
            lsoa_name: "City of London 001A".to_string(),
        };
        assert!(row.validate().is_err());
    }

    #[test]
    fn test_properties_number_accepts_numeric_strings() {
        let props: FeatureProperties =
            serde_json::from_value(json!({"pred_per_km2": "3.25", "NAME": ""})).unwrap();
        assert_eq!(props.number("pred_per_km2"), Some(3.25));
        assert_eq!(props.text("NAME"), None);
        assert_eq!(props.value_for("missing"), 0.0);
    }

    #[test]
    fn test_tier_parse_and_display() {
        assert_eq!(Tier::parse("Tier 1"), Tier::Tier1);
        assert_eq!(Tier::parse("Tier 3"), Tier::Tier3);
        assert_eq!(Tier::parse("Tier 1 "), Tier::Other("Tier 1 ".to_string()));
        assert_eq!(Tier::parse("Tier 9"), Tier::Other("Tier 9".to_string()));
        assert_eq!(Tier::Tier2.to_string(), "Tier 2");
    }

    #[test]
    fn test_boundary_level_maps_to_detail() {
        assert_eq!(BoundaryLevel::Ward.detail(), DetailLevel::Low);
        assert_eq!(BoundaryLevel::Lsoa.detail(), DetailLevel::High);
        assert_eq!("lsoa".parse::<BoundaryLevel>().unwrap(), BoundaryLevel::Lsoa);
        assert!("borough".parse::<BoundaryLevel>().is_err());
    }

    #[test]
    fn test_endpoint_metadata() {
        assert_eq!(MapEndpoint::PastBurglaries.path(), "past-burglaries");
        assert_eq!(MapEndpoint::PredictedBurglaries.value_field(), "pred_per_km2");
        assert_eq!(MapEndpoint::PredictedBurglaries.fixed_period(), Some((2025, 2)));
        assert_eq!(MapEndpoint::PastBurglaries.fixed_period(), None);
        assert_eq!(
            "predicted".parse::<MapEndpoint>().unwrap(),
            MapEndpoint::PredictedBurglaries
        );
    }
}
