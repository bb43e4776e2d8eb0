use crate::config::routing::{ApiRouting, RuntimeMode, DEFAULT_DEV_BACKEND};
use crate::domain::filter::{FilterSelection, FIRST_YEAR, LAST_YEAR};
use crate::domain::model::BoundaryLevel;
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::{validate_positive_number, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_ROWS_PER_LOAD: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub duty_sheet: DutySheetConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub mode: Option<RuntimeMode>,
    pub origin: Option<String>,
    pub dev_backend: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersConfig {
    pub level: Option<BoundaryLevel>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DutySheetConfig {
    pub rows_per_load: Option<usize>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DashboardError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DASHBOARD_ORIGIN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DashboardError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 沒指定模式時看 `DASHBOARD_ENV`
    pub fn mode(&self) -> Result<RuntimeMode> {
        match self.api.mode {
            Some(mode) => Ok(mode),
            None => RuntimeMode::from_env(),
        }
    }

    pub fn routing(&self) -> Result<ApiRouting> {
        Ok(self.routing_for(self.mode()?))
    }

    /// 模式已由命令列決定時使用，不再讀環境變數
    pub fn routing_for(&self, mode: RuntimeMode) -> ApiRouting {
        ApiRouting {
            mode,
            origin: self.api.origin.clone(),
            dev_backend: self
                .api
                .dev_backend
                .clone()
                .unwrap_or_else(|| DEFAULT_DEV_BACKEND.to_string()),
        }
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn rows_per_load(&self) -> usize {
        self.duty_sheet.rows_per_load.unwrap_or(DEFAULT_ROWS_PER_LOAD)
    }

    /// 初始篩選條件；年月超出可用範圍時會被夾回
    pub fn initial_filter(&self) -> FilterSelection {
        let defaults = FilterSelection::default();
        FilterSelection::new(
            self.filters.level.unwrap_or(defaults.level),
            self.filters.year.unwrap_or(defaults.year),
            self.filters.month.unwrap_or(defaults.month),
        )
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(origin) = &self.api.origin {
            validate_url("api.origin", origin)?;
        }
        if let Some(dev_backend) = &self.api.dev_backend {
            validate_url("api.dev_backend", dev_backend)?;
        }
        if let Some(timeout) = self.api.timeout_seconds {
            validate_positive_number("api.timeout_seconds", timeout as usize, 1)?;
        }
        if let Some(year) = self.filters.year {
            validate_range("filters.year", year, FIRST_YEAR, LAST_YEAR)?;
        }
        if let Some(month) = self.filters.month {
            validate_range("filters.month", month, 1, 12)?;
        }
        if let Some(rows) = self.duty_sheet.rows_per_load {
            validate_positive_number("duty_sheet.rows_per_load", rows, 1)?;
        }
        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[api]
mode = "production"
origin = "https://dashboard.example.org"
timeout_seconds = 10

[filters]
level = "LSOA"
year = 2023
month = 7

[duty_sheet]
rows_per_load = 25
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.api.mode, Some(RuntimeMode::Production));
        assert_eq!(config.timeout_seconds(), 10);
        assert_eq!(config.rows_per_load(), 25);
        assert_eq!(
            config.initial_filter(),
            FilterSelection::new(BoundaryLevel::Lsoa, 2023, 7)
        );
        assert_eq!(
            config.routing().unwrap().resolve().unwrap(),
            "https://dashboard.example.org"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.rows_per_load(), DEFAULT_ROWS_PER_LOAD);
        assert_eq!(config.initial_filter(), FilterSelection::default());
    }

    #[test]
    fn test_initial_filter_clamps_unavailable_month() {
        let config = TomlConfig::from_toml_str("[filters]\nyear = 2025\nmonth = 6\n").unwrap();
        assert_eq!(config.initial_filter().month, 2);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_DASHBOARD_BACKEND", "http://127.0.0.1:5001");

        let toml_content = r#"
[api]
mode = "development"
dev_backend = "${TEST_DASHBOARD_BACKEND}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.api.dev_backend.as_deref(),
            Some("http://127.0.0.1:5001")
        );

        std::env::remove_var("TEST_DASHBOARD_BACKEND");
    }

    #[test]
    fn test_config_validation() {
        let bad_origin = TomlConfig::from_toml_str("[api]\norigin = \"invalid-url\"\n").unwrap();
        assert!(bad_origin.validate().is_err());

        let bad_year = TomlConfig::from_toml_str("[filters]\nyear = 2031\n").unwrap();
        assert!(bad_year.validate().is_err());

        let bad_rows = TomlConfig::from_toml_str("[duty_sheet]\nrows_per_load = 0\n").unwrap();
        assert!(bad_rows.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nmode = \"development\"\ntimeout_seconds = 5").unwrap();

        let config = TomlConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timeout_seconds(), 5);
        assert_eq!(config.routing().unwrap().mode, RuntimeMode::Development);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[api\nmode = ").unwrap_err();
        assert!(err.to_string().contains("toml_parsing"));
    }
}
