#[cfg(feature = "cli")]
pub mod cli;
pub mod routing;
pub mod toml_config;

use crate::config::routing::{ApiRouting, RuntimeMode};
use crate::config::toml_config::{TomlConfig, DEFAULT_ROWS_PER_LOAD, DEFAULT_TIMEOUT_SECONDS};
use crate::domain::filter::FilterSelection;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_url, Validate};

/// 命令列可覆蓋的設定
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub mode: Option<RuntimeMode>,
    pub origin: Option<String>,
    pub dev_backend: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// 合併檔案、環境變數與命令列之後的最終設定
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub mode: RuntimeMode,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub rows_per_load: usize,
    pub initial_filter: FilterSelection,
}

impl DashboardConfig {
    pub fn resolve(file: &TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        file.validate()?;

        let base = match overrides.mode {
            Some(mode) => file.routing_for(mode),
            None => file.routing()?,
        };
        let routing = ApiRouting {
            mode: base.mode,
            origin: overrides.origin.clone().or(base.origin),
            dev_backend: overrides.dev_backend.clone().unwrap_or(base.dev_backend),
        };

        let config = Self {
            mode: routing.mode,
            api_base: routing.resolve()?,
            timeout_seconds: overrides
                .timeout_seconds
                .unwrap_or_else(|| file.timeout_seconds()),
            rows_per_load: file.rows_per_load(),
            initial_filter: file.initial_filter(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 直接指定後端位址（測試與工具程式用）
    pub fn for_base(api_base: impl Into<String>) -> Self {
        Self {
            mode: RuntimeMode::Development,
            api_base: api_base.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            rows_per_load: DEFAULT_ROWS_PER_LOAD,
            initial_filter: FilterSelection::default(),
        }
    }

    pub fn with_initial_filter(mut self, filter: FilterSelection) -> Self {
        self.initial_filter = filter;
        self
    }
}

impl Validate for DashboardConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base", &self.api_base)?;
        validate_positive_number("api.timeout_seconds", self.timeout_seconds as usize, 1)?;
        validate_positive_number("duty_sheet.rows_per_load", self.rows_per_load, 1)
    }
}

impl ConfigProvider for DashboardConfig {
    fn api_base(&self) -> &str {
        &self.api_base
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn rows_per_load(&self) -> usize {
        self.rows_per_load
    }
}
