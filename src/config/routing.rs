use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::validate_url;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DEV_BACKEND: &str = "http://localhost:5000";
pub const MODE_ENV_VAR: &str = "DASHBOARD_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// 讀取 `DASHBOARD_ENV`
    pub fn from_env() -> Result<Self> {
        Self::from_env_value(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    /// 未設定或空字串時視為開發環境；無法辨識的值與命令列 `--mode` 一樣回報錯誤
    pub fn from_env_value(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(RuntimeMode::default()),
            Some(raw) => raw.parse().map_err(|_| {
                tracing::warn!("⚠️ Unrecognised {}={}", MODE_ENV_VAR, raw);
                DashboardError::InvalidConfigValueError {
                    field: MODE_ENV_VAR.to_string(),
                    value: raw.to_string(),
                    reason: "Valid modes: development, production".to_string(),
                }
            }),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMode::Development => f.write_str("development"),
            RuntimeMode::Production => f.write_str("production"),
        }
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeMode::Development),
            "production" | "prod" => Ok(RuntimeMode::Production),
            other => Err(DashboardError::InvalidConfigValueError {
                field: "api.mode".to_string(),
                value: other.to_string(),
                reason: "Valid modes: development, production".to_string(),
            }),
        }
    }
}

/// 依環境決定 `/api` 請求送往哪裡：開發時代理到本機後端，正式環境走同源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRouting {
    pub mode: RuntimeMode,
    pub origin: Option<String>,
    pub dev_backend: String,
}

impl Default for ApiRouting {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Development,
            origin: None,
            dev_backend: DEFAULT_DEV_BACKEND.to_string(),
        }
    }
}

impl ApiRouting {
    pub fn resolve(&self) -> Result<String> {
        let base = match self.mode {
            RuntimeMode::Development => self.dev_backend.clone(),
            RuntimeMode::Production => {
                self.origin
                    .clone()
                    .ok_or_else(|| DashboardError::ConfigValidationError {
                        field: "api.origin".to_string(),
                        message: "production mode serves /api from the dashboard origin, so an origin is required"
                            .to_string(),
                    })?
            }
        };
        let field = match self.mode {
            RuntimeMode::Development => "api.dev_backend",
            RuntimeMode::Production => "api.origin",
        };
        validate_url(field, &base)?;

        tracing::debug!("🔀 {} mode: routing /api to {}", self.mode, base);
        Ok(base.trim_end_matches('/').to_string())
    }
}
