use crate::domain::model::{DetailLevel, DutySheetResponse, DutySheetRow, MapData, MapEndpoint};
use crate::domain::ports::{ConfigProvider, DashboardApi};
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// 預測服務的 HTTP 客戶端
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        // 保證結尾有斜線，join 時才不會吃掉最後一段路徑
        let normalized = if api_base.ends_with('/') {
            api_base.to_string()
        } else {
            format!("{}/", api_base)
        };
        let base = Url::parse(&normalized).map_err(|e| DashboardError::InvalidConfigValueError {
            field: "api.base".to_string(),
            value: api_base.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base, client })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base(),
            Duration::from_secs(config.timeout_seconds()),
        )
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `/api/<endpoint>?detail=<level>&year=<y>&month=<m>`
    pub fn map_url(&self, endpoint: MapEndpoint, detail: DetailLevel, year: i32, month: u32) -> Result<Url> {
        let mut url = self.api_url(endpoint.path())?;
        url.query_pairs_mut()
            .append_pair("detail", detail.as_str())
            .append_pair("year", &year.to_string())
            .append_pair("month", &month.to_string());
        Ok(url)
    }

    pub fn duty_sheet_url(&self) -> Result<Url> {
        self.api_url("duty-sheet")
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(&format!("api/{}", path))
            .map_err(|e| DashboardError::ConfigError {
                message: format!("Cannot build URL for '{}': {}", path, e),
            })
    }

    /// 非 2xx 時轉成錯誤；後端若回傳 `{"error": "..."}` 則一併帶出
    async fn check_status(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let reason = status.canonical_reason().unwrap_or("Unknown Status").to_string();
        let backend_message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string));

        let message = match backend_message {
            Some(detail) => format!("{}: {} ({})", context, reason, detail),
            None => format!("{}: {}", context, reason),
        };
        Err(DashboardError::HttpStatusError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn fetch_map(
        &self,
        endpoint: MapEndpoint,
        detail: DetailLevel,
        year: i32,
        month: u32,
    ) -> Result<MapData> {
        let url = self.map_url(endpoint, detail, year, month)?;
        tracing::debug!("Making API request to: {}", url);

        let started = std::time::Instant::now();
        let response = self.client.get(url).send().await?;
        tracing::debug!("API response status: {}", response.status());

        let response = Self::check_status(response, "Failed to fetch map data").await?;
        let data: MapData = response.json().await?;

        if let Err(e) = data.validate() {
            // 後端負責數值正確性，這裡只記錄
            tracing::warn!("⚠️ {} {}-{:02}: {}", endpoint, year, month, e);
        }

        tracing::info!(
            "🗺️ Loaded {} ({} detail, {}-{:02}): {} features, {} boundaries in {:?}",
            endpoint,
            detail,
            year,
            month,
            data.features.len(),
            data.boundary_count(),
            started.elapsed()
        );
        Ok(data)
    }

    async fn fetch_duty_sheet(&self) -> Result<Vec<DutySheetRow>> {
        let url = self.duty_sheet_url()?;
        tracing::debug!("Making API request to: {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response, "Failed to fetch duty sheet data").await?;
        let body: DutySheetResponse = response.json().await?;

        let invalid = body
            .duty_sheet
            .iter()
            .filter_map(|row| row.validate().err())
            .inspect(|e| tracing::warn!("⚠️ duty sheet: {}", e))
            .count();
        if invalid > 0 {
            tracing::warn!("⚠️ {} duty sheet rows failed validation", invalid);
        }

        tracing::info!("📋 Loaded duty sheet: {} rows", body.duty_sheet.len());
        Ok(body.duty_sheet)
    }
}
