use crate::domain::model::{DetailLevel, DutySheetRow, MapData, MapEndpoint};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 外部預測服務。模型、公平性分析與巡邏時數分配都在服務端計算，儀表板只負責取回結果。
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_map(
        &self,
        endpoint: MapEndpoint,
        detail: DetailLevel,
        year: i32,
        month: u32,
    ) -> Result<MapData>;

    async fn fetch_duty_sheet(&self) -> Result<Vec<DutySheetRow>>;
}

pub trait ConfigProvider: Send + Sync {
    /// `/api/...` 請求的基底位址（已依環境解析）
    fn api_base(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn rows_per_load(&self) -> usize;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
