use crate::config::DashboardConfig;
use crate::core::cache::{CacheStats, DutySheetCache, MapCache};
use crate::core::duty_sheet::{DutySheetPanel, DutySheetState};
use crate::core::map_widget::{LoadState, MapWidget};
use crate::domain::filter::FilterStore;
use crate::domain::model::MapEndpoint;
use crate::domain::ports::{ConfigProvider, DashboardApi};
use std::sync::Arc;

/// 一次載入的結果摘要
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub past: LoadState,
    pub predicted: LoadState,
    pub duty_sheet_error: Option<String>,
}

impl LoadReport {
    pub fn has_errors(&self) -> bool {
        self.past.error_message().is_some()
            || self.predicted.error_message().is_some()
            || self.duty_sheet_error.is_some()
    }
}

/// 組裝共享快取、篩選狀態、兩個地圖元件與值班表
pub struct Dashboard {
    config: DashboardConfig,
    api: Arc<dyn DashboardApi>,
    filters: FilterStore,
    map_cache: MapCache,
    duty_cache: DutySheetCache,
    past: MapWidget,
    predicted: MapWidget,
    duty_sheet: DutySheetPanel,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, api: Arc<dyn DashboardApi>) -> Self {
        let filters = FilterStore::new(config.initial_filter);
        let map_cache = MapCache::new("maps");
        let duty_cache = DutySheetCache::new("duty-sheet");

        let past = MapWidget::mount(
            MapEndpoint::PastBurglaries,
            filters.subscribe(),
            map_cache.clone(),
            Arc::clone(&api),
        );
        let predicted = MapWidget::mount(
            MapEndpoint::PredictedBurglaries,
            filters.subscribe(),
            map_cache.clone(),
            Arc::clone(&api),
        );
        let duty_sheet =
            DutySheetPanel::new(duty_cache.clone(), Arc::clone(&api), config.rows_per_load());

        tracing::info!(
            "🧭 Dashboard ready ({} mode, api base {})",
            config.mode,
            config.api_base()
        );

        Self {
            config,
            api,
            filters,
            map_cache,
            duty_cache,
            past,
            predicted,
            duty_sheet,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn widget(&self, endpoint: MapEndpoint) -> &MapWidget {
        match endpoint {
            MapEndpoint::PastBurglaries => &self.past,
            MapEndpoint::PredictedBurglaries => &self.predicted,
        }
    }

    pub fn duty_sheet(&self) -> &DutySheetPanel {
        &self.duty_sheet
    }

    pub fn duty_sheet_mut(&mut self) -> &mut DutySheetPanel {
        &mut self.duty_sheet
    }

    pub fn map_cache(&self) -> &MapCache {
        &self.map_cache
    }

    pub fn map_cache_stats(&self) -> CacheStats {
        self.map_cache.stats()
    }

    /// 兩個地圖與值班表同時載入
    pub async fn load_all(&mut self) -> LoadReport {
        let started = std::time::Instant::now();
        let (past, predicted, duty) = tokio::join!(
            self.past.refresh(),
            self.predicted.refresh(),
            self.duty_sheet.load()
        );
        let duty_sheet_error = match duty {
            DutySheetState::Error(e) => Some(e.clone()),
            _ => None,
        };

        let report = LoadReport {
            past,
            predicted,
            duty_sheet_error,
        };
        if report.has_errors() {
            tracing::warn!("⚠️ Dashboard loaded with errors in {:?}", started.elapsed());
        } else {
            tracing::info!("✅ Dashboard loaded in {:?}", started.elapsed());
        }
        report
    }

    /// 只重新整理地圖（篩選變更後）
    pub async fn refresh_maps(&self) -> (LoadState, LoadState) {
        tokio::join!(self.past.refresh(), self.predicted.refresh())
    }

    /// 等待下一次篩選變更，然後兩張地圖一起重新整理。
    /// 兩個元件都訂閱同一個篩選來源，一次變更只觸發一次重新整理；來源關閉時回傳 `None`。
    pub async fn watch_filters(&mut self) -> Option<(LoadState, LoadState)> {
        let open = tokio::select! {
            open = self.past.filters_changed() => open,
            open = self.predicted.filters_changed() => open,
        };
        if !open {
            return None;
        }
        self.past.mark_filters_seen();
        self.predicted.mark_filters_seen();

        let selection = self.filters.current();
        tracing::info!(
            "🎛️ Filters changed to {} {}, refreshing maps",
            selection.level,
            selection.period_label()
        );
        Some(self.refresh_maps().await)
    }

    /// 重試按鈕：清掉所有快取與元件狀態後整個重新載入
    pub async fn reload(&mut self) -> LoadReport {
        tracing::info!("🔄 Reloading dashboard");
        self.map_cache.clear();
        self.duty_cache.clear();
        self.past.reset();
        self.predicted.reset();
        self.duty_sheet.reset();
        self.load_all().await
    }

    pub fn api(&self) -> &Arc<dyn DashboardApi> {
        &self.api
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.past.unmount();
        self.predicted.unmount();
    }
}
