use crate::core::cache::{CacheKey, CacheSource, MapCache};
use crate::domain::filter::{month_name, FilterSelection};
use crate::domain::model::{BoundaryType, MapData, MapEndpoint};
use crate::domain::ports::DashboardApi;
use crate::render::scale::{heat_color, legend, Legend};
use crate::render::tooltip::{boundary_tooltip, feature_tooltip, Tooltip, TooltipContext};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub const MAP_ERROR_MESSAGE: &str = "Failed to load detailed map";

/// 倫敦地圖的視窗設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    zoom: f64,
}

impl MapViewport {
    pub const CENTER: (f64, f64) = (51.5074, -0.1278);
    pub const MIN_ZOOM: f64 = 9.0;
    pub const MAX_ZOOM: f64 = 16.0;
    pub const DEFAULT_ZOOM: f64 = 10.0;
    /// 西南角與東北角
    pub const MAX_BOUNDS: ((f64, f64), (f64, f64)) = ((51.2, -0.7), (51.8, 0.3));
    pub const LSOA_BOUNDARY_MIN_ZOOM: f64 = 11.0;

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn with_zoom(zoom: f64) -> Self {
        Self {
            zoom: zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM),
        }
    }

    /// LSOA 邊界太密，放大到 11 級以上才畫；ward 邊界一律顯示
    pub fn shows_boundaries(&self, boundary_type: BoundaryType) -> bool {
        match boundary_type {
            BoundaryType::Ward => true,
            BoundaryType::Lsoa => self.zoom >= Self::LSOA_BOUNDARY_MIN_ZOOM,
        }
    }

    pub fn contains(lat: f64, lng: f64) -> bool {
        let ((south, west), (north, east)) = Self::MAX_BOUNDS;
        (south..=north).contains(&lat) && (west..=east).contains(&lng)
    }
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            zoom: Self::DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading { message: String },
    Loaded { message: String, from_cache: bool },
    Error { message: String, detail: String },
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoadState::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct WidgetState {
    load: LoadState,
    key: Option<CacheKey>,
    data: Option<Arc<MapData>>,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            load: LoadState::Idle,
            key: None,
            data: None,
        }
    }
}

/// 一個地圖元件。各自訂閱篩選條件，資料一律經由共享快取取得。
pub struct MapWidget {
    endpoint: MapEndpoint,
    filters: watch::Receiver<FilterSelection>,
    cache: MapCache,
    api: Arc<dyn DashboardApi>,
    mounted: Arc<AtomicBool>,
    /// 每次 refresh 或 reset 遞增；較舊的回應一律丟棄
    generation: Arc<AtomicU64>,
    state: Arc<Mutex<WidgetState>>,
}

impl MapWidget {
    pub fn mount(
        endpoint: MapEndpoint,
        filters: watch::Receiver<FilterSelection>,
        cache: MapCache,
        api: Arc<dyn DashboardApi>,
    ) -> Self {
        tracing::debug!("📌 Mounting {} widget", endpoint);
        Self {
            endpoint,
            filters,
            cache,
            api,
            mounted: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(WidgetState::default())),
        }
    }

    pub fn endpoint(&self) -> MapEndpoint {
        self.endpoint
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// 卸載後進行中的請求仍會完成並寫入快取，只是不再更新元件狀態
    pub fn unmount(&self) {
        if self.mounted.swap(false, Ordering::SeqCst) {
            tracing::debug!("📤 Unmounting {} widget", self.endpoint);
        }
    }

    pub fn state(&self) -> LoadState {
        self.state.lock().load.clone()
    }

    pub fn data(&self) -> Option<Arc<MapData>> {
        self.state.lock().data.clone()
    }

    pub fn current_key(&self) -> Option<CacheKey> {
        self.state.lock().key
    }

    pub fn selection(&self) -> FilterSelection {
        *self.filters.borrow()
    }

    /// 預測圖固定在 2025 年 2 月，過去資料跟隨篩選
    pub fn period(&self, selection: &FilterSelection) -> (i32, u32) {
        self.endpoint
            .fixed_period()
            .unwrap_or((selection.year, selection.month))
    }

    pub fn key_for(&self, selection: &FilterSelection) -> CacheKey {
        let (year, month) = self.period(selection);
        CacheKey::new(self.endpoint, selection.level.detail(), year, month)
    }

    /// 依目前的篩選重新取得資料
    pub async fn refresh(&self) -> LoadState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let selection = *self.filters.borrow();
        let key = self.key_for(&selection);
        let level = selection.level.as_str().to_lowercase();

        if !self.cache.contains(&key) {
            self.set_state(
                generation,
                LoadState::Loading {
                    message: format!(
                        "Loading {} boundaries for {} {}...",
                        level,
                        month_name(key.month),
                        key.year
                    ),
                },
                Some(key),
                None,
            );
        }

        let api = Arc::clone(&self.api);
        let result = self
            .cache
            .get_or_fetch(key, move || async move {
                api.fetch_map(key.endpoint, key.detail, key.year, key.month).await
            })
            .await;

        if !self.is_mounted() {
            tracing::debug!("💤 {} widget unmounted, dropping result for {}", self.endpoint, key);
            return self.state();
        }
        if self.key_for(&self.filters.borrow()) != key {
            tracing::debug!("⏭️ {} filter moved on, dropping result for {}", self.endpoint, key);
            return self.state();
        }

        match result {
            Ok(lookup) => {
                let from_cache = lookup.source != CacheSource::Fetched;
                let message = if from_cache {
                    format!("Detailed {} map loaded from cache!", level)
                } else {
                    format!("Detailed {} map loaded!", level)
                };
                self.set_state(
                    generation,
                    LoadState::Loaded {
                        message,
                        from_cache,
                    },
                    Some(key),
                    Some(lookup.value),
                );
            }
            Err(e) => {
                tracing::error!("❌ {} widget failed to load {}: {}", self.endpoint, key, e);
                self.set_state(
                    generation,
                    LoadState::Error {
                        message: MAP_ERROR_MESSAGE.to_string(),
                        detail: e.user_friendly_message(),
                    },
                    Some(key),
                    None,
                );
            }
        }
        self.state()
    }

    /// 等待下一次篩選變更；篩選來源關閉時回傳 false
    pub async fn filters_changed(&mut self) -> bool {
        let open = self.filters.changed().await.is_ok();
        self.filters.borrow_and_update();
        open
    }

    /// 標記目前的篩選值已處理
    pub fn mark_filters_seen(&mut self) {
        self.filters.borrow_and_update();
    }

    /// 等待下一次篩選變更再重新整理；篩選來源關閉時回傳 `None`
    pub async fn watch_filters(&mut self) -> Option<LoadState> {
        if !self.filters_changed().await {
            return None;
        }
        Some(self.refresh().await)
    }

    /// 重新載入時清空元件狀態，進行中的請求結果也不再套用
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = WidgetState::default();
    }

    fn set_state(
        &self,
        generation: u64,
        load: LoadState,
        key: Option<CacheKey>,
        data: Option<Arc<MapData>>,
    ) {
        if !self.is_mounted() {
            return;
        }
        let mut state = self.state.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("⏭️ {} widget dropping superseded result", self.endpoint);
            return;
        }
        state.load = load;
        state.key = key;
        state.data = data;
    }

    pub fn view(&self, viewport: &MapViewport) -> Option<MapView> {
        let state = self.state.lock();
        let data = state.data.as_ref()?;
        let key = state.key?;
        let from_cache = matches!(state.load, LoadState::Loaded { from_cache: true, .. });
        Some(MapView::build(self.endpoint, key, data, from_cache, viewport))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaView {
    pub code: String,
    pub value: f64,
    pub color: &'static str,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub endpoint: MapEndpoint,
    pub period_label: String,
    pub time_label: String,
    pub legend: Legend,
    pub boundary_type: BoundaryType,
    pub boundary_count: usize,
    pub boundaries_visible: bool,
    pub detail_level: String,
    pub data_source: Option<String>,
    /// "Loaded from cache" 標記
    pub cache_badge: Option<&'static str>,
    pub prediction_badge: Option<&'static str>,
    pub areas: Vec<AreaView>,
    pub boundaries: Vec<Tooltip>,
}

impl MapView {
    fn build(
        endpoint: MapEndpoint,
        key: CacheKey,
        data: &MapData,
        from_cache: bool,
        viewport: &MapViewport,
    ) -> Self {
        let period_label = format!("{} {}", month_name(key.month), key.year);
        let ctx = TooltipContext {
            is_prediction: endpoint.is_prediction(),
            period_label: &period_label,
            value_field: endpoint.value_field(),
        };

        let areas = data
            .features
            .features
            .iter()
            .map(|feature| {
                let props = &feature.properties;
                let value = props.value_for(endpoint.value_field());
                AreaView {
                    code: props
                        .text("area_code")
                        .or_else(|| props.text("LSOA21CD"))
                        .unwrap_or("Unknown")
                        .to_string(),
                    value,
                    color: heat_color(value, data.max_value),
                    tooltip: feature_tooltip(props, &ctx),
                }
            })
            .collect();

        let boundary_type = data.ward_boundaries.boundary_type();
        let boundaries_visible =
            !data.ward_boundaries.is_empty() && viewport.shows_boundaries(boundary_type);
        let boundaries = if boundaries_visible {
            data.ward_boundaries
                .features
                .iter()
                .map(|f| boundary_tooltip(&f.properties, &ctx))
                .collect()
        } else {
            Vec::new()
        };

        let prediction_badge = match endpoint.fixed_period() {
            Some((2025, 2)) => Some("February 2025 Predictions"),
            _ => None,
        };

        Self {
            endpoint,
            time_label: data.time_label.clone(),
            legend: legend(data.max_value, endpoint.legend_title(), boundary_type.label()),
            boundary_type,
            boundary_count: data.boundary_count(),
            boundaries_visible,
            detail_level: data
                .detail_level
                .clone()
                .unwrap_or_else(|| key.detail.to_string()),
            data_source: data.data_source.clone(),
            cache_badge: from_cache.then_some("Loaded from cache"),
            prediction_badge,
            areas,
            boundaries,
            period_label,
        }
    }
}
