use crate::core::cache::{DutySheetCache, DutySheetKey};
use crate::domain::model::{DutySheetRow, Tier};
use crate::domain::ports::{DashboardApi, Storage};
use crate::render::scale::{tier_color, BadgeColor};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;

pub const ROWS_PER_LOAD: usize = 20;

/// 同一個 ward 底下的所有 LSOA
#[derive(Debug, Clone, PartialEq)]
pub struct WardGroup {
    pub ward_name: String,
    pub rows: Vec<DutySheetRow>,
}

impl WardGroup {
    pub fn tier1_count(&self) -> usize {
        self.rows.iter().filter(|r| r.tier() == Tier::Tier1).count()
    }
}

/// 值班表：搜尋、排序、依 ward 分組後分頁顯示
#[derive(Debug, Clone)]
pub struct DutySheetTable {
    rows: Arc<Vec<DutySheetRow>>,
    search: String,
    page_size: usize,
    visible_wards: usize,
}

impl DutySheetTable {
    pub fn new(rows: Arc<Vec<DutySheetRow>>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            rows,
            search: String::new(),
            page_size,
            visible_wards: page_size,
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// 變更搜尋字串會把分頁重設回第一頁
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.visible_wards = self.page_size;
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn matches(&self, row: &DutySheetRow) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        [&row.ward_name, &row.lsoa_code, &row.ward_code]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// 符合搜尋條件的 ward 分組，Tier 1 數量多的在前
    pub fn groups(&self) -> Vec<WardGroup> {
        let mut rows: Vec<&DutySheetRow> = self.rows.iter().filter(|r| self.matches(r)).collect();
        rows.sort_by(|a, b| {
            compare_text(&a.ward_name, &b.ward_name)
                .then_with(|| compare_text(&a.lsoa_code, &b.lsoa_code))
        });

        let mut groups: Vec<WardGroup> = Vec::new();
        for row in rows {
            match groups.last_mut() {
                Some(group) if group.ward_name == row.ward_name => group.rows.push(row.clone()),
                _ => groups.push(WardGroup {
                    ward_name: row.ward_name.clone(),
                    rows: vec![row.clone()],
                }),
            }
        }

        // sort_by 是穩定排序，同數量時保留字母順序
        groups.sort_by(|a, b| b.tier1_count().cmp(&a.tier1_count()));
        groups
    }

    pub fn ward_count(&self) -> usize {
        self.groups().len()
    }

    pub fn visible_groups(&self) -> Vec<WardGroup> {
        let mut groups = self.groups();
        groups.truncate(self.visible_wards);
        groups
    }

    pub fn visible_ward_count(&self) -> usize {
        self.visible_wards.min(self.ward_count())
    }

    pub fn has_more(&self) -> bool {
        self.visible_wards < self.ward_count()
    }

    /// 載入下一頁；已經全部顯示時回傳 false
    pub fn load_more(&mut self) -> bool {
        let total = self.ward_count();
        if self.visible_wards >= total {
            return false;
        }
        self.visible_wards = (self.visible_wards + self.page_size).min(total);
        tracing::debug!("📜 Duty sheet showing {} of {} wards", self.visible_wards, total);
        true
    }

    pub fn summary(&self) -> String {
        format!(
            "Showing {} of {} wards",
            self.visible_ward_count(),
            self.ward_count()
        )
    }

    /// 目前搜尋結果的純文字列印版（全部 ward，不分頁）
    pub fn to_plain_text(&self, generated_at: DateTime<Utc>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Patrol Allocations for {}", generated_at.format("%d/%m/%Y"));
        let _ = writeln!(out, "Generated at {}", generated_at.to_rfc3339());
        if !self.search.is_empty() {
            let _ = writeln!(out, "Filter: \"{}\"", self.search);
        }

        for group in self.groups() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Ward name: {}", group.ward_name);
            for row in &group.rows {
                let _ = writeln!(
                    out,
                    "  {:<10} {:<10} {:<32} {:>8} {}",
                    row.ward_code,
                    row.lsoa_code,
                    row.lsoa_name,
                    format_hours(row.hours_per_week),
                    row.tier
                );
            }
        }
        out
    }

    /// CSV 匯出；第一欄為產生時間
    pub fn to_csv(&self, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "generated_at",
            "ward_name",
            "ward_code",
            "lsoa_code",
            "lsoa_name",
            "hours_per_week",
            "tier",
        ])?;

        let stamp = generated_at.to_rfc3339();
        for group in self.groups() {
            for row in &group.rows {
                writer.write_record([
                    stamp.as_str(),
                    row.ward_name.as_str(),
                    row.ward_code.as_str(),
                    row.lsoa_code.as_str(),
                    row.lsoa_name.as_str(),
                    format_hours(row.hours_per_week).as_str(),
                    row.tier.as_str(),
                ])?;
            }
        }

        writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }

    pub async fn export_csv<S: Storage>(
        &self,
        storage: &S,
        path: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<usize> {
        let data = self.to_csv(generated_at)?;
        storage.write_file(path, &data).await?;
        tracing::info!("💾 Duty sheet exported to {} ({} bytes)", path, data.len());
        Ok(data.len())
    }

    pub async fn print_to<S: Storage>(
        &self,
        storage: &S,
        path: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<usize> {
        let text = self.to_plain_text(generated_at);
        storage.write_file(path, text.as_bytes()).await?;
        tracing::info!("🖨️ Duty sheet printed to {}", path);
        Ok(text.len())
    }
}

/// 不分大小寫比較，相同時再比原字串，排序才會穩定
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub fn format_hours(hours: f64) -> String {
    format!("{:.2}", hours)
}

pub fn tier_badge(row: &DutySheetRow) -> BadgeColor {
    tier_color(&row.tier)
}

#[derive(Debug, Clone)]
pub enum DutySheetState {
    Loading,
    Error(String),
    Ready(DutySheetTable),
}

impl DutySheetState {
    pub fn message(&self) -> Option<String> {
        match self {
            DutySheetState::Loading => Some("Loading duty sheet data...".to_string()),
            DutySheetState::Error(e) => Some(format!("Error: {}", e)),
            DutySheetState::Ready(_) => None,
        }
    }
}

/// 值班表面板。資料來自共享快取，多個面板只會發出一次請求。
pub struct DutySheetPanel {
    cache: DutySheetCache,
    api: Arc<dyn DashboardApi>,
    page_size: usize,
    state: DutySheetState,
    /// reset 之後仍保留的搜尋字串
    search: String,
}

impl DutySheetPanel {
    pub fn new(cache: DutySheetCache, api: Arc<dyn DashboardApi>, page_size: usize) -> Self {
        Self {
            cache,
            api,
            page_size,
            state: DutySheetState::Loading,
            search: String::new(),
        }
    }

    pub fn state(&self) -> &DutySheetState {
        &self.state
    }

    pub fn table(&self) -> Option<&DutySheetTable> {
        match &self.state {
            DutySheetState::Ready(table) => Some(table),
            _ => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut DutySheetTable> {
        match &mut self.state {
            DutySheetState::Ready(table) => Some(table),
            _ => None,
        }
    }

    pub async fn load(&mut self) -> &DutySheetState {
        let api = Arc::clone(&self.api);
        let result = self
            .cache
            .get_or_fetch(DutySheetKey, move || async move { api.fetch_duty_sheet().await })
            .await;

        self.remember_search();
        self.state = match result {
            Ok(lookup) => {
                let mut table = DutySheetTable::new(lookup.value, self.page_size);
                if !self.search.is_empty() {
                    table.set_search(self.search.clone());
                }
                DutySheetState::Ready(table)
            }
            Err(e) => {
                tracing::error!("❌ Duty sheet failed to load: {}", e);
                DutySheetState::Error(e.user_friendly_message())
            }
        };
        &self.state
    }

    pub fn reset(&mut self) {
        self.remember_search();
        self.state = DutySheetState::Loading;
    }

    fn remember_search(&mut self) {
        if let Some(search) = self.table().map(|t| t.search().to_string()) {
            self.search = search;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::domain::model::{DetailLevel, MapData, MapEndpoint};
    use crate::utils::error::DashboardError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tempfile::TempDir;

    fn row(ward: &str, lsoa: &str, tier: &str, hours: f64) -> DutySheetRow {
        DutySheetRow {
            lsoa_code: lsoa.to_string(),
            ward_code: format!("E05{}", &lsoa[3..]),
            ward_name: ward.to_string(),
            hours_per_week: hours,
            tier: tier.to_string(),
            lsoa_name: format!("{} {}", ward, lsoa),
        }
    }

    fn sample() -> Arc<Vec<DutySheetRow>> {
        Arc::new(vec![
            row("Camden Town", "E01000003", "Tier 2", 6.0),
            row("Aldersgate", "E01000002", "Tier 3", 2.5),
            row("Brixton", "E01000005", "Tier 1", 10.0),
            row("Brixton", "E01000004", "Tier 1", 12.333),
            row("Aldersgate", "E01000001", "Tier 1", 8.0),
            row("Stratford", "E01000006", "Tier 2", 4.0),
        ])
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_groups_are_ordered_by_tier1_count_then_name() {
        let table = DutySheetTable::new(sample(), ROWS_PER_LOAD);
        let groups = table.groups();
        let names: Vec<&str> = groups.iter().map(|g| g.ward_name.as_str()).collect();

        assert_eq!(names, vec!["Brixton", "Aldersgate", "Camden Town", "Stratford"]);
        // ward 內依 LSOA 代碼排序
        assert_eq!(groups[0].rows[0].lsoa_code, "E01000004");
        assert_eq!(groups[1].rows[0].lsoa_code, "E01000001");
        assert_eq!(groups[0].tier1_count(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let mut table = DutySheetTable::new(sample(), ROWS_PER_LOAD);

        table.set_search("BRIX");
        assert_eq!(table.ward_count(), 1);

        table.set_search("e01000006");
        assert_eq!(table.groups()[0].ward_name, "Stratford");

        table.set_search("E0500000");
        assert_eq!(table.ward_count(), 4);

        table.set_search("nowhere");
        assert_eq!(table.summary(), "Showing 0 of 0 wards");
    }

    #[test]
    fn test_paging_by_wards() {
        let mut table = DutySheetTable::new(sample(), 2);
        assert_eq!(table.summary(), "Showing 2 of 4 wards");
        assert!(table.has_more());

        assert!(table.load_more());
        assert_eq!(table.summary(), "Showing 4 of 4 wards");
        assert!(!table.load_more());
        assert_eq!(table.visible_groups().len(), 4);
    }

    #[test]
    fn test_search_resets_paging() {
        let mut table = DutySheetTable::new(sample(), 1);
        table.load_more();
        table.load_more();
        assert_eq!(table.visible_ward_count(), 3);

        table.set_search("e01");
        assert_eq!(table.visible_ward_count(), 1);
    }

    #[test]
    fn test_hours_and_badges() {
        assert_eq!(format_hours(12.333), "12.33");
        assert_eq!(format_hours(2.5), "2.50");
        let rows = sample();
        assert_eq!(tier_badge(&rows[2]), BadgeColor::Red);
        assert_eq!(tier_badge(&rows[0]), BadgeColor::Yellow);
        assert_eq!(tier_badge(&rows[1]), BadgeColor::Green);
    }

    #[test]
    fn test_plain_text_sheet() {
        let table = DutySheetTable::new(sample(), ROWS_PER_LOAD);
        let text = table.to_plain_text(fixed_time());

        assert!(text.starts_with("Patrol Allocations for 01/02/2025\n"));
        assert!(text.contains("Ward name: Brixton"));
        assert!(text.contains("12.33"));
        let brixton = text.find("Ward name: Brixton").unwrap();
        let stratford = text.find("Ward name: Stratford").unwrap();
        assert!(brixton < stratford);
    }

    #[tokio::test]
    async fn test_csv_export_through_storage() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());
        let mut table = DutySheetTable::new(sample(), ROWS_PER_LOAD);
        table.set_search("aldersgate");

        table
            .export_csv(&storage, "exports/duty.csv", fixed_time())
            .await
            .unwrap();

        let data = storage.read_file("exports/duty.csv").await.unwrap();
        let mut reader = csv::Reader::from_reader(data.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[1], "ward_name");

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "2025-02-01T08:30:00+00:00");
        assert_eq!(&records[0][3], "E01000001");
        assert_eq!(&records[0][5], "8.00");
    }

    struct RowsApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DashboardApi for RowsApi {
        async fn fetch_map(
            &self,
            _endpoint: MapEndpoint,
            _detail: DetailLevel,
            _year: i32,
            _month: u32,
        ) -> Result<MapData> {
            Err(DashboardError::ValidationError {
                message: "maps are not served here".to_string(),
            })
        }

        async fn fetch_duty_sheet(&self) -> Result<Vec<DutySheetRow>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok((*sample()).clone())
        }
    }

    #[tokio::test]
    async fn test_search_survives_reset_and_reload() {
        let cache = DutySheetCache::new("duty-sheet");
        let api = Arc::new(RowsApi {
            calls: AtomicUsize::new(0),
        });
        let mut panel = DutySheetPanel::new(cache.clone(), api.clone(), ROWS_PER_LOAD);

        panel.load().await;
        panel.table_mut().unwrap().set_search("brixton");

        // 與整頁重新載入相同的順序
        cache.clear();
        panel.reset();
        assert!(panel.table().is_none());
        panel.load().await;

        let table = panel.table().unwrap();
        assert_eq!(table.search(), "brixton");
        assert_eq!(table.ward_count(), 1);
        assert_eq!(api.calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn test_state_messages() {
        assert_eq!(
            DutySheetState::Loading.message().as_deref(),
            Some("Loading duty sheet data...")
        );
        assert_eq!(
            DutySheetState::Error("Failed to fetch duty sheet data: Not Found".to_string())
                .message()
                .as_deref(),
            Some("Error: Failed to fetch duty sheet data: Not Found")
        );
    }
}
