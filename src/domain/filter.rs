use crate::domain::model::BoundaryLevel;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::watch;

pub const FIRST_YEAR: i32 = 2010;
pub const LAST_YEAR: i32 = 2025;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[(month - 1) as usize],
        _ => "Unknown",
    }
}

/// 該年份可選的月份。2010 年只有 12 月的資料，2025 年只到 2 月。
pub fn month_range(year: i32) -> RangeInclusive<u32> {
    match year {
        FIRST_YEAR => 12..=12,
        LAST_YEAR => 1..=2,
        _ => 1..=12,
    }
}

pub fn year_range() -> RangeInclusive<i32> {
    FIRST_YEAR..=LAST_YEAR
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterSelection {
    pub level: BoundaryLevel,
    pub year: i32,
    pub month: u32,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            level: BoundaryLevel::Ward,
            year: 2024,
            month: 3,
        }
    }
}

impl FilterSelection {
    /// 建立時即套用年份與月份的限制
    pub fn new(level: BoundaryLevel, year: i32, month: u32) -> Self {
        let year = year.clamp(FIRST_YEAR, LAST_YEAR);
        let range = month_range(year);
        Self {
            level,
            year,
            month: month.clamp(*range.start(), *range.end()),
        }
    }

    pub fn with_level(self, level: BoundaryLevel) -> Self {
        Self { level, ..self }
    }

    /// 切換年份；月份若超出該年範圍則夾回範圍內
    pub fn with_year(self, year: i32) -> Self {
        let year = year.clamp(FIRST_YEAR, LAST_YEAR);
        let range = month_range(year);
        let month = self.month.clamp(*range.start(), *range.end());
        Self {
            year,
            month,
            ..self
        }
    }

    /// 切換月份；超出目前年份範圍的月份不接受
    pub fn with_month(self, month: u32) -> Option<Self> {
        if month_range(self.year).contains(&month) {
            Some(Self { month, ..self })
        } else {
            None
        }
    }

    pub fn period_label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }

    /// 只在特定年份顯示的提示
    pub fn month_hint(&self) -> Option<&'static str> {
        match self.year {
            FIRST_YEAR => Some("(Only Dec 2010 available)"),
            LAST_YEAR => Some("(Jan-Feb 2025 only)"),
            _ => None,
        }
    }
}

/// 篩選狀態的共享儲存。各個地圖元件各自訂閱，變更會廣播給所有訂閱者。
#[derive(Debug, Clone)]
pub struct FilterStore {
    sender: Arc<watch::Sender<FilterSelection>>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(FilterSelection::default())
    }
}

impl FilterStore {
    pub fn new(initial: FilterSelection) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> FilterSelection {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterSelection> {
        self.sender.subscribe()
    }

    pub fn set_level(&self, level: BoundaryLevel) -> FilterSelection {
        self.update(|s| Some(s.with_level(level)))
    }

    pub fn set_year(&self, year: i32) -> FilterSelection {
        self.update(|s| Some(s.with_year(year)))
    }

    /// 回傳 false 表示月份被拒絕（例如 2010 年選 12 月以外）
    pub fn set_month(&self, month: u32) -> bool {
        let before = self.current();
        let after = self.update(|s| s.with_month(month));
        if after == before && before.month != month {
            tracing::debug!(
                "🚫 Month {} rejected for year {} (allowed {:?})",
                month,
                before.year,
                month_range(before.year)
            );
            return false;
        }
        true
    }

    fn update(&self, change: impl FnOnce(FilterSelection) -> Option<FilterSelection>) -> FilterSelection {
        self.sender.send_if_modified(|current| match change(*current) {
            Some(next) if next != *current => {
                tracing::debug!(
                    "🎛️ Filter changed: {} {} -> {} {}",
                    current.level,
                    current.period_label(),
                    next.level,
                    next.period_label()
                );
                *current = next;
                true
            }
            _ => false,
        });
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selection() {
        let selection = FilterSelection::default();
        assert_eq!(selection.level, BoundaryLevel::Ward);
        assert_eq!(selection.year, 2024);
        assert_eq!(selection.month, 3);
        assert_eq!(selection.period_label(), "March 2024");
    }

    #[test]
    fn test_year_2025_clamps_month_to_february() {
        let selection = FilterSelection::default().with_month(6).unwrap();
        let moved = selection.with_year(2025);
        assert_eq!(moved.year, 2025);
        assert_eq!(moved.month, 2);

        let january = FilterSelection::default().with_month(1).unwrap().with_year(2025);
        assert_eq!(january.month, 1);
    }

    #[test]
    fn test_year_2010_forces_december() {
        let moved = FilterSelection::default().with_year(2010);
        assert_eq!(moved.month, 12);
        assert_eq!(moved.month_hint(), Some("(Only Dec 2010 available)"));
    }

    #[test]
    fn test_year_outside_range_is_clamped() {
        assert_eq!(FilterSelection::default().with_year(1999).year, FIRST_YEAR);
        assert_eq!(FilterSelection::default().with_year(2030).year, LAST_YEAR);
    }

    #[test]
    fn test_month_outside_year_range_is_rejected() {
        let in_2025 = FilterSelection::default().with_year(2025);
        assert!(in_2025.with_month(3).is_none());
        assert_eq!(in_2025.with_month(1).map(|s| s.month), Some(1));

        let in_2010 = FilterSelection::default().with_year(2010);
        assert!(in_2010.with_month(11).is_none());
        assert!(FilterSelection::default().with_month(13).is_none());
        assert!(FilterSelection::default().with_month(0).is_none());
    }

    #[test]
    fn test_new_applies_clamping() {
        let selection = FilterSelection::new(BoundaryLevel::Lsoa, 2025, 9);
        assert_eq!(selection, FilterSelection::new(BoundaryLevel::Lsoa, 2025, 2));
        assert_eq!(selection.month, 2);
        assert_eq!(FilterSelection::new(BoundaryLevel::Ward, 2010, 1).month, 12);
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "Unknown");
    }

    #[tokio::test]
    async fn test_store_broadcasts_to_every_subscriber() {
        let store = FilterStore::default();
        let mut past = store.subscribe();
        let mut predicted = store.subscribe();

        store.set_level(BoundaryLevel::Lsoa);

        past.changed().await.unwrap();
        predicted.changed().await.unwrap();
        assert_eq!(past.borrow_and_update().level, BoundaryLevel::Lsoa);
        assert_eq!(predicted.borrow_and_update().level, BoundaryLevel::Lsoa);
    }

    #[test]
    fn test_store_does_not_notify_on_identical_selection() {
        let store = FilterStore::default();
        let receiver = store.subscribe();

        store.set_year(2024);
        assert!(!receiver.has_changed().unwrap());

        store.set_year(2023);
        assert!(receiver.has_changed().unwrap());
    }

    #[test]
    fn test_store_rejects_invalid_month() {
        let store = FilterStore::default();
        store.set_year(2025);
        assert!(!store.set_month(5));
        assert_eq!(store.current().month, 2);
        assert!(store.set_month(1));
        assert_eq!(store.current().month, 1);
        // 與目前相同的月份仍視為接受
        assert!(store.set_month(1));
    }
}
