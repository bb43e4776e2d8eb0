pub mod cache;
pub mod dashboard;
pub mod duty_sheet;
pub mod map_widget;

pub use cache::{CacheKey, CacheSource, DutySheetCache, MapCache, RequestCache};
pub use dashboard::{Dashboard, LoadReport};
pub use duty_sheet::{DutySheetPanel, DutySheetTable, ROWS_PER_LOAD};
pub use map_widget::{LoadState, MapView, MapViewport, MapWidget, MAP_ERROR_MESSAGE};
