// Adapters layer: concrete implementations for external systems (prediction backend, local files).

pub mod http;
pub mod storage;

pub use http::ApiClient;
pub use storage::LocalStorage;
