pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod render;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{ApiClient, LocalStorage};
pub use config::DashboardConfig;
pub use core::{Dashboard, MapCache, MapWidget};
pub use domain::filter::{FilterSelection, FilterStore};
pub use utils::error::{DashboardError, Result};
