use anyhow::Context;
use burglary_dashboard::adapters::ApiClient;
use burglary_dashboard::config::routing::DEFAULT_DEV_BACKEND;
use burglary_dashboard::core::cache::{CacheKey, MapCache};
use burglary_dashboard::domain::filter::FilterSelection;
use burglary_dashboard::domain::model::{BoundaryLevel, MapEndpoint};
use burglary_dashboard::domain::ports::DashboardApi;
use burglary_dashboard::utils::logger;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 對後端打一輪請求：每個端點、兩種細節等級各一次，並用同一個鍵併發 4 次確認只發出一個請求。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_cli_logger(false);

    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DEV_BACKEND.to_string());
    println!("🚀 Probing prediction service at {}", base);

    let client = ApiClient::new(&base, Duration::from_secs(30))
        .with_context(|| format!("invalid backend address: {}", base))?;
    let api: Arc<dyn DashboardApi> = Arc::new(client);
    let cache = MapCache::new("probe");
    let selection = FilterSelection::default();

    for endpoint in MapEndpoint::ALL {
        for level in [BoundaryLevel::Ward, BoundaryLevel::Lsoa] {
            let (year, month) = endpoint
                .fixed_period()
                .unwrap_or((selection.year, selection.month));
            let key = CacheKey::new(endpoint, level.detail(), year, month);

            let started = Instant::now();
            let lookups = join_all((0..4).map(|_| {
                let api = Arc::clone(&api);
                cache.get_or_fetch(key, move || async move {
                    api.fetch_map(key.endpoint, key.detail, key.year, key.month)
                        .await
                })
            }))
            .await;

            match lookups.into_iter().collect::<Result<Vec<_>, _>>() {
                Ok(results) => {
                    let first = &results[0].value;
                    let shared = results.iter().all(|r| Arc::ptr_eq(&r.value, first));
                    println!(
                        "  ✅ {} {} features, {} boundaries, shared={} ({:?})",
                        key,
                        first.features.len(),
                        first.boundary_count(),
                        shared,
                        started.elapsed()
                    );
                }
                Err(e) => println!("  ❌ {}: {}", key, e.user_friendly_message()),
            }
        }
    }

    match api.fetch_duty_sheet().await {
        Ok(rows) => println!("  ✅ duty-sheet {} rows", rows.len()),
        Err(e) => println!("  ❌ duty-sheet: {}", e.user_friendly_message()),
    }

    let stats = cache.stats();
    println!(
        "📊 cache: {} entries, {} misses, {} coalesced, {} hits",
        stats.entries, stats.misses, stats.coalesced, stats.hits
    );
    Ok(())
}
