use burglary_dashboard::adapters::{ApiClient, LocalStorage};
use burglary_dashboard::config::cli::{CliConfig, Command, FilterArgs};
use burglary_dashboard::config::DashboardConfig;
use burglary_dashboard::core::{Dashboard, MapViewport};
use burglary_dashboard::domain::model::MapEndpoint;
use burglary_dashboard::domain::ports::DashboardApi;
use burglary_dashboard::render::{reports, text};
use burglary_dashboard::utils::error::{ErrorSeverity, Result};
use burglary_dashboard::utils::{logger, validation::Validate};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting burglary-dashboard CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(cli).await {
        Ok(output) => print!("{}", output),
        Err(e) => {
            tracing::error!(
                "❌ Dashboard command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

async fn run(cli: CliConfig) -> Result<String> {
    cli.validate()?;
    let config = cli.load()?;

    match cli.command {
        // 指標與配置摘要不需要後端
        Command::Metrics => Ok(format!(
            "{}\n{}",
            text::render_metrics(&reports::prediction_metrics()),
            text::render_allocation(&reports::allocation_summary())
        )),
        Command::Overview(filters) => {
            let api = api_for(&config)?;
            overview(config, api, &filters).await
        }
        Command::Map {
            endpoint,
            filters,
            zoom,
            top,
        } => {
            let api = api_for(&config)?;
            map(config, api, endpoint, &filters, zoom, top).await
        }
        Command::DutySheet {
            search,
            pages,
            export_csv,
            print_to,
            output_path,
        } => {
            let api = api_for(&config)?;
            let mut dashboard = Dashboard::new(config, api);
            let state = dashboard.duty_sheet_mut().load().await;
            if let Some(message) = state.message() {
                return Ok(format!("{}\n", message));
            }

            let Some(table) = dashboard.duty_sheet_mut().table_mut() else {
                return Ok(String::new());
            };
            table.set_search(search);
            for _ in 0..pages {
                if !table.load_more() {
                    break;
                }
            }

            let storage = LocalStorage::new(output_path);
            let now = chrono::Utc::now();
            if let Some(path) = export_csv {
                table.export_csv(&storage, &path, now).await?;
                eprintln!("📁 CSV saved to: {}", storage.full_path(&path));
            }
            if let Some(path) = print_to {
                table.print_to(&storage, &path, now).await?;
                eprintln!("🖨️ Sheet saved to: {}", storage.full_path(&path));
            }
            Ok(text::render_duty_sheet(table))
        }
        Command::Report { kind } => {
            let mut output = text::render_popout(&reports::popout(kind));
            if kind.embeds_duty_sheet() {
                let api = api_for(&config)?;
                let mut dashboard = Dashboard::new(config, api);
                let state = dashboard.duty_sheet_mut().load().await;
                output.push('\n');
                output.push_str(&text::render_duty_state(state));
            }
            Ok(output)
        }
    }
}

fn api_for(config: &DashboardConfig) -> Result<Arc<dyn DashboardApi>> {
    Ok(Arc::new(ApiClient::from_config(config)?))
}

fn with_filters(config: DashboardConfig, filters: &FilterArgs) -> DashboardConfig {
    let (selection, accepted) = filters.apply(config.initial_filter);
    if !accepted {
        tracing::warn!(
            "⚠️ Month {:?} is not available for {}, keeping {}",
            filters.month,
            selection.year,
            selection.period_label()
        );
    }
    config.with_initial_filter(selection)
}

async fn overview(
    config: DashboardConfig,
    api: Arc<dyn DashboardApi>,
    filters: &FilterArgs,
) -> Result<String> {
    let mut dashboard = Dashboard::new(with_filters(config, filters), api);
    let report = dashboard.load_all().await;
    let viewport = MapViewport::default();

    let mut output = text::render_filters(&dashboard.filters().current());
    for endpoint in MapEndpoint::ALL {
        output.push('\n');
        let widget = dashboard.widget(endpoint);
        match widget.view(&viewport) {
            Some(view) => output.push_str(&text::render_map(&view, 5)),
            None => output.push_str(&text::render_load_state(endpoint.legend_title(), &widget.state())),
        }
    }

    output.push('\n');
    output.push_str(&text::render_metrics(&reports::prediction_metrics()));
    output.push('\n');
    let popouts: Vec<_> = reports::ReportKind::ALL.into_iter().map(reports::popout).collect();
    output.push_str(&text::render_popout_previews(&popouts));
    output.push('\n');
    output.push_str(&text::render_duty_state(dashboard.duty_sheet().state()));

    let stats = dashboard.map_cache_stats();
    tracing::info!(
        "📊 Map cache: {} entries, {} misses, {} coalesced, {} hits",
        stats.entries,
        stats.misses,
        stats.coalesced,
        stats.hits
    );

    if report.has_errors() {
        tracing::warn!("⚠️ Some panels failed to load; run the command again to reload everything");
    }
    Ok(output)
}

async fn map(
    config: DashboardConfig,
    api: Arc<dyn DashboardApi>,
    endpoint: MapEndpoint,
    filters: &FilterArgs,
    zoom: f64,
    top: usize,
) -> Result<String> {
    let dashboard = Dashboard::new(with_filters(config, filters), api);
    let widget = dashboard.widget(endpoint);
    let state = widget.refresh().await;

    let mut output = text::render_filters(&dashboard.filters().current());
    output.push('\n');
    match widget.view(&MapViewport::with_zoom(zoom)) {
        Some(view) => output.push_str(&text::render_map(&view, top)),
        None => output.push_str(&text::render_load_state(endpoint.legend_title(), &state)),
    }
    Ok(output)
}
