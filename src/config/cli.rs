use crate::config::routing::RuntimeMode;
use crate::config::toml_config::TomlConfig;
use crate::config::{ConfigOverrides, DashboardConfig};
use crate::domain::filter::FilterSelection;
use crate::domain::model::{BoundaryLevel, MapEndpoint};
use crate::render::reports::ReportKind;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "burglary-dashboard")]
#[command(about = "Terminal client for the burglary prediction dashboard")]
pub struct CliConfig {
    /// TOML 設定檔
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true, env = "DASHBOARD_ENV")]
    pub mode: Option<RuntimeMode>,

    /// 正式環境的同源位址
    #[arg(long, global = true, env = "DASHBOARD_ORIGIN")]
    pub origin: Option<String>,

    #[arg(long, global = true)]
    pub dev_backend: Option<String>,

    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 篩選、兩張地圖、指標與報告預覽
    Overview(FilterArgs),
    /// 單一地圖的圖例與區域
    Map {
        endpoint: MapEndpoint,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10.0)]
        zoom: f64,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// 值班表
    DutySheet {
        #[arg(long, default_value = "")]
        search: String,
        /// 額外載入的頁數
        #[arg(long, default_value_t = 0)]
        pages: usize,
        #[arg(long)]
        export_csv: Option<String>,
        #[arg(long)]
        print_to: Option<String>,
        #[arg(long, default_value = ".")]
        output_path: String,
    },
    Report {
        kind: ReportKind,
    },
    Metrics,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub level: Option<BoundaryLevel>,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub month: Option<u32>,
}

impl FilterArgs {
    /// 套用在初始篩選上；年份先變更，再嘗試月份
    pub fn apply(&self, base: FilterSelection) -> (FilterSelection, bool) {
        let mut selection = base;
        if let Some(level) = self.level {
            selection = selection.with_level(level);
        }
        if let Some(year) = self.year {
            selection = selection.with_year(year);
        }
        match self.month {
            Some(month) => match selection.with_month(month) {
                Some(next) => (next, true),
                None => (selection, false),
            },
            None => (selection, true),
        }
    }
}

impl CliConfig {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mode: self.mode,
            origin: self.origin.clone(),
            dev_backend: self.dev_backend.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }

    /// 讀取設定檔（若有）並套用命令列覆蓋
    pub fn load(&self) -> Result<DashboardConfig> {
        let file = match &self.config {
            Some(path) => {
                validate_path("config", path)?;
                tracing::info!("📄 Loading config from {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        DashboardConfig::resolve(&file, &self.overrides())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        if let Command::DutySheet { output_path, .. } = &self.command {
            validate_path("output_path", output_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_command() {
        let cli = CliConfig::try_parse_from([
            "burglary-dashboard",
            "--mode",
            "development",
            "map",
            "predicted",
            "--level",
            "lsoa",
            "--zoom",
            "12",
        ])
        .unwrap();

        match cli.command {
            Command::Map {
                endpoint,
                filters,
                zoom,
                ..
            } => {
                assert_eq!(endpoint, MapEndpoint::PredictedBurglaries);
                assert_eq!(filters.level, Some(BoundaryLevel::Lsoa));
                assert_eq!(zoom, 12.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.mode, Some(RuntimeMode::Development));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = CliConfig::try_parse_from([
            "burglary-dashboard",
            "duty-sheet",
            "--search",
            "brixton",
            "--verbose",
            "--timeout-seconds",
            "5",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.overrides().timeout_seconds, Some(5));
        assert!(matches!(cli.command, Command::DutySheet { ref search, .. } if search == "brixton"));
    }

    #[test]
    fn test_unknown_report_is_rejected() {
        assert!(CliConfig::try_parse_from(["burglary-dashboard", "report", "weather"]).is_err());
    }

    #[test]
    fn test_filter_args_apply() {
        let args = FilterArgs {
            level: None,
            year: Some(2025),
            month: Some(6),
        };
        let (selection, accepted) = args.apply(FilterSelection::default());
        assert!(!accepted);
        assert_eq!((selection.year, selection.month), (2025, 2));

        let args = FilterArgs {
            level: Some(BoundaryLevel::Lsoa),
            year: Some(2010),
            month: None,
        };
        let (selection, accepted) = args.apply(FilterSelection::default());
        assert!(accepted);
        assert_eq!(selection.month, 12);
    }
}
