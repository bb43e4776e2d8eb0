//! 終端機輸出。把各個 view-model 排成純文字。

use crate::core::duty_sheet::{format_hours, tier_badge, DutySheetState, DutySheetTable};
use crate::core::map_widget::{LoadState, MapView};
use crate::domain::filter::{month_range, year_range, FilterSelection};
use crate::render::reports::{format_pounds, AllocationSummary, MetricCard, Popout, SectionBody};
use crate::render::scale::BadgeColor;
use std::fmt::Write as _;

fn badge(color: BadgeColor) -> &'static str {
    match color {
        BadgeColor::Red => "[R]",
        BadgeColor::Yellow => "[Y]",
        BadgeColor::Green => "[G]",
        BadgeColor::Gray => "[-]",
    }
}

pub fn render_filters(selection: &FilterSelection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Filters");
    let _ = writeln!(out, "  Boundary level: {}", selection.level);
    let years = year_range();
    let _ = writeln!(
        out,
        "  Year: {} ({}-{})",
        selection.year,
        years.start(),
        years.end()
    );
    let months = month_range(selection.year);
    let _ = write!(
        out,
        "  Month: {} ({}-{})",
        selection.month,
        months.start(),
        months.end()
    );
    if let Some(hint) = selection.month_hint() {
        let _ = write!(out, " {}", hint);
    }
    let _ = writeln!(out);
    out
}

/// 地圖元件在還沒有資料時顯示的狀態
pub fn render_load_state(title: &str, state: &LoadState) -> String {
    match state {
        LoadState::Idle => format!("{}\n  (not loaded)\n", title),
        LoadState::Loading { message } => format!("{}\n  {}\n", title, message),
        LoadState::Loaded { message, .. } => format!("{}\n  {}\n", title, message),
        LoadState::Error { message, detail } => {
            format!("{}\n  ❌ {}\n  {}\n  [Retry] reloads the whole dashboard\n", title, message, detail)
        }
    }
}

pub fn render_map(view: &MapView, max_areas: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", view.legend.title, view.period_label);
    if let Some(label) = view.prediction_badge {
        let _ = writeln!(out, "  {}", label);
    }
    if let Some(label) = view.cache_badge {
        let _ = writeln!(out, "  ⚡ {}", label);
    }
    let _ = writeln!(
        out,
        "  Detail level: {} ({} areas)",
        view.detail_level, view.boundary_count
    );
    if let Some(source) = &view.data_source {
        let _ = writeln!(out, "  Data: {}", source);
    }
    if !view.time_label.is_empty() {
        let _ = writeln!(out, "  Time: {}", view.time_label);
    }

    let _ = writeln!(out, "  Legend:");
    for entry in &view.legend.entries {
        let _ = writeln!(out, "    {} {}", entry.color, entry.label);
    }
    let visibility = if view.boundaries_visible {
        "shown"
    } else {
        "hidden at this zoom"
    };
    let _ = writeln!(out, "    {} ({})", view.legend.boundary_label, visibility);

    let mut areas: Vec<_> = view.areas.iter().collect();
    areas.sort_by(|a, b| b.value.total_cmp(&a.value));
    if !areas.is_empty() {
        let _ = writeln!(out, "  Top areas:");
    }
    for area in areas.into_iter().take(max_areas) {
        // 第一行是代碼，已經印在前面
        let details: Vec<String> = area
            .tooltip
            .lines
            .iter()
            .skip(1)
            .map(|l| format!("{} {}", l.label, l.value))
            .collect();
        let _ = writeln!(
            out,
            "    {} {:<12} {}",
            area.color,
            area.code,
            details.join(" | ")
        );
    }
    out
}

pub fn render_duty_sheet(table: &DutySheetTable) -> String {
    let mut out = String::new();
    for group in table.visible_groups() {
        let _ = writeln!(out, "Ward name: {}", group.ward_name);
        for row in &group.rows {
            let _ = writeln!(
                out,
                "  {:<10} {:<10} {:<32} {:>8} {} {}",
                row.ward_code,
                row.lsoa_code,
                row.lsoa_name,
                format_hours(row.hours_per_week),
                badge(tier_badge(row)),
                row.tier
            );
        }
    }
    let _ = writeln!(out, "{}", table.summary());
    out
}

pub fn render_duty_state(state: &DutySheetState) -> String {
    match state {
        DutySheetState::Ready(table) => render_duty_sheet(table),
        other => format!("{}\n", other.message().unwrap_or_default()),
    }
}

pub fn render_popout(popout: &Popout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", popout.title);
    let _ = writeln!(out, "{}", popout.description);
    for section in &popout.sections {
        let _ = writeln!(out);
        if let Some(heading) = &section.heading {
            let _ = writeln!(out, "{}", heading);
        }
        match &section.body {
            SectionBody::Paragraphs(lines) => {
                for line in lines {
                    let _ = writeln!(out, "  {}", line);
                }
            }
            SectionBody::Bullets(items) => {
                for item in items {
                    let _ = writeln!(out, "  - {}", item);
                }
            }
            SectionBody::Scores(scores) => {
                for score in scores {
                    let _ = writeln!(
                        out,
                        "  {} {:<20} {}",
                        badge(score.color()),
                        score.label,
                        score.formatted()
                    );
                }
            }
        }
    }
    out
}

pub fn render_popout_previews(popouts: &[Popout]) -> String {
    let mut out = String::from("Interactive Reports\n");
    for popout in popouts {
        let _ = writeln!(out, "  {} ({})", popout.title, popout.kind);
        for line in &popout.preview {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}

pub fn render_metrics(cards: &[MetricCard]) -> String {
    let mut out = String::from("Prediction Metrics\n");
    for card in cards {
        let m = &card.metrics;
        let _ = writeln!(out, "  {}", card.title);
        let _ = writeln!(
            out,
            "    MSE: {}  RMSE: {}  MAE: {}  R²: {}",
            m.mse, m.rmse, m.mae, m.r2
        );
    }
    out
}

pub fn render_allocation(summary: &AllocationSummary) -> String {
    let mut out = String::from("Police Allocation\n");
    let _ = writeln!(out, "  Current Budget:   {}", format_pounds(summary.current_budget));
    let _ = writeln!(out, "  Optimized Budget: {}", format_pounds(summary.optimized_budget));
    let _ = writeln!(
        out,
        "  Savings:          {} ({:.0}% savings)",
        format_pounds(summary.savings()),
        summary.savings_percent()
    );
    for unit in &summary.units {
        let _ = writeln!(out, "  {}: {} → {}", unit.label, unit.current, unit.recommended);
    }
    out
}
