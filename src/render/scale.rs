use crate::domain::model::Tier;

/// YlOrRd 色階，由低到高
pub const HEAT_COLORS: [&str; 6] = [
    "#ffffb2", "#fed976", "#feb24c", "#fd8d3c", "#f03b20", "#bd0026",
];

pub fn normalized(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if max > 0.0 {
        (value / max).min(1.0)
    } else if value > 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn heat_color(value: f64, max: f64) -> &'static str {
    let n = normalized(value, max);
    if n > 0.8 {
        HEAT_COLORS[5]
    } else if n > 0.6 {
        HEAT_COLORS[4]
    } else if n > 0.4 {
        HEAT_COLORS[3]
    } else if n > 0.2 {
        HEAT_COLORS[2]
    } else if n > 0.0 {
        HEAT_COLORS[1]
    } else {
        HEAT_COLORS[0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
    pub boundary_label: String,
}

/// 五個等距區間：0、0.2、0.4、0.6、0.8 倍最大值
pub fn legend(max: f64, title: &str, boundary_label: &str) -> Legend {
    let grades: Vec<f64> = [0.0, 0.2, 0.4, 0.6, 0.8].iter().map(|f| f * max).collect();

    let entries = grades
        .iter()
        .enumerate()
        .map(|(i, grade)| {
            let label = match grades.get(i + 1) {
                Some(next) if *next != 0.0 => format!("{:.0} – {:.0}", grade, next),
                _ => format!("{:.0}+", grade),
            };
            LegendEntry {
                color: heat_color(grade + 0.1, max),
                label,
            }
        })
        .collect();

    Legend {
        title: title.to_string(),
        entries,
        boundary_label: boundary_label.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Red,
    Yellow,
    Green,
    Gray,
}

impl BadgeColor {
    pub fn background(self) -> &'static str {
        match self {
            BadgeColor::Red => "#fee2e2",
            BadgeColor::Yellow => "#fef9c3",
            BadgeColor::Green => "#dcfce7",
            BadgeColor::Gray => "#f3f4f6",
        }
    }

    pub fn foreground(self) -> &'static str {
        match self {
            BadgeColor::Red => "#991b1b",
            BadgeColor::Yellow => "#854d0e",
            BadgeColor::Green => "#166534",
            BadgeColor::Gray => "#1f2937",
        }
    }
}

pub fn tier_color(tier: &str) -> BadgeColor {
    match Tier::parse(tier) {
        Tier::Tier1 => BadgeColor::Red,
        Tier::Tier2 => BadgeColor::Yellow,
        Tier::Tier3 => BadgeColor::Green,
        Tier::Other(_) => BadgeColor::Gray,
    }
}
