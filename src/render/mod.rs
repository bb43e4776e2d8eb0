pub mod reports;
pub mod scale;
pub mod text;
pub mod tooltip;

pub use scale::{heat_color, legend, tier_color, BadgeColor, Legend};
pub use tooltip::{boundary_tooltip, feature_tooltip, Tooltip};
