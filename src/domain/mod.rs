// Domain layer: view-models, filter state and ports. No HTTP here.

pub mod filter;
pub mod model;
pub mod ports;
