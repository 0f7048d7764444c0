// src/tracking/mod.rs

pub mod corner_filter;
pub mod quad_tracker;

pub use corner_filter::{CornerFilterConfig, CornerKalmanFilter};
pub use quad_tracker::{QuadTrackerConfig, QuadrilateralTracker};
