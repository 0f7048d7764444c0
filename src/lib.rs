// src/lib.rs
//
// scantrack: the tracking core of a document-scanning pipeline.
//
// An external detector hands us candidate quadrilaterals (four corners in
// source-image space) per video frame; an external motion source hands us
// gravity-removed acceleration and angular rate. This crate scores the
// candidates, decides whether the device is steady enough to trust a fresh
// measurement, and smooths the winning quadrilateral across frames with one
// constant-velocity Kalman filter per corner.
//
// Camera setup, model inference, rendering, and capture decisions are the
// surrounding system's job.

pub mod config;
pub mod pipeline;
pub mod scoring;
pub mod stability;
pub mod tracking;
pub mod types;

pub use config::Config;
pub use pipeline::FramePipeline;
pub use scoring::{CandidateScore, CandidateScorer, ScoringConfig};
pub use stability::{StabilityConfig, StabilityGate};
pub use tracking::{CornerFilterConfig, CornerKalmanFilter, QuadTrackerConfig, QuadrilateralTracker};
pub use types::{MotionSample, Point2D, Quadrilateral};
