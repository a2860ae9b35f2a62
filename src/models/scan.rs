// Allow dead code: wire response fields kept for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Gasket dimensions in millimetres, derived from the calibration card scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanDimensions {
    pub width_mm: f64,
    pub height_mm: f64,
}

/// An internal hole detected inside the gasket outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoleDimensions {
    pub contour_points: Vec<[f64; 2]>,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Analysis result for a captured photo.
///
/// Contour coordinates are normalized to [0, 1] within the original image.
/// `calibration_warning` is set when no calibration card was found and the
/// dimensions fall back to an uncalibrated estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub contour_points: Vec<[f64; 2]>,
    pub dimensions: ScanDimensions,
    pub calibration_warning: bool,
    #[serde(default)]
    pub holes: Vec<HoleDimensions>,
}

/// Response of the live card-detection endpoint.
/// Only the boolean is published to the UI; confidence is informational.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DetectResponse {
    pub card_detected: bool,
    #[serde(default)]
    pub confidence: f64,
}

/// Acknowledgement returned when a scan dossier is submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
}

impl SubmitResponse {
    pub fn is_accepted(&self) -> bool {
        self.status == "accepted"
    }
}
