//! Client-side state of the scan pipeline.
//!
//! Holds the captured photo and the analysis result between the camera,
//! validation and confirmation pages. Plain mutable fields owned by the
//! application; nothing here is persisted.

use crate::models::ProcessResult;

#[derive(Default)]
pub struct ScanState {
    photo: Option<Vec<u8>>,
    result: Option<ProcessResult>,
    thickness_mm: Option<f64>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a photo has been captured and not yet discarded.
    /// The validation page refuses to run without one.
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    pub fn photo(&self) -> Option<&[u8]> {
        self.photo.as_deref()
    }

    pub fn set_photo(&mut self, bytes: Vec<u8>) {
        self.photo = Some(bytes);
    }

    pub fn clear_photo(&mut self) {
        self.photo = None;
    }

    pub fn result(&self) -> Option<&ProcessResult> {
        self.result.as_ref()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn set_result(&mut self, result: ProcessResult) {
        self.result = Some(result);
    }

    pub fn thickness_mm(&self) -> Option<f64> {
        self.thickness_mm
    }

    /// Manually measured gasket thickness; None clears the entry
    pub fn set_thickness(&mut self, thickness_mm: Option<f64>) {
        self.thickness_mm = thickness_mm;
    }

    /// Discard the analysis result and thickness, keeping the photo.
    /// Used when the operator re-runs the analysis.
    pub fn clear_result(&mut self) {
        self.result = None;
        self.thickness_mm = None;
    }

    /// Reset everything for a new scan
    pub fn clear(&mut self) {
        self.photo = None;
        self.clear_result();
    }
}
