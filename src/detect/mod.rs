//! Detector seam: the vision backend is an external collaborator reached
//! through [`BarcodeDetector`]; this crate ships only the wiring.

use thiserror::Error;

use crate::source::{GrayFrame, Point};

/// Everything one detector invocation found.
///
/// `points` is the detector's flat corner buffer: four consecutive entries
/// per detection, in the winding order the backend established. The expected
/// invariant is `points.len() == 4 * payloads.len()`; buffers that break it
/// are treated downstream as "nothing found".
#[derive(Debug, Clone, Default)]
pub struct Detections {
    pub payloads: Vec<String>,
    pub symbologies: Vec<String>,
    pub points: Vec<Point>,
}

impl Detections {
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("detector backend failure: {0}")]
    Backend(String),
}

/// A barcode detector bound to some vision library.
///
/// Invoked from the decode worker thread only, so implementations need
/// [`Send`] but never interior synchronization.
pub trait BarcodeDetector: Send {
    fn detect(&mut self, gray: &GrayFrame) -> Result<Detections, DetectError>;
}

/// Placeholder backend that never finds anything. Keeps the pipeline
/// runnable until a real vision library is wired in.
pub struct StubDetector;

impl BarcodeDetector for StubDetector {
    fn detect(&mut self, _gray: &GrayFrame) -> Result<Detections, DetectError> {
        Ok(Detections::default())
    }
}
