pub mod frame;
pub mod synthetic;

pub use frame::{ColorFrame, Frame, FrameMetadata, GrayFrame, Point};
pub use synthetic::SyntheticSource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which physical camera a source opens. Fixed at startup, not
/// runtime-switchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Back,
    Front,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// Terminal for the session: the platform refused camera access.
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    #[error("source not started")]
    NotStarted,
    #[error("source stopped")]
    Stopped,
}

/// A continuous sequence of camera frames at a device-driven cadence.
///
/// Implementations are owned by the capture thread, so they only need to be
/// [`Send`]. `next_frame` may block until the next tick is due.
pub trait FrameSource: Send {
    fn start(&mut self) -> Result<(), SourceError>;

    fn stop(&mut self);

    fn next_frame(&mut self) -> Result<Frame, SourceError>;
}
