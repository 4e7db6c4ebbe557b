pub mod polygon;
pub mod scheduler;
pub mod session;

pub use polygon::{assemble_quads, Quad};
pub use scheduler::{
    DecodeOutcome, DecodeScheduler, FlightPermit, OutcomeReceiver, SchedulerProbe, SingleFlight,
    StatsSnapshot,
};
pub use session::ScanSession;

use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn {name} thread")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
}
