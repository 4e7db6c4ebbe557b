pub mod overlay;

use std::sync::Arc;

use tracing::info;

use crate::pipeline::scheduler::{DecodeOutcome, OutcomeReceiver};
use crate::source::ColorFrame;
use crate::DisplayConfig;
use overlay::{draw_quads, OverlayStyle};

/// Where preview frames and decode results end up.
///
/// Sink methods are infallible: per-frame display problems must never
/// surface as user-visible error states.
pub trait DisplaySink {
    /// Called for every preview frame, at capture cadence.
    fn show_frame(&mut self, frame: &ColorFrame);

    /// Called once per completed decode cycle.
    fn show_result(&mut self, outcome: &DecodeOutcome);
}

enum SinkEvent {
    Frame(Result<ColorFrame, flume::RecvError>),
    Outcome(Result<Arc<DecodeOutcome>, flume::RecvError>),
}

/// Drain loop for the display-owning thread: the single consumer of both
/// the preview and the outcome channel. Returns the sink once both producer
/// sides have disconnected, after delivering everything still buffered.
pub fn run_sink<S: DisplaySink>(
    mut sink: S,
    frames: flume::Receiver<ColorFrame>,
    outcomes: OutcomeReceiver,
) -> S {
    let mut frames_open = true;
    let mut outcomes_open = true;

    while frames_open || outcomes_open {
        let event = {
            let mut select = flume::Selector::new();
            if frames_open {
                select = select.recv(&frames, SinkEvent::Frame);
            }
            if outcomes_open {
                select = select.recv(&outcomes, SinkEvent::Outcome);
            }
            select.wait()
        };

        match event {
            SinkEvent::Frame(Ok(frame)) => {
                let latency = frame.meta.captured_at.elapsed();
                metrics::histogram!("frame_latency_ms").record(latency.as_millis() as f64);
                sink.show_frame(&frame);
            }
            SinkEvent::Frame(Err(_)) => frames_open = false,
            SinkEvent::Outcome(Ok(outcome)) => sink.show_result(&outcome),
            SinkEvent::Outcome(Err(_)) => outcomes_open = false,
        }
    }

    sink
}

/// Headless sink that logs the decoded text, or the configured not-found
/// message, only when the displayed state changes.
pub struct LogSink {
    not_found_message: String,
    last: Option<Option<String>>,
}

impl LogSink {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            not_found_message: config.not_found_message.clone(),
            last: None,
        }
    }
}

impl DisplaySink for LogSink {
    fn show_frame(&mut self, _frame: &ColorFrame) {}

    fn show_result(&mut self, outcome: &DecodeOutcome) {
        if self.last.as_ref() == Some(&outcome.text) {
            return;
        }
        match &outcome.text {
            Some(text) => info!("Barcode: {}", text),
            None => info!("{}", self.not_found_message),
        }
        self.last = Some(outcome.text.clone());
    }
}

/// Headless sink retaining the most recent frame; each result is painted
/// over a copy of that frame, the way an on-screen overlay would be drawn.
/// Used by tests and embedders without a windowing stack.
pub struct BufferSink {
    style: OverlayStyle,
    last_frame: Option<ColorFrame>,
    annotated: Option<ColorFrame>,
    last_outcome: Option<DecodeOutcome>,
}

impl BufferSink {
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            style,
            last_frame: None,
            annotated: None,
            last_outcome: None,
        }
    }

    pub fn last_frame(&self) -> Option<&ColorFrame> {
        self.last_frame.as_ref()
    }

    /// Most recent frame with the most recent outcome's quads painted in.
    pub fn annotated(&self) -> Option<&ColorFrame> {
        self.annotated.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&DecodeOutcome> {
        self.last_outcome.as_ref()
    }
}

impl DisplaySink for BufferSink {
    fn show_frame(&mut self, frame: &ColorFrame) {
        self.last_frame = Some(frame.clone());
    }

    fn show_result(&mut self, outcome: &DecodeOutcome) {
        if let Some(frame) = &self.last_frame {
            let mut rgb = frame.data.to_vec();
            draw_quads(
                &mut rgb,
                frame.meta.width,
                frame.meta.height,
                &outcome.quads,
                &self.style,
            );
            self.annotated = Some(ColorFrame {
                data: rgb.into(),
                meta: frame.meta.clone(),
            });
        }
        self.last_outcome = Some(outcome.clone());
    }
}
