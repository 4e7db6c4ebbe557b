//! Active scan session: capture thread -> scheduler -> display thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flume::TrySendError;
use tracing::{error, info};

use crate::detect::BarcodeDetector;
use crate::display::{run_sink, DisplaySink};
use crate::pipeline::scheduler::{DecodeOutcome, DecodeScheduler, SchedulerProbe, StatsSnapshot};
use crate::pipeline::PipelineError;
use crate::source::{ColorFrame, FrameSource, SourceError};
use crate::PipelineConfig;

/// One running camera session.
///
/// `spawn` starts the source and wires the three contexts together: the
/// capture thread feeds the scheduler and the preview queue, the decode
/// worker runs the detector, the display thread drains previews and
/// outcomes into the sink. `stop` (or drop) tears all of it down, letting
/// any in-flight decode finish first.
pub struct ScanSession<S> {
    running: Arc<AtomicBool>,
    probe: SchedulerProbe,
    capture: Option<thread::JoinHandle<()>>,
    display: Option<thread::JoinHandle<S>>,
}

impl<S: DisplaySink + Send + 'static> ScanSession<S> {
    pub fn spawn<F, D>(
        mut source: F,
        detector: D,
        sink: S,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError>
    where
        F: FrameSource + 'static,
        D: BarcodeDetector + 'static,
    {
        // Fail fast: a denied camera surfaces here, before any thread spawns
        source.start()?;

        let (scheduler, outcomes) = DecodeScheduler::new(detector, config)?;
        let probe = scheduler.probe();
        let (preview_tx, preview_rx) = flume::bounded(config.preview_queue_depth.max(1));

        let running = Arc::new(AtomicBool::new(true));

        let capture_running = running.clone();
        let evict = preview_rx.clone();
        let capture = thread::Builder::new()
            .name("argus-capture".into())
            .spawn(move || capture_loop(source, scheduler, preview_tx, evict, capture_running))
            .map_err(|e| PipelineError::ThreadSpawn {
                name: "argus-capture",
                source: e,
            })?;

        let display = thread::Builder::new()
            .name("argus-display".into())
            .spawn(move || run_sink(sink, preview_rx, outcomes));
        let display = match display {
            Ok(handle) => handle,
            Err(e) => {
                // Unwind the capture side before reporting
                running.store(false, Ordering::Relaxed);
                if capture.join().is_err() {
                    error!("capture thread panicked");
                }
                return Err(PipelineError::ThreadSpawn {
                    name: "argus-display",
                    source: e,
                });
            }
        };

        info!("Scan session started");
        Ok(Self {
            running,
            probe,
            capture: Some(capture),
            display: Some(display),
        })
    }

    /// Halt capture, let any in-flight decode finish, join the pipeline
    /// threads and hand the sink back for inspection. `None` only if a
    /// pipeline thread panicked.
    pub fn stop(mut self) -> Option<S> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(capture) = self.capture.take() {
            if capture.join().is_err() {
                error!("capture thread panicked");
            }
        }
        let sink = match self.display.take() {
            Some(display) => match display.join() {
                Ok(sink) => Some(sink),
                Err(_) => {
                    error!("display thread panicked");
                    None
                }
            },
            None => None,
        };
        info!("Scan session stopped");
        sink
    }

    pub fn in_flight(&self) -> bool {
        self.probe.in_flight()
    }

    pub fn latest_outcome(&self) -> Option<Arc<DecodeOutcome>> {
        self.probe.latest_outcome()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.probe.stats()
    }
}

impl<S> Drop for ScanSession<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(capture) = self.capture.take() {
            if capture.join().is_err() {
                error!("capture thread panicked");
            }
        }
        if let Some(display) = self.display.take() {
            if display.join().is_err() {
                error!("display thread panicked");
            }
        }
    }
}

fn capture_loop<F: FrameSource>(
    mut source: F,
    scheduler: DecodeScheduler,
    previews: flume::Sender<ColorFrame>,
    evict: flume::Receiver<ColorFrame>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(SourceError::Stopped) => break,
            Err(e) => {
                error!("Capture error: {}", e);
                thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        let color = scheduler.on_frame(frame);
        match previews.try_send(color) {
            Ok(()) => {}
            Err(TrySendError::Full(color)) => {
                // Evict the oldest queued preview rather than block capture
                let _ = evict.try_recv();
                metrics::counter!("preview_frames_dropped").increment(1);
                let _ = previews.try_send(color);
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    source.stop();
    // Dropping the scheduler joins the decode worker once any in-flight
    // cycle completes; the preview sender closes when this frame ends, which
    // lets the display loop drain and exit
    drop(scheduler);
}
