//! Single-flight decode scheduler
//!
//! Admits at most one in-flight decode at a time: a frame arriving while a
//! decode is outstanding is dropped, not queued, so the pipeline stays
//! real-time and bounded no matter how slow the detector is. The capture
//! thread never blocks; the detector runs on a dedicated worker thread and
//! completions flow to the display context over a bounded channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use crossbeam::utils::CachePadded;
use tracing::{debug, error, instrument, trace, warn};

use crate::detect::BarcodeDetector;
use crate::pipeline::polygon::{assemble_quads, Quad};
use crate::pipeline::PipelineError;
use crate::source::{ColorFrame, Frame, GrayFrame};
use crate::PipelineConfig;

/// Capacity-one admission gate over an atomic flag.
///
/// `try_acquire` is a non-blocking compare-and-swap; the returned permit
/// reopens the gate when dropped, so release happens on every completion
/// path without a manual clear.
#[derive(Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Exclusive hold on the single decode slot, released on drop.
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// One admitted frame's grayscale view on its way to the worker. Carries the
/// permit so an undeliverable request frees the slot when dropped.
struct DecodeRequest {
    gray: GrayFrame,
    permit: FlightPermit,
}

/// Completion event of one decode cycle: the first detection's decoded text
/// (if any) plus the overlay quads, tagged with the source frame's sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub sequence: u64,
    pub text: Option<String>,
    pub quads: Vec<Quad>,
}

/// Single-consumer channel the display context drains outcomes from.
pub type OutcomeReceiver = flume::Receiver<Arc<DecodeOutcome>>;

#[derive(Default)]
struct Stats {
    frames_seen: AtomicU64,
    frames_admitted: AtomicU64,
    frames_dropped: AtomicU64,
    decode_hits: AtomicU64,
    decode_empty: AtomicU64,
    decode_failures: AtomicU64,
}

/// Point-in-time copy of the scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_seen: u64,
    pub frames_admitted: u64,
    pub frames_dropped: u64,
    pub decode_hits: u64,
    pub decode_empty: u64,
    pub decode_failures: u64,
}

/// Cheap cloneable view of the scheduler's observable state. The scheduler
/// itself lives on the capture thread; a probe can be read from anywhere.
#[derive(Clone)]
pub struct SchedulerProbe {
    flight: SingleFlight,
    latest: Arc<ArcSwapOption<DecodeOutcome>>,
    stats: Arc<CachePadded<Stats>>,
}

impl SchedulerProbe {
    pub fn in_flight(&self) -> bool {
        self.flight.in_flight()
    }

    /// Most recent completion, whatever the display side has or hasn't drained.
    pub fn latest_outcome(&self) -> Option<Arc<DecodeOutcome>> {
        self.latest.load_full()
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_seen: self.stats.frames_seen.load(Ordering::Relaxed),
            frames_admitted: self.stats.frames_admitted.load(Ordering::Relaxed),
            frames_dropped: self.stats.frames_dropped.load(Ordering::Relaxed),
            decode_hits: self.stats.decode_hits.load(Ordering::Relaxed),
            decode_empty: self.stats.decode_empty.load(Ordering::Relaxed),
            decode_failures: self.stats.decode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Frame-throttled decode front end.
///
/// [`DecodeScheduler::on_frame`] is called from the capture context at
/// camera cadence and never blocks; the detector owned by the worker thread
/// sees at most one request at a time. Dropping the scheduler closes the
/// request channel, lets any in-flight decode finish and joins the worker.
pub struct DecodeScheduler {
    requests: Option<flume::Sender<DecodeRequest>>,
    probe: SchedulerProbe,
    worker: Option<thread::JoinHandle<()>>,
}

impl DecodeScheduler {
    /// Spawn the decode worker around `detector` and return the scheduler
    /// plus the outcome channel for the display context.
    pub fn new<D>(
        detector: D,
        config: &PipelineConfig,
    ) -> Result<(Self, OutcomeReceiver), PipelineError>
    where
        D: BarcodeDetector + 'static,
    {
        // Depth 1 backs the drop-if-busy policy structurally: with the
        // permit held there is never more than one queued request.
        let (request_tx, request_rx) = flume::bounded(1);
        let (outcome_tx, outcome_rx) = flume::bounded(config.outcome_queue_depth.max(1));

        let probe = SchedulerProbe {
            flight: SingleFlight::new(),
            latest: Arc::new(ArcSwapOption::empty()),
            stats: Arc::new(CachePadded::new(Stats::default())),
        };

        let worker_probe = probe.clone();
        let worker = thread::Builder::new()
            .name("argus-decode".into())
            .spawn(move || decode_worker(detector, request_rx, outcome_tx, worker_probe))
            .map_err(|source| PipelineError::ThreadSpawn {
                name: "argus-decode",
                source,
            })?;

        Ok((
            Self {
                requests: Some(request_tx),
                probe,
                worker: Some(worker),
            },
            outcome_rx,
        ))
    }

    /// Admit or drop one camera frame; always returns the color view for
    /// immediate display so the live preview never stalls.
    #[instrument(skip(self, frame))]
    pub fn on_frame(&self, frame: Frame) -> ColorFrame {
        let stats = &self.probe.stats;
        stats.frames_seen.fetch_add(1, Ordering::Relaxed);

        if let Some(permit) = self.probe.flight.try_acquire() {
            // Grayscale extraction happens on the admission path only
            let gray = frame.gray();
            stats.frames_admitted.fetch_add(1, Ordering::Relaxed);

            if let Some(tx) = &self.requests {
                if tx.try_send(DecodeRequest { gray, permit }).is_err() {
                    // Worker gone; the failed send hands the request back and
                    // dropping it frees the permit
                    debug!("decode worker unavailable, frame not dispatched");
                }
            }
        } else {
            stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("frames_dropped").increment(1);
            trace!("decode in flight, frame {} dropped", frame.meta().sequence);
        }

        frame.into_color()
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

    pub fn probe(&self) -> SchedulerProbe {
        self.probe.clone()
    }
}

impl Drop for DecodeScheduler {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop once any
        // in-flight cycle has completed
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("decode worker panicked");
            }
        }
    }
}

fn decode_worker<D: BarcodeDetector>(
    mut detector: D,
    requests: flume::Receiver<DecodeRequest>,
    outcomes: flume::Sender<Arc<DecodeOutcome>>,
    probe: SchedulerProbe,
) {
    while let Ok(DecodeRequest { gray, permit }) = requests.recv() {
        let sequence = gray.meta.sequence;
        let started = Instant::now();

        let outcome = match detector.detect(&gray) {
            Ok(found) if !found.is_empty() => {
                probe.stats.decode_hits.fetch_add(1, Ordering::Relaxed);
                let quads = assemble_quads(&found.points, found.len());
                debug!(
                    "frame {}: decoded {} barcode(s), first {:?} ({})",
                    sequence,
                    found.len(),
                    found.payloads[0],
                    found.symbologies.first().map(String::as_str).unwrap_or("?"),
                );
                DecodeOutcome {
                    sequence,
                    text: found.payloads.into_iter().next(),
                    quads,
                }
            }
            Ok(_) => {
                probe.stats.decode_empty.fetch_add(1, Ordering::Relaxed);
                DecodeOutcome {
                    sequence,
                    text: None,
                    quads: Vec::new(),
                }
            }
            Err(e) => {
                // Absorbed: a failed decode displays as "nothing found" and
                // the next admitted frame is the retry
                probe.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!("frame {}: decode failed: {}", sequence, e);
                DecodeOutcome {
                    sequence,
                    text: None,
                    quads: Vec::new(),
                }
            }
        };

        metrics::histogram!("decode_time_us").record(started.elapsed().as_micros() as f64);

        let outcome = Arc::new(outcome);
        probe.latest.store(Some(outcome.clone()));
        if outcomes.try_send(outcome).is_err() {
            // Display side gone or not draining; the latest cell still holds
            // the result
            trace!("frame {}: outcome not delivered", sequence);
        }

        // Clearing the flag is the final step of every completion path
        drop(permit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubDetector;
    use crate::source::FrameMetadata;
    use bytes::Bytes;
    use std::time::Duration;

    fn test_frame(sequence: u64) -> Frame {
        Frame::from_color(ColorFrame {
            data: Bytes::from(vec![128; 2 * 2 * 3]),
            meta: Arc::new(FrameMetadata {
                sequence,
                width: 2,
                height: 2,
                captured_at: Instant::now(),
            }),
        })
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn gate_admits_exactly_one() {
        let flight = SingleFlight::new();
        assert!(!flight.in_flight());

        let permit = flight.try_acquire().expect("gate starts open");
        assert!(flight.in_flight());
        assert!(flight.try_acquire().is_none());

        drop(permit);
        assert!(!flight.in_flight());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn gate_clones_share_the_slot() {
        let flight = SingleFlight::new();
        let alias = flight.clone();

        let _permit = flight.try_acquire().expect("gate starts open");
        assert!(alias.in_flight());
        assert!(alias.try_acquire().is_none());
    }

    #[test]
    fn stub_decode_completes_and_clears_flag() {
        let (scheduler, outcomes) =
            DecodeScheduler::new(StubDetector, &PipelineConfig::default()).expect("spawn worker");

        let color = scheduler.on_frame(test_frame(7));
        assert_eq!(color.meta.sequence, 7);

        let outcome = outcomes
            .recv_timeout(Duration::from_secs(2))
            .expect("outcome delivered");
        assert_eq!(outcome.sequence, 7);
        assert_eq!(outcome.text, None);
        assert!(outcome.quads.is_empty());

        assert!(wait_until(Duration::from_secs(2), || !scheduler.in_flight()));
        let stats = scheduler.stats();
        assert_eq!(stats.frames_seen, 1);
        assert_eq!(stats.frames_admitted, 1);
        assert_eq!(stats.decode_empty, 1);
        assert_eq!(scheduler.latest_outcome().expect("latest set").sequence, 7);
    }
}
