//! Procedural frame source for running the pipeline without camera hardware

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::info;

use crate::source::frame::{ColorFrame, Frame, FrameMetadata};
use crate::source::{FrameSource, SourceError};
use crate::SourceConfig;

enum State {
    Idle,
    Running,
    Stopped,
}

/// Generates a moving RGB24 test pattern at the configured resolution,
/// paced to `fps` (0 = as fast as the consumer pulls, used by tests).
pub struct SyntheticSource {
    config: SourceConfig,
    state: State,
    sequence: u64,
    interval: Option<Duration>,
    next_due: Instant,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        let interval = match config.fps {
            0 => None,
            fps => Some(Duration::from_secs(1) / fps),
        };

        Self {
            config,
            state: State::Idle,
            sequence: 0,
            interval,
            next_due: Instant::now(),
        }
    }

    fn render_pattern(&self) -> Bytes {
        let w = self.config.width as u64;
        let h = self.config.height as u64;
        let mut data = vec![0u8; (w * h * 3) as usize];

        // Vertical light bar sweeping across a fixed gradient
        let bar = (self.sequence * 7) % w.max(1);
        for y in 0..h {
            for x in 0..w {
                let i = ((y * w + x) * 3) as usize;
                data[i] = (x * 255 / w.max(1)) as u8;
                data[i + 1] = (y * 255 / h.max(1)) as u8;
                data[i + 2] = if x.abs_diff(bar) < 4 { 255 } else { 32 };
            }
        }

        data.into()
    }
}

impl FrameSource for SyntheticSource {
    fn start(&mut self) -> Result<(), SourceError> {
        info!(
            "Synthetic source started: {}x{} @ {} fps, facing {:?}",
            self.config.width, self.config.height, self.config.fps, self.config.facing
        );
        self.state = State::Running;
        self.next_due = Instant::now();
        Ok(())
    }

    fn stop(&mut self) {
        if matches!(self.state, State::Running) {
            info!("Synthetic source stopped after {} frames", self.sequence);
        }
        self.state = State::Stopped;
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        match self.state {
            State::Running => {}
            State::Idle => return Err(SourceError::NotStarted),
            State::Stopped => return Err(SourceError::Stopped),
        }

        if let Some(interval) = self.interval {
            let now = Instant::now();
            if self.next_due > now {
                thread::sleep(self.next_due - now);
            }
            self.next_due += interval;
        }

        self.sequence += 1;
        let meta = Arc::new(FrameMetadata {
            sequence: self.sequence,
            width: self.config.width,
            height: self.config.height,
            captured_at: Instant::now(),
        });

        Ok(Frame::from_color(ColorFrame {
            data: self.render_pattern(),
            meta,
        }))
    }
}
