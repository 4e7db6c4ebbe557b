//! Argus barcode scan pipeline with a synthetic source and stub detector

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tracing::info;

use argus::detect::StubDetector;
use argus::display::LogSink;
use argus::pipeline::ScanSession;
use argus::source::SyntheticSource;
use argus::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("argus=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Argus launching...");

    // Load configuration
    let config = Config::load()?;
    argus::CONFIG.store(Arc::new(config.clone()));

    let source = SyntheticSource::new(config.source.clone());
    let detector = StubDetector; // real vision backend goes here
    let sink = LogSink::new(&config.display);

    let session = ScanSession::spawn(source, detector, sink, &config.pipeline)?;

    let mut stats_tick = tokio::time::interval(Duration::from_secs(5));
    stats_tick.tick().await; // the first tick is immediate

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = stats_tick.tick() => {
                let stats = session.stats();
                info!(
                    "Frames seen {} admitted {} dropped {} | decodes: {} hit, {} empty, {} failed",
                    stats.frames_seen,
                    stats.frames_admitted,
                    stats.frames_dropped,
                    stats.decode_hits,
                    stats.decode_empty,
                    stats.decode_failures,
                );
            }
        }
    }

    info!("Argus shutting down");
    session.stop();
    Ok(())
}
