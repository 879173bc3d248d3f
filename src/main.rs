//! Argus demo: synthetic camera, headless renderer and background decoding

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use argus::capture::{synthetic, Frame, PixelFormat, SyntheticCamera};
use argus::decode::{CodeResult, DecodeError, LumaDecoder, Symbology};
use argus::render::HeadlessBackend;
use argus::{CameraScanner, Config, Error};
use color_eyre::Result;
use flume::{bounded, TrySendError};
use tracing::{error, info, warn};

/// Treats the banner stamped by the synthetic camera as a QR payload
fn banner_decoder(
    luma: &[u8],
    _width: u32,
    _height: u32,
    _hint: PixelFormat,
) -> std::result::Result<Option<CodeResult>, DecodeError> {
    Ok(synthetic::read_banner(luma).map(|text| CodeResult::new(text, Symbology::QrCode)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.filter.as_str())
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Argus launching...");
    argus::CONFIG.store(Arc::new(config.clone()));

    // Capture runs at camera rate; the renderer only ever sees the newest frame
    let (tx, rx) = bounded::<Frame>(1);
    let capture_config = config.capture.clone();
    let capture_handle = tokio::spawn(async move {
        let mut camera = SyntheticCamera::new(&capture_config)
            .with_banner("https://example.org/argus", u64::from(capture_config.fps.max(1)));
        let mut interval = tokio::time::interval(Duration::from_secs_f64(
            1.0 / capture_config.fps.max(1) as f64,
        ));
        loop {
            interval.tick().await;
            if let Err(TrySendError::Disconnected(_)) = tx.try_send(camera.capture()) {
                break;
            }
        }
    });

    let mut scanner = CameraScanner::start(
        rx,
        HeadlessBackend::new(),
        LumaDecoder::new(banner_decoder),
        &config,
    )?;
    let results = scanner.results();
    let viewport = config.display.viewport();
    let mut ticker = tokio::time::interval(config.display.tick_interval());
    let mut seen = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl-C received");
                break;
            }
            _ = ticker.tick() => {
                match scanner.tick(&viewport) {
                    Ok(_) | Err(Error::NoFrameAvailable) => {}
                    Err(e) if e.is_recoverable() => warn!("Tick skipped: {}", e),
                    Err(e) => {
                        error!("Tick failed: {}", e);
                        break;
                    }
                }

                let generation = results.generation();
                if generation != seen {
                    seen = generation;
                    if let Some(result) = results.latest() {
                        info!("Decoded {}: {}", result.format, result.text);
                    }
                }
            }
        }
    }

    capture_handle.abort();
    let stats = scanner.stats();
    info!(
        "Rendered {} frames, decoded {}, dropped {}",
        stats.frames_rendered, stats.frames_decoded, stats.frames_dropped
    );
    scanner.shutdown()?;

    info!("Argus shutting down");
    Ok(())
}
