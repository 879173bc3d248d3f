use std::thread;
use std::time::{Duration, Instant};

use argus::capture::{Frame, FrameMetadata, FrameProjection, Orientation, PixelFormat};
use argus::decode::{CodeResult, DecodeError, Symbology};
use argus::render::{HeadlessBackend, Phase};
use argus::{CameraScanner, Config, DisplayTarget, Error, RenderMode, Viewport};
use bytes::Bytes;
use flume::{Receiver, Sender};

const MAGIC: &[u8] = b"MAGIC-QR";

fn stub_decoder(
    data: &[u8],
    _width: u32,
    _height: u32,
    _hint: PixelFormat,
) -> Result<Option<CodeResult>, DecodeError> {
    if data.starts_with(MAGIC) {
        Ok(Some(CodeResult::new("https://example.org", Symbology::QrCode)))
    } else {
        Ok(None)
    }
}

fn frame(sequence: u64, data: &[u8]) -> Frame {
    Frame::new(
        Bytes::copy_from_slice(data),
        FrameMetadata {
            sequence,
            width: data.len() as u32,
            height: 1,
            stride: data.len() as u32,
            format: PixelFormat::Gray8,
            orientation: Orientation::Deg0,
        },
        FrameProjection::default(),
    )
}

fn config() -> Config {
    let mut config = Config::default();
    config.decode.poll_interval_ms = 1;
    config
}

fn scanner() -> (
    CameraScanner<Receiver<Frame>, HeadlessBackend>,
    Sender<Frame>,
) {
    let (tx, rx) = flume::unbounded();
    let scanner =
        CameraScanner::start(rx, HeadlessBackend::new(), stub_decoder, &config()).unwrap();
    (scanner, tx)
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn magic_frame_is_decoded_and_survives_misses() {
    let (mut scanner, tx) = scanner();
    let viewport = Viewport::new(320, 240);

    tx.send(frame(1, MAGIC)).unwrap();
    assert!(scanner.tick(&viewport).unwrap().published);
    assert!(wait_for(|| scanner.decoded_text().is_some()));
    assert_eq!(scanner.decoded_text().as_deref(), Some("https://example.org"));
    assert_eq!(scanner.decoded_format(), Some(Symbology::QrCode));

    assert!(wait_for(|| scanner.stats().frames_decoded == 1));
    tx.send(frame(2, b"nothing here")).unwrap();
    assert!(scanner.tick(&viewport).unwrap().published);
    assert!(wait_for(|| scanner.stats().frames_decoded == 2));
    thread::sleep(Duration::from_millis(5));

    assert_eq!(scanner.decoded_text().as_deref(), Some("https://example.org"));
    assert_eq!(scanner.stats().results_published, 1);

    scanner.shutdown().unwrap();
}

#[test]
fn results_are_readable_from_other_threads() {
    let (mut scanner, tx) = scanner();
    let results = scanner.results();
    let reader = thread::spawn(move || {
        wait_for(|| results.decoded_text().is_some()).then(|| results.decoded_text())
    });

    tx.send(frame(1, MAGIC)).unwrap();
    scanner.tick(&Viewport::new(320, 240)).unwrap();

    let text = reader.join().unwrap().flatten();
    assert_eq!(text.as_deref(), Some("https://example.org"));
    scanner.shutdown().unwrap();
}

#[test]
fn empty_ticks_are_recoverable() {
    let (mut scanner, _tx) = scanner();
    let err = scanner.tick(&Viewport::new(320, 240)).unwrap_err();
    assert!(matches!(err, Error::NoFrameAvailable));
    assert_eq!(scanner.stats().frames_missing, 1);
    assert_eq!(scanner.render().phase(), Phase::Uninitialized);
    scanner.shutdown().unwrap();
}

#[test]
fn frames_are_dropped_while_worker_is_busy() {
    let (tx, rx) = flume::unbounded();
    let (gate_tx, gate_rx) = flume::unbounded::<()>();
    let decoder = move |_: &[u8],
                        _: u32,
                        _: u32,
                        _: PixelFormat|
          -> Result<Option<CodeResult>, DecodeError> {
        let _ = gate_rx.recv();
        Ok(None)
    };
    let mut scanner = CameraScanner::start(rx, HeadlessBackend::new(), decoder, &config()).unwrap();
    let viewport = Viewport::new(320, 240);

    tx.send(frame(1, b"one")).unwrap();
    scanner.tick(&viewport).unwrap();
    // Worker claims frame 1 and blocks in the decoder
    assert!(wait_for(|| scanner.stats().frames_decoded == 1));

    tx.send(frame(2, b"two")).unwrap();
    assert!(scanner.tick(&viewport).unwrap().published);
    for sequence in 3..6 {
        tx.send(frame(sequence, b"later")).unwrap();
        let outcome = scanner.tick(&viewport).unwrap();
        assert!(!outcome.published);
    }

    let stats = scanner.stats();
    assert_eq!(stats.frames_rendered, 5);
    assert_eq!(stats.frames_published, 2);
    assert_eq!(stats.frames_dropped, 3);

    for _ in 0..2 {
        gate_tx.send(()).unwrap();
    }
    assert!(wait_for(|| scanner.stats().frames_decoded == 2));
    scanner.shutdown().unwrap();
}

#[test]
fn render_mode_round_trip_through_the_scanner() {
    let (mut scanner, tx) = scanner();
    let viewport = Viewport::new(320, 240);
    tx.send(frame(1, b"pixels")).unwrap();
    scanner.tick(&viewport).unwrap();
    let attached = scanner.render().backend().attached().to_vec();
    assert_eq!(attached.len(), 1);

    scanner.set_render_mode(RenderMode::External).unwrap();
    assert!(scanner.render().backend().attached().is_empty());

    // Frames keep flowing while detached
    tx.send(frame(2, b"pixels")).unwrap();
    scanner.tick(&viewport).unwrap();
    assert!(scanner.render().backend().attached().is_empty());

    scanner.set_render_mode(RenderMode::Normal).unwrap();
    let reattached = scanner.render().backend().attached();
    assert_eq!(reattached.len(), 1);
    assert!(reattached[0].same_targets(&attached[0]));

    scanner.shutdown().unwrap();
}

#[test]
fn display_target_resizes_immediately() {
    let (mut scanner, tx) = scanner();
    let viewport = Viewport::new(320, 240);
    tx.send(frame(1, b"pixels")).unwrap();
    scanner.tick(&viewport).unwrap();

    let texture = scanner
        .set_display_target(DisplayTarget::Right, &viewport)
        .unwrap()
        .unwrap();
    assert_eq!((texture.width, texture.height), (160, 240));
    assert_eq!(scanner.render().backend().live_textures(), vec![texture]);

    tx.send(frame(2, b"pixels")).unwrap();
    let outcome = scanner.tick(&viewport).unwrap();
    assert!(!outcome.resized);
    scanner.shutdown().unwrap();
}

#[test]
fn shutdown_releases_everything_once() {
    let (mut scanner, tx) = scanner();
    tx.send(frame(1, b"pixels")).unwrap();
    scanner.tick(&Viewport::new(320, 240)).unwrap();
    assert!(scanner.is_decoding());

    let started = Instant::now();
    scanner.shutdown().unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!scanner.is_decoding());

    let backend = scanner.render().backend();
    assert_eq!(scanner.render().phase(), Phase::Disposed);
    assert!(backend.attached().is_empty());
    assert!(backend.live_textures().is_empty());
    assert_eq!(backend.live_materials(), 0);
    let ops = backend.log().len();

    scanner.shutdown().unwrap();
    assert_eq!(scanner.render().backend().log().len(), ops);
    assert!(matches!(
        scanner.tick(&Viewport::new(320, 240)),
        Err(Error::Disposed)
    ));
}

#[test]
fn shutdown_before_any_frame() {
    let (mut scanner, _tx) = scanner();
    scanner.shutdown().unwrap();
    assert_eq!(scanner.render().phase(), Phase::Disposed);
    assert!(scanner.render().backend().log().is_empty());
}

#[test]
fn dropping_a_running_scanner_joins_the_worker() {
    let (scanner, tx) = scanner();
    let results = scanner.results();
    drop(scanner);
    // The channel's receiver went away with the scanner
    assert!(tx.send(frame(1, MAGIC)).is_err());
    assert!(results.latest().is_none());
}

#[test]
fn timed_out_shutdown_stops_ticking() {
    let (tx, rx) = flume::unbounded();
    let (gate_tx, gate_rx) = flume::unbounded::<()>();
    let decoder = move |_: &[u8],
                        _: u32,
                        _: u32,
                        _: PixelFormat|
          -> Result<Option<CodeResult>, DecodeError> {
        let _ = gate_rx.recv();
        Ok(None)
    };
    let mut config = config();
    config.decode.shutdown_timeout_ms = 20;
    let mut scanner = CameraScanner::start(rx, HeadlessBackend::new(), decoder, &config).unwrap();
    let viewport = Viewport::new(320, 240);

    tx.send(frame(1, b"stuck")).unwrap();
    scanner.tick(&viewport).unwrap();
    assert!(wait_for(|| scanner.stats().frames_decoded == 1));

    let err = scanner.shutdown().unwrap_err();
    assert!(matches!(err, Error::WorkerShutdownTimeout { .. }));
    assert_eq!(scanner.render().phase(), Phase::Disposed);

    tx.send(frame(2, b"late")).unwrap();
    assert!(matches!(scanner.tick(&viewport), Err(Error::Disposed)));
    assert_eq!(scanner.stats().frames_published, 1);
    assert_eq!(scanner.source_mut().len(), 1);

    gate_tx.send(()).unwrap();
    assert!(wait_for(|| !scanner.is_decoding()));
    scanner.shutdown().unwrap();
}
