//! Background decode worker
//!
//! Runs on its own OS thread, polling the frame slot at a fixed interval and
//! publishing every successful decode into a [`LatestResult`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::RecvTimeoutError;
use tracing::{debug, error, info, instrument, trace, warn};

use super::result::LatestResult;
use super::slot::{PendingFrame, SlotConsumer, StopHandle};
use crate::decode::{CodeResult, Decoder, DecoderOptions};
use crate::error::{Error, Result};
use crate::DecodeConfig;

/// Handle to the running decode thread.
///
/// [`stop`](Self::stop) must be called by the owner during teardown; dropping a
/// still-running worker requests a stop and joins without a time bound.
pub struct DecodeWorker {
    handle: Option<JoinHandle<()>>,
    stop: StopHandle,
    exited: flume::Receiver<()>,
    shutdown_timeout: Duration,
}

impl DecodeWorker {
    #[instrument(skip_all, fields(poll_ms = config.poll_interval_ms))]
    pub fn start<D>(
        consumer: SlotConsumer,
        mut decoder: D,
        results: Arc<LatestResult>,
        config: &DecodeConfig,
    ) -> Result<Self>
    where
        D: Decoder + 'static,
    {
        let stop = consumer.stop_handle();
        let poll = config.poll_interval();
        let options = config.options.clone();
        decoder.configure(&options);
        let (exit_tx, exit_rx) = flume::bounded(1);

        let handle = thread::Builder::new()
            .name("decode-worker".into())
            .spawn(move || {
                run(consumer, decoder, &results, &options, poll);
                let _ = exit_tx.send(());
            })?;

        info!("Decode worker started");
        Ok(Self {
            handle: Some(handle),
            stop,
            exited: exit_rx,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request a stop and join the thread.
    ///
    /// Blocks for at most the configured shutdown timeout. On timeout the
    /// thread is left running and the call may be retried.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.stop.request_stop();
        match self.exited.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    error!("Decode worker panicked");
                }
                info!("Decode worker stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    "Decode worker still busy after {:?}, decoder may be stuck",
                    self.shutdown_timeout
                );
                self.handle = Some(handle);
                Err(Error::WorkerShutdownTimeout {
                    waited: self.shutdown_timeout,
                })
            }
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            warn!("Decode worker dropped while running, joining");
            self.stop.request_stop();
            let _ = handle.join();
        }
    }
}

fn run<D: Decoder>(
    mut consumer: SlotConsumer,
    mut decoder: D,
    results: &LatestResult,
    options: &DecoderOptions,
    poll: Duration,
) {
    while !consumer.is_stop_requested() {
        if let Some(frame) = consumer.try_take() {
            match decode_one(&mut decoder, &frame, options) {
                Ok(Some(result)) => {
                    debug!(
                        "Decoded {} from frame {}: {}",
                        result.format, frame.sequence, result.text
                    );
                    metrics::counter!("argus_decode_success").increment(1);
                    results.publish(result);
                }
                Ok(None) => trace!("No code in frame {}", frame.sequence),
                Err(e) => {
                    debug!("Frame {}: {}", frame.sequence, e);
                    metrics::counter!("argus_decode_failure").increment(1);
                }
            }
        }

        thread::sleep(poll);
    }
}

/// Decode one frame. Decoder errors and panics both become `DecodeFailure`.
fn decode_one<D: Decoder>(
    decoder: &mut D,
    frame: &PendingFrame,
    options: &DecoderOptions,
) -> Result<Option<CodeResult>> {
    let started = Instant::now();
    // A decoder that panicked is reused as-is for the next frame
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        decoder.decode(&frame.data, frame.width, frame.height, frame.format)
    }));
    metrics::histogram!("argus_decode_time_us").record(started.elapsed().as_micros() as f64);

    match outcome {
        Ok(Ok(Some(result))) if !options.accepts(result.format) => {
            trace!("Ignoring {} result, not enabled", result.format);
            Ok(None)
        }
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(Error::DecodeFailure {
            reason: e.to_string(),
        }),
        Err(payload) => Err(Error::DecodeFailure {
            reason: format!("decoder panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
